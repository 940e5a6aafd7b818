pub mod error;
pub mod types;
pub mod config;
pub mod logging;

pub use error::CoreError;
pub use config::{AdapterConfig, ChainConfig, LedgerConfig, LoggingConfig, NoncePolicy, SequencerConfig};
pub use types::{
    Account, Block, Nonce, OutboundTransactionRecord, PaymentInstruction, PreparedPayment,
    PreparedTransaction, SignaturePacket, SortOrder,
};
