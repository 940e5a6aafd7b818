//! Dexlink chain adapter
//!
//! Settles DEX payouts from a multisig account. Each member runs an adapter
//! that assigns the account's next nonce deterministically from ledger
//! history, builds the transfer, and contributes its partial signature, so
//! that every member produces the same transaction for the same instruction.

pub mod error;
pub mod ledger;
pub mod id_cache;
pub mod calibrator;
pub mod preparer;
pub mod verifier;
pub mod adapter;

pub use error::ChainError;
pub use ledger::{
    HttpLedgerService, InMemoryLedger, LedgerError, LedgerQueryClient, LedgerQueryService,
    RetryPolicy,
};
pub use id_cache::BoundedInsertionMap;
pub use calibrator::{CalibrationStatus, NonceAssignment, NonceCalibrator, SequencerState};
pub use preparer::{transaction_id, TransactionPreparer};
pub use verifier::SignatureVerifier;
pub use adapter::{IChainAdapter, MultisigChainAdapter};
