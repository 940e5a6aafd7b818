use dexlink_core::{CoreError, Nonce};
use dexlink_crypto::CryptoError;

use crate::ledger::LedgerError;

/// Chain-adapter errors.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("invalid recipient address: {0}")]
    InvalidRecipient(String),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("adapter is not loaded")]
    NotLoaded,

    #[error("member public key {0} is not part of the multisig group")]
    NotMultisigMember(String),

    #[error("nonce calibration exhausted after {iterations} look-ahead pages")]
    CalibrationExhausted { iterations: u32 },

    #[error("nonce {nonce} is below the ledger minimum {expected_min}")]
    NonceRegression { nonce: Nonce, expected_min: Nonce },

    #[error("nonce {0} has no successor")]
    NonceOverflow(Nonce),

    #[error("nonce issuance halted until the next reset")]
    Halted,

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

impl ChainError {
    /// Whether the host must resynchronize from an earlier safe height
    /// before any further nonce can be issued.
    pub fn requires_resync(&self) -> bool {
        matches!(
            self,
            Self::CalibrationExhausted { .. } | Self::NonceRegression { .. } | Self::Halted
        )
    }
}
