/// Cryptographic operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("signature verification failed")]
    SignatureVerificationFailed,

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}
