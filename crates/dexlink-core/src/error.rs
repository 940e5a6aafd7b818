/// Core data-model and configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid nonce: {0}")]
    InvalidNonce(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
