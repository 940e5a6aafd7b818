//! Read access to the Ledger Query Service.

pub mod client;
pub mod http;
pub mod memory;

use async_trait::async_trait;
use dexlink_core::{Account, Block, OutboundTransactionRecord, SortOrder};

pub use client::{LedgerQueryClient, RetryPolicy};
pub use http::HttpLedgerService;
pub use memory::InMemoryLedger;

/// Ledger query failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("service error: {0}")]
    Service(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl LedgerError {
    /// Transport and service failures are transient; a malformed response
    /// will not get better by asking again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Service(_))
    }
}

/// Ledger Query Service interface.
#[async_trait]
pub trait LedgerQueryService: Send + Sync {
    /// Fetch an account snapshot.
    async fn get_account(&self, address: &str) -> Result<Account, LedgerError>;

    /// Fetch the block at a height.
    async fn get_block_at_height(&self, height: u64) -> Result<Block, LedgerError>;

    /// Page through transactions sent by `address`.
    ///
    /// `Asc` returns records with `timestamp >= from_timestamp` in ascending
    /// `(timestamp, nonce)` order; `Desc` returns records with
    /// `timestamp <= from_timestamp` in descending order. At most `limit`
    /// records are returned.
    async fn get_outbound_transactions(
        &self,
        address: &str,
        from_timestamp: u64,
        limit: usize,
        order: SortOrder,
    ) -> Result<Vec<OutboundTransactionRecord>, LedgerError>;

    /// Transactions sent by `address` that were included in a block.
    async fn get_outbound_transactions_from_block(
        &self,
        address: &str,
        block_id: &str,
    ) -> Result<Vec<OutboundTransactionRecord>, LedgerError>;

    /// Up to `limit` blocks above `from_height` (exclusive), ascending.
    async fn get_blocks_between_heights(
        &self,
        from_height: u64,
        limit: usize,
    ) -> Result<Vec<Block>, LedgerError>;
}
