use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dexlink_core::{Account, Block, LedgerConfig, Nonce, OutboundTransactionRecord, SortOrder};

use super::{LedgerError, LedgerQueryService};

/// Delay schedule between attempts of a failed ledger query.
///
/// There is deliberately no attempt limit: an unreachable ledger stalls the
/// adapter instead of letting it guess a nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Fixed wait after each failure.
    pub delay: Duration,
    /// Upper bound of uniform random jitter added to `delay`.
    pub jitter: Duration,
}

impl RetryPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self {
            delay,
            jitter: Duration::ZERO,
        }
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        Self {
            delay: config.retry_delay(),
            jitter: config.retry_jitter(),
        }
    }

    /// Wait before the next attempt.
    pub fn next_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.delay;
        }
        let max_jitter_ms = self.jitter.as_millis().min(u64::MAX as u128) as u64;
        let extra = rand::thread_rng().gen_range(0..=max_jitter_ms);
        self.delay + Duration::from_millis(extra)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_millis(5000))
    }
}

/// Retry-wrapped access to a [`LedgerQueryService`].
#[derive(Clone)]
pub struct LedgerQueryClient {
    service: Arc<dyn LedgerQueryService>,
    policy: RetryPolicy,
}

impl LedgerQueryClient {
    pub fn new(service: Arc<dyn LedgerQueryService>, policy: RetryPolicy) -> Self {
        Self { service, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `request` until it succeeds or fails with a non-retryable error.
    async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut request: F) -> Result<T, LedgerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let mut attempt: u64 = 0;
        loop {
            match request().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => {
                    attempt += 1;
                    tracing::warn!(operation, error = %e, "ledger query failed, retrying");
                    tracing::debug!(operation, attempt, "ledger query retry scheduled");
                    tokio::time::sleep(self.policy.next_delay()).await;
                }
                Err(e) => {
                    tracing::error!(operation, error = %e, "ledger query failed permanently");
                    return Err(e);
                }
            }
        }
    }

    pub async fn get_account(&self, address: &str) -> Result<Account, LedgerError> {
        self.with_retry("getAccount", || self.service.get_account(address))
            .await
    }

    pub async fn get_block_at_height(&self, height: u64) -> Result<Block, LedgerError> {
        self.with_retry("getBlockAtHeight", || self.service.get_block_at_height(height))
            .await
    }

    pub async fn get_outbound_transactions(
        &self,
        address: &str,
        from_timestamp: u64,
        limit: usize,
        order: SortOrder,
    ) -> Result<Vec<OutboundTransactionRecord>, LedgerError> {
        self.with_retry("getOutboundTransactions", || {
            self.service
                .get_outbound_transactions(address, from_timestamp, limit, order)
        })
        .await
    }

    pub async fn get_outbound_transactions_from_block(
        &self,
        address: &str,
        block_id: &str,
    ) -> Result<Vec<OutboundTransactionRecord>, LedgerError> {
        self.with_retry("getOutboundTransactionsFromBlock", || {
            self.service.get_outbound_transactions_from_block(address, block_id)
        })
        .await
    }

    pub async fn get_blocks_between_heights(
        &self,
        from_height: u64,
        limit: usize,
    ) -> Result<Vec<Block>, LedgerError> {
        self.with_retry("getBlocksBetweenHeights", || {
            self.service.get_blocks_between_heights(from_height, limit)
        })
        .await
    }

    /// Highest nonce among the newest `page_size` transactions sent at or
    /// before `timestamp`, if any.
    pub async fn last_outbound_nonce_at_or_before(
        &self,
        address: &str,
        timestamp: u64,
        page_size: usize,
    ) -> Result<Option<Nonce>, LedgerError> {
        let page = self
            .get_outbound_transactions(address, timestamp, page_size, SortOrder::Desc)
            .await?;
        Ok(page.iter().map(|r| r.nonce).max())
    }

    /// A page as long as its limit means more records may follow.
    pub fn is_full_page<T>(page: &[T], limit: usize) -> bool {
        page.len() >= limit
    }
}
