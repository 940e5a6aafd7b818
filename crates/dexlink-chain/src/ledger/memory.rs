use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

use dexlink_core::{Account, Block, Nonce, OutboundTransactionRecord, SortOrder};

use super::{LedgerError, LedgerQueryService};

/// In-process ledger.
///
/// Holds accounts, a linear chain of blocks and per-address outbound history.
/// Used for local runs and tests; failures can be injected to exercise the
/// retry path.
pub struct InMemoryLedger {
    accounts: DashMap<String, Account>,
    /// Blocks in ascending height order; heights start at 1.
    blocks: RwLock<Vec<Block>>,
    /// Outbound history keyed by sender address, kept sorted by ordering key.
    outbound: DashMap<String, Vec<OutboundTransactionRecord>>,
    /// Errors returned by the next calls, oldest first.
    failures: Mutex<VecDeque<LedgerError>>,
    calls: AtomicUsize,
    history_queries: AtomicUsize,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            blocks: RwLock::new(Vec::new()),
            outbound: DashMap::new(),
            failures: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            history_queries: AtomicUsize::new(0),
        }
    }

    /// Insert or replace an account.
    pub fn upsert_account(&self, account: Account) {
        self.accounts.insert(account.address.clone(), account);
    }

    /// Overwrite the confirmed nonce of an existing account.
    pub fn set_account_nonce(&self, address: &str, nonce: Nonce) -> bool {
        match self.accounts.get_mut(address) {
            Some(mut account) => {
                account.ledger_nonce = nonce;
                true
            }
            None => false,
        }
    }

    /// Append a block on top of the chain and return it.
    pub fn append_block(&self, timestamp: u64) -> Block {
        let mut blocks = self.blocks.write().unwrap_or_else(PoisonError::into_inner);
        let height = blocks.last().map(|b| b.height + 1).unwrap_or(1);
        let block = Block {
            id: format!("block-{}", height),
            height,
            timestamp,
        };
        blocks.push(block.clone());
        block
    }

    /// Current tip, if any block exists.
    pub fn tip(&self) -> Option<Block> {
        self.blocks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Record a transaction sent by `address` in `block`.
    ///
    /// Also advances the account's confirmed nonce when the account exists.
    pub fn record_outbound(
        &self,
        address: &str,
        block: &Block,
        nonce: Nonce,
        message: &str,
    ) -> OutboundTransactionRecord {
        let record = OutboundTransactionRecord {
            id: format!("{}-tx-{}", address, nonce),
            nonce,
            timestamp: block.timestamp,
            message: message.to_string(),
            block_id: block.id.clone(),
        };

        let mut history = self.outbound.entry(address.to_string()).or_default();
        let pos = history.partition_point(|r| r.ordering_key() <= record.ordering_key());
        history.insert(pos, record.clone());
        drop(history);

        if let Some(mut account) = self.accounts.get_mut(address) {
            account.ledger_nonce = account.ledger_nonce.max(nonce);
        }

        tracing::trace!(address, nonce, block = %block.id, "recorded outbound transaction");
        record
    }

    /// Queue errors to be returned by the next calls, one per call.
    pub fn inject_failures(&self, failures: impl IntoIterator<Item = LedgerError>) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(failures);
    }

    /// Total number of service calls, failed ones included.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of `get_outbound_transactions` calls, failed ones included.
    pub fn history_query_count(&self) -> usize {
        self.history_queries.load(Ordering::SeqCst)
    }

    fn begin_call(&self) -> Result<(), LedgerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn history_of(&self, address: &str) -> Vec<OutboundTransactionRecord> {
        self.outbound
            .get(address)
            .map(|h| h.value().clone())
            .unwrap_or_default()
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerQueryService for InMemoryLedger {
    async fn get_account(&self, address: &str) -> Result<Account, LedgerError> {
        self.begin_call()?;
        self.accounts
            .get(address)
            .map(|a| a.value().clone())
            .ok_or_else(|| LedgerError::Service(format!("account {} not found", address)))
    }

    async fn get_block_at_height(&self, height: u64) -> Result<Block, LedgerError> {
        self.begin_call()?;
        self.blocks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|b| b.height == height)
            .cloned()
            .ok_or_else(|| LedgerError::Service(format!("no block at height {}", height)))
    }

    async fn get_outbound_transactions(
        &self,
        address: &str,
        from_timestamp: u64,
        limit: usize,
        order: SortOrder,
    ) -> Result<Vec<OutboundTransactionRecord>, LedgerError> {
        self.history_queries.fetch_add(1, Ordering::SeqCst);
        self.begin_call()?;
        let history = self.history_of(address);
        let page = match order {
            SortOrder::Asc => history
                .into_iter()
                .filter(|r| r.timestamp >= from_timestamp)
                .take(limit)
                .collect(),
            SortOrder::Desc => history
                .into_iter()
                .rev()
                .filter(|r| r.timestamp <= from_timestamp)
                .take(limit)
                .collect(),
        };
        Ok(page)
    }

    async fn get_outbound_transactions_from_block(
        &self,
        address: &str,
        block_id: &str,
    ) -> Result<Vec<OutboundTransactionRecord>, LedgerError> {
        self.begin_call()?;
        Ok(self
            .history_of(address)
            .into_iter()
            .filter(|r| r.block_id == block_id)
            .collect())
    }

    async fn get_blocks_between_heights(
        &self,
        from_height: u64,
        limit: usize,
    ) -> Result<Vec<Block>, LedgerError> {
        self.begin_call()?;
        Ok(self
            .blocks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|b| b.height > from_height)
            .take(limit)
            .cloned()
            .collect())
    }
}
