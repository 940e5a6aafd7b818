//! Nonce sequencing and recovery.
//!
//! The calibrator owns the adapter's only mutable sequencing state. After a
//! reset it works out which nonces the multisig account has already spent and
//! hands out the next one, recognising instructions that were already
//! broadcast before a restart so that they get their original nonce back.

use dexlink_core::{Nonce, NoncePolicy, PaymentInstruction, SequencerConfig, SortOrder};

use crate::error::ChainError;
use crate::id_cache::BoundedInsertionMap;
use crate::ledger::LedgerQueryClient;

/// Where the calibrator stands within the current epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStatus {
    /// Reset done, look-ahead still pending.
    Uncalibrated,
    /// Nonces are issued by incrementing `next_nonce`.
    Calibrated,
    /// A fatal error occurred; nothing is issued until the next reset.
    Halted,
}

/// Sequencing state between two resets.
#[derive(Debug, Clone)]
pub struct SequencerState {
    pub next_nonce: Nonce,
    pub status: CalibrationStatus,
    /// Timestamp of the last instruction whose ledger floor was queried.
    pub last_timestamp_seen: Option<u64>,
    /// Lowest nonce the ledger still allows at `last_timestamp_seen`.
    pub ledger_floor: Nonce,
    pub resync_height: u64,
    pub resync_timestamp: u64,
    /// Idempotency key to nonce, rolling-cache policy only.
    pub recent_identifiers: BoundedInsertionMap<String, Nonce>,
}

/// Nonce handed out for one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonceAssignment {
    pub nonce: Nonce,
    /// The instruction was recognised as already broadcast.
    pub replayed: bool,
}

pub struct NonceCalibrator {
    address: String,
    initial_account_nonce: Nonce,
    config: SequencerConfig,
    state: SequencerState,
}

impl NonceCalibrator {
    /// `initial_account_nonce` is the account nonce snapshot taken at load; it
    /// seeds `next_nonce` when the ledger reports no history.
    pub fn new(address: impl Into<String>, initial_account_nonce: Nonce, config: SequencerConfig) -> Self {
        let state = SequencerState {
            next_nonce: initial_account_nonce.saturating_add(1),
            status: CalibrationStatus::Uncalibrated,
            last_timestamp_seen: None,
            ledger_floor: 0,
            resync_height: 0,
            resync_timestamp: 0,
            recent_identifiers: BoundedInsertionMap::new(config.identifier_cache_capacity),
        };
        Self {
            address: address.into(),
            initial_account_nonce,
            config,
            state,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn policy(&self) -> NoncePolicy {
        self.config.policy
    }

    pub fn state(&self) -> &SequencerState {
        &self.state
    }

    /// Rebuild the sequencing state from the ledger as of `height`.
    pub async fn reset(&mut self, client: &LedgerQueryClient, height: u64) -> Result<(), ChainError> {
        let block = client.get_block_at_height(height).await?;
        let highest = client
            .last_outbound_nonce_at_or_before(&self.address, block.timestamp, self.config.lookahead_page_size)
            .await?;

        let next_nonce = successor(highest.unwrap_or(self.initial_account_nonce))?;

        let mut recent = BoundedInsertionMap::new(self.config.identifier_cache_capacity);
        let status = match self.config.policy {
            NoncePolicy::HistoryReplay => CalibrationStatus::Uncalibrated,
            NoncePolicy::RollingCache => {
                self.scan_recent_identifiers(client, height, &mut recent).await?;
                CalibrationStatus::Calibrated
            }
        };

        self.state = SequencerState {
            next_nonce,
            status,
            last_timestamp_seen: None,
            ledger_floor: 0,
            resync_height: height,
            resync_timestamp: block.timestamp,
            recent_identifiers: recent,
        };

        tracing::info!(
            address = %self.address,
            height,
            timestamp = block.timestamp,
            next_nonce = self.state.next_nonce,
            cached = self.state.recent_identifiers.len(),
            "nonce calibrator reset"
        );
        Ok(())
    }

    /// Record every outbound transaction in the blocks following `height`.
    async fn scan_recent_identifiers(
        &self,
        client: &LedgerQueryClient,
        height: u64,
        recent: &mut BoundedInsertionMap<String, Nonce>,
    ) -> Result<(), ChainError> {
        let blocks = client
            .get_blocks_between_heights(height, self.config.cache_scan_blocks)
            .await?;
        for block in &blocks {
            let records = client
                .get_outbound_transactions_from_block(&self.address, &block.id)
                .await?;
            for record in records {
                recent.insert(record.idempotency_key().to_string(), record.nonce);
            }
        }
        tracing::debug!(blocks = blocks.len(), cached = recent.len(), "identifier cache rebuilt");
        Ok(())
    }

    /// Assign the nonce for `instruction`.
    pub async fn next_nonce(
        &mut self,
        client: &LedgerQueryClient,
        instruction: &PaymentInstruction,
    ) -> Result<NonceAssignment, ChainError> {
        if self.state.status == CalibrationStatus::Halted {
            return Err(ChainError::Halted);
        }

        // The floor is checked once per timestamp, on its first instruction.
        // Later instructions of the same block may reuse nonces the ledger
        // already holds for them.
        let first_of_timestamp = self.state.last_timestamp_seen != Some(instruction.timestamp);
        if first_of_timestamp {
            let highest = client
                .last_outbound_nonce_at_or_before(
                    &self.address,
                    instruction.timestamp,
                    self.config.lookahead_page_size,
                )
                .await?;
            self.state.ledger_floor = highest.map_or(Ok(0), successor)?;
        }

        let key = instruction.idempotency_key();
        let assignment = match self.config.policy {
            NoncePolicy::HistoryReplay => self.assign_with_history(client, key).await?,
            NoncePolicy::RollingCache => self.assign_with_cache(key)?,
        };
        // Only a completed assignment consumes the timestamp's floor check.
        self.state.last_timestamp_seen = Some(instruction.timestamp);

        if first_of_timestamp && !assignment.replayed && assignment.nonce < self.state.ledger_floor {
            let err = ChainError::NonceRegression {
                nonce: assignment.nonce,
                expected_min: self.state.ledger_floor,
            };
            return Err(self.halt(err));
        }

        if assignment.replayed {
            tracing::warn!(key = key.unwrap_or_default(), nonce = assignment.nonce, "instruction replayed");
        } else {
            tracing::debug!(nonce = assignment.nonce, timestamp = instruction.timestamp, "nonce assigned");
        }
        Ok(assignment)
    }

    async fn assign_with_history(
        &mut self,
        client: &LedgerQueryClient,
        key: Option<&str>,
    ) -> Result<NonceAssignment, ChainError> {
        if self.state.status == CalibrationStatus::Uncalibrated {
            let (next_nonce, matched) = match self.look_ahead(client, key).await {
                Ok(outcome) => outcome,
                Err(err @ ChainError::CalibrationExhausted { .. }) => return Err(self.halt(err)),
                Err(err) => return Err(err),
            };
            self.state.next_nonce = next_nonce;
            self.state.status = CalibrationStatus::Calibrated;
            if let Some(nonce) = matched {
                return Ok(NonceAssignment { nonce, replayed: true });
            }
        }
        self.issue_fresh()
    }

    /// Walk the history after the resync point past every transaction
    /// already sent. Returns the resulting next nonce and the nonce of a
    /// transaction carrying `key`, if one is found. State is left untouched.
    ///
    /// A full page that never leaves the cursor's timestamp is re-read with a
    /// wider window, since an ascending query from that timestamp would
    /// return the same page again.
    async fn look_ahead(
        &self,
        client: &LedgerQueryClient,
        key: Option<&str>,
    ) -> Result<(Nonce, Option<Nonce>), ChainError> {
        let page_size = self.config.lookahead_page_size;
        let mut cursor = self.state.resync_timestamp;
        let mut limit = page_size;
        let mut next_nonce = self.state.next_nonce;

        for iteration in 1..=self.config.max_lookahead_iterations {
            let page = client
                .get_outbound_transactions(&self.address, cursor, limit, SortOrder::Asc)
                .await?;
            tracing::trace!(iteration, cursor, limit, records = page.len(), "look-ahead page");

            for record in &page {
                if record.nonce < next_nonce {
                    continue;
                }
                next_nonce = successor(record.nonce)?;
                if key.is_some_and(|k| record.idempotency_key() == k) {
                    return Ok((next_nonce, Some(record.nonce)));
                }
            }

            if !LedgerQueryClient::is_full_page(&page, limit) {
                return Ok((next_nonce, None));
            }
            match page.last() {
                Some(last) if last.timestamp > cursor => {
                    cursor = last.timestamp;
                    limit = page_size;
                }
                _ => limit = limit.saturating_add(page_size),
            }
        }

        Err(ChainError::CalibrationExhausted {
            iterations: self.config.max_lookahead_iterations,
        })
    }

    fn assign_with_cache(&mut self, key: Option<&str>) -> Result<NonceAssignment, ChainError> {
        if let Some(&cached) = key.and_then(|k| self.state.recent_identifiers.get(&k.to_string())) {
            self.state.next_nonce = self.state.next_nonce.max(successor(cached)?);
            return Ok(NonceAssignment {
                nonce: cached,
                replayed: true,
            });
        }

        let assignment = self.issue_fresh()?;
        if let Some(k) = key {
            self.state.recent_identifiers.insert(k.to_string(), assignment.nonce);
        }
        Ok(assignment)
    }

    fn issue_fresh(&mut self) -> Result<NonceAssignment, ChainError> {
        let nonce = self.state.next_nonce;
        self.state.next_nonce = successor(nonce)?;
        Ok(NonceAssignment {
            nonce,
            replayed: false,
        })
    }

    fn halt(&mut self, err: ChainError) -> ChainError {
        tracing::error!(address = %self.address, error = %err, "nonce issuance halted");
        self.state.status = CalibrationStatus::Halted;
        err
    }
}

fn successor(nonce: Nonce) -> Result<Nonce, ChainError> {
    nonce.checked_add(1).ok_or(ChainError::NonceOverflow(nonce))
}
