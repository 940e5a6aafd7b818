//! Adapter configuration loading and management.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::CoreError;

/// Full configuration for the chain adapter.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AdapterConfig {
    /// Chain and key settings.
    #[serde(default)]
    pub chain: ChainConfig,

    /// Ledger query settings.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Nonce sequencing settings.
    #[serde(default)]
    pub sequencer: SequencerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Alias of the ledger module that answers queries.
    #[serde(default = "default_module_alias")]
    pub module_alias: String,
    /// Network byte used for addresses and transactions.
    #[serde(default = "default_network")]
    pub network: u8,
    /// Public key (hex) of the multisig account this adapter spends from.
    #[serde(default)]
    pub multisig_public_key: String,
    /// Passphrase from which this member's signing key is derived.
    #[serde(default)]
    pub member_passphrase: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Base URL of the ledger query service.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Fixed delay between retries of a failed query.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Upper bound of random jitter added to each retry delay.
    #[serde(default)]
    pub retry_jitter_ms: u64,
    /// Per-request timeout for HTTP-backed services.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// How the calibrator recognises instructions that were already broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NoncePolicy {
    /// Scan history forward from the resync point on the first preparation
    /// and match by message.
    HistoryReplay,
    /// Keep a bounded identifier → nonce cache rebuilt on reset.
    #[default]
    RollingCache,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequencerConfig {
    #[serde(default)]
    pub policy: NoncePolicy,
    /// Page size for history queries.
    #[serde(default = "default_lookahead_page_size")]
    pub lookahead_page_size: usize,
    /// Maximum look-ahead pages before calibration gives up.
    #[serde(default = "default_max_lookahead_iterations")]
    pub max_lookahead_iterations: u32,
    /// Maximum number of remembered identifiers.
    #[serde(default = "default_identifier_cache_capacity")]
    pub identifier_cache_capacity: usize,
    /// Blocks scanned after the resync height to rebuild the cache.
    #[serde(default = "default_cache_scan_blocks")]
    pub cache_scan_blocks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_module_alias() -> String {
    "ark".into()
}
fn default_network() -> u8 {
    30
}
fn default_endpoint() -> String {
    "http://127.0.0.1:8010".into()
}
fn default_retry_delay_ms() -> u64 {
    5000
}
fn default_request_timeout_ms() -> u64 {
    10_000
}
fn default_lookahead_page_size() -> usize {
    100
}
fn default_max_lookahead_iterations() -> u32 {
    50
}
fn default_identifier_cache_capacity() -> usize {
    1000
}
fn default_cache_scan_blocks() -> usize {
    100
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            module_alias: default_module_alias(),
            network: default_network(),
            multisig_public_key: String::new(),
            member_passphrase: String::new(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            retry_delay_ms: default_retry_delay_ms(),
            retry_jitter_ms: 0,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl LedgerConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn retry_jitter(&self) -> Duration {
        Duration::from_millis(self.retry_jitter_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            policy: NoncePolicy::default(),
            lookahead_page_size: default_lookahead_page_size(),
            max_lookahead_iterations: default_max_lookahead_iterations(),
            identifier_cache_capacity: default_identifier_cache_capacity(),
            cache_scan_blocks: default_cache_scan_blocks(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl AdapterConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: AdapterConfig = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Reject settings the sequencer cannot run with.
    pub fn validate(&self) -> Result<(), CoreError> {
        let seq = &self.sequencer;
        if seq.lookahead_page_size == 0 {
            return Err(CoreError::InvalidConfig(
                "sequencer.lookahead_page_size must be greater than 0".into(),
            ));
        }
        if seq.max_lookahead_iterations == 0 {
            return Err(CoreError::InvalidConfig(
                "sequencer.max_lookahead_iterations must be greater than 0".into(),
            ));
        }
        if seq.identifier_cache_capacity == 0 {
            return Err(CoreError::InvalidConfig(
                "sequencer.identifier_cache_capacity must be greater than 0".into(),
            ));
        }
        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(CoreError::InvalidConfig(format!(
                "logging.format must be text or json, got {}",
                self.logging.format
            )));
        }
        Ok(())
    }
}
