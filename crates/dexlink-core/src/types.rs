use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Per-account transaction counter.
pub type Nonce = u64;

/// Serde adapter for integers that travel as decimal strings.
///
/// Anything other than a non-empty run of ASCII digits is rejected, so
/// malformed amounts and nonces never make it past deserialization.
pub mod decimal {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::fmt::Display;
    use std::str::FromStr;

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(D::Error::custom)
    }

    /// Parse a decimal string into an unsigned integer.
    pub fn parse<T>(raw: &str) -> Result<T, String>
    where
        T: FromStr,
        T::Err: Display,
    {
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("expected a decimal string, got {:?}", raw));
        }
        raw.parse::<T>().map_err(|e| e.to_string())
    }
}

/// Snapshot of the controlled multisig account as reported by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Account address.
    pub address: String,
    /// Account public key (hex), empty when the ledger does not report it.
    #[serde(default)]
    pub public_key: String,
    /// Last nonce the ledger has confirmed for this account.
    #[serde(rename = "nonce", with = "decimal")]
    pub ledger_nonce: Nonce,
    /// Member public keys (hex) of the multisig group, in signing-index order.
    #[serde(default)]
    pub multisig_public_keys: Vec<String>,
    /// Number of member signatures required.
    #[serde(default)]
    pub multisig_threshold: u32,
}

/// A ledger block header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: String,
    pub height: u64,
    /// Block timestamp in seconds.
    pub timestamp: u64,
}

/// A transaction previously sent by the controlled account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundTransactionRecord {
    pub id: String,
    #[serde(with = "decimal")]
    pub nonce: Nonce,
    pub timestamp: u64,
    #[serde(default)]
    pub message: String,
    pub block_id: String,
}

impl OutboundTransactionRecord {
    /// History ordering key.
    pub fn ordering_key(&self) -> (u64, Nonce) {
        (self.timestamp, self.nonce)
    }

    /// Key under which this record is remembered by the identifier cache:
    /// the message when present, the ledger id otherwise.
    pub fn idempotency_key(&self) -> &str {
        if self.message.is_empty() {
            &self.id
        } else {
            &self.message
        }
    }
}

/// Sort direction for paginated history queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

/// An outgoing payment the host wants settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInstruction {
    /// Stable identifier assigned by the host, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub recipient_address: String,
    /// Amount in the smallest unit.
    #[serde(with = "decimal")]
    pub amount: u128,
    /// Fee in the smallest unit.
    #[serde(with = "decimal")]
    pub fee: u128,
    /// Timestamp of the source block the instruction was derived from.
    pub timestamp: u64,
    #[serde(default)]
    pub message: String,
}

impl PaymentInstruction {
    pub fn new(recipient_address: impl Into<String>, amount: u128, fee: u128, timestamp: u64) -> Self {
        Self {
            id: None,
            recipient_address: recipient_address.into(),
            amount,
            fee,
            timestamp,
            message: String::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Key used to recognise a re-submitted instruction.
    ///
    /// The message goes on chain and can be matched against ledger records
    /// after a restart, so it wins over the host id. An id-only instruction
    /// is only recognised within the current epoch.
    pub fn idempotency_key(&self) -> Option<&str> {
        if !self.message.is_empty() {
            return Some(self.message.as_str());
        }
        self.id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Normalized transaction returned to the host.
///
/// Money and nonce fields are decimal strings. `id` is the deterministic
/// identifier shared by every signer; `original_id` keeps the chain hash of
/// the signed view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedTransaction {
    pub id: String,
    #[serde(default)]
    pub original_id: String,
    pub version: u8,
    pub network: u8,
    pub type_group: u32,
    #[serde(rename = "type")]
    pub kind: u16,
    pub sender_address: String,
    pub sender_public_key: String,
    pub recipient_address: String,
    pub amount: String,
    pub fee: String,
    pub nonce: String,
    #[serde(default)]
    pub message: String,
    pub timestamp: u64,
    #[serde(default)]
    pub expiration: u32,
    #[serde(default)]
    pub signatures: Vec<SignaturePacket>,
}

impl PreparedTransaction {
    pub fn nonce_value(&self) -> Result<Nonce, CoreError> {
        decimal::parse(&self.nonce).map_err(CoreError::InvalidNonce)
    }

    pub fn amount_value(&self) -> Result<u128, CoreError> {
        decimal::parse(&self.amount).map_err(CoreError::InvalidAmount)
    }

    pub fn fee_value(&self) -> Result<u128, CoreError> {
        decimal::parse(&self.fee).map_err(CoreError::InvalidAmount)
    }
}

/// A member's partial authorization of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignaturePacket {
    pub signer_address: String,
    /// Signer public key (hex).
    pub public_key: String,
    /// Encoded partial multisignature.
    pub signature: String,
}

/// Output of a successful preparation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedPayment {
    pub transaction: PreparedTransaction,
    pub signature: SignaturePacket,
}
