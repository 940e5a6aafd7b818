use serde::{Deserialize, Serialize};

use crate::error::CryptoError;
use crate::hashing::{hash, Hash};

/// Largest vendor field (message) a transfer may carry, in bytes.
pub const MAX_VENDOR_FIELD_BYTES: usize = 255;

/// Transaction format version produced by the builder.
pub const TRANSFER_VERSION: u8 = 2;

/// Core type group.
pub const CORE_TYPE_GROUP: u32 = 1;

/// Transfer type within the core group.
pub const TRANSFER_TYPE: u16 = 0;

/// Domain tag prepended to the canonical encoding.
const CANONICAL_TAG: &[u8] = b"dexlink/transfer/v2";

/// Inputs for building a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferParams {
    pub nonce: u64,
    pub amount: u128,
    pub fee: u128,
    pub sender_public_key: String,
    pub recipient_address: String,
    pub timestamp: u64,
    pub message: String,
}

/// Unsigned view of a transfer transaction.
///
/// This is what signers hash; signatures are never part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTransaction {
    pub version: u8,
    pub network: u8,
    pub type_group: u32,
    pub kind: u16,
    pub nonce: u64,
    pub sender_public_key: String,
    pub recipient_address: String,
    pub amount: u128,
    pub fee: u128,
    pub timestamp: u64,
    pub expiration: u32,
    pub vendor_field: String,
}

impl TransferTransaction {
    pub fn builder() -> TransferBuilder {
        TransferBuilder::default()
    }

    /// Deterministic byte encoding used for hashing.
    ///
    /// Fixed-width integers are big-endian; strings are prefixed with their
    /// byte length as a big-endian u16.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);
        buf.extend_from_slice(CANONICAL_TAG);
        buf.push(self.version);
        buf.push(self.network);
        buf.extend_from_slice(&self.type_group.to_be_bytes());
        buf.extend_from_slice(&self.kind.to_be_bytes());
        buf.extend_from_slice(&self.nonce.to_be_bytes());
        push_str(&mut buf, &self.sender_public_key);
        push_str(&mut buf, &self.recipient_address);
        buf.extend_from_slice(&self.amount.to_be_bytes());
        buf.extend_from_slice(&self.fee.to_be_bytes());
        buf.extend_from_slice(&self.timestamp.to_be_bytes());
        buf.extend_from_slice(&self.expiration.to_be_bytes());
        push_str(&mut buf, &self.vendor_field);
        buf
    }

    /// Hash of the canonical encoding.
    pub fn hash(&self) -> Hash {
        hash(&self.canonical_bytes())
    }

    /// Chain-level transaction id (hex of the hash).
    pub fn id(&self) -> String {
        hex::encode(self.hash())
    }
}

fn push_str(buf: &mut Vec<u8>, value: &str) {
    let bytes = value.as_bytes();
    // Every string field is bounded well below u16::MAX by the builder.
    buf.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
    buf.extend_from_slice(bytes);
}

/// Builder for transfer transactions.
#[derive(Default)]
pub struct TransferBuilder {
    network: u8,
    nonce: Option<u64>,
    amount: u128,
    fee: u128,
    sender_public_key: Option<String>,
    recipient_address: Option<String>,
    timestamp: u64,
    vendor_field: String,
}

impl TransferBuilder {
    pub fn network(mut self, network: u8) -> Self {
        self.network = network;
        self
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn amount(mut self, amount: u128) -> Self {
        self.amount = amount;
        self
    }

    pub fn fee(mut self, fee: u128) -> Self {
        self.fee = fee;
        self
    }

    pub fn sender_public_key(mut self, key: impl Into<String>) -> Self {
        self.sender_public_key = Some(key.into());
        self
    }

    pub fn recipient(mut self, address: impl Into<String>) -> Self {
        self.recipient_address = Some(address.into());
        self
    }

    pub fn timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn vendor_field(mut self, field: impl Into<String>) -> Self {
        self.vendor_field = field.into();
        self
    }

    /// Apply every field of a [`TransferParams`].
    pub fn params(self, params: &TransferParams) -> Self {
        self.nonce(params.nonce)
            .amount(params.amount)
            .fee(params.fee)
            .sender_public_key(params.sender_public_key.clone())
            .recipient(params.recipient_address.clone())
            .timestamp(params.timestamp)
            .vendor_field(params.message.clone())
    }

    pub fn build(self) -> Result<TransferTransaction, CryptoError> {
        let nonce = self
            .nonce
            .ok_or_else(|| CryptoError::InvalidTransaction("missing nonce".into()))?;
        let sender_public_key = self
            .sender_public_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| CryptoError::InvalidTransaction("missing sender public key".into()))?;
        let recipient_address = self
            .recipient_address
            .filter(|a| !a.is_empty())
            .ok_or_else(|| CryptoError::InvalidTransaction("missing recipient".into()))?;
        if self.vendor_field.len() > MAX_VENDOR_FIELD_BYTES {
            return Err(CryptoError::InvalidTransaction(format!(
                "vendor field is {} bytes, limit is {}",
                self.vendor_field.len(),
                MAX_VENDOR_FIELD_BYTES
            )));
        }
        if sender_public_key.len() > 1024 || recipient_address.len() > 1024 {
            return Err(CryptoError::InvalidTransaction("key or address too long".into()));
        }

        Ok(TransferTransaction {
            version: TRANSFER_VERSION,
            network: self.network,
            type_group: CORE_TYPE_GROUP,
            kind: TRANSFER_TYPE,
            nonce,
            sender_public_key,
            recipient_address,
            amount: self.amount,
            fee: self.fee,
            timestamp: self.timestamp,
            expiration: 0,
            vendor_field: self.vendor_field,
        })
    }
}
