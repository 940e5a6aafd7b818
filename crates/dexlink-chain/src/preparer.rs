use std::sync::Arc;

use dexlink_core::{Nonce, PaymentInstruction, PreparedPayment, PreparedTransaction, SignaturePacket};
use dexlink_crypto::transfer::MAX_VENDOR_FIELD_BYTES;
use dexlink_crypto::{sha256_hex, ChainSdk, KeyPair, TransferParams};

use crate::error::ChainError;

/// Deterministic transaction id shared by every member: the hex SHA-256 of
/// `"{sender_address}-{nonce}"`. Signatures never influence it.
pub fn transaction_id(sender_address: &str, nonce: Nonce) -> String {
    sha256_hex(format!("{}-{}", sender_address, nonce).as_bytes())
}

/// Turns payment instructions into transfers signed by this member.
pub struct TransactionPreparer {
    sdk: Arc<dyn ChainSdk>,
    member: KeyPair,
    member_index: u8,
    member_public_key: String,
    member_address: String,
    multisig_public_key: String,
    multisig_address: String,
}

impl TransactionPreparer {
    pub fn new(
        sdk: Arc<dyn ChainSdk>,
        member: KeyPair,
        member_index: u8,
        multisig_public_key: impl Into<String>,
    ) -> Result<Self, ChainError> {
        let multisig_public_key = multisig_public_key.into();
        let multisig_address = sdk.address_from_public_key(&multisig_public_key)?;
        let member_public_key = member.public_key().to_hex();
        let member_address = sdk.address_from_public_key(&member_public_key)?;
        Ok(Self {
            sdk,
            member,
            member_index,
            member_public_key,
            member_address,
            multisig_public_key,
            multisig_address,
        })
    }

    pub fn multisig_address(&self) -> &str {
        &self.multisig_address
    }

    pub fn member_address(&self) -> &str {
        &self.member_address
    }

    /// Input checks that must pass before a nonce is consumed.
    pub fn validate(&self, instruction: &PaymentInstruction) -> Result<(), ChainError> {
        if !self.sdk.validate_address(&instruction.recipient_address) {
            return Err(ChainError::InvalidRecipient(instruction.recipient_address.clone()));
        }
        if instruction.message.len() > MAX_VENDOR_FIELD_BYTES {
            return Err(ChainError::InvalidMessage(format!(
                "message is {} bytes, limit is {}",
                instruction.message.len(),
                MAX_VENDOR_FIELD_BYTES
            )));
        }
        Ok(())
    }

    /// Build and sign the transfer for `instruction` at `nonce`.
    pub fn build(&self, instruction: &PaymentInstruction, nonce: Nonce) -> Result<PreparedPayment, ChainError> {
        let unsigned = self.sdk.build_transfer(&TransferParams {
            nonce,
            amount: instruction.amount,
            fee: instruction.fee,
            sender_public_key: self.multisig_public_key.clone(),
            recipient_address: instruction.recipient_address.clone(),
            timestamp: instruction.timestamp,
            message: instruction.message.clone(),
        })?;
        let signature = self.sdk.multi_sign(&unsigned, &self.member, self.member_index);

        let transaction = PreparedTransaction {
            id: transaction_id(&self.multisig_address, nonce),
            original_id: hex::encode(self.sdk.transaction_hash(&unsigned)),
            version: unsigned.version,
            network: unsigned.network,
            type_group: unsigned.type_group,
            kind: unsigned.kind,
            sender_address: self.multisig_address.clone(),
            sender_public_key: unsigned.sender_public_key,
            recipient_address: unsigned.recipient_address,
            amount: unsigned.amount.to_string(),
            fee: unsigned.fee.to_string(),
            nonce: unsigned.nonce.to_string(),
            message: unsigned.vendor_field,
            timestamp: unsigned.timestamp,
            expiration: unsigned.expiration,
            signatures: Vec::new(),
        };

        tracing::debug!(id = %transaction.id, nonce, "transaction prepared");
        Ok(PreparedPayment {
            transaction,
            signature: SignaturePacket {
                signer_address: self.member_address.clone(),
                public_key: self.member_public_key.clone(),
                signature,
            },
        })
    }
}
