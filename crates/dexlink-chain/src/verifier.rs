use std::sync::Arc;

use dexlink_core::{PreparedTransaction, SignaturePacket};
use dexlink_crypto::{ChainSdk, TransferParams, TransferTransaction};

use crate::error::ChainError;

/// Checks partial signatures produced by other members.
pub struct SignatureVerifier {
    sdk: Arc<dyn ChainSdk>,
}

impl SignatureVerifier {
    pub fn new(sdk: Arc<dyn ChainSdk>) -> Self {
        Self { sdk }
    }

    /// Whether `packet` is a valid partial signature over `transaction`.
    ///
    /// Any inconsistency yields `false`; this never errors.
    pub fn verify(&self, transaction: &PreparedTransaction, packet: &SignaturePacket) -> bool {
        match self.sdk.address_from_public_key(&packet.public_key) {
            Ok(address) if address == packet.signer_address => {}
            Ok(address) => {
                tracing::debug!(
                    claimed = %packet.signer_address,
                    derived = %address,
                    "signer address does not match public key"
                );
                return false;
            }
            Err(e) => {
                tracing::debug!(error = %e, "invalid signer public key");
                return false;
            }
        }

        let unsigned = match self.unsigned_view(transaction) {
            Ok(unsigned) => unsigned,
            Err(e) => {
                tracing::debug!(id = %transaction.id, error = %e, "cannot rebuild transaction");
                return false;
            }
        };

        let hash = self.sdk.transaction_hash(&unsigned);
        if !transaction.original_id.is_empty() && transaction.original_id != hex::encode(hash) {
            tracing::debug!(id = %transaction.id, "original id does not match rebuilt transaction");
            return false;
        }

        self.sdk
            .verify_signature(&hash, &packet.signature, &packet.public_key)
    }

    /// Rebuild the unsigned transfer that members signed.
    fn unsigned_view(&self, tx: &PreparedTransaction) -> Result<TransferTransaction, ChainError> {
        let mut unsigned = self.sdk.build_transfer(&TransferParams {
            nonce: tx.nonce_value()?,
            amount: tx.amount_value()?,
            fee: tx.fee_value()?,
            sender_public_key: tx.sender_public_key.clone(),
            recipient_address: tx.recipient_address.clone(),
            timestamp: tx.timestamp,
            message: tx.message.clone(),
        })?;
        unsigned.version = tx.version;
        unsigned.network = tx.network;
        unsigned.type_group = tx.type_group;
        unsigned.kind = tx.kind;
        unsigned.expiration = tx.expiration;
        Ok(unsigned)
    }
}
