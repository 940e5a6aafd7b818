use crate::address::{address_from_public_key, validate_address};
use crate::error::CryptoError;
use crate::hashing::Hash;
use crate::keys::{KeyPair, PublicKey};
use crate::signing::{sign, verify, MultisigSignature};
use crate::transfer::{TransferParams, TransferTransaction};

/// Chain SDK interface.
///
/// Everything the adapter needs from the chain's cryptography: address
/// handling, transfer encoding and hashing, and partial multisignatures.
pub trait ChainSdk: Send + Sync {
    /// Network byte this SDK is configured for.
    fn network(&self) -> u8;

    /// Whether an address is well-formed for this network.
    fn validate_address(&self, address: &str) -> bool;

    /// Derive the address belonging to a hex public key.
    fn address_from_public_key(&self, public_key_hex: &str) -> Result<String, CryptoError>;

    /// Build an unsigned transfer.
    fn build_transfer(&self, params: &TransferParams) -> Result<TransferTransaction, CryptoError>;

    /// Hash of the transfer with every signature field excluded.
    fn transaction_hash(&self, tx: &TransferTransaction) -> Hash;

    /// Produce this member's partial signature at `index` in the group.
    fn multi_sign(&self, tx: &TransferTransaction, member: &KeyPair, index: u8) -> String;

    /// Check an encoded partial signature against a hash and hex public key.
    fn verify_signature(&self, hash: &Hash, signature: &str, public_key_hex: &str) -> bool;
}

/// Ed25519 / BLAKE3 implementation of [`ChainSdk`].
#[derive(Debug, Clone)]
pub struct Ed25519Sdk {
    network: u8,
}

impl Ed25519Sdk {
    pub fn new(network: u8) -> Self {
        Self { network }
    }
}

impl ChainSdk for Ed25519Sdk {
    fn network(&self) -> u8 {
        self.network
    }

    fn validate_address(&self, address: &str) -> bool {
        validate_address(address, self.network).is_ok()
    }

    fn address_from_public_key(&self, public_key_hex: &str) -> Result<String, CryptoError> {
        let pk = PublicKey::from_hex(public_key_hex)?;
        Ok(address_from_public_key(&pk, self.network))
    }

    fn build_transfer(&self, params: &TransferParams) -> Result<TransferTransaction, CryptoError> {
        TransferTransaction::builder()
            .network(self.network)
            .params(params)
            .build()
    }

    fn transaction_hash(&self, tx: &TransferTransaction) -> Hash {
        tx.hash()
    }

    fn multi_sign(&self, tx: &TransferTransaction, member: &KeyPair, index: u8) -> String {
        let hash = self.transaction_hash(tx);
        MultisigSignature {
            index,
            signature: sign(&hash, member),
        }
        .encode()
    }

    fn verify_signature(&self, hash: &Hash, signature: &str, public_key_hex: &str) -> bool {
        let decoded = match MultisigSignature::decode(signature) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::trace!(error = %e, "undecodable multisig signature");
                return false;
            }
        };
        let pk = match PublicKey::from_hex(public_key_hex) {
            Ok(pk) => pk,
            Err(e) => {
                tracing::trace!(error = %e, "invalid signer public key");
                return false;
            }
        };
        verify(hash, &decoded.signature, &pk).is_ok()
    }
}
