use ed25519_dalek::{Signer, Verifier};

use crate::error::CryptoError;
use crate::hashing::Hash;
use crate::keys::{KeyPair, PublicKey};

const SIGNATURE_LEN: usize = 64;

/// Encoded length of a [`MultisigSignature`]: index byte plus signature, in hex.
pub const MULTISIG_SIGNATURE_HEX_LEN: usize = 2 * (1 + SIGNATURE_LEN);

/// Ed25519 signature over a transaction hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    inner: ed25519_dalek::Signature,
}

impl Signature {
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LEN] {
        self.inner.to_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let raw: [u8; SIGNATURE_LEN] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidInput(format!("signature must be 64 bytes, got {}", bytes.len()))
        })?;
        Ok(Self {
            inner: ed25519_dalek::Signature::from_bytes(&raw),
        })
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

/// Sign a transaction hash.
pub fn sign(hash: &Hash, member: &KeyPair) -> Signature {
    Signature {
        inner: member.signing_key().sign(hash),
    }
}

/// Verify a signature over a transaction hash.
pub fn verify(hash: &Hash, signature: &Signature, signer: &PublicKey) -> Result<(), CryptoError> {
    signer
        .verifying_key()
        .verify(hash, &signature.inner)
        .map_err(|_| CryptoError::SignatureVerificationFailed)
}

/// A member's partial signature within a multisig group.
///
/// Encoded as two hex digits of member index followed by the 128 hex digits
/// of the signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigSignature {
    pub index: u8,
    pub signature: Signature,
}

impl MultisigSignature {
    pub fn encode(&self) -> String {
        format!("{:02x}{}", self.index, self.signature.to_hex())
    }

    pub fn decode(encoded: &str) -> Result<Self, CryptoError> {
        if encoded.len() != MULTISIG_SIGNATURE_HEX_LEN || !encoded.is_ascii() {
            return Err(CryptoError::InvalidInput(format!(
                "multisig signature must be {} hex chars, got {}",
                MULTISIG_SIGNATURE_HEX_LEN,
                encoded.len()
            )));
        }
        let (index, signature) = encoded.split_at(2);
        let index = u8::from_str_radix(index, 16)
            .map_err(|e| CryptoError::InvalidInput(format!("invalid member index: {}", e)))?;
        let bytes = hex::decode(signature)
            .map_err(|e| CryptoError::InvalidInput(format!("signature is not hex: {}", e)))?;
        Ok(Self {
            index,
            signature: Signature::from_bytes(&bytes)?,
        })
    }
}
