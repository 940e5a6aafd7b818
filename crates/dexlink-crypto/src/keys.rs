use ed25519_dalek::{SigningKey, VerifyingKey};
use zeroize::Zeroize;

use crate::error::CryptoError;

/// Domain separation context for passphrase-derived member keys.
const PASSPHRASE_KEY_CONTEXT: &str = "dexlink 2024-01-01 member signing key";

/// A multisig member's signing key.
///
/// The secret half never leaves this type; `ed25519-dalek` wipes it on drop.
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Key whose secret scalar is expanded from `seed`.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Derive a member key from its configured passphrase.
    ///
    /// The same passphrase always yields the same key, so every restart of a
    /// member signs with the key the multisig group registered.
    pub fn from_passphrase(passphrase: &str) -> Result<Self, CryptoError> {
        if passphrase.trim().is_empty() {
            return Err(CryptoError::InvalidInput("passphrase must not be empty".into()));
        }
        let mut seed = blake3::derive_key(PASSPHRASE_KEY_CONTEXT, passphrase.as_bytes());
        let kp = Self::from_seed(&seed);
        seed.zeroize();
        Ok(kp)
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            verifying_key: self.signing_key.verifying_key(),
        }
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }
}

/// Public half of a member or multisig key, exchanged as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    verifying_key: VerifyingKey,
}

impl PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let raw: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        VerifyingKey::from_bytes(&raw)
            .map(|verifying_key| Self { verifying_key })
            .map_err(|e| CryptoError::InvalidInput(format!("not a curve point: {}", e)))
    }

    pub fn from_hex(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(encoded)
            .map_err(|e| CryptoError::InvalidInput(format!("public key is not hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.verifying_key.as_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }
}
