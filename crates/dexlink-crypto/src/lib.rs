pub mod error;
pub mod keys;
pub mod signing;
pub mod hashing;
pub mod address;
pub mod transfer;
pub mod sdk;

pub use error::CryptoError;
pub use keys::{KeyPair, PublicKey};
pub use signing::{sign, verify, MultisigSignature, Signature};
pub use hashing::{hash, sha256_hex, Hash};
pub use address::{address_from_public_key, validate_address};
pub use transfer::{TransferBuilder, TransferParams, TransferTransaction};
pub use sdk::{ChainSdk, Ed25519Sdk};
