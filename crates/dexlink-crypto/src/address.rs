//! Base58 account addresses.
//!
//! Layout: `network (1) || blake3(public_key)[..20] || checksum (4)`, where the
//! checksum is the first four bytes of `blake3` over the preceding 21 bytes.

use crate::error::CryptoError;
use crate::hashing::hash;
use crate::keys::PublicKey;

const KEY_DIGEST_LEN: usize = 20;
const CHECKSUM_LEN: usize = 4;
const ADDRESS_LEN: usize = 1 + KEY_DIGEST_LEN + CHECKSUM_LEN;

/// Derive the address of a public key on the given network.
pub fn address_from_public_key(public_key: &PublicKey, network: u8) -> String {
    let mut bytes = Vec::with_capacity(ADDRESS_LEN);
    bytes.push(network);
    bytes.extend_from_slice(&hash(public_key.as_bytes())[..KEY_DIGEST_LEN]);
    let checksum = hash(&bytes);
    bytes.extend_from_slice(&checksum[..CHECKSUM_LEN]);
    bs58::encode(bytes).into_string()
}

/// Check an address: base58, correct length, network byte, and checksum.
pub fn validate_address(address: &str, network: u8) -> Result<(), CryptoError> {
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|e| CryptoError::InvalidAddress(format!("invalid base58: {}", e)))?;
    if bytes.len() != ADDRESS_LEN {
        return Err(CryptoError::InvalidAddress(format!(
            "expected {} bytes, got {}",
            ADDRESS_LEN,
            bytes.len()
        )));
    }
    if bytes[0] != network {
        return Err(CryptoError::InvalidAddress(format!(
            "network byte {} does not match {}",
            bytes[0], network
        )));
    }
    let (payload, checksum) = bytes.split_at(ADDRESS_LEN - CHECKSUM_LEN);
    if hash(payload)[..CHECKSUM_LEN] != *checksum {
        return Err(CryptoError::InvalidAddress("checksum mismatch".into()));
    }
    Ok(())
}
