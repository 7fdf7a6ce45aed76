//! API key generation and hashing.

use sha2::{Digest, Sha256};

/// Prefix of every generated key.
pub const API_KEY_PREFIX: &str = "gw_";

/// Hashes an API key using SHA-256.
pub fn hash_api_key(key: &str) -> String {
    let hash = Sha256::digest(key.as_bytes());
    hex::encode(hash)
}

/// Generates a new raw API key: the prefix followed by 32 hex characters.
pub fn generate_api_key() -> String {
    let bytes: [u8; 16] = rand::random();
    format!("{}{}", API_KEY_PREFIX, hex::encode(bytes))
}
