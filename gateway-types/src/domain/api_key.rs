//! API Key domain type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AccountId;

/// Unique identifier for an API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApiKeyId(Uuid);

impl ApiKeyId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ApiKeyId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ApiKeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A credential bound 1:1 to an account.
///
/// Only the SHA-256 digest of the raw key is kept; the raw key is handed
/// to the caller once at registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: ApiKeyId,
    pub account_id: AccountId,
    pub key_hash: String,
    pub created_at: DateTime<Utc>,
}

impl ApiKey {
    /// Creates a new API key record for the given account and hash.
    pub fn new(account_id: AccountId, key_hash: String) -> Self {
        Self {
            id: ApiKeyId::new(),
            account_id,
            key_hash,
            created_at: Utc::now(),
        }
    }
}
