//! # Gateway Repository
//!
//! Concrete store adapters for the payment gateway.
//! Both adapters implement the `AccountRepository` and `InvoiceRepository` ports.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gateway_types::{
    Account, AccountId, AccountRepository, DomainError, Invoice, InvoiceId, InvoiceRepository,
    InvoiceStatus, RepoError,
};

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
mod types;

pub mod security;


pub use memory::MemoryRepo;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteRepo;

/// Attempts before giving up on generating a collision-free key.
const KEY_GENERATION_ATTEMPTS: usize = 3;

/// Generates a random key and registers it, retrying on the (astronomically
/// unlikely) collision with an existing key.
pub(crate) async fn register_generated_key<R: AccountRepository + ?Sized>(
    repo: &R,
    account_id: AccountId,
) -> Result<String, RepoError> {
    for _ in 0..KEY_GENERATION_ATTEMPTS {
        let raw_key = security::generate_api_key();
        match repo.register_api_key(account_id, &raw_key).await {
            Ok(()) => return Ok(raw_key),
            Err(RepoError::Domain(DomainError::DuplicatedApiKey)) => {
                tracing::warn!(%account_id, "generated api key collided, retrying");
            }
            Err(e) => return Err(e),
        }
    }
    Err(DomainError::DuplicatedApiKey.into())
}

/// Unified repository wrapper selected at runtime from the database URL.
pub enum Repo {
    Memory(MemoryRepo),
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteRepo),
}

/// Build and initialize a repository from a database URL.
///
/// - `memory://` keeps everything in process memory
/// - `sqlite://path/to/file.db?mode=rwc` or `sqlite::memory:` (with the
///   `sqlite` feature) connects and runs migrations
///
/// # Examples
///
/// ```ignore
/// let repo = build_repo("memory://").await?;
/// let repo = build_repo("sqlite://gateway.db?mode=rwc").await?;
/// ```
pub async fn build_repo(database_url: &str) -> anyhow::Result<Repo> {
    Repo::new(database_url).await
}

impl Repo {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        if database_url.starts_with("memory:") {
            return Ok(Repo::Memory(MemoryRepo::new()));
        }

        #[cfg(feature = "sqlite")]
        if database_url.starts_with("sqlite:") {
            return Ok(Repo::Sqlite(SqliteRepo::new(database_url).await?));
        }

        anyhow::bail!("Unsupported database URL: {}", database_url)
    }

    /// Short adapter name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Repo::Memory(_) => "memory",
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(_) => "sqlite",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Port implementations for Repo (delegation)
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl AccountRepository for Repo {
    async fn create_account(&self, account: Account) -> Result<Account, RepoError> {
        match self {
            Repo::Memory(r) => r.create_account(account).await,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(r) => r.create_account(account).await,
        }
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, RepoError> {
        match self {
            Repo::Memory(r) => r.get_account(id).await,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(r) => r.get_account(id).await,
        }
    }

    async fn delete_account(&self, id: AccountId) -> Result<(), RepoError> {
        match self {
            Repo::Memory(r) => r.delete_account(id).await,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(r) => r.delete_account(id).await,
        }
    }

    async fn register_api_key(
        &self,
        account_id: AccountId,
        raw_key: &str,
    ) -> Result<(), RepoError> {
        match self {
            Repo::Memory(r) => r.register_api_key(account_id, raw_key).await,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(r) => r.register_api_key(account_id, raw_key).await,
        }
    }

    async fn resolve_account_by_api_key(&self, raw_key: &str) -> Result<AccountId, RepoError> {
        match self {
            Repo::Memory(r) => r.resolve_account_by_api_key(raw_key).await,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(r) => r.resolve_account_by_api_key(raw_key).await,
        }
    }

    async fn generate_api_key(&self, account_id: AccountId) -> Result<String, RepoError> {
        match self {
            Repo::Memory(r) => r.generate_api_key(account_id).await,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(r) => r.generate_api_key(account_id).await,
        }
    }
}

#[async_trait]
impl InvoiceRepository for Repo {
    async fn save(&self, invoice: &Invoice) -> Result<(), RepoError> {
        match self {
            Repo::Memory(r) => r.save(invoice).await,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(r) => r.save(invoice).await,
        }
    }

    async fn find_by_id(&self, id: InvoiceId) -> Result<Option<Invoice>, RepoError> {
        match self {
            Repo::Memory(r) => r.find_by_id(id).await,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(r) => r.find_by_id(id).await,
        }
    }

    async fn list_by_account(&self, account_id: AccountId) -> Result<Vec<Invoice>, RepoError> {
        match self {
            Repo::Memory(r) => r.list_by_account(account_id).await,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(r) => r.list_by_account(account_id).await,
        }
    }

    async fn update_status(
        &self,
        id: InvoiceId,
        expected: InvoiceStatus,
        new_status: InvoiceStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepoError> {
        match self {
            Repo::Memory(r) => r.update_status(id, expected, new_status, updated_at).await,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(r) => {
                r.update_status(id, expected, new_status, updated_at)
                    .await
            }
        }
    }
}
