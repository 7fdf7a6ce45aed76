//! Store port traits.
//!
//! Adapters (SQLite, in-memory) implement these. Concurrency guarantees live
//! here rather than in the domain: key registration is insert-if-absent and
//! status updates are compare-and-swap on the current status.

use chrono::{DateTime, Utc};

use crate::domain::{Account, AccountId, Invoice, InvoiceId, InvoiceStatus};
use crate::error::RepoError;

/// Accounts and the API keys that authenticate them.
#[async_trait::async_trait]
pub trait AccountRepository: Send + Sync + 'static {
    /// Persists a newly built account.
    async fn create_account(&self, account: Account) -> Result<Account, RepoError>;

    /// Gets an account by ID.
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, RepoError>;

    /// Removes an account and its API key. Unknown IDs are a no-op.
    ///
    /// Used to undo a registration whose key could not be issued.
    async fn delete_account(&self, id: AccountId) -> Result<(), RepoError>;

    /// Binds `raw_key` to `account_id`.
    ///
    /// MUST be atomic insert-if-absent. Fails with `DuplicatedApiKey` when the
    /// key is already bound to any account (including this one) and with
    /// `AccountNotFound` when the account does not exist.
    async fn register_api_key(&self, account_id: AccountId, raw_key: &str)
    -> Result<(), RepoError>;

    /// Resolves a raw key to its owning account, or fails with `AccountNotFound`.
    async fn resolve_account_by_api_key(&self, raw_key: &str) -> Result<AccountId, RepoError>;

    /// Generates a fresh key, registers it for `account_id` and returns it.
    ///
    /// The returned raw key is not recoverable afterwards.
    async fn generate_api_key(&self, account_id: AccountId) -> Result<String, RepoError>;
}

/// Invoice persistence.
#[async_trait::async_trait]
pub trait InvoiceRepository: Send + Sync + 'static {
    /// Inserts a new invoice.
    async fn save(&self, invoice: &Invoice) -> Result<(), RepoError>;

    /// Gets an invoice by ID.
    async fn find_by_id(&self, id: InvoiceId) -> Result<Option<Invoice>, RepoError>;

    /// Lists an account's invoices, newest first.
    async fn list_by_account(&self, account_id: AccountId) -> Result<Vec<Invoice>, RepoError>;

    /// Atomically sets the status if it still equals `expected`.
    ///
    /// Fails with `NotFound` for an unknown id and with `InvalidStatus` when
    /// the stored status no longer equals `expected`, so two concurrent
    /// transitions of one pending invoice have exactly one winner.
    async fn update_status(
        &self,
        id: InvoiceId,
        expected: InvoiceStatus,
        new_status: InvoiceStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepoError>;
}

/// Everything the gateway service needs from a store.
pub trait GatewayRepository: AccountRepository + InvoiceRepository {}

impl<T: AccountRepository + InvoiceRepository> GatewayRepository for T {}
