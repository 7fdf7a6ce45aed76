//! SQLite repository adapter.
#![allow(clippy::collapsible_if)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

use gateway_types::{
    Account, AccountId, AccountRepository, ApiKeyId, DomainError, Invoice, InvoiceId,
    InvoiceRepository, InvoiceStatus, RepoError,
};

use crate::security::hash_api_key;
use crate::types::{DbAccount, DbInvoice, DbKeyOwner, DbStatus, format_timestamp, parse_uuid};

/// How long a connection waits for another writer before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const INVOICE_COLUMNS: &str = "id, account_id, amount, status, description, payment_type, card_last_digits, created_at, updated_at";

fn db_err(e: sqlx::Error) -> RepoError {
    RepoError::Database(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite repository implementation.
pub struct SqliteRepo {
    pool: SqlitePool,
}

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let in_memory = database_url.contains(":memory:");

        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            // Remove query parameters
            let path = path.split('?').next().unwrap_or(path);
            if !in_memory {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let mut options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // Every connection to `:memory:` is a separate database.
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .connect_with(options)
            .await?;

        let repo = Self { pool };
        repo.create_schema().await?;

        tracing::debug!(in_memory, "sqlite repository ready");
        Ok(repo)
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the database schema (idempotent).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        let ddl = include_str!("../migrations/0001_create_tables.sql");
        sqlx::raw_sql(ddl).execute(&self.pool).await.map_err(db_err)?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Account & API key operations
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl AccountRepository for SqliteRepo {
    async fn create_account(&self, account: Account) -> Result<Account, RepoError> {
        sqlx::query(
            r#"INSERT INTO accounts (id, name, email, created_at, updated_at) VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(account.id.to_string())
        .bind(&account.name)
        .bind(&account.email)
        .bind(format_timestamp(account.created_at))
        .bind(format_timestamp(account.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RepoError::Conflict(format!("account {} already exists", account.id))
            } else {
                db_err(e)
            }
        })?;

        Ok(account)
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, RepoError> {
        let row: Option<DbAccount> = sqlx::query_as(
            r#"SELECT id, name, email, created_at, updated_at FROM accounts WHERE id = ?"#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(DbAccount::into_domain).transpose()
    }

    async fn delete_account(&self, id: AccountId) -> Result<(), RepoError> {
        let id_str = id.to_string();
        let mut db_tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(r#"DELETE FROM api_keys WHERE account_id = ?"#)
            .bind(&id_str)
            .execute(&mut *db_tx)
            .await
            .map_err(db_err)?;

        sqlx::query(r#"DELETE FROM accounts WHERE id = ?"#)
            .bind(&id_str)
            .execute(&mut *db_tx)
            .await
            .map_err(db_err)?;

        db_tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn register_api_key(
        &self,
        account_id: AccountId,
        raw_key: &str,
    ) -> Result<(), RepoError> {
        let key_hash = hash_api_key(raw_key);
        let account_id_str = account_id.to_string();

        // Both statements write, so the transaction takes the write lock on
        // its first statement and waits out concurrent writers.
        let mut db_tx = self.pool.begin().await.map_err(db_err)?;

        // Keeps a row whose hash equals the new one, so re-registering the
        // active key still trips the unique index below.
        sqlx::query(r#"DELETE FROM api_keys WHERE account_id = ? AND key_hash <> ?"#)
            .bind(&account_id_str)
            .bind(&key_hash)
            .execute(&mut *db_tx)
            .await
            .map_err(db_err)?;

        sqlx::query(
            r#"INSERT INTO api_keys (id, account_id, key_hash, created_at) VALUES (?, ?, ?, ?)"#,
        )
        .bind(ApiKeyId::new().to_string())
        .bind(&account_id_str)
        .bind(&key_hash)
        .bind(format_timestamp(Utc::now()))
        .execute(&mut *db_tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RepoError::Domain(DomainError::DuplicatedApiKey)
            } else if is_foreign_key_violation(&e) {
                RepoError::Domain(DomainError::AccountNotFound)
            } else {
                db_err(e)
            }
        })?;

        db_tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn resolve_account_by_api_key(&self, raw_key: &str) -> Result<AccountId, RepoError> {
        let row: Option<DbKeyOwner> =
            sqlx::query_as(r#"SELECT account_id FROM api_keys WHERE key_hash = ?"#)
                .bind(hash_api_key(raw_key))
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        let owner = row.ok_or(RepoError::Domain(DomainError::AccountNotFound))?;
        Ok(AccountId::from_uuid(parse_uuid(&owner.account_id)?))
    }

    async fn generate_api_key(&self, account_id: AccountId) -> Result<String, RepoError> {
        crate::register_generated_key(self, account_id).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Invoice operations
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl InvoiceRepository for SqliteRepo {
    async fn save(&self, invoice: &Invoice) -> Result<(), RepoError> {
        sqlx::query(
            r#"INSERT INTO invoices (id, account_id, amount, status, description, payment_type, card_last_digits, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(invoice.id().to_string())
        .bind(invoice.account_id().to_string())
        .bind(invoice.amount())
        .bind(invoice.status().as_str())
        .bind(invoice.description())
        .bind(invoice.payment_type())
        .bind(invoice.card_last_digits())
        .bind(format_timestamp(invoice.created_at()))
        .bind(format_timestamp(invoice.updated_at()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RepoError::Conflict(format!("invoice {} already exists", invoice.id()))
            } else {
                db_err(e)
            }
        })?;

        Ok(())
    }

    async fn find_by_id(&self, id: InvoiceId) -> Result<Option<Invoice>, RepoError> {
        let row: Option<DbInvoice> =
            sqlx::query_as(&format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        row.map(DbInvoice::into_domain).transpose()
    }

    async fn list_by_account(&self, account_id: AccountId) -> Result<Vec<Invoice>, RepoError> {
        let rows: Vec<DbInvoice> = sqlx::query_as(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE account_id = ? ORDER BY created_at DESC"
        ))
        .bind(account_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(DbInvoice::into_domain).collect()
    }

    async fn update_status(
        &self,
        id: InvoiceId,
        expected: InvoiceStatus,
        new_status: InvoiceStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepoError> {
        let id_str = id.to_string();

        let result =
            sqlx::query(r#"UPDATE invoices SET status = ?, updated_at = ? WHERE id = ? AND status = ?"#)
                .bind(new_status.as_str())
                .bind(format_timestamp(updated_at))
                .bind(&id_str)
                .bind(expected.as_str())
                .execute(&self.pool)
                .await
                .map_err(db_err)?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let current: Option<DbStatus> =
            sqlx::query_as(r#"SELECT status FROM invoices WHERE id = ?"#)
                .bind(&id_str)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        match current {
            None => Err(RepoError::NotFound),
            Some(row) => {
                tracing::debug!(invoice_id = %id, current = %row.status, "status compare-and-swap lost");
                Err(DomainError::InvalidStatus.into())
            }
        }
    }
}
