//! SQLite row types and their conversion into domain values.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::FromRow;

use gateway_types::{Account, AccountId, Invoice, InvoiceId, InvoiceStatus, RepoError};

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// Account row from database.
#[derive(FromRow)]
pub struct DbAccount {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Invoice row from database.
#[derive(FromRow)]
pub struct DbInvoice {
    pub id: String,
    pub account_id: String,
    pub amount: f64,
    pub status: String,
    pub description: String,
    pub payment_type: String,
    pub card_last_digits: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Owning account of an API key.
#[derive(FromRow)]
pub struct DbKeyOwner {
    pub account_id: String,
}

/// Status-only row for compare-and-swap diagnostics.
#[derive(FromRow)]
pub struct DbStatus {
    pub status: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Fixed-width RFC 3339 so that text ordering matches time ordering.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, RepoError> {
    Ok(DateTime::parse_from_rfc3339(s)
        .map_err(|e| RepoError::Database(e.to_string()))?
        .with_timezone(&Utc))
}

pub fn parse_uuid(s: &str) -> Result<uuid::Uuid, RepoError> {
    uuid::Uuid::parse_str(s).map_err(|e| RepoError::Database(e.to_string()))
}

pub fn parse_status(s: &str) -> Result<InvoiceStatus, RepoError> {
    s.parse()
        .map_err(|_| RepoError::Database(format!("Unknown invoice status: {}", s)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain conversion
// ─────────────────────────────────────────────────────────────────────────────

impl DbAccount {
    /// Convert database row to domain Account.
    pub fn into_domain(self) -> Result<Account, RepoError> {
        Ok(Account::from_parts(
            AccountId::from_uuid(parse_uuid(&self.id)?),
            self.name,
            self.email,
            parse_timestamp(&self.created_at)?,
            parse_timestamp(&self.updated_at)?,
        ))
    }
}

impl DbInvoice {
    /// Convert database row to domain Invoice.
    pub fn into_domain(self) -> Result<Invoice, RepoError> {
        Ok(Invoice::from_parts(
            InvoiceId::from_uuid(parse_uuid(&self.id)?),
            AccountId::from_uuid(parse_uuid(&self.account_id)?),
            self.amount,
            parse_status(&self.status)?,
            self.description,
            self.payment_type,
            self.card_last_digits,
            parse_timestamp(&self.created_at)?,
            parse_timestamp(&self.updated_at)?,
        ))
    }
}
