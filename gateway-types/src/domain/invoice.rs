//! Invoice aggregate and its approval lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account::AccountId;
use super::credit_card::{CardDetails, CreditCard};
use crate::error::DomainError;

/// Unique identifier for an Invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(Uuid);

impl InvoiceId {
    /// Creates a new random InvoiceId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an InvoiceId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for InvoiceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for InvoiceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Position of an invoice in its approval lifecycle.
///
/// `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Approved => "approved",
            InvoiceStatus::Rejected => "rejected",
        }
    }

    /// True for `Approved` and `Rejected`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, InvoiceStatus::Pending)
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InvoiceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InvoiceStatus::Pending),
            "approved" => Ok(InvoiceStatus::Approved),
            "rejected" => Ok(InvoiceStatus::Rejected),
            _ => Err(DomainError::InvalidStatus),
        }
    }
}

/// One charge attempt against an account and its outcome.
///
/// Holds only the trailing digits of the card; the PAN and CVV never reach
/// this type.
#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    id: InvoiceId,
    account_id: AccountId,
    amount: f64,
    status: InvoiceStatus,
    description: String,
    payment_type: String,
    card_last_digits: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Creates a pending invoice, validating the amount and the card.
    pub fn new(
        account_id: AccountId,
        amount: f64,
        description: String,
        payment_type: String,
        card: CardDetails,
    ) -> Result<Self, DomainError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(DomainError::InvalidAmount);
        }

        let card = CreditCard::try_from(card)?;

        let now = Utc::now();
        Ok(Self {
            id: InvoiceId::new(),
            account_id,
            amount,
            status: InvoiceStatus::Pending,
            description,
            payment_type,
            card_last_digits: card.last_digits().to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Reconstructs an invoice from stored fields.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: InvoiceId,
        account_id: AccountId,
        amount: f64,
        status: InvoiceStatus,
        description: String,
        payment_type: String,
        card_last_digits: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            account_id,
            amount,
            status,
            description,
            payment_type,
            card_last_digits,
            created_at,
            updated_at,
        }
    }

    /// Moves a pending invoice to `Approved` or `Rejected`.
    ///
    /// One-shot: any call on a non-pending invoice, or with `Pending` as the
    /// target, fails with [`DomainError::InvalidStatus`].
    pub fn transition(&mut self, new_status: InvoiceStatus) -> Result<(), DomainError> {
        if self.status != InvoiceStatus::Pending || !new_status.is_terminal() {
            return Err(DomainError::InvalidStatus);
        }

        self.status = new_status;
        self.updated_at = Utc::now().max(self.created_at);
        Ok(())
    }

    pub fn id(&self) -> InvoiceId {
        self.id
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn payment_type(&self) -> &str {
        &self.payment_type
    }

    pub fn card_last_digits(&self) -> &str {
        &self.card_last_digits
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// True when `account_id` owns this invoice.
    pub fn is_owned_by(&self, account_id: AccountId) -> bool {
        self.account_id == account_id
    }
}
