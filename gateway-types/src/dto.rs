//! Data Transfer Objects (DTOs) and the invoice translation layer.
//!
//! Inbound shapes are converted into domain constructors here, and domain
//! entities are projected back into outbound shapes. No outbound type has a
//! field for the card number or CVV.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Account, AccountId, CardDetails, Invoice, InvoiceId, InvoiceStatus};
use crate::error::DomainError;

// ─────────────────────────────────────────────────────────────────────────────
// Account DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to register a new account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    pub name: String,
    pub email: String,
}

/// Account as exposed to API callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Response to account registration. The raw API key is only ever shown here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountResponse {
    #[serde(flatten)]
    pub account: AccountResponse,
    pub api_key: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Invoice DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to charge a card.
///
/// `api_key` comes from the authentication header, never from the JSON body.
#[derive(Clone, Serialize, Deserialize)]
pub struct CreateInvoiceRequest {
    #[serde(skip)]
    pub api_key: String,
    pub amount: f64,
    #[serde(default)]
    pub description: String,
    pub payment_type: String,
    pub card_number: String,
    #[serde(default)]
    pub holder_name: String,
    pub expiration_month: u32,
    pub expiration_year: i32,
    pub cvv: String,
}

impl std::fmt::Debug for CreateInvoiceRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateInvoiceRequest")
            .field("amount", &self.amount)
            .field("description", &self.description)
            .field("payment_type", &self.payment_type)
            .field("card_number", &"****")
            .field("holder_name", &self.holder_name)
            .field("expiration_month", &self.expiration_month)
            .field("expiration_year", &self.expiration_year)
            .field("cvv", &"***")
            .finish()
    }
}

/// Invoice as exposed to API callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceResponse {
    pub id: InvoiceId,
    pub account_id: AccountId,
    pub amount: f64,
    pub status: String,
    pub description: String,
    pub payment_type: String,
    pub card_last_digits: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to move an invoice out of `pending`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateInvoiceStatusRequest {
    /// `"approved"` or `"rejected"`
    pub status: String,
}

impl UpdateInvoiceStatusRequest {
    /// Parses the requested status into the closed domain enum.
    pub fn target_status(&self) -> Result<InvoiceStatus, DomainError> {
        self.status.parse()
    }
}

/// Builds a domain invoice for `account_id` from an inbound request.
///
/// The owner is always the caller-resolved `account_id`, never anything in
/// the request body. Constructor errors propagate unchanged.
pub fn to_invoice(
    input: CreateInvoiceRequest,
    account_id: AccountId,
) -> Result<Invoice, DomainError> {
    let card = CardDetails {
        number: input.card_number,
        holder_name: input.holder_name,
        expiration_month: input.expiration_month,
        expiration_year: input.expiration_year,
        cvv: input.cvv,
    };

    Invoice::new(
        account_id,
        input.amount,
        input.description,
        input.payment_type,
        card,
    )
}

/// Projects a domain invoice into its outbound shape.
pub fn from_invoice(invoice: &Invoice) -> InvoiceResponse {
    InvoiceResponse {
        id: invoice.id(),
        account_id: invoice.account_id(),
        amount: invoice.amount(),
        status: invoice.status().to_string(),
        description: invoice.description().to_string(),
        payment_type: invoice.payment_type().to_string(),
        card_last_digits: invoice.card_last_digits().to_string(),
        created_at: invoice.created_at(),
        updated_at: invoice.updated_at(),
    }
}

impl From<&Invoice> for InvoiceResponse {
    fn from(invoice: &Invoice) -> Self {
        from_invoice(invoice)
    }
}
