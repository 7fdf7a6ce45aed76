//! Domain models for the payment gateway.

pub mod account;
pub mod api_key;
pub mod credit_card;
pub mod invoice;

pub use account::{Account, AccountId};
pub use api_key::{ApiKey, ApiKeyId};
pub use credit_card::{CardDetails, CreditCard, LAST_DIGITS_LEN};
pub use invoice::{Invoice, InvoiceId, InvoiceStatus};
