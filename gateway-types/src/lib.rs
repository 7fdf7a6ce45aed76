//! # Gateway Types
//!
//! Domain types and port traits for the payment gateway.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Account, ApiKey, CreditCard, Invoice)
//! - `ports/` - Trait definitions that store adapters must implement
//! - `dto/` - Request/response shapes and the invoice translation layer
//! - `error/` - Domain, repository and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    Account, AccountId, ApiKey, ApiKeyId, CardDetails, CreditCard, Invoice, InvoiceId,
    InvoiceStatus,
};
pub use dto::*;
pub use error::{AppError, DomainError, RepoError};
pub use ports::{AccountRepository, GatewayRepository, InvoiceRepository};
