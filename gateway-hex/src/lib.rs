//! # Gateway Hex
//!
//! Application service layer and HTTP adapter for the payment gateway.
//!
//! ## Architecture
//!
//! - `service/` - Application service (orchestrates domain operations)
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! The service is generic over `R: GatewayRepository`, allowing
//! different store adapters to be injected.

pub mod inbound;
pub mod service;

#[cfg(test)]
mod service_tests;

pub use service::GatewayService;
