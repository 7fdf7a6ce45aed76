//! # Gateway Client SDK
//!
//! A typed Rust client for the payment gateway API.

use gateway_types::{
    AccountResponse, CreateAccountRequest, CreateAccountResponse, CreateInvoiceRequest,
    InvoiceId, InvoiceResponse, InvoiceStatus, UpdateInvoiceStatusRequest,
};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Payment gateway API client.
pub struct GatewayClient {
    base_url: String,
    api_key: Option<String>,
    http: Client,
}

impl GatewayClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            http: Client::new(),
        }
    }

    /// Sets the API key for authentication.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Checks if the API is healthy.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }

    /// Registers a new account. The returned API key is not retrievable later.
    pub async fn create_account(
        &self,
        name: &str,
        email: &str,
    ) -> Result<CreateAccountResponse, ClientError> {
        let req = CreateAccountRequest {
            name: name.to_string(),
            email: email.to_string(),
        };
        self.send(Method::POST, "/api/accounts", Some(&req)).await
    }

    /// Gets the account owning the configured API key.
    pub async fn me(&self) -> Result<AccountResponse, ClientError> {
        self.send::<_, ()>(Method::GET, "/api/accounts/me", None).await
    }

    /// Creates an invoice for the configured API key.
    ///
    /// `req.api_key` is ignored; the key set on the client is sent instead.
    pub async fn create_invoice(
        &self,
        req: &CreateInvoiceRequest,
    ) -> Result<InvoiceResponse, ClientError> {
        self.send(Method::POST, "/api/invoices", Some(req)).await
    }

    /// Gets an invoice by ID.
    pub async fn get_invoice(&self, id: InvoiceId) -> Result<InvoiceResponse, ClientError> {
        self.send::<_, ()>(Method::GET, &format!("/api/invoices/{}", id), None)
            .await
    }

    /// Lists the caller's invoices, newest first.
    pub async fn list_invoices(&self) -> Result<Vec<InvoiceResponse>, ClientError> {
        self.send::<_, ()>(Method::GET, "/api/invoices", None).await
    }

    /// Approves or rejects a pending invoice.
    pub async fn update_invoice_status(
        &self,
        id: InvoiceId,
        status: InvoiceStatus,
    ) -> Result<InvoiceResponse, ClientError> {
        let req = UpdateInvoiceStatusRequest {
            status: status.to_string(),
        };
        self.send(
            Method::PATCH,
            &format!("/api/invoices/{}/status", id),
            Some(&req),
        )
        .await
    }

    async fn send<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ClientError> {
        let mut req = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(body) = body {
            req = req.json(body);
        }
        if let Some(key) = &self.api_key {
            req = req.header("X-API-Key", key);
        }
        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(ClientError::Api {
                status: status.as_u16(),
                message: error_message(body),
            })
        }
    }
}

/// Pulls `error` out of a JSON error body, falling back to the raw text.
fn error_message(body: String) -> String {
    serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or(body)
}
