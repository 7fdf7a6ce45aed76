//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{FromRequest, Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use gateway_types::{
    AccountResponse, AppError, CreateAccountRequest, CreateAccountResponse, CreateInvoiceRequest,
    GatewayRepository, InvoiceId, InvoiceResponse, UpdateInvoiceStatusRequest,
};

use super::auth::AuthenticatedAccount;
use super::rate_limit::RateLimiterState;
use crate::GatewayService;

/// Application state shared across handlers and middleware.
pub struct AppState<R: GatewayRepository> {
    pub service: GatewayService<R>,
    pub rate_limiter: Arc<RateLimiterState>,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0 {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error": message,
            "code": status.as_u16()
        });

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(AppError::BadRequest(rejection.body_text()))
    }
}

/// JSON body extractor whose rejections use the API error body.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

fn parse_invoice_id(id: &str) -> Result<InvoiceId, ApiError> {
    id.parse()
        .map_err(|_| ApiError(AppError::BadRequest("Invalid invoice ID".into())))
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Accounts
// ─────────────────────────────────────────────────────────────────────────────

/// Registers an account. The response carries the only copy of its API key.
#[tracing::instrument(skip(state, req), fields(name = %req.name))]
pub async fn create_account<R: GatewayRepository>(
    State(state): State<Arc<AppState<R>>>,
    ApiJson(req): ApiJson<CreateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (account, api_key) = state.service.create_account(req).await?;
    let body = CreateAccountResponse {
        account: AccountResponse::from(&account),
        api_key,
    };
    Ok((StatusCode::CREATED, Json(body)))
}

/// Returns the account owning the presented key.
#[tracing::instrument(skip(state, caller), fields(account_id = %caller.account_id))]
pub async fn me<R: GatewayRepository>(
    State(state): State<Arc<AppState<R>>>,
    Extension(caller): Extension<AuthenticatedAccount>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state.service.get_account(caller.account_id).await?;
    Ok(Json(AccountResponse::from(&account)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Invoices
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip(state, caller, req), fields(account_id = %caller.account_id))]
pub async fn create_invoice<R: GatewayRepository>(
    State(state): State<Arc<AppState<R>>>,
    Extension(caller): Extension<AuthenticatedAccount>,
    ApiJson(mut req): ApiJson<CreateInvoiceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.api_key = caller.api_key;
    let invoice = state.service.create_invoice(req).await?;
    Ok((StatusCode::CREATED, Json(InvoiceResponse::from(&invoice))))
}

#[tracing::instrument(skip(state, caller), fields(account_id = %caller.account_id))]
pub async fn list_invoices<R: GatewayRepository>(
    State(state): State<Arc<AppState<R>>>,
    Extension(caller): Extension<AuthenticatedAccount>,
) -> Result<impl IntoResponse, ApiError> {
    let invoices = state.service.list_invoices(caller.account_id).await?;
    let body: Vec<InvoiceResponse> = invoices.iter().map(InvoiceResponse::from).collect();
    Ok(Json(body))
}

#[tracing::instrument(skip(state, caller), fields(invoice_id = %id))]
pub async fn get_invoice<R: GatewayRepository>(
    State(state): State<Arc<AppState<R>>>,
    Extension(caller): Extension<AuthenticatedAccount>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let invoice_id = parse_invoice_id(&id)?;
    let invoice = state
        .service
        .get_invoice(invoice_id, caller.account_id)
        .await?;
    Ok(Json(InvoiceResponse::from(&invoice)))
}

/// Approves or rejects a pending invoice.
#[tracing::instrument(skip(state, caller, req), fields(invoice_id = %id))]
pub async fn update_invoice_status<R: GatewayRepository>(
    State(state): State<Arc<AppState<R>>>,
    Extension(caller): Extension<AuthenticatedAccount>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateInvoiceStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let invoice_id = parse_invoice_id(&id)?;
    let target = req
        .target_status()
        .map_err(|_| AppError::BadRequest(format!("Unsupported status: {}", req.status)))?;

    let invoice = state
        .service
        .transition_invoice(invoice_id, caller.account_id, target)
        .await?;
    Ok(Json(InvoiceResponse::from(&invoice)))
}
