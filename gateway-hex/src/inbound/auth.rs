//! Authentication middleware for API key validation.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use gateway_types::{AccountId, AppError, GatewayRepository};

use super::handlers::{ApiError, AppState};
use super::rate_limit::{ANONYMOUS, too_many_requests};

/// Header carrying the raw API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// The caller resolved from its API key, placed into request extensions.
#[derive(Clone)]
pub struct AuthenticatedAccount {
    pub account_id: AccountId,
    pub api_key: String,
}

impl std::fmt::Debug for AuthenticatedAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedAccount")
            .field("account_id", &self.account_id)
            .finish_non_exhaustive()
    }
}

/// Extracts the API key from `X-API-Key`, falling back to
/// `Authorization: Bearer <key>`.
pub(crate) fn extract_api_key(headers: &HeaderMap) -> Option<&str> {
    let from_header = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
    let from_bearer = || {
        headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    };

    from_header
        .or_else(from_bearer)
        .map(str::trim)
        .filter(|k| !k.is_empty())
}

/// Routes reachable without a key.
fn is_public(method: &Method, path: &str) -> bool {
    path == "/health" || (path == "/api/accounts" && method == Method::POST)
}

/// Authentication middleware that resolves API keys to accounts.
///
/// On success the request carries an [`AuthenticatedAccount`] extension.
/// Missing or unknown keys get 401 and are charged to the anonymous rate
/// limit bucket; once that bucket is empty they get 429 instead.
pub async fn auth_middleware<R: GatewayRepository>(
    State(state): State<Arc<AppState<R>>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if is_public(request.method(), request.uri().path()) {
        return next.run(request).await;
    }

    let api_key = match extract_api_key(request.headers()) {
        Some(key) => key.to_string(),
        None => return reject(&state, "Missing or invalid API key header"),
    };

    match state.service.authenticate(&api_key).await {
        Ok(account_id) => {
            request.extensions_mut().insert(AuthenticatedAccount {
                account_id,
                api_key,
            });
            next.run(request).await
        }
        Err(AppError::Unauthorized(_)) => reject(&state, "Invalid API key"),
        Err(e) => {
            tracing::error!("API key verification failed: {}", e);
            ApiError(e).into_response()
        }
    }
}

fn reject<R: GatewayRepository>(state: &AppState<R>, message: &str) -> Response {
    if !state.rate_limiter.check(ANONYMOUS) {
        tracing::warn!("rate limit exceeded on failed authentication");
        return too_many_requests(state.rate_limiter.retry_after_secs());
    }
    ApiError(AppError::Unauthorized(message.into())).into_response()
}
