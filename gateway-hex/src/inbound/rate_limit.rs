//! Rate limiting middleware using Governor.
//!
//! Implements per-API-key rate limiting with a token bucket algorithm.

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use serde_json::json;
use std::{num::NonZeroU32, sync::Arc};

use super::auth::AuthenticatedAccount;

/// Bucket shared by unauthenticated requests, including failed key checks.
pub(crate) const ANONYMOUS: &str = "anonymous";

/// Rate limiter state shared across requests.
pub struct RateLimiterState {
    /// Per-key rate limiters
    limiters: DashMap<String, Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>>,
    /// Default quota for new keys
    quota: Quota,
    retry_after_secs: u64,
}

impl Default for RateLimiterState {
    fn default() -> Self {
        Self::per_minute(100)
    }
}

impl RateLimiterState {
    /// Allows `requests` per minute per key, with the whole allowance
    /// available as an initial burst. Zero is treated as one.
    pub fn per_minute(requests: u32) -> Self {
        let requests = NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN);

        Self {
            limiters: DashMap::new(),
            quota: Quota::per_minute(requests),
            retry_after_secs: 60u64.div_ceil(u64::from(requests.get())),
        }
    }

    /// Checks if a request should be rate limited.
    /// Returns true if the request is allowed, false if rate limited.
    pub fn check(&self, key: &str) -> bool {
        let limiter = self
            .limiters
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(RateLimiter::direct(self.quota)));

        limiter.check().is_ok()
    }

    /// Seconds until one more request is replenished for an exhausted key.
    pub fn retry_after_secs(&self) -> u64 {
        self.retry_after_secs
    }
}

/// 429 response telling the caller when to come back.
pub(crate) fn too_many_requests(retry_after_secs: u64) -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({
            "error": "Rate limit exceeded. Please try again later.",
            "retry_after_seconds": retry_after_secs
        })),
    )
        .into_response()
}

/// Rate limiting middleware.
///
/// Runs after authentication: requests carrying an [`AuthenticatedAccount`]
/// draw from that account's bucket, everything else from the shared
/// anonymous bucket. Unverified key headers never pick the bucket.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let key = request
        .extensions()
        .get::<AuthenticatedAccount>()
        .map(|caller| caller.account_id.to_string())
        .unwrap_or_else(|| ANONYMOUS.to_string());

    if !limiter.check(&key) {
        tracing::warn!(path = %request.uri().path(), "rate limit exceeded");
        return too_many_requests(limiter.retry_after_secs());
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_then_limited() {
        let limiter = RateLimiterState::per_minute(3);

        assert!(limiter.check("k1"));
        assert!(limiter.check("k1"));
        assert!(limiter.check("k1"));
        assert!(!limiter.check("k1"));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiterState::per_minute(1);

        assert!(limiter.check("k1"));
        assert!(!limiter.check("k1"));
        assert!(limiter.check("k2"));
    }

    #[test]
    fn test_zero_quota_allows_one() {
        let limiter = RateLimiterState::per_minute(0);

        assert!(limiter.check("k1"));
        assert!(!limiter.check("k1"));
        assert_eq!(limiter.retry_after_secs(), 60);
    }

    #[test]
    fn test_retry_after_scales_with_quota() {
        assert_eq!(RateLimiterState::per_minute(100).retry_after_secs(), 1);
        assert_eq!(RateLimiterState::per_minute(7).retry_after_secs(), 9);
    }
}
