//! HTTP Server configuration and startup.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, patch, post},
};
use tower_http::trace::TraceLayer;

use gateway_types::GatewayRepository;

use super::auth::auth_middleware;
use super::handlers::{self, AppState};
use super::rate_limit::{RateLimiterState, rate_limit_middleware};
use crate::GatewayService;

/// HTTP Server for the payment gateway API.
pub struct HttpServer<R: GatewayRepository> {
    state: Arc<AppState<R>>,
}

impl<R: GatewayRepository> HttpServer<R> {
    /// Creates a new HTTP server with the default rate limit (100 req/min).
    pub fn new(service: GatewayService<R>) -> Self {
        Self::with_limiter(service, RateLimiterState::default())
    }

    /// Creates a new HTTP server with custom rate limiting.
    pub fn with_rate_limit(service: GatewayService<R>, requests_per_minute: u32) -> Self {
        Self::with_limiter(service, RateLimiterState::per_minute(requests_per_minute))
    }

    fn with_limiter(service: GatewayService<R>, limiter: RateLimiterState) -> Self {
        Self {
            state: Arc::new(AppState {
                service,
                rate_limiter: Arc::new(limiter),
            }),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        // Uses the globally installed MeterProvider (no-op when none is set).
        let metrics = axum_otel_metrics::HttpMetricsLayerBuilder::new().build();

        Router::new()
            .route("/health", get(handlers::health))
            .route("/api/accounts", post(handlers::create_account::<R>))
            .route("/api/accounts/me", get(handlers::me::<R>))
            .route(
                "/api/invoices",
                post(handlers::create_invoice::<R>).get(handlers::list_invoices::<R>),
            )
            .route("/api/invoices/{id}", get(handlers::get_invoice::<R>))
            .route(
                "/api/invoices/{id}/status",
                patch(handlers::update_invoice_status::<R>),
            )
            .layer(metrics)
            .layer(middleware::from_fn_with_state(
                self.state.rate_limiter.clone(),
                rate_limit_middleware,
            ))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                auth_middleware::<R>,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
