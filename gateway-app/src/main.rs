//! # Gateway Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the repository adapter
//! - Create the gateway service
//! - Start the HTTP server

mod config;

use opentelemetry::{global, trace::TracerProvider as _};
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace::SdkTracerProvider};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use gateway_hex::{GatewayService, inbound::HttpServer};
use gateway_repo::build_repo;

use crate::config::Config;

const SERVICE_NAME: &str = "payment-gateway";
const DEFAULT_LOG_FILTER: &str = "info,gateway_app=debug,gateway_hex=debug";

/// Installs the fmt and OTLP layers. The returned provider must be shut
/// down on exit to flush buffered spans.
fn init_tracing() -> anyhow::Result<SdkTracerProvider> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()?;
    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();
    global::set_tracer_provider(provider.clone());

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_opentelemetry::layer().with_tracer(provider.tracer(SERVICE_NAME)))
        .init();

    Ok(provider)
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let repo = build_repo(&config.database_url).await?;
    tracing::info!(store = repo.kind(), "Repository ready");

    let server = HttpServer::with_rate_limit(
        GatewayService::new(repo),
        config.rate_limit_per_minute,
    );
    server.run(&format!("0.0.0.0:{}", config.port)).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let provider = init_tracing()?;
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        rate_limit_per_minute = config.rate_limit_per_minute,
        "Starting gateway server"
    );

    let result = serve(config).await;

    if let Err(e) = provider.shutdown() {
        tracing::warn!("failed to flush traces: {}", e);
    }
    result
}
