use rust_lms_api::config::LendingConfig;
use rust_lms_api::handlers::{self, AppState};
use rust_lms_api::store::{InMemoryCustomerRepository, InMemoryLoanRepository};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the Lending Orchestrator (LMS).
///
/// Initializes logging, loads configuration (startup-fatal when required
/// values are missing), wires the in-memory repositories and outbound
/// clients, and starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_lms_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = LendingConfig::from_env()?;

    let customers = Arc::new(InMemoryCustomerRepository::new());
    let loans = Arc::new(InMemoryLoanRepository::new());
    let state = Arc::new(AppState::new(config.clone(), customers, loans)?);

    let app = handlers::router(state)
        .layer(
            ServiceBuilder::new()
                // 1MB max payload; loan requests are tiny
                .layer(RequestBodyLimitLayer::new(1024 * 1024)),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("LMS running on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
