use rust_lms_api::config::ScoringConfig;
use rust_lms_api::scoring::{self, ScoringState};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the Scoring Engine.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_lms_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ScoringConfig::from_env()?;

    let state = Arc::new(ScoringState::new(&config)?);

    let app = scoring::router(state)
        .layer(ServiceBuilder::new().layer(RequestBodyLimitLayer::new(1024 * 1024)))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Scoring engine running on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
