use rust_lms_api::broker::{self, BrokerState};
use rust_lms_api::config::BrokerConfig;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the Credential Broker.
///
/// Registration with the scoring engine runs to completion before the
/// listener starts accepting traffic; without a registered identity the
/// transactions proxy cannot authorize callers, so a registration failure
/// (after the optional fallback endpoint) is fatal.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_lms_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = BrokerConfig::from_env()?;
    let port = config.port;

    let state = Arc::new(BrokerState::new(config)?);
    state
        .register()
        .await
        .map_err(|e| anyhow::anyhow!("Broker registration failed: {}", e))?;

    let app = broker::router(state)
        .layer(ServiceBuilder::new().layer(RequestBodyLimitLayer::new(1024 * 1024)))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Broker running on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
