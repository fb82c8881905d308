use rust_estate_api::config::Config;
use rust_estate_api::handlers::{build_router, AppState};

use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::limit::RequestBodyLimitLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the dashboard sync service.
///
/// Initializes tracing and configuration, loads the local snapshots into the
/// property and call caches, then serves the dashboard API.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_estate_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let port = config.port;

    let state = Arc::new(AppState::from_config(config).await?);
    tracing::info!(
        "Caches loaded: {} properties, {} calls",
        state.properties.get_cached().await.len(),
        state.calls.get_cached().await.len()
    );

    // 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    let app = build_router(state.clone()).layer(
        ServiceBuilder::new()
            // Listings carry base64 images and PDFs
            .layer(RequestBodyLimitLayer::new(25 * 1024 * 1024))
            .layer(GovernorLayer {
                config: governor_conf,
            }),
    );

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // Flush the caches so the next start sees the latest state
    state.properties.dispose().await?;
    state.calls.dispose().await?;
    tracing::info!("Snapshots flushed, shutting down");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
