//! Simple Slack API server binary entrypoint.

use std::net::SocketAddr;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use slack_common::config::AppConfig;

use slack_api::routes::create_router;
use slack_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("slack_api=debug,slack_engine=debug,slack_notifier=debug,tower_http=debug")
        }))
        .init();

    tracing::info!("Starting Simple Slack API server...");

    // Load configuration
    let config = AppConfig::from_env()?;
    let port = config.port;
    tracing::info!(
        circleci_api_host = %config.circleci_api_host,
        sleep_interval_secs = config.sleep_interval_secs,
        transport_failure = %config.transport_failure,
        default_webhook = config.default_webhook.is_some(),
        "Configuration loaded"
    );

    // Build application state
    let state = AppState::from_config(&config);
    let registry = state.coordinator.registry().clone();

    // Build router
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Monitors do not outlive the server
    registry.shutdown().await;
    tracing::info!("API server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}
