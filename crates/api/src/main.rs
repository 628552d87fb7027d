//! Barbe API server binary entrypoint.

use std::net::SocketAddr;
use std::time::Duration;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use barbe_api::build_state;
use barbe_api::routes::create_router;
use barbe_common::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("barbe_api=debug,barbe_engine=debug,tower_http=debug")
        }))
        .init();

    tracing::info!("Starting Barbe API server...");

    // Load configuration
    let config = AppConfig::from_env()?;
    let port = config.port;
    let dispatch_interval = Duration::from_secs(config.dispatch_interval_secs);
    let cleanup_interval = Duration::from_secs(config.cleanup_interval_secs);

    // Build application state
    let state = build_state(config);
    tracing::info!(
        push_enabled = state.config.push_enabled(),
        owner_notifier = state.owner.enabled(),
        "components wired"
    );

    // Background sweeps
    tokio::spawn(state.dispatcher.clone().run(dispatch_interval));
    tokio::spawn(state.cleanup.clone().run(cleanup_interval));

    // Build router
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
