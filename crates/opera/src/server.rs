//! Axum HTTP server: router, listener, graceful shutdown.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

use crate::config::OperaConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: OperaConfig,
}

/// Build the router. `/` also acts as the catch-all for unmatched paths.
pub fn router(state: AppState) -> Router {
    let segment_name = state.config.xray_app_name.clone();

    Router::new()
        .route("/", get(handle_artists))
        .route("/ping", get(handle_ping))
        .fallback(handle_artists)
        .with_state(Arc::new(state))
        .layer(musicbox_tracing::segment_layer(segment_name))
}

/// Build and run the HTTP server.
pub async fn run(state: AppState) -> anyhow::Result<()> {
    let listen_addr = state.config.listen_address();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, "opera listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("opera shut down gracefully");
    Ok(())
}

/// GET / — the configured artists as plain text.
async fn handle_artists(State(state): State<Arc<AppState>>) -> String {
    tracing::info!(artists = %state.config.artists, "opera artists requested");
    state.config.artists.clone()
}

async fn handle_ping() -> StatusCode {
    tracing::info!("ping to opera-svc requested, responding with HTTP 200");
    StatusCode::OK
}

/// Wait for SIGINT (Ctrl+C) for graceful shutdown.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler, running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
