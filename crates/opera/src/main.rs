//! opera: standalone service answering with its configured opera artists.

mod config;
mod server;

use config::OperaConfig;
use server::AppState;

fn main() -> anyhow::Result<()> {
    let config = OperaConfig::from_env()?;

    // Build the tokio runtime first — tonic gRPC exporter needs a reactor context
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let _tracing_guard = musicbox_tracing::init_tracing(&config.tracing());

        tracing::info!(
            port = config.port,
            stage = %config.telemetry.stage,
            segment = %config.xray_app_name,
            artists = %config.artists,
            "Starting opera"
        );

        server::run(AppState { config }).await
    })
}
