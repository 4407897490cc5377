//! musicbox-front: relays flamenco and opera artists from their upstream
//! services as small JSON replies.

mod config;
mod server;
mod upstream;

use config::FrontConfig;
use server::AppState;
use upstream::UpstreamClient;

fn main() -> anyhow::Result<()> {
    // Fail fast on missing upstream hosts, before any listener is bound
    let config = FrontConfig::from_env()?;

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
            flamenco_host = %config.flamenco_host,
            opera_host = %config.opera_host,
            "Starting musicbox-front"
        );

        run(config).await
    })
}

async fn run(config: FrontConfig) -> anyhow::Result<()> {
    let upstream = UpstreamClient::new()?;
    let state = AppState { config, upstream };
    server::run(state).await
}
