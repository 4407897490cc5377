//! Axum HTTP server: router, listener, graceful shutdown.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::config::FrontConfig;
use crate::upstream::UpstreamClient;

/// Body of every failed artists reply. Error detail stays in the logs.
pub const UNEXPECTED_ERROR_BODY: &str = "500 - Unexpected Error";

const FLAMENCO_LABEL: &str = "flamenco artists";
const OPERA_LABEL: &str = "Opera artists";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: FrontConfig,
    pub upstream: UpstreamClient,
}

/// Build the router with every route under the service's segment layer.
pub fn router(state: AppState) -> Router {
    let segment_name = state.config.xray_app_name.clone();

    Router::new()
        .route("/flamenco", get(handle_flamenco))
        .route("/opera", get(handle_opera))
        .route("/ping", get(handle_ping))
        .with_state(Arc::new(state))
        .layer(musicbox_tracing::segment_layer(segment_name))
}

/// Build and run the HTTP server.
pub async fn run(state: AppState) -> anyhow::Result<()> {
    let listen_addr = state.config.listen_address();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, "musicbox-front listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("musicbox-front shut down gracefully");
    Ok(())
}

/// GET /flamenco — relay the flamenco service's artists.
async fn handle_flamenco(State(state): State<Arc<AppState>>) -> Response {
    relay_artists(&state, &state.config.flamenco_host, FLAMENCO_LABEL).await
}

/// GET /opera — relay the opera service's artists.
async fn handle_opera(State(state): State<Arc<AppState>>) -> Response {
    relay_artists(&state, &state.config.opera_host, OPERA_LABEL).await
}

async fn relay_artists(state: &AppState, host: &str, label: &str) -> Response {
    match state.upstream.fetch(host).await {
        Ok(artists) => {
            let mut reply = serde_json::Map::new();
            reply.insert(label.to_string(), serde_json::Value::String(artists));
            (StatusCode::OK, Json(serde_json::Value::Object(reply))).into_response()
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                kind = e.kind(),
                upstream = %host,
                "Failed to fetch artists"
            );
            (StatusCode::INTERNAL_SERVER_ERROR, UNEXPECTED_ERROR_BODY).into_response()
        }
    }
}

/// Health check endpoint.
async fn handle_ping() -> StatusCode {
    tracing::info!("ping requested, responding with HTTP 200");
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::Mutex;
    use std::time::Duration;

    use axum::http::HeaderMap;
    use musicbox_tracing::TelemetrySettings;
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_sdk::propagation::TraceContextPropagator;
    use opentelemetry_sdk::trace::SdkTracerProvider;
    use tokio::io::AsyncWriteExt;
    use tokio::sync::oneshot;
    use tracing_subscriber::layer::SubscriberExt;

    async fn spawn(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    async fn spawn_upstream(status: StatusCode, body: &'static str) -> String {
        let app = Router::new().route("/", get(move || async move { (status, body) }));
        spawn(app).await.to_string()
    }

    /// A loopback address nothing is listening on.
    async fn dead_host() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        addr.to_string()
    }

    fn test_config(flamenco_host: String, opera_host: String) -> FrontConfig {
        FrontConfig {
            port: 0,
            xray_app_name: "musicbox-front-test".to_string(),
            flamenco_host,
            opera_host,
            telemetry: TelemetrySettings::default(),
        }
    }

    async fn spawn_front(flamenco_host: String, opera_host: String) -> SocketAddr {
        let state = AppState {
            config: test_config(flamenco_host, opera_host),
            upstream: UpstreamClient::new().unwrap(),
        };
        spawn(router(state)).await
    }

    async fn get_text(addr: SocketAddr, path: &str) -> (StatusCode, String) {
        let resp = reqwest::get(format!("http://{addr}{path}")).await.unwrap();
        let status = StatusCode::from_u16(resp.status().as_u16()).unwrap();
        (status, resp.text().await.unwrap())
    }

    #[tokio::test]
    async fn test_flamenco_wraps_trimmed_upstream_body() {
        let flamenco = spawn_upstream(StatusCode::OK, "  Miles Davis  \n").await;
        let front = spawn_front(flamenco, dead_host().await).await;

        let (status, body) = get_text(front, "/flamenco").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"flamenco artists":"Miles Davis"}"#);
    }

    #[tokio::test]
    async fn test_opera_wraps_upstream_body() {
        let opera = spawn_upstream(StatusCode::OK, "Pavarotti, Netrebko").await;
        let front = spawn_front(dead_host().await, opera).await;

        let (status, body) = get_text(front, "/opera").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"Opera artists":"Pavarotti, Netrebko"}"#);
    }

    #[tokio::test]
    async fn test_blank_upstream_body_is_500() {
        let flamenco = spawn_upstream(StatusCode::OK, " \n\t ").await;
        let front = spawn_front(flamenco, dead_host().await).await;

        let (status, body) = get_text(front, "/flamenco").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, UNEXPECTED_ERROR_BODY);
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_500() {
        let front = spawn_front(dead_host().await, dead_host().await).await;

        let (status, body) = get_text(front, "/opera").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, UNEXPECTED_ERROR_BODY);
    }

    #[tokio::test]
    async fn test_upstream_error_status_with_body_is_relayed() {
        let opera = spawn_upstream(StatusCode::NOT_FOUND, "Callas").await;
        let front = spawn_front(dead_host().await, opera).await;

        let (status, body) = get_text(front, "/opera").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"Opera artists":"Callas"}"#);
    }

    #[tokio::test]
    async fn test_reply_is_valid_json_for_quoted_values() {
        let flamenco = spawn_upstream(StatusCode::OK, r#"Camaron "de la Isla""#).await;
        let front = spawn_front(flamenco, dead_host().await).await;

        let (status, body) = get_text(front, "/flamenco").await;
        assert_eq!(status, StatusCode::OK);
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["flamenco artists"], r#"Camaron "de la Isla""#);
    }

    #[tokio::test]
    async fn test_ping_is_ok_without_upstreams() {
        let front = spawn_front(dead_host().await, dead_host().await).await;

        let (status, body) = get_text(front, "/ping").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
    }

    /// Upstream whose handler never completes. `entered` fires when the
    /// request arrives; `released` fires once the handler future is dropped.
    async fn spawn_hanging_upstream() -> (String, oneshot::Receiver<()>, oneshot::Receiver<()>) {
        let (entered_tx, entered_rx) = oneshot::channel::<()>();
        let (released_tx, released_rx) = oneshot::channel::<()>();
        let senders = Arc::new(Mutex::new(Some((entered_tx, released_tx))));

        let app = Router::new().route(
            "/",
            get(move || {
                let senders = senders.clone();
                async move {
                    let taken = senders.lock().unwrap().take();
                    let _released = taken.map(|(entered, released)| {
                        let _ = entered.send(());
                        released
                    });
                    std::future::pending::<&'static str>().await
                }
            }),
        );
        (spawn(app).await.to_string(), entered_rx, released_rx)
    }

    #[tokio::test]
    async fn test_client_disconnect_cancels_upstream_call() {
        let (flamenco, entered, released) = spawn_hanging_upstream().await;
        let front = spawn_front(flamenco, dead_host().await).await;

        let mut client = tokio::net::TcpStream::connect(front).await.unwrap();
        client
            .write_all(b"GET /flamenco HTTP/1.1\r\nHost: musicbox\r\n\r\n")
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(5), entered)
            .await
            .expect("upstream never saw the request")
            .unwrap();

        drop(client);

        // The sender is only ever dropped, never sent on.
        let outcome = tokio::time::timeout(Duration::from_secs(5), released).await;
        assert!(matches!(outcome, Ok(Err(_))), "upstream call outlived the client");
    }

    #[tokio::test]
    async fn test_upstream_call_continues_inbound_trace() {
        opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());
        let provider = SdkTracerProvider::builder().build();
        let subscriber = tracing_subscriber::registry()
            .with(tracing_opentelemetry::layer().with_tracer(provider.tracer("musicbox-front-test")));
        // current_thread runtime: every spawned server task sees this subscriber.
        let _default = tracing::subscriber::set_default(subscriber);

        // The upstream echoes the traceparent it received.
        let echo = Router::new().route(
            "/",
            get(|headers: HeaderMap| async move {
                headers
                    .get("traceparent")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string()
            }),
        );
        let flamenco = spawn(echo).await.to_string();
        let front = spawn_front(flamenco, dead_host().await).await;

        let inbound = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";
        let resp = reqwest::Client::new()
            .get(format!("http://{front}/flamenco"))
            .header("traceparent", inbound)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);

        let reply: serde_json::Value = serde_json::from_str(&resp.text().await.unwrap()).unwrap();
        let outbound = reply["flamenco artists"].as_str().unwrap();
        assert!(
            outbound.starts_with("00-4bf92f3577b34da6a3ce929d0e0e4736-"),
            "unexpected traceparent {outbound}"
        );
        assert_ne!(outbound, inbound, "outbound call should carry its own span id");
    }
}
