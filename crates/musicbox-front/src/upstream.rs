//! Traced HTTP client for the upstream artist services.
//!
//! Every call opens an `upstream_fetch` client span under the inbound
//! request's segment and forwards the trace context in `traceparent`.
//! Non-2xx responses are not failures on their own: the body is read and
//! trimmed either way, and only an empty result is rejected.

use std::time::Instant;

use http::HeaderMap;
use tracing::Instrument;

/// Failure to obtain a usable body from an upstream service.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream {host} unreachable: {source}")]
    Transport {
        host: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("empty response from {host}")]
    EmptyResponse { host: String },
}

impl UpstreamError {
    /// Short machine-readable label for logs and span fields.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Transport { .. } => "transport",
            UpstreamError::EmptyResponse { .. } => "empty_response",
        }
    }
}

/// Shared HTTP client for upstream calls. Cheap to clone.
#[derive(Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
}

impl UpstreamClient {
    /// No request timeout is set: a call lives exactly as long as the
    /// inbound request that issued it.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client })
    }

    /// GET `http://{host}` and return the trimmed body.
    pub async fn fetch(&self, host: &str) -> Result<String, UpstreamError> {
        let span = musicbox_tracing::upstream_fetch_span!(host);
        let start = Instant::now();

        async {
            let mut headers = HeaderMap::new();
            musicbox_tracing::propagation::inject_current(&mut headers);

            let url = format!("http://{host}");
            let transport = |source| UpstreamError::Transport {
                host: host.to_string(),
                source,
            };

            let response = self
                .client
                .get(&url)
                .headers(headers)
                .send()
                .await
                .map_err(transport)?;

            let status = response.status();
            tracing::Span::current().record("http.status_code", status.as_u16());
            if !status.is_success() {
                tracing::debug!(status = status.as_u16(), "Upstream returned non-success status");
            }

            let body = response.text().await.map_err(transport)?;

            let latency = start.elapsed().as_millis() as u64;
            tracing::Span::current().record("latency_ms", latency);

            let artists = trimmed_body(host, &body)?;
            tracing::Span::current().record("body_len", artists.len());
            Ok(artists)
        }
        .instrument(span)
        .await
    }
}

/// Trim surrounding whitespace; an empty remainder is an error.
fn trimmed_body(host: &str, body: &str) -> Result<String, UpstreamError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(UpstreamError::EmptyResponse {
            host: host.to_string(),
        });
    }
    Ok(trimmed.to_string())
}
