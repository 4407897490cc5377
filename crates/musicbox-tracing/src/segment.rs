//! Per-request segments: the tracing decorator every route is registered under.
//!
//! Each inbound request gets one server span carrying the service's fixed
//! segment name, continued from the caller's `traceparent` when present.

use std::sync::Arc;
use std::time::Duration;

use http::{Request, Response};
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultOnRequest, MakeSpan, OnResponse, TraceLayer};
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use uuid::Uuid;

use crate::propagation::extract_parent;

/// The `TraceLayer` produced by [`segment_layer`].
pub type SegmentLayer = TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    SegmentNamer,
    DefaultOnRequest,
    SegmentOnResponse,
>;

/// Names every request span after a fixed service name.
#[derive(Debug, Clone)]
pub struct SegmentNamer {
    name: Arc<str>,
}

impl SegmentNamer {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<B> MakeSpan<B> for SegmentNamer {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let span = tracing::info_span!(
            "segment",
            otel.name = %self.name,
            otel.kind = "server",
            request_id = %Uuid::new_v4(),
            http.method = %request.method(),
            http.target = %request.uri().path(),
            http.status_code = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
        );
        if let Err(e) = span.set_parent(extract_parent(request.headers())) {
            tracing::debug!(error = ?e, "Could not attach inbound trace context");
        }
        span
    }
}

/// Records the outcome of a request on its segment span.
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentOnResponse;

impl<B> OnResponse<B> for SegmentOnResponse {
    fn on_response(self, response: &Response<B>, latency: Duration, span: &Span) {
        let status = response.status().as_u16();
        let latency_ms = latency.as_millis() as u64;
        span.record("http.status_code", status);
        span.record("latency_ms", latency_ms);
        tracing::debug!(parent: span, status, latency_ms, "Request complete");
    }
}

/// Build the tracing decorator for a service's router.
pub fn segment_layer(name: impl Into<Arc<str>>) -> SegmentLayer {
    TraceLayer::new_for_http()
        .make_span_with(SegmentNamer::new(name))
        .on_response(SegmentOnResponse)
}
