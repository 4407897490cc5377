//! Span builder helpers for musicbox instrumentation.

/// Create a client span for a single outbound call to an upstream service.
///
/// Usage: `upstream_fetch_span!(host)` and `.instrument(span)` the call.
///
/// Fields recorded once the call completes:
/// - `http.status_code`: upstream response status
/// - `latency_ms`: milliseconds from request send to body fully read
/// - `body_len`: length of the trimmed upstream body
#[macro_export]
macro_rules! upstream_fetch_span {
    ($host:expr) => {
        tracing::info_span!(
            "upstream_fetch",
            otel.kind = "client",
            upstream = %$host,
            http.status_code = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
            body_len = tracing::field::Empty,
        )
    };
}
