//! OTLP exporter setup and TracingGuard.

use anyhow::Result;
use opentelemetry::trace::TracerProvider;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::{OtlpProtocol, TracingConfig};

/// RAII guard that shuts down the tracer provider on drop.
pub struct TracingGuard {
    provider: Option<SdkTracerProvider>,
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        if let Some(ref mut provider) = self.provider {
            if let Err(e) = provider.shutdown() {
                eprintln!("Failed to shutdown tracer provider: {e}");
            }
        }
    }
}

/// Initialize the tracing subsystem with OTLP export and fmt logging.
///
/// If the OTLP exporter fails to initialize, falls back to fmt-only tracing
/// so the service can start without a collector. The W3C trace-context
/// propagator is installed in every case, so inbound `traceparent` headers
/// are honoured and forwarded upstream.
///
/// Returns a [`TracingGuard`] that must be held for the lifetime of the application
/// to ensure traces are flushed on shutdown.
pub fn init_tracing(config: &TracingConfig) -> TracingGuard {
    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

    // Skip OTLP entirely if no endpoint is configured
    let endpoint = match &config.otlp_endpoint {
        Some(url) => url.clone(),
        None => {
            init_fmt_only(config);
            return TracingGuard { provider: None };
        }
    };

    match try_init_with_otlp(config, &endpoint) {
        Ok(guard) => guard,
        Err(e) => {
            init_fmt_only(config);

            tracing::warn!(
                error = %e,
                endpoint = %endpoint,
                "OTLP exporter failed to initialize, running with fmt-only tracing"
            );

            TracingGuard { provider: None }
        }
    }
}

fn env_filter(config: &TracingConfig) -> EnvFilter {
    EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"))
}

fn init_fmt_only(config: &TracingConfig) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .with(env_filter(config))
        .init();
}

fn resource(config: &TracingConfig) -> Resource {
    let mut builder = Resource::builder_empty().with_service_name(config.service_name.clone());
    if let Some(stage) = &config.stage {
        builder = builder.with_attribute(KeyValue::new("deployment.environment", stage.clone()));
    }
    builder.build()
}

/// Try to initialize tracing with OTLP export. Returns Err if the exporter
/// cannot be built.
fn try_init_with_otlp(config: &TracingConfig, endpoint: &str) -> Result<TracingGuard> {
    let otlp_exporter = match config.protocol {
        OtlpProtocol::Grpc => opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()?,
        OtlpProtocol::Http => opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .with_endpoint(endpoint)
            .build()?,
    };

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(otlp_exporter)
        .with_resource(resource(config))
        .build();

    let tracer = provider.tracer(config.service_name.clone());

    tracing_subscriber::registry()
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .with(env_filter(config))
        .init();

    tracing::info!(
        endpoint = %endpoint,
        service = %config.service_name,
        protocol = ?config.protocol,
        stage = ?config.stage,
        "OpenTelemetry OTLP tracing initialized"
    );

    Ok(TracingGuard {
        provider: Some(provider),
    })
}
