//! Reusable tracing library for the musicbox front and opera services.

pub mod config;
pub mod env;
pub mod otlp;
pub mod propagation;
pub mod segment;
pub mod spans;

pub use config::{OtlpProtocol, TracingConfig};
pub use env::TelemetrySettings;
pub use otlp::{init_tracing, TracingGuard};
pub use segment::{segment_layer, SegmentLayer, SegmentNamer, SegmentOnResponse};
