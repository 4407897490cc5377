//! Environment-driven settings shared by the musicbox services.
//!
//! String settings are taken verbatim from the process environment: figment's
//! `Env` provider would parse `007`, `true` or `[x]` as typed literals and
//! reject them for `String` fields. Only numeric keys go through `Env`.
//! Empty variables count as unset in both cases.

use std::collections::BTreeMap;

use figment::providers::{Env, Serialized};
use figment::Figment;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::{OtlpProtocol, TracingConfig};

/// Variables behind [`TelemetrySettings`], read by every service.
pub const TELEMETRY_KEYS: &[&str] = &[
    "STAGE",
    "OTEL_EXPORTER_OTLP_ENDPOINT",
    "OTEL_EXPORTER_OTLP_PROTOCOL",
    "LOG_LEVEL",
];

/// Deployment and export settings common to both services.
/// Meant to be `#[serde(flatten)]`ed into a service config.
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default = "default_stage")]
    pub stage: String,

    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    #[serde(default)]
    pub otel_exporter_otlp_protocol: OtlpProtocol,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_stage() -> String {
    "dev".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            stage: default_stage(),
            otel_exporter_otlp_endpoint: None,
            otel_exporter_otlp_protocol: OtlpProtocol::default(),
            log_level: default_log_level(),
        }
    }
}

impl TelemetrySettings {
    /// Tracing configuration for a service reporting as `service_name`.
    pub fn tracing_config(&self, service_name: &str) -> TracingConfig {
        TracingConfig {
            service_name: service_name.to_string(),
            otlp_endpoint: self.otel_exporter_otlp_endpoint.clone(),
            protocol: self.otel_exporter_otlp_protocol,
            log_level: self.log_level.clone(),
            stage: Some(self.stage.clone()),
        }
    }
}

/// Non-empty values of `keys`, verbatim, keyed by lowercased name.
pub fn verbatim(keys: &[&str]) -> Serialized<BTreeMap<String, String>> {
    let values = keys
        .iter()
        .filter_map(|key| match std::env::var(key) {
            Ok(value) if !value.is_empty() => Some((key.to_ascii_lowercase(), value)),
            _ => None,
        })
        .collect();
    Serialized::defaults(values)
}

/// Non-empty values of `keys`, parsed by figment (numbers, booleans).
pub fn parsed(keys: &[&str]) -> Env {
    Env::raw().only(keys).filter(|key| {
        std::env::var(key.as_str().to_ascii_uppercase()).is_ok_and(|value| !value.is_empty())
    })
}

/// Resolve a service config from the environment. `string_keys` and
/// [`TELEMETRY_KEYS`] are read verbatim, `numeric_keys` are parsed.
pub fn load<T: DeserializeOwned>(
    numeric_keys: &[&str],
    string_keys: &[&str],
) -> Result<T, figment::Error> {
    let string_keys = [string_keys, TELEMETRY_KEYS].concat();
    Figment::from(parsed(numeric_keys))
        .merge(verbatim(&string_keys))
        .extract()
}
