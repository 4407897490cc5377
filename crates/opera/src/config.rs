//! Configuration types and loading logic.

use musicbox_tracing::env;
use musicbox_tracing::{TelemetrySettings, TracingConfig};
use serde::Deserialize;

const NUMERIC_KEYS: &[&str] = &["PORT"];
const STRING_KEYS: &[&str] = &["XRAY_APP_NAME", "ARTISTS"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Extract(#[from] figment::Error),
}

/// Opera service configuration. Every setting has a default.
#[derive(Debug, Clone, Deserialize)]
pub struct OperaConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_app_name")]
    pub xray_app_name: String,

    /// Reply body for `/`, served verbatim.
    #[serde(default = "default_artists")]
    pub artists: String,

    #[serde(flatten)]
    pub telemetry: TelemetrySettings,
}

fn default_port() -> u16 {
    9002
}

fn default_app_name() -> String {
    "opera".to_string()
}

fn default_artists() -> String {
    "Pavarotti, Netrebko".to_string()
}

impl OperaConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(env::load(NUMERIC_KEYS, STRING_KEYS)?)
    }

    pub fn listen_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    pub fn tracing(&self) -> TracingConfig {
        self.telemetry.tracing_config(&self.xray_app_name)
    }
}
