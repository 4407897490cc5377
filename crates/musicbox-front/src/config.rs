//! Configuration types and loading logic.

use musicbox_tracing::env;
use musicbox_tracing::{TelemetrySettings, TracingConfig};
use serde::Deserialize;

/// Environment variables read as numbers.
const NUMERIC_KEYS: &[&str] = &["PORT"];

/// Environment variables read verbatim, on top of [`env::TELEMETRY_KEYS`].
const STRING_KEYS: &[&str] = &["XRAY_APP_NAME", "FLAMENCO_HOST", "OPERA_HOST"];

/// Errors raised while resolving configuration at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("invalid configuration: {0}")]
    Extract(#[from] figment::Error),
}

/// Front service configuration, resolved once per process.
#[derive(Debug, Clone, Deserialize)]
pub struct FrontConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Fixed segment name for every inbound request.
    #[serde(default = "default_app_name")]
    pub xray_app_name: String,

    /// Required. Host (and optional port) of the flamenco service.
    #[serde(default)]
    pub flamenco_host: String,

    /// Required. Host (and optional port) of the opera service.
    #[serde(default)]
    pub opera_host: String,

    #[serde(flatten)]
    pub telemetry: TelemetrySettings,
}

fn default_port() -> u16 {
    9000
}

fn default_app_name() -> String {
    "musicbox-front".to_string()
}

impl FrontConfig {
    /// Load configuration from the process environment and check that both
    /// upstream hosts are present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config: FrontConfig = env::load(NUMERIC_KEYS, STRING_KEYS)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.flamenco_host.is_empty() {
            return Err(ConfigError::Missing("FLAMENCO_HOST"));
        }
        if self.opera_host.is_empty() {
            return Err(ConfigError::Missing("OPERA_HOST"));
        }
        Ok(())
    }

    pub fn listen_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    pub fn tracing(&self) -> TracingConfig {
        self.telemetry.tracing_config(&self.xray_app_name)
    }
}
