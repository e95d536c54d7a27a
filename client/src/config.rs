//! Client configuration with TOML file support.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use jailpool_payment::PaymentConfig;

use crate::error::ClientError;
use crate::logging::LogFormat;

/// Configuration for a jailpool client.
///
/// Can be loaded from a TOML file via [`ClientConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the platform API, including any path prefix.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Challenge refresh cadence, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound on waiting for a broadcast transaction to confirm.
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,

    /// How often to query the chain while waiting for confirmation.
    #[serde(default = "default_confirmation_poll_interval_ms")]
    pub confirmation_poll_interval_ms: u64,

    /// Treasury split percentage forwarded to the construct endpoint.
    #[serde(default)]
    pub treasury_split_pct: Option<u8>,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_base_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_poll_interval_ms() -> u64 {
    3_000
}

fn default_confirmation_timeout_secs() -> u64 {
    60
}

fn default_confirmation_poll_interval_ms() -> u64 {
    500
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ClientConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, ClientError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ClientError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ClientError> {
        toml::from_str(s).map_err(|e| ClientError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("ClientConfig is always serializable to TOML")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// The payment-flow tunables carried by this configuration.
    pub fn payment_config(&self) -> PaymentConfig {
        PaymentConfig {
            confirmation_timeout: Duration::from_secs(self.confirmation_timeout_secs),
            confirmation_poll_interval: Duration::from_millis(self.confirmation_poll_interval_ms),
            treasury_split_pct: self.treasury_split_pct,
        }
    }

    /// The parsed log format, validating the configured string.
    pub fn log_format(&self) -> Result<LogFormat, ClientError> {
        LogFormat::from_str(&self.log_format)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            poll_interval_ms: default_poll_interval_ms(),
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
            confirmation_poll_interval_ms: default_confirmation_poll_interval_ms(),
            treasury_split_pct: None,
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sensible() {
        let config = ClientConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(3));
        assert_eq!(
            config.payment_config().confirmation_timeout,
            Duration::from_secs(60)
        );
        assert_eq!(config.log_format().unwrap(), LogFormat::Human);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = ClientConfig::from_toml_str(
            r#"
            base_url = "https://jailpool.example/api"
            treasury_split_pct = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.base_url, "https://jailpool.example/api");
        assert_eq!(config.treasury_split_pct, Some(10));
        assert_eq!(config.poll_interval_ms, 3_000);
    }

    #[test]
    fn round_trips_through_toml() {
        let mut config = ClientConfig::default();
        config.poll_interval_ms = 1_000;
        let parsed = ClientConfig::from_toml_str(&config.to_toml_string()).unwrap();
        assert_eq!(parsed.poll_interval_ms, 1_000);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_format = \"json\"").unwrap();
        let config = ClientConfig::from_toml_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.log_format().unwrap(), LogFormat::Json);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        assert!(matches!(
            ClientConfig::from_toml_str("base_url = 42"),
            Err(ClientError::Config(_))
        ));
    }
}
