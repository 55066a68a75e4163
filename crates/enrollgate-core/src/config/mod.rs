//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod logging;
pub mod relay;
pub mod worker;

use serde::{Deserialize, Serialize};

use self::logging::LoggingConfig;
use self::relay::RelayConfig;
use self::worker::WorkerConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Background sync worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Remote directory endpoints.
    #[serde(default)]
    pub relay: RelayConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `ENROLLGATE_`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("ENROLLGATE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Parse configuration from an in-memory TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = AppConfig::from_toml_str("").expect("empty config should parse");
        assert!(config.worker.enabled);
        assert_eq!(config.worker.queue_name, "sync");
        assert_eq!(config.worker.cadence, "0 * * * * *");
        assert_eq!(config.worker.default_retries, 3);
        assert_eq!(config.worker.dispatch_timeout_seconds, 30);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_sections_override_defaults() {
        let raw = r#"
            [worker]
            cadence = "*/10 * * * * *"
            default_retries = 5

            [relay]
            eta_base_url = "https://eta.example.org/api"
            lider_base_url = "https://lider.example.org/api"
            request_timeout_seconds = 5
        "#;

        let config = AppConfig::from_toml_str(raw).expect("config should parse");
        assert_eq!(config.worker.cadence, "*/10 * * * * *");
        assert_eq!(config.worker.default_retries, 5);
        assert_eq!(config.worker.queue_name, "sync");
        assert_eq!(config.relay.eta_base_url, "https://eta.example.org/api");
        assert_eq!(config.relay.request_timeout_seconds, 5);
    }

    #[test]
    fn test_invalid_type_is_configuration_error() {
        let err = AppConfig::from_toml_str("[worker]\ndefault_retries = \"many\"\n")
            .expect_err("string retries should be rejected");
        assert_eq!(err.kind, crate::error::ErrorKind::Configuration);
    }
}
