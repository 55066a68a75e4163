//! Remote directory endpoint configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Endpoints of the two directories device records are relayed between.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Base URL of the ETA device registry API.
    #[serde(default = "default_eta_base_url")]
    pub eta_base_url: String,
    /// Base URL of the LIDER agent directory API.
    #[serde(default = "default_lider_base_url")]
    pub lider_base_url: String,
    /// HTTP request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl RelayConfig {
    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            eta_base_url: default_eta_base_url(),
            lider_base_url: default_lider_base_url(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_eta_base_url() -> String {
    "http://localhost:8081".to_string()
}

fn default_lider_base_url() -> String {
    "http://localhost:8082".to_string()
}

fn default_request_timeout() -> u64 {
    15
}
