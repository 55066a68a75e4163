//! Background sync worker configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Sync queue worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the worker is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Name of the queue drained by the processing pass.
    #[serde(default = "default_queue_name")]
    pub queue_name: String,
    /// Cron expression (seconds first) that triggers a processing pass.
    #[serde(default = "default_cadence")]
    pub cadence: String,
    /// Retry budget given to jobs enqueued without an explicit count.
    #[serde(default = "default_retries")]
    pub default_retries: u32,
    /// Upper bound in seconds for a single remote dispatch.
    #[serde(default = "default_dispatch_timeout")]
    pub dispatch_timeout_seconds: u64,
}

impl WorkerConfig {
    /// Dispatch timeout as a [`Duration`].
    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_seconds)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            queue_name: default_queue_name(),
            cadence: default_cadence(),
            default_retries: default_retries(),
            dispatch_timeout_seconds: default_dispatch_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_queue_name() -> String {
    "sync".to_string()
}

fn default_cadence() -> String {
    "0 * * * * *".to_string()
}

fn default_retries() -> u32 {
    3
}

fn default_dispatch_timeout() -> u64 {
    30
}
