//! Job executor that routes sync jobs to the remote directory.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing;

use crate::job::{DirectoryUpdate, Job, MacAddress, SyncPayload, TargetDomain};

/// Error raised by a remote directory operation.
///
/// Always recoverable from the queue's point of view: it only drives the
/// retry/drop decision for the job that raised it.
#[derive(Debug, thiserror::Error)]
pub enum RemoteOperationError {
    /// The call did not finish within the dispatch timeout
    #[error("Remote operation timed out after {0:?}")]
    Timeout(Duration),

    /// Connection or protocol failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The directory answered with a non-success status
    #[error("Remote rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The directory answered with a body that could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Operations the sync queue needs from the ETA and LIDER directories.
#[async_trait]
pub trait RemoteDirectory: Send + Sync + std::fmt::Debug {
    /// Fetch the record for `mac_address` from `target_domain`.
    async fn perform_read(
        &self,
        mac_address: &MacAddress,
        target_domain: TargetDomain,
    ) -> Result<Value, RemoteOperationError>;

    /// Write `update` for `mac_address` to the directory the update names.
    async fn perform_write(
        &self,
        mac_address: &MacAddress,
        update: &DirectoryUpdate,
    ) -> Result<Value, RemoteOperationError>;
}

/// Dispatches jobs to the remote directory with a per-call timeout.
#[derive(Debug)]
pub struct JobExecutor {
    /// Remote directory collaborator
    directory: Arc<dyn RemoteDirectory>,
    /// Upper bound for a single dispatch
    timeout: Duration,
}

impl JobExecutor {
    /// Create a new job executor
    pub fn new(directory: Arc<dyn RemoteDirectory>, timeout: Duration) -> Self {
        Self { directory, timeout }
    }

    /// Execute a job by dispatching to the matching directory operation
    pub async fn execute(&self, job: &Job) -> Result<Value, RemoteOperationError> {
        tracing::debug!(
            job_id = %job.id,
            process = job.payload.process(),
            target_domain = %job.payload.target_domain(),
            mac_address = %job.payload.mac_address(),
            "Executing job"
        );

        let dispatch = async {
            match &job.payload {
                SyncPayload::Get {
                    mac_address,
                    target_domain,
                } => {
                    self.directory
                        .perform_read(mac_address, *target_domain)
                        .await
                }
                SyncPayload::Update {
                    mac_address,
                    update,
                } => self.directory.perform_write(mac_address, update).await,
            }
        };

        match tokio::time::timeout(self.timeout, dispatch).await {
            Ok(result) => result,
            Err(_) => Err(RemoteOperationError::Timeout(self.timeout)),
        }
    }

    /// Dispatch timeout applied to every call
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
