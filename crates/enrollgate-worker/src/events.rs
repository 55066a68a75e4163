//! Outcome events emitted by the processing pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::JobId;

/// How a single dispatch was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    /// Dispatch succeeded and the job was removed.
    Success,
    /// Dispatch failed and the job stays queued with one retry fewer.
    Retry,
    /// Dispatch failed with no retries left; the job was removed.
    Dropped,
}

impl JobOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobOutcome::Success => "success",
            JobOutcome::Retry => "retry",
            JobOutcome::Dropped => "dropped",
        }
    }
}

impl std::fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One per job per pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutcomeEvent {
    pub job_id: JobId,
    pub queue: String,
    pub outcome: JobOutcome,
    /// Retry budget after the outcome was applied.
    pub retries_remaining: u32,
    pub timestamp: DateTime<Utc>,
}

impl JobOutcomeEvent {
    /// Get a short description of this event for logging.
    pub fn description(&self) -> String {
        match self.outcome {
            JobOutcome::Success => format!("Job {} synced", self.job_id),
            JobOutcome::Retry => format!(
                "Job {} failed, {} retries left",
                self.job_id, self.retries_remaining
            ),
            JobOutcome::Dropped => format!("Job {} dropped after exhausting retries", self.job_id),
        }
    }
}
