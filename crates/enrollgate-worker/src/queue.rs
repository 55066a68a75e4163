//! In-memory named job queues with content-based deduplication.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing;

use enrollgate_core::result::AppResult;

use crate::clock::{Clock, SystemClock};
use crate::job::{EnqueueOptions, Job, JobId, JobPatch, SyncPayload};

/// Result of an enqueue call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// A new job was appended.
    Enqueued(JobId),
    /// An identical job was already pending; nothing changed.
    Duplicate(JobId),
}

impl EnqueueOutcome {
    /// Id of the pending job, new or existing.
    pub fn job_id(&self) -> &JobId {
        match self {
            EnqueueOutcome::Enqueued(id) | EnqueueOutcome::Duplicate(id) => id,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, EnqueueOutcome::Duplicate(_))
    }
}

/// Queue statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Queue name
    pub name: String,
    /// Number of pending jobs
    pub pending: usize,
}

/// Owner of all named sync queues.
///
/// Queues are created on first reference and live for the lifetime of the
/// store. Every mutation is keyed by job id, never by position, so a caller
/// iterating a [`QueueStore::get_queue`] snapshot can mutate freely.
#[derive(Debug)]
pub struct QueueStore {
    /// Queue name to jobs in insertion order
    queues: DashMap<String, Vec<Job>>,
    /// Time source for `created_at`
    clock: Arc<dyn Clock>,
    /// Retry budget for jobs enqueued without one
    default_retries: u32,
}

impl QueueStore {
    /// Create a store backed by the system clock.
    pub fn new(default_retries: u32) -> Self {
        Self::with_clock(default_retries, Arc::new(SystemClock))
    }

    /// Create a store with an explicit time source.
    pub fn with_clock(default_retries: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            queues: DashMap::new(),
            clock,
            default_retries,
        }
    }

    /// Enqueue `payload` with the default retry budget and no delay.
    pub fn enqueue(&self, queue_name: &str, payload: SyncPayload) -> AppResult<EnqueueOutcome> {
        self.add_job(queue_name, payload, EnqueueOptions::default())
    }

    /// Append a job unless an identical one is already pending.
    ///
    /// The only failure is a payload that cannot be serialized for hashing.
    pub fn add_job(
        &self,
        queue_name: &str,
        payload: SyncPayload,
        options: EnqueueOptions,
    ) -> AppResult<EnqueueOutcome> {
        let id = JobId::derive(queue_name, &payload)?;

        let mut queue = self.queues.entry(queue_name.to_string()).or_default();

        if queue.iter().any(|job| job.id == id) {
            tracing::debug!(
                job_id = %id,
                queue = %queue_name,
                "Duplicate job ignored"
            );
            return Ok(EnqueueOutcome::Duplicate(id));
        }

        let job = Job {
            id: id.clone(),
            retries_remaining: options.retries.unwrap_or(self.default_retries),
            scheduled_delay_ms: options.delay.as_millis() as u64,
            created_at: self.clock.now(),
            payload,
        };

        tracing::debug!(
            job_id = %id,
            queue = %queue_name,
            process = job.payload.process(),
            target_domain = %job.payload.target_domain(),
            retries = job.retries_remaining,
            "Enqueued job"
        );

        queue.push(job);
        Ok(EnqueueOutcome::Enqueued(id))
    }

    /// Ordered copy of the queue's current contents.
    pub fn get_queue(&self, queue_name: &str) -> Vec<Job> {
        self.queues
            .entry(queue_name.to_string())
            .or_default()
            .clone()
    }

    /// Whether a job with `id` is pending in `queue_name`.
    pub fn has_job(&self, queue_name: &str, id: &JobId) -> bool {
        self.queues
            .get(queue_name)
            .map(|queue| queue.iter().any(|job| &job.id == id))
            .unwrap_or(false)
    }

    /// Remove the job with `id`. Returns `false` if it was not present.
    pub fn dequeue_job(&self, queue_name: &str, id: &JobId) -> bool {
        let removed = self
            .queues
            .get_mut(queue_name)
            .and_then(|mut queue| {
                let position = queue.iter().position(|job| &job.id == id)?;
                Some(queue.remove(position))
            })
            .is_some();

        if removed {
            tracing::debug!(job_id = %id, queue = %queue_name, "Dequeued job");
        } else {
            tracing::warn!(
                job_id = %id,
                queue = %queue_name,
                "Attempted to dequeue job that is not queued"
            );
        }

        removed
    }

    /// Merge `patch` into the job with `id`, keeping its position.
    pub fn update_job(&self, queue_name: &str, id: &JobId, patch: JobPatch) -> bool {
        let Some(mut queue) = self.queues.get_mut(queue_name) else {
            return false;
        };

        match queue.iter_mut().find(|job| &job.id == id) {
            Some(job) => {
                job.apply(&patch);
                true
            }
            None => false,
        }
    }

    /// Number of pending jobs in `queue_name`.
    pub fn len(&self, queue_name: &str) -> usize {
        self.queues.get(queue_name).map(|q| q.len()).unwrap_or(0)
    }

    pub fn is_empty(&self, queue_name: &str) -> bool {
        self.len(queue_name) == 0
    }

    /// Names of every queue referenced so far.
    pub fn queue_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.queues.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Get queue statistics
    pub fn stats(&self, queue_name: &str) -> QueueStats {
        QueueStats {
            name: queue_name.to_string(),
            pending: self.len(queue_name),
        }
    }
}
