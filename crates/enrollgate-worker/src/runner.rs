//! Processing pass: walks a queue snapshot and reconciles dispatch results.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, broadcast};
use tracing;

use crate::clock::{Clock, SystemClock};
use crate::events::{JobOutcome, JobOutcomeEvent};
use crate::executor::JobExecutor;
use crate::job::{Job, JobPatch};
use crate::queue::QueueStore;

/// Capacity of the outcome event channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Summary of one processing pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PassReport {
    /// True when the pass was suppressed because another was running
    pub skipped: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One event per job visited, in snapshot order
    pub events: Vec<JobOutcomeEvent>,
}

impl PassReport {
    fn empty(skipped: bool, at: DateTime<Utc>) -> Self {
        Self {
            skipped,
            started_at: at,
            finished_at: at,
            events: Vec::new(),
        }
    }

    fn count(&self, outcome: JobOutcome) -> usize {
        self.events.iter().filter(|e| e.outcome == outcome).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(JobOutcome::Success)
    }

    pub fn retried(&self) -> usize {
        self.count(JobOutcome::Retry)
    }

    pub fn dropped(&self) -> usize {
        self.count(JobOutcome::Dropped)
    }
}

/// Drains one named queue through the executor.
///
/// Passes never overlap: a pass started while another holds the guard
/// returns immediately with [`PassReport::skipped`] set.
#[derive(Debug)]
pub struct QueueProcessor {
    /// Shared queue store
    store: Arc<QueueStore>,
    /// Job executor for dispatching
    executor: Arc<JobExecutor>,
    /// Queue drained by this processor
    queue_name: String,
    /// Time source for reports and events
    clock: Arc<dyn Clock>,
    /// Held for the duration of a pass
    pass_guard: Mutex<()>,
    /// Outcome event fan-out
    events: broadcast::Sender<JobOutcomeEvent>,
}

impl QueueProcessor {
    /// Create a new processor backed by the system clock
    pub fn new(
        store: Arc<QueueStore>,
        executor: Arc<JobExecutor>,
        queue_name: impl Into<String>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            executor,
            queue_name: queue_name.into(),
            clock: Arc::new(SystemClock),
            pass_guard: Mutex::new(()),
            events,
        }
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Name of the queue this processor drains
    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Receive every outcome event emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<JobOutcomeEvent> {
        self.events.subscribe()
    }

    /// Whether a pass is currently running
    pub fn is_processing(&self) -> bool {
        self.pass_guard.try_lock().is_err()
    }

    /// Run one pass over a snapshot of the queue.
    pub async fn run_pass(&self) -> PassReport {
        let Ok(_guard) = self.pass_guard.try_lock() else {
            tracing::debug!(
                queue = %self.queue_name,
                "Processing pass already running, trigger suppressed"
            );
            return PassReport::empty(true, self.clock.now());
        };

        let started_at = self.clock.now();
        let snapshot = self.store.get_queue(&self.queue_name);

        if snapshot.is_empty() {
            tracing::trace!(queue = %self.queue_name, "No jobs queued");
            return PassReport::empty(false, started_at);
        }

        tracing::info!(
            queue = %self.queue_name,
            jobs = snapshot.len(),
            "Processing pass started"
        );

        let mut events = Vec::with_capacity(snapshot.len());
        for job in &snapshot {
            let event = self.process_job(job).await;
            let _ = self.events.send(event.clone());
            events.push(event);
        }

        let report = PassReport {
            skipped: false,
            started_at,
            finished_at: self.clock.now(),
            events,
        };

        tracing::info!(
            queue = %self.queue_name,
            succeeded = report.succeeded(),
            retried = report.retried(),
            dropped = report.dropped(),
            remaining = self.store.len(&self.queue_name),
            "Processing pass finished"
        );

        report
    }

    /// Dispatch one job and apply the result to the live store by id
    async fn process_job(&self, job: &Job) -> JobOutcomeEvent {
        let (outcome, retries_remaining) = match self.executor.execute(job).await {
            Ok(_) => {
                self.store.dequeue_job(&self.queue_name, &job.id);
                (JobOutcome::Success, job.retries_remaining)
            }
            Err(e) if job.retries_remaining > 0 => {
                let remaining = job.retries_remaining - 1;
                if !self
                    .store
                    .update_job(&self.queue_name, &job.id, JobPatch::retries(remaining))
                {
                    tracing::debug!(
                        job_id = %job.id,
                        "Job left the queue during dispatch, retry not recorded"
                    );
                }
                tracing::warn!(
                    job_id = %job.id,
                    queue = %self.queue_name,
                    retries_remaining = remaining,
                    error = %e,
                    "Job dispatch failed, will retry"
                );
                (JobOutcome::Retry, remaining)
            }
            Err(e) => {
                self.store.dequeue_job(&self.queue_name, &job.id);
                tracing::error!(
                    job_id = %job.id,
                    queue = %self.queue_name,
                    process = job.payload.process(),
                    target_domain = %job.payload.target_domain(),
                    mac_address = %job.payload.mac_address(),
                    error = %e,
                    "Retries exhausted, job dropped"
                );
                (JobOutcome::Dropped, 0)
            }
        };

        let event = JobOutcomeEvent {
            job_id: job.id.clone(),
            queue: self.queue_name.clone(),
            outcome,
            retries_remaining,
            timestamp: self.clock.now(),
        };

        tracing::info!(
            job_id = %event.job_id,
            outcome = %event.outcome,
            retries_remaining = event.retries_remaining,
            "{}",
            event.description()
        );

        event
    }
}
