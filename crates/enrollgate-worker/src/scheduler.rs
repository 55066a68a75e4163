//! Cron scheduler that triggers the sync processing pass.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing;
use uuid::Uuid;

use enrollgate_core::error::AppError;

use crate::runner::{PassReport, QueueProcessor};

/// Cron-based trigger for [`QueueProcessor::run_pass`].
///
/// Ticks that arrive while a pass is still running are suppressed by the
/// processor's pass guard.
pub struct CronScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Processor run on every tick
    processor: Arc<QueueProcessor>,
    /// Cron expression, seconds first
    cadence: String,
    /// Id of the registered tick job while started
    tick_job: Option<Uuid>,
    /// Set once `stop` has shut the scheduler down
    shut_down: bool,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler")
            .field("cadence", &self.cadence)
            .field("running", &self.is_running())
            .finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler
    ///
    /// Fails with a configuration error if `cadence` is not a valid cron
    /// expression.
    pub async fn new(
        processor: Arc<QueueProcessor>,
        cadence: impl Into<String>,
    ) -> Result<Self, AppError> {
        let cadence = cadence.into();
        Self::validate_cadence(&cadence)?;

        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self {
            scheduler,
            processor,
            cadence,
            tick_job: None,
            shut_down: false,
        })
    }

    /// Check that `cadence` parses as a cron schedule
    pub fn validate_cadence(cadence: &str) -> Result<(), AppError> {
        CronJob::new_async(cadence, |_uuid, _lock| Box::pin(async {}))
            .map(|_| ())
            .map_err(|e| {
                AppError::configuration(format!("Invalid cadence '{}': {}", cadence, e))
            })
    }

    /// Register the tick and start the scheduler
    ///
    /// A stopped scheduler cannot be restarted; build a new one instead.
    pub async fn start(&mut self) -> Result<(), AppError> {
        if self.shut_down {
            return Err(AppError::service_unavailable(
                "Cron scheduler has been shut down",
            ));
        }
        if self.tick_job.is_some() {
            tracing::debug!("Cron scheduler already started");
            return Ok(());
        }

        let processor = Arc::clone(&self.processor);
        let job = CronJob::new_async(self.cadence.as_str(), move |_uuid, _lock| {
            let processor = Arc::clone(&processor);
            Box::pin(async move {
                tracing::trace!(queue = %processor.queue_name(), "Cadence tick");
                processor.run_pass().await;
            })
        })
        .map_err(|e| AppError::configuration(format!("Failed to create sync schedule: {}", e)))?;

        let id = self
            .scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add sync schedule: {}", e)))?;

        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {}", e)))?;

        self.tick_job = Some(id);
        tracing::info!(
            cadence = %self.cadence,
            queue = %self.processor.queue_name(),
            "Cron scheduler started"
        );
        Ok(())
    }

    /// Remove the tick and shut the scheduler down
    ///
    /// A pass already in flight runs to completion.
    pub async fn stop(&mut self) -> Result<(), AppError> {
        let Some(id) = self.tick_job.take() else {
            return Ok(());
        };

        self.scheduler
            .remove(&id)
            .await
            .map_err(|e| AppError::internal(format!("Failed to remove sync schedule: {}", e)))?;

        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {}", e)))?;

        self.shut_down = true;
        tracing::info!("Cron scheduler shut down");
        Ok(())
    }

    /// Run a guarded pass immediately, outside the cadence
    pub async fn trigger_now(&self) -> PassReport {
        self.processor.run_pass().await
    }

    /// Whether the tick is registered
    pub fn is_running(&self) -> bool {
        self.tick_job.is_some()
    }

    /// Configured cron expression
    pub fn cadence(&self) -> &str {
        &self.cadence
    }
}
