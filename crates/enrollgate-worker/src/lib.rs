//! Background device-registration sync for EnrollGate.
//!
//! This crate provides:
//! - An in-memory, named, deduplicating job queue ([`QueueStore`])
//! - A job executor that routes each job to a remote directory
//! - A processing pass that retries failed jobs a bounded number of times
//! - A cron scheduler that runs the pass on a fixed cadence
//! - An HTTP client for the ETA and LIDER directories

pub mod clock;
pub mod events;
pub mod executor;
pub mod job;
pub mod queue;
pub mod relay;
pub mod runner;
pub mod scheduler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use events::{JobOutcome, JobOutcomeEvent};
pub use executor::{JobExecutor, RemoteDirectory, RemoteOperationError};
pub use job::{
    DirectoryUpdate, EnqueueOptions, EtaUpdate, Job, JobId, JobPatch, LiderUpdate, MacAddress,
    SyncPayload, TargetDomain,
};
pub use queue::{EnqueueOutcome, QueueStats, QueueStore};
pub use relay::HttpDirectoryClient;
pub use runner::{PassReport, QueueProcessor};
pub use scheduler::CronScheduler;
