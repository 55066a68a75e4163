//! Cron scheduler lifecycle.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Harness, QUEUE, ScriptedDirectory, get};
use enrollgate_core::error::ErrorKind;
use enrollgate_worker::{CronScheduler, TargetDomain};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_started_scheduler_drains_queue_on_cadence() {
    let h = Harness::new(ScriptedDirectory::new());
    h.store
        .enqueue(QUEUE, get("AA:BB:CC:DD:EE:FF", TargetDomain::Eta))
        .unwrap();

    let mut scheduler = CronScheduler::new(Arc::clone(&h.processor), "* * * * * *")
        .await
        .unwrap();
    scheduler.start().await.unwrap();
    assert!(scheduler.is_running());

    let drained = tokio::time::timeout(Duration::from_secs(10), async {
        while !h.store.is_empty(QUEUE) {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    })
    .await;

    scheduler.stop().await.unwrap();
    assert!(drained.is_ok(), "queue was not drained by the cadence");
    assert!(!scheduler.is_running());
    assert_eq!(h.directory.dispatches(), 1);
}

#[tokio::test]
async fn test_trigger_now_runs_without_start() {
    let h = Harness::new(ScriptedDirectory::new());
    h.store
        .enqueue(QUEUE, get("AA:BB:CC:DD:EE:FF", TargetDomain::Lider))
        .unwrap();

    let scheduler = CronScheduler::new(Arc::clone(&h.processor), "0 * * * * *")
        .await
        .unwrap();
    assert!(!scheduler.is_running());

    let report = scheduler.trigger_now().await;
    assert_eq!(report.succeeded(), 1);
    assert!(h.store.is_empty(QUEUE));
}

#[tokio::test]
async fn test_invalid_cadence_is_rejected() {
    let h = Harness::new(ScriptedDirectory::new());
    let err = CronScheduler::new(Arc::clone(&h.processor), "sometimes")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Configuration);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stopped_scheduler_cannot_restart() {
    let h = Harness::new(ScriptedDirectory::new());
    let mut scheduler = CronScheduler::new(Arc::clone(&h.processor), "0 * * * * *")
        .await
        .unwrap();

    scheduler.start().await.unwrap();
    scheduler.stop().await.unwrap();
    scheduler.stop().await.unwrap();

    let err = scheduler.start().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ServiceUnavailable);
}
