//! Shared test doubles for worker integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Notify, Semaphore};

use enrollgate_worker::{
    DirectoryUpdate, JobExecutor, MacAddress, QueueProcessor, QueueStore, RemoteDirectory,
    RemoteOperationError, SyncPayload, TargetDomain,
};

pub const QUEUE: &str = "sync";

/// Directory double whose failures are scripted per MAC address.
///
/// Optionally blocks every call until [`ScriptedDirectory::release`] adds a
/// permit, announcing entry through `entered`.
#[derive(Debug, Default)]
pub struct ScriptedDirectory {
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
    dispatches: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
    pub entered: Arc<Notify>,
}

impl ScriptedDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls block until released.
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        }
    }

    pub fn fail_for(&self, mac: &str) {
        self.failing.lock().unwrap().insert(mac.to_string());
    }

    pub fn succeed_for(&self, mac: &str) {
        self.failing.lock().unwrap().remove(mac);
    }

    /// Let `n` blocked calls proceed.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn dispatches(&self) -> usize {
        self.dispatches.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn respond(&self, call: String, mac: &MacAddress) -> Result<Value, RemoteOperationError> {
        self.dispatches.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(call);
        self.entered.notify_one();

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }

        if self.failing.lock().unwrap().contains(mac.as_str()) {
            Err(RemoteOperationError::Rejected {
                status: 503,
                message: "directory unavailable".to_string(),
            })
        } else {
            Ok(serde_json::json!({ "mac_address": mac.as_str() }))
        }
    }
}

#[async_trait]
impl RemoteDirectory for ScriptedDirectory {
    async fn perform_read(
        &self,
        mac_address: &MacAddress,
        target_domain: TargetDomain,
    ) -> Result<Value, RemoteOperationError> {
        self.respond(format!("read {target_domain} {mac_address}"), mac_address)
            .await
    }

    async fn perform_write(
        &self,
        mac_address: &MacAddress,
        update: &DirectoryUpdate,
    ) -> Result<Value, RemoteOperationError> {
        self.respond(
            format!("write {} {mac_address}", update.target_domain()),
            mac_address,
        )
        .await
    }
}

/// Store, directory and processor wired together.
pub struct Harness {
    pub store: Arc<QueueStore>,
    pub directory: Arc<ScriptedDirectory>,
    pub processor: Arc<QueueProcessor>,
}

impl Harness {
    pub fn new(directory: ScriptedDirectory) -> Self {
        let store = Arc::new(QueueStore::new(3));
        let directory = Arc::new(directory);
        let executor = Arc::new(JobExecutor::new(
            directory.clone(),
            Duration::from_secs(5),
        ));
        let processor = Arc::new(QueueProcessor::new(
            Arc::clone(&store),
            executor,
            QUEUE,
        ));

        Self {
            store,
            directory,
            processor,
        }
    }
}

pub fn get(mac: &str, domain: TargetDomain) -> SyncPayload {
    SyncPayload::Get {
        mac_address: mac.parse().expect("valid mac"),
        target_domain: domain,
    }
}
