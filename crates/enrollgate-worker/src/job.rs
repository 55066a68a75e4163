//! Sync job domain types and content-derived job identity.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use enrollgate_core::error::AppError;

/// Content-derived job identifier (hex SHA-256).
///
/// Two jobs built from the same queue name and payload always share an id,
/// which is what makes enqueueing idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Derive the id for `payload` submitted to `queue_name`.
    pub fn derive(queue_name: &str, payload: &SyncPayload) -> Result<Self, serde_json::Error> {
        let encoded = serde_json::to_vec(payload)?;
        let payload_digest = sha256_hex(&encoded);

        let material = format!(
            "{}\n{}\n{}\n{}\n{}",
            queue_name,
            payload.process(),
            payload.target_domain(),
            payload.mac_address(),
            payload_digest
        );

        Ok(Self(sha256_hex(material.as_bytes())))
    }

    /// Borrow the hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Hardware address used as the correlation key between directories.
///
/// Always stored upper-case and colon separated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress(String);

impl MacAddress {
    /// Borrow the normalized form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for MacAddress {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let octets: Vec<&str> = trimmed.split(|c| c == ':' || c == '-').collect();

        let valid = octets.len() == 6
            && octets
                .iter()
                .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()));

        if !valid {
            return Err(AppError::validation(format!(
                "Invalid MAC address: '{trimmed}'"
            )));
        }

        Ok(Self(octets.join(":").to_ascii_uppercase()))
    }
}

impl TryFrom<String> for MacAddress {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.0
    }
}

impl std::fmt::Display for MacAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The external directory a job talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TargetDomain {
    /// ETA device registry.
    Eta,
    /// LIDER agent directory.
    Lider,
}

impl std::fmt::Display for TargetDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetDomain::Eta => write!(f, "ETA"),
            TargetDomain::Lider => write!(f, "LIDER"),
        }
    }
}

/// Device record pushed to the ETA registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtaUpdate {
    /// Device host name.
    pub hostname: String,
    /// Manufacturer serial number, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    /// Directory uid of the user the device is assigned to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_uid: Option<String>,
}

/// Agent entry pushed to the LIDER directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiderUpdate {
    /// Distinguished name of the agent entry.
    pub agent_dn: String,
    /// Attributes to replace on the entry.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// A write against one directory. The variant decides the target domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target_domain", content = "record", rename_all = "UPPERCASE")]
pub enum DirectoryUpdate {
    Eta(EtaUpdate),
    Lider(LiderUpdate),
}

impl DirectoryUpdate {
    /// Directory this update is routed to.
    pub fn target_domain(&self) -> TargetDomain {
        match self {
            DirectoryUpdate::Eta(_) => TargetDomain::Eta,
            DirectoryUpdate::Lider(_) => TargetDomain::Lider,
        }
    }
}

/// What a sync job asks the remote side to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "process", rename_all = "UPPERCASE")]
pub enum SyncPayload {
    /// Fetch the device record from `target_domain`.
    Get {
        mac_address: MacAddress,
        target_domain: TargetDomain,
    },
    /// Write the device record to the directory named by `update`.
    Update {
        mac_address: MacAddress,
        update: DirectoryUpdate,
    },
}

impl SyncPayload {
    /// Process discriminator as it appears on the wire.
    pub fn process(&self) -> &'static str {
        match self {
            SyncPayload::Get { .. } => "GET",
            SyncPayload::Update { .. } => "UPDATE",
        }
    }

    pub fn target_domain(&self) -> TargetDomain {
        match self {
            SyncPayload::Get { target_domain, .. } => *target_domain,
            SyncPayload::Update { update, .. } => update.target_domain(),
        }
    }

    pub fn mac_address(&self) -> &MacAddress {
        match self {
            SyncPayload::Get { mac_address, .. } | SyncPayload::Update { mac_address, .. } => {
                mac_address
            }
        }
    }
}

/// A pending unit of sync work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Content-derived identifier.
    pub id: JobId,
    /// What to do.
    pub payload: SyncPayload,
    /// Failed dispatches still allowed before the job is dropped.
    pub retries_remaining: u32,
    /// Requested delay recorded at enqueue time. Not consulted by the pass.
    pub scheduled_delay_ms: u64,
    /// When the job was enqueued.
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Requested delay as a [`Duration`].
    pub fn scheduled_delay(&self) -> Duration {
        Duration::from_millis(self.scheduled_delay_ms)
    }

    /// Merge `patch` into this job.
    ///
    /// The retry budget never grows.
    pub fn apply(&mut self, patch: &JobPatch) {
        if let Some(retries) = patch.retries_remaining {
            self.retries_remaining = self.retries_remaining.min(retries);
        }
        if let Some(delay) = patch.scheduled_delay {
            self.scheduled_delay_ms = delay.as_millis() as u64;
        }
    }
}

/// Partial update for a queued job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobPatch {
    pub retries_remaining: Option<u32>,
    pub scheduled_delay: Option<Duration>,
}

impl JobPatch {
    /// Patch that only sets the remaining retry count.
    pub fn retries(retries_remaining: u32) -> Self {
        Self {
            retries_remaining: Some(retries_remaining),
            ..Self::default()
        }
    }
}

/// Per-call enqueue settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnqueueOptions {
    /// Retry budget; `None` uses the store default.
    pub retries: Option<u32>,
    /// Recorded on the job, see [`Job::scheduled_delay`].
    pub delay: Duration,
}

impl EnqueueOptions {
    /// Set the retry budget for this job.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    /// Set the recorded delay for this job.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(s: &str) -> MacAddress {
        s.parse().expect("valid mac")
    }

    fn get_payload() -> SyncPayload {
        SyncPayload::Get {
            mac_address: mac("AA:BB:CC:DD:EE:FF"),
            target_domain: TargetDomain::Eta,
        }
    }

    #[test]
    fn test_mac_address_normalizes() {
        assert_eq!(mac("aa-bb-cc-dd-ee-ff").as_str(), "AA:BB:CC:DD:EE:FF");
        assert_eq!(mac(" 11:22:33:44:55:66 ").as_str(), "11:22:33:44:55:66");
    }

    #[test]
    fn test_mac_address_rejects_garbage() {
        assert!("AA:BB:CC:DD:EE".parse::<MacAddress>().is_err());
        assert!("GG:BB:CC:DD:EE:FF".parse::<MacAddress>().is_err());
        assert!("AAB:B:CC:DD:EE:FF".parse::<MacAddress>().is_err());
        assert!(serde_json::from_str::<MacAddress>("\"not-a-mac\"").is_err());
    }

    #[test]
    fn test_payload_wire_format() {
        let json = serde_json::to_string(&get_payload()).unwrap();
        assert_eq!(
            json,
            r#"{"process":"GET","mac_address":"AA:BB:CC:DD:EE:FF","target_domain":"ETA"}"#
        );

        let update: SyncPayload = serde_json::from_value(serde_json::json!({
            "process": "UPDATE",
            "mac_address": "11:22:33:44:55:66",
            "update": {
                "target_domain": "LIDER",
                "record": { "agent_dn": "cn=pc-01,ou=Agents,dc=example,dc=org" }
            }
        }))
        .unwrap();
        assert_eq!(update.process(), "UPDATE");
        assert_eq!(update.target_domain(), TargetDomain::Lider);
        assert_eq!(update.mac_address().as_str(), "11:22:33:44:55:66");
    }

    #[test]
    fn test_job_id_is_stable() {
        let first = JobId::derive("sync", &get_payload()).unwrap();
        let second = JobId::derive("sync", &get_payload()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.as_str().len(), 64);
        assert_eq!(
            first.as_str(),
            "9e70750cd5fb3a1378295f62d082a48b7fd99fabbd470328a796df332fea9ef6"
        );
    }

    #[test]
    fn test_job_id_depends_on_queue_and_content() {
        let base = JobId::derive("sync", &get_payload()).unwrap();
        assert_ne!(base, JobId::derive("other", &get_payload()).unwrap());

        let lider = SyncPayload::Get {
            mac_address: mac("AA:BB:CC:DD:EE:FF"),
            target_domain: TargetDomain::Lider,
        };
        assert_ne!(base, JobId::derive("sync", &lider).unwrap());
    }

    #[test]
    fn test_apply_never_raises_retries() {
        let mut job = Job {
            id: JobId::derive("sync", &get_payload()).unwrap(),
            payload: get_payload(),
            retries_remaining: 2,
            scheduled_delay_ms: 0,
            created_at: Utc::now(),
        };

        job.apply(&JobPatch::retries(5));
        assert_eq!(job.retries_remaining, 2);

        job.apply(&JobPatch::retries(1));
        assert_eq!(job.retries_remaining, 1);

        job.apply(&JobPatch {
            scheduled_delay: Some(Duration::from_secs(2)),
            ..JobPatch::default()
        });
        assert_eq!(job.scheduled_delay(), Duration::from_secs(2));
        assert_eq!(job.retries_remaining, 1);
    }
}
