//! HTTP client for the ETA and LIDER directory APIs.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;
use std::time::Duration;
use tracing;

use enrollgate_core::config::relay::RelayConfig;
use enrollgate_core::error::AppError;

use crate::executor::{RemoteDirectory, RemoteOperationError};
use crate::job::{DirectoryUpdate, MacAddress, TargetDomain};

/// [`RemoteDirectory`] backed by the directories' REST APIs.
///
/// Reads are `GET {base}/devices/{mac}`, writes are `PUT {base}/devices/{mac}`
/// with the domain-specific record as the JSON body.
#[derive(Debug, Clone)]
pub struct HttpDirectoryClient {
    client: Client,
    eta_base_url: String,
    lider_base_url: String,
    timeout: Duration,
}

impl HttpDirectoryClient {
    /// Build a client from relay configuration.
    pub fn new(config: &RelayConfig) -> Result<Self, AppError> {
        let timeout = config.request_timeout();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            eta_base_url: config.eta_base_url.trim_end_matches('/').to_string(),
            lider_base_url: config.lider_base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn base_url(&self, domain: TargetDomain) -> &str {
        match domain {
            TargetDomain::Eta => &self.eta_base_url,
            TargetDomain::Lider => &self.lider_base_url,
        }
    }

    fn device_url(&self, domain: TargetDomain, mac_address: &MacAddress) -> String {
        format!("{}/devices/{}", self.base_url(domain), mac_address)
    }

    fn transport_error(&self, err: reqwest::Error) -> RemoteOperationError {
        if err.is_timeout() {
            RemoteOperationError::Timeout(self.timeout)
        } else {
            RemoteOperationError::Transport(err.to_string())
        }
    }

    async fn decode(&self, response: Response) -> Result<Value, RemoteOperationError> {
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RemoteOperationError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;

        if body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&body)
            .map_err(|e| RemoteOperationError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl RemoteDirectory for HttpDirectoryClient {
    async fn perform_read(
        &self,
        mac_address: &MacAddress,
        target_domain: TargetDomain,
    ) -> Result<Value, RemoteOperationError> {
        let url = self.device_url(target_domain, mac_address);
        tracing::debug!(url = %url, "Reading device record");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.decode(response).await
    }

    async fn perform_write(
        &self,
        mac_address: &MacAddress,
        update: &DirectoryUpdate,
    ) -> Result<Value, RemoteOperationError> {
        let url = self.device_url(update.target_domain(), mac_address);
        tracing::debug!(url = %url, "Writing device record");

        let request = match update {
            DirectoryUpdate::Eta(record) => self.client.put(&url).json(record),
            DirectoryUpdate::Lider(record) => self.client.put(&url).json(record),
        };

        let response = request.send().await.map_err(|e| self.transport_error(e))?;

        self.decode(response).await
    }
}
