//! REST client for the provisioning API.
//!
//! Wraps the HTTP endpoints (submission, listing, approval, inventory)
//! using [`reqwest`].

use std::time::Duration;

use crate::models::{
    DatabaseInventory, Decision, Health, NewRequest, RequestList, RequestOutcome, ServiceInfo,
};
use dbprov_core::provisioning::RequestStatus;

/// Errors from the provisioning client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request itself failed (network, DNS, TLS, decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API returned a non-2xx status code.
    #[error("Provisioning API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The server never reported healthy within the allowed attempts.
    #[error("API at {url} not healthy after {attempts} attempts")]
    Unavailable { url: String, attempts: u32 },

    /// Writing demo output failed.
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP client for a single provisioning API instance.
#[derive(Debug, Clone)]
pub struct ProvisioningClient {
    client: reqwest::Client,
    api_url: String,
}

impl ProvisioningClient {
    /// Create a new client.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `http://localhost:8000`.
    /// * `timeout` - Per-request timeout.
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, api_url))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: &str) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Base URL this client talks to.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// `GET /` -- service descriptor.
    pub async fn service_info(&self) -> Result<ServiceInfo, ClientError> {
        let response = self.client.get(format!("{}/", self.api_url)).send().await?;
        Self::parse_response(response).await
    }

    /// `GET /health` -- service and database health.
    pub async fn health(&self) -> Result<Health, ClientError> {
        let response = self
            .client
            .get(format!("{}/health", self.api_url))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Poll `/health` until it reports a reachable database.
    ///
    /// Gives up with [`ClientError::Unavailable`] after `attempts` tries
    /// spaced `interval` apart.
    pub async fn wait_until_healthy(
        &self,
        attempts: u32,
        interval: Duration,
    ) -> Result<Health, ClientError> {
        for attempt in 1..=attempts {
            match self.health().await {
                Ok(health) if health.db_healthy => return Ok(health),
                Ok(health) => {
                    tracing::debug!(attempt, status = %health.status, "API up but degraded");
                }
                Err(e) => {
                    tracing::debug!(attempt, error = %e, "API not reachable yet");
                }
            }
            if attempt < attempts {
                tokio::time::sleep(interval).await;
            }
        }
        Err(ClientError::Unavailable {
            url: self.api_url.clone(),
            attempts,
        })
    }

    /// `POST /api/v1/requests` -- submit a provisioning request.
    pub async fn create_request(&self, request: &NewRequest) -> Result<RequestOutcome, ClientError> {
        let response = self
            .client
            .post(format!("{}/api/v1/requests", self.api_url))
            .json(request)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `GET /api/v1/requests` -- list requests, optionally by status.
    pub async fn list_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<RequestList, ClientError> {
        let mut builder = self.client.get(format!("{}/api/v1/requests", self.api_url));
        if let Some(status) = status {
            builder = builder.query(&[("status", status.as_str())]);
        }
        let response = builder.send().await?;
        Self::parse_response(response).await
    }

    /// `POST /api/v1/approve` -- approve or reject a pending request.
    pub async fn process_approval(&self, decision: &Decision) -> Result<RequestOutcome, ClientError> {
        let response = self
            .client
            .post(format!("{}/api/v1/approve", self.api_url))
            .json(decision)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `GET /api/v1/databases` -- active databases and their total cost.
    pub async fn list_databases(&self) -> Result<DatabaseInventory, ClientError> {
        let response = self
            .client
            .get(format!("{}/api/v1/databases", self.api_url))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ClientError::Api`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}
