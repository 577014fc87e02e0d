//! Deployment platform REST client.
//!
//! Uses reqwest to call the create and status endpoints, and to discover
//! this machine's public IP for placement.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use sortie_core::ErrorKind;
use thiserror::Error;
use tracing::{debug, warn};

use super::types::{CreateDeploymentRequest, CreateDeploymentResponse, DeploymentStatus};

/// Per-endpoint budget for public IP discovery.
pub const IP_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Deployment API client errors.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Deployment API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("Deployment API response ({status}) has no request_id: {body}")]
    MissingRequestId { status: u16, body: String },

    #[error("Unreadable deployment API response: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Http(_) | Self::Status { .. } => ErrorKind::Transport,
            Self::MissingRequestId { .. } | Self::Decode(_) => ErrorKind::Protocol,
            Self::Config(_) => ErrorKind::Configuration,
        }
    }
}

/// Operations the orchestrator needs from the deployment platform.
#[async_trait]
pub trait DeploymentApi: Send + Sync {
    /// Request a new deployment; returns its request id.
    async fn create_deployment(&self, request: &CreateDeploymentRequest)
    -> Result<String, ApiError>;

    /// Fetch the current status of a deployment.
    async fn deployment_status(&self, request_id: &str) -> Result<DeploymentStatus, ApiError>;
}

/// Source of this machine's public IP address.
#[async_trait]
pub trait PublicIpLookup: Send + Sync {
    async fn public_ip(&self) -> Option<String>;
}

/// REST client for the deployment platform.
#[derive(Debug, Clone)]
pub struct DeployApiClient {
    http: reqwest::Client,
    base_url: String,
    auth: Option<HeaderValue>,
}

impl DeployApiClient {
    /// Create a client. `api_token`, when present, is sent as
    /// `Authorization: token <api_token>` on every call.
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        api_token: Option<&str>,
    ) -> Result<Self, ApiError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(ApiError::Config("api base url is empty".into()));
        }

        let auth = match api_token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => {
                let mut value = HeaderValue::from_str(&format!("token {token}"))
                    .map_err(|_| ApiError::Config("Invalid token format".into()))?;
                value.set_sensitive(true);
                Some(value)
            }
            None => None,
        };

        Ok(Self {
            http,
            base_url: base_url.to_string(),
            auth,
        })
    }

    /// Build the URL for a given API path.
    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Some(value) => builder.header(AUTHORIZATION, value.clone()),
            None => builder,
        }
    }

    /// Read the body of a response, returning it alongside the status.
    async fn read(resp: reqwest::Response) -> Result<(reqwest::StatusCode, String), ApiError> {
        let status = resp.status();
        let body = resp.text().await?;
        Ok((status, body))
    }
}

#[async_trait]
impl DeploymentApi for DeployApiClient {
    async fn create_deployment(
        &self,
        request: &CreateDeploymentRequest,
    ) -> Result<String, ApiError> {
        let url = self.api_url("/v2/deployments");
        let resp = self
            .authorize(self.http.post(&url))
            .json(request)
            .send()
            .await?;
        let (status, body) = Self::read(resp).await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let request_id = serde_json::from_str::<CreateDeploymentResponse>(&body)
            .ok()
            .and_then(|r| r.request_id)
            .filter(|id| !id.trim().is_empty());
        request_id.ok_or(ApiError::MissingRequestId {
            status: status.as_u16(),
            body,
        })
    }

    async fn deployment_status(&self, request_id: &str) -> Result<DeploymentStatus, ApiError> {
        let url = self.api_url(&format!("/v1/status/{request_id}"));
        let resp = self.authorize(self.http.get(&url)).send().await?;
        let (status, body) = Self::read(resp).await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(format!("{e}: {body}")))
    }
}

/// Public IP discovery over plain-text "what is my IP" services, tried in
/// order until one answers with an address.
///
/// Each endpoint gets [`IP_LOOKUP_TIMEOUT`]; one that stalls is skipped.
#[derive(Debug, Clone)]
pub struct HttpPublicIpLookup {
    http: reqwest::Client,
    endpoints: Vec<String>,
    per_endpoint: Duration,
}

impl HttpPublicIpLookup {
    pub const fn new(http: reqwest::Client, endpoints: Vec<String>) -> Self {
        Self {
            http,
            endpoints,
            per_endpoint: IP_LOOKUP_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, per_endpoint: Duration) -> Self {
        self.per_endpoint = per_endpoint;
        self
    }

    async fn query(&self, endpoint: &str) -> Result<Option<String>, reqwest::Error> {
        let resp = self.http.get(endpoint).send().await?;
        if !resp.status().is_success() {
            debug!(endpoint, status = resp.status().as_u16(), "IP lookup rejected");
            return Ok(None);
        }
        let body = resp.text().await?;
        let candidate = body.trim();
        if candidate.parse::<IpAddr>().is_ok() {
            Ok(Some(candidate.to_string()))
        } else {
            warn!(endpoint, "IP lookup returned something that is not an address");
            Ok(None)
        }
    }
}

#[async_trait]
impl PublicIpLookup for HttpPublicIpLookup {
    async fn public_ip(&self) -> Option<String> {
        for endpoint in &self.endpoints {
            match tokio::time::timeout(self.per_endpoint, self.query(endpoint)).await {
                Ok(Ok(Some(ip))) => {
                    debug!(endpoint, ip = %ip, "Resolved public IP");
                    return Some(ip);
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) => warn!(endpoint, error = %e, "IP lookup failed"),
                Err(_) => warn!(
                    endpoint,
                    timeout_ms = u64::try_from(self.per_endpoint.as_millis()).unwrap_or(u64::MAX),
                    "IP lookup timed out"
                ),
            }
        }
        None
    }
}
