//! Deployment API request and response types.
//!
//! Deserialization structs matching the platform's `/v2/deployments` and
//! `/v1/status/{request_id}` JSON bodies. Only the fields the session
//! lifecycle reads are modelled; everything else is ignored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Body of `POST /v2/deployments`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateDeploymentRequest {
    pub application: String,
    pub version: String,
    pub users: Vec<DeploymentUser>,
}

/// A player the platform should place the deployment near.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentUser {
    pub user_type: String,
    pub user_data: UserData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserData {
    pub ip_address: String,
}

impl DeploymentUser {
    /// A user located by public IP address.
    pub fn ip_address(ip: impl Into<String>) -> Self {
        Self {
            user_type: "ip_address".to_string(),
            user_data: UserData {
                ip_address: ip.into(),
            },
        }
    }
}

/// Successful body of `POST /v2/deployments` (subset of fields).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDeploymentResponse {
    #[serde(default)]
    pub request_id: Option<String>,
}

/// One entry of the status `ports` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PortMapping {
    #[serde(default)]
    pub internal: Option<i64>,
    #[serde(default)]
    pub external: Option<i64>,
    #[serde(default)]
    pub protocol: Option<String>,
}

impl PortMapping {
    /// The external port, if present and representable as a TCP/UDP port.
    pub fn external_port(&self) -> Option<u16> {
        self.external.and_then(|p| u16::try_from(p).ok())
    }

    pub fn is_udp(&self) -> bool {
        self.protocol
            .as_deref()
            .is_some_and(|p| p.to_ascii_uppercase().contains("UDP"))
    }
}

/// A `ports` entry; values the platform sends in an unexpected shape are
/// kept as raw JSON and never selected.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PortEntry {
    Mapping(PortMapping),
    Unrecognized(serde_json::Value),
}

impl PortEntry {
    pub const fn mapping(&self) -> Option<&PortMapping> {
        match self {
            Self::Mapping(m) => Some(m),
            Self::Unrecognized(_) => None,
        }
    }
}

/// Port name -> mapping. Traversal order is by port name.
pub type PortMap = BTreeMap<String, PortEntry>;

/// Body of `GET /v1/status/{request_id}` (subset of fields).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeploymentStatus {
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub fqdn: Option<String>,
    #[serde(default)]
    pub ports: Option<PortMap>,
    /// Free-form platform status, e.g. `"Status.DEPLOYING"`.
    #[serde(default)]
    pub current_status: Option<String>,
}

impl DeploymentStatus {
    /// Running, addressable, and with at least one port mapping.
    pub fn is_ready(&self) -> bool {
        self.running
            && self.fqdn.as_deref().is_some_and(|f| !f.trim().is_empty())
            && self.ports.as_ref().is_some_and(|p| !p.is_empty())
    }
}
