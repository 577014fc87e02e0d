//! Deployment platform integration.
//!
//! Provides a reqwest-based client for the create and status endpoints,
//! plus public IP discovery used for placement.

mod client;
pub mod types;


pub use client::{
    ApiError, DeployApiClient, DeploymentApi, HttpPublicIpLookup, IP_LOOKUP_TIMEOUT, PublicIpLookup,
};
pub use types::{
    CreateDeploymentRequest, DeploymentStatus, DeploymentUser, PortEntry, PortMap, PortMapping,
};
