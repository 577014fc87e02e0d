//! `Sortie` Session Library
//!
//! Lifecycle of an on-demand game session:
//! - Deployment creation and readiness polling against the platform API
//! - Join code production for the resulting address
//! - Idle detection and self-teardown of the running deployment
//! - Authenticated DELETE with authorization-scheme fallback

pub mod api;
pub mod cmd;
pub mod http;
pub mod idle;
pub mod orchestrator;
pub mod teardown;
