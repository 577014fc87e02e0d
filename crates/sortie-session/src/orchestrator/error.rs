//! Orchestration error types.

use std::time::Duration;

use sortie_core::{CodecError, ErrorKind};

use crate::api::ApiError;

/// Errors that end a create-and-wait run.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("Invalid deployment configuration: {0}")]
    InvalidConfiguration(String),

    #[error("No placement strategy configured")]
    NoPlacementStrategy,

    #[error("Could not determine this machine's public IP")]
    PublicIpUnavailable,

    #[error("Deployment create failed ({status}): {body}")]
    CreateFailed { status: u16, body: String },

    #[error("Deployment status failed ({status}): {body}")]
    StatusFailed { status: u16, body: String },

    #[error("Deployment {request_id} entered error state")]
    DeploymentError { request_id: String },

    #[error("Deployment {request_id} is running but exposes no external port")]
    NoExternalPort { request_id: String },

    #[error("Deployment {request_id} did not become ready within {budget:?}")]
    PollTimeout { request_id: String, budget: Duration },

    #[error("Deployment cancelled")]
    Cancelled,

    #[error(transparent)]
    Api(ApiError),

    #[error("Platform returned an unusable request id: {0}")]
    Codec(#[from] CodecError),
}

impl DeployError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfiguration(_) | Self::NoPlacementStrategy => ErrorKind::Configuration,
            Self::PublicIpUnavailable | Self::CreateFailed { .. } | Self::StatusFailed { .. } => {
                ErrorKind::Transport
            }
            Self::DeploymentError { .. } | Self::NoExternalPort { .. } | Self::Codec(_) => {
                ErrorKind::Protocol
            }
            Self::PollTimeout { .. } => ErrorKind::Timeout,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Api(e) => e.kind(),
        }
    }

    /// Map an error from the create call.
    pub(crate) fn from_create(err: ApiError) -> Self {
        match err {
            ApiError::Status { status, body } | ApiError::MissingRequestId { status, body } => {
                Self::CreateFailed { status, body }
            }
            other => Self::Api(other),
        }
    }

    /// Map an error from a status poll.
    pub(crate) fn from_status(err: ApiError) -> Self {
        match err {
            ApiError::Status { status, body } => Self::StatusFailed { status, body },
            other => Self::Api(other),
        }
    }
}
