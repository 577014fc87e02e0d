//! Teardown error types.

use sortie_core::ErrorKind;

/// Errors from stopping a deployment.
#[derive(Debug, thiserror::Error)]
pub enum TeardownError {
    #[error("Missing teardown credentials: {0} is not set")]
    MissingCredentials(String),

    #[error("Teardown token cannot be sent as an HTTP header")]
    InvalidToken,

    #[error("Teardown rejected ({status}) after {attempts} attempt(s): {body}")]
    Rejected {
        status: u16,
        body: String,
        attempts: usize,
    },

    #[error("Teardown request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Teardown task ended without a result")]
    Aborted,
}

impl TeardownError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingCredentials(_) | Self::InvalidToken => ErrorKind::Configuration,
            Self::Rejected { .. } | Self::Transport(_) | Self::Aborted => ErrorKind::Transport,
        }
    }
}
