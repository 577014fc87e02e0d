//! Error types for `Sortie` core library.

use std::fmt;

use thiserror::Error;

/// Result type alias using `Sortie` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `Sortie` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Join code or address could not be decoded
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Codec(_) => ErrorKind::Codec,
            Self::Config(_) | Self::Json(_) | Self::Io(_) => ErrorKind::Configuration,
        }
    }
}

/// Errors produced while encoding or decoding base58 data and join codes.
///
/// Always local: the caller can recover by asking for a different input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("invalid base58 character {ch:?} at position {position}")]
    InvalidCharacter { ch: char, position: usize },

    #[error("invalid hex in request id: {0}")]
    InvalidHex(String),

    #[error("request id must be at least 12 hex characters, got {0:?}")]
    InvalidRequestId(String),

    #[error("join code decodes to {actual} bytes, expected {expected}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("input is empty")]
    Empty,

    #[error("invalid address {input:?}: {reason}")]
    InvalidAddress { input: String, reason: String },
}

/// Coarse failure classes shared by every `Sortie` error type.
///
/// Each class calls for a different corrective action from the user, which
/// [`ErrorKind::hint`] spells out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing or blank required configuration; nothing was sent.
    Configuration,
    /// Malformed join code, hex, or address.
    Codec,
    /// Network failure or a rejected HTTP request.
    Transport,
    /// The platform reported an error state or returned an unusable body.
    Protocol,
    /// The deployment never became ready within the polling budget.
    Timeout,
    /// The caller aborted the operation.
    Cancelled,
}

impl ErrorKind {
    /// Short human-readable corrective action for this class of failure.
    pub const fn hint(self) -> &'static str {
        match self {
            Self::Configuration => "check the configured application, version and credentials",
            Self::Codec => "check the join code or address and try again",
            Self::Transport => "the platform rejected the request; check credentials and network",
            Self::Protocol => "the platform reported an error; check the deployment logs",
            Self::Timeout => "the server never became ready; check provider capacity and retry",
            Self::Cancelled => "the operation was cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configuration => "configuration",
            Self::Codec => "bad input",
            Self::Transport => "transport",
            Self::Protocol => "platform error",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}
