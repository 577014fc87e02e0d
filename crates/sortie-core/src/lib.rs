//! `Sortie` Core Library
//!
//! Shared functionality for `Sortie` components:
//! - Base58 and join code encoding
//! - Join input resolution (code or direct address)
//! - Configuration resolution and hierarchy
//! - Common error types and the user-facing error taxonomy

pub mod codec;
pub mod config;
pub mod error;
pub mod tracing_init;

pub use codec::{JoinCode, JoinEndpoint, JoinTarget};
pub use config::Config;
pub use error::{CodecError, Error, ErrorKind, Result};
