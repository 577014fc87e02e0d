//! Join code encoding.
//!
//! [`base58`] is a standalone primitive; [`join_code`] packs a request id
//! prefix and a port into it, and [`target`] resolves free-form join input.

pub mod base58;
pub mod join_code;
pub mod target;

pub use join_code::{JoinCode, JoinEndpoint};
pub use target::JoinTarget;
