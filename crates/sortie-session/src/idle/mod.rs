//! Idle shutdown for a running deployment.
//!
//! [`IdleState`] is the pure state machine; [`IdleShutdownMonitor`] feeds it
//! connection events and ticks and runs teardown when it says so.

mod monitor;
mod state;

pub use monitor::{IdleOutcome, IdleShutdownMonitor};
pub use state::{
    ConnectionEvent, ConnectionOrigin, ConnectionState, IdleState, ShutdownPhase, TickOutcome,
};
