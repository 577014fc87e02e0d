//! Idle detection state machine.
//!
//! ```text
//! Idle -> CountdownStarted -> ShutdownRequested -> ShutdownAttempted
//!   ^           |
//!   +-----------+  (a client is present on a tick)
//! ```
//!
//! `ShutdownRequested` and `ShutdownAttempted` are one-way: once reached,
//! neither connection events nor ticks can move the machine back.

use std::str::FromStr;
use std::time::Duration;

use tokio::time::Instant;

/// Whether a connection opened or closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Started,
    Stopped,
}

/// Where a connection comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionOrigin {
    Remote,
    /// The host's own local client.
    Loopback,
}

/// A connection state change reported by the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionEvent {
    pub state: ConnectionState,
    pub origin: ConnectionOrigin,
}

impl ConnectionEvent {
    pub const fn started() -> Self {
        Self {
            state: ConnectionState::Started,
            origin: ConnectionOrigin::Remote,
        }
    }

    pub const fn stopped() -> Self {
        Self {
            state: ConnectionState::Stopped,
            origin: ConnectionOrigin::Remote,
        }
    }

    #[must_use]
    pub const fn loopback(mut self) -> Self {
        self.origin = ConnectionOrigin::Loopback;
        self
    }
}

/// Parses `started`, `stopped`, optionally followed by `loopback`.
impl FromStr for ConnectionEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace().map(str::to_ascii_lowercase);
        let event = match words.next().as_deref() {
            Some("started" | "start" | "connected") => Self::started(),
            Some("stopped" | "stop" | "disconnected") => Self::stopped(),
            Some(other) => return Err(format!("unknown connection state {other:?}")),
            None => return Err("empty event".into()),
        };
        match words.next().as_deref() {
            None | Some("remote") => Ok(event),
            Some("loopback" | "local") => Ok(event.loopback()),
            Some(other) => Err(format!("unknown connection origin {other:?}")),
        }
    }
}

/// Shutdown progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    Idle,
    CountdownStarted { since: Instant },
    ShutdownRequested,
    ShutdownAttempted,
}

/// What a tick decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Nothing,
    CountdownStarted,
    CountdownReset,
    /// The idle window elapsed; the caller must run teardown exactly once.
    TriggerShutdown,
}

/// Occupancy counter plus shutdown phase.
#[derive(Debug, Clone)]
pub struct IdleState {
    active_clients: u32,
    ever_had_client: bool,
    phase: ShutdownPhase,
    threshold: Duration,
    count_loopback: bool,
}

impl IdleState {
    pub const fn new(threshold: Duration, count_loopback: bool) -> Self {
        Self {
            active_clients: 0,
            ever_had_client: false,
            phase: ShutdownPhase::Idle,
            threshold,
            count_loopback,
        }
    }

    pub const fn threshold(&self) -> Duration {
        self.threshold
    }

    pub const fn active_clients(&self) -> u32 {
        self.active_clients
    }

    pub const fn ever_had_client(&self) -> bool {
        self.ever_had_client
    }

    pub const fn phase(&self) -> ShutdownPhase {
        self.phase
    }

    pub const fn empty_since(&self) -> Option<Instant> {
        match self.phase {
            ShutdownPhase::CountdownStarted { since } => Some(since),
            _ => None,
        }
    }

    pub const fn stop_requested(&self) -> bool {
        matches!(
            self.phase,
            ShutdownPhase::ShutdownRequested | ShutdownPhase::ShutdownAttempted
        )
    }

    pub const fn stop_attempted(&self) -> bool {
        matches!(self.phase, ShutdownPhase::ShutdownAttempted)
    }

    /// Apply a connection event. Returns `false` if it was ignored.
    pub fn on_event(&mut self, event: ConnectionEvent) -> bool {
        if event.origin == ConnectionOrigin::Loopback && !self.count_loopback {
            return false;
        }
        match event.state {
            ConnectionState::Started => {
                self.active_clients = self.active_clients.saturating_add(1);
                self.ever_had_client = true;
            }
            ConnectionState::Stopped => {
                self.active_clients = self.active_clients.saturating_sub(1);
            }
        }
        true
    }

    /// Evaluate the idle condition at `now`.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if self.stop_requested() || !self.ever_had_client {
            return TickOutcome::Nothing;
        }

        if self.active_clients > 0 {
            return match self.phase {
                ShutdownPhase::CountdownStarted { .. } => {
                    self.phase = ShutdownPhase::Idle;
                    TickOutcome::CountdownReset
                }
                _ => TickOutcome::Nothing,
            };
        }

        match self.phase {
            ShutdownPhase::Idle => {
                self.phase = ShutdownPhase::CountdownStarted { since: now };
                TickOutcome::CountdownStarted
            }
            ShutdownPhase::CountdownStarted { since }
                if now.saturating_duration_since(since) >= self.threshold =>
            {
                self.phase = ShutdownPhase::ShutdownRequested;
                TickOutcome::TriggerShutdown
            }
            _ => TickOutcome::Nothing,
        }
    }

    /// Record that the teardown call finished, whatever its result.
    ///
    /// Only valid after [`TickOutcome::TriggerShutdown`]; returns `false`
    /// and changes nothing otherwise.
    pub fn mark_attempted(&mut self) -> bool {
        if self.phase == ShutdownPhase::ShutdownRequested {
            self.phase = ShutdownPhase::ShutdownAttempted;
            true
        } else {
            false
        }
    }
}
