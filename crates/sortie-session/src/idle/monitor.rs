//! Async driver for [`IdleState`].

use std::sync::Arc;
use std::time::Duration;

use sortie_core::config::IdleConfig;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::state::{ConnectionEvent, IdleState, TickOutcome};
use crate::teardown::{DeleteOutcome, Teardown, TeardownError};

type TeardownResult = Result<DeleteOutcome, TeardownError>;

const MIN_TICK: Duration = Duration::from_millis(1);

/// How a monitor run ended.
#[derive(Debug)]
pub enum IdleOutcome {
    /// Cancelled before any teardown completed.
    Cancelled,
    /// Teardown ran once; this is its result.
    TeardownAttempted(TeardownResult),
}

/// Watches connection events and stops the deployment once nobody has been
/// connected for the idle threshold.
pub struct IdleShutdownMonitor<T> {
    state: IdleState,
    tick: Duration,
    teardown: Arc<T>,
}

impl<T: Teardown + 'static> IdleShutdownMonitor<T> {
    /// Build a monitor from config, rejecting an unusable idle window.
    pub fn new(config: &IdleConfig, teardown: Arc<T>) -> sortie_core::Result<Self> {
        Ok(Self::with_timing(
            config.idle_threshold()?,
            config.tick_interval(),
            config.count_loopback,
            teardown,
        ))
    }

    pub fn with_timing(
        threshold: Duration,
        tick: Duration,
        count_loopback: bool,
        teardown: Arc<T>,
    ) -> Self {
        Self {
            state: IdleState::new(threshold, count_loopback),
            tick: tick.max(MIN_TICK),
            teardown,
        }
    }

    pub const fn state(&self) -> &IdleState {
        &self.state
    }

    pub fn spawn(
        self,
        events: mpsc::Receiver<ConnectionEvent>,
        cancel: CancellationToken,
    ) -> JoinHandle<IdleOutcome> {
        tokio::spawn(self.run(events, cancel))
    }

    /// Start the teardown on its own task; its result comes back on the
    /// returned channel.
    fn start_teardown(&self) -> oneshot::Receiver<TeardownResult> {
        let (tx, rx) = oneshot::channel();
        let teardown = Arc::clone(&self.teardown);
        tokio::spawn(async move {
            let result = teardown.stop_deployment().await;
            if tx.send(result).is_err() {
                debug!("Idle monitor gone before teardown finished");
            }
        });
        rx
    }

    /// Run until teardown has been attempted or `cancel` fires.
    ///
    /// Events keep being consumed while the teardown request is in flight.
    /// A closed event channel is treated as "no further changes": the
    /// last known occupancy still counts down. Cancelling after teardown
    /// has started does not abort the request; it finishes on its own task.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<ConnectionEvent>,
        cancel: CancellationToken,
    ) -> IdleOutcome {
        let threshold_secs = self.state.threshold().as_secs_f64();
        self.teardown.log_readiness();
        info!(
            threshold_secs,
            tick_ms = u64::try_from(self.tick.as_millis()).unwrap_or(u64::MAX),
            "Idle shutdown monitor started"
        );

        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut events_open = true;
        let mut in_flight: Option<oneshot::Receiver<TeardownResult>> = None;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    if in_flight.is_some() {
                        info!("Idle monitor cancelled, teardown continues in background");
                    } else {
                        debug!("Idle monitor cancelled");
                    }
                    return IdleOutcome::Cancelled;
                }
                received = async {
                    match in_flight.as_mut() {
                        Some(rx) => rx.await,
                        None => std::future::pending().await,
                    }
                }, if in_flight.is_some() => {
                    self.state.mark_attempted();
                    let result = received.unwrap_or(Err(TeardownError::Aborted));
                    match &result {
                        Ok(outcome) => info!(
                            status = outcome.status,
                            scheme = %outcome.scheme,
                            attempts = outcome.attempts,
                            "Idle teardown succeeded"
                        ),
                        Err(e) => error!(error = %e, kind = %e.kind(), "Idle teardown failed"),
                    }
                    return IdleOutcome::TeardownAttempted(result);
                }
                maybe = events.recv(), if events_open => match maybe {
                    Some(event) => {
                        if self.state.on_event(event) {
                            debug!(
                                ?event,
                                active = self.state.active_clients(),
                                "Connection event"
                            );
                        }
                    }
                    None => {
                        debug!("Connection event channel closed");
                        events_open = false;
                    }
                },
                now = ticker.tick() => match self.state.tick(now) {
                    TickOutcome::Nothing => {}
                    TickOutcome::CountdownStarted => {
                        info!(threshold_secs, "Session empty, idle countdown started");
                    }
                    TickOutcome::CountdownReset => debug!("Client returned, idle countdown reset"),
                    TickOutcome::TriggerShutdown => {
                        info!(idle_secs = threshold_secs, "Session idle, stopping deployment");
                        in_flight = Some(self.start_teardown());
                    }
                },
            }
        }
    }
}
