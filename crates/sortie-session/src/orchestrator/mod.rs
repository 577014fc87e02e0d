//! On-demand deployment orchestration.
//!
//! Creates a deployment, polls it until it is routable, and turns the
//! result into a join code:
//!
//! ```text
//! Idle -> Creating -> Polling -> Ready
//!                             -> Error
//!                             -> TimedOut
//! ```
//!
//! Nothing is retried internally. A failed create may still have allocated
//! a paid server, so retrying is left to the caller.

pub mod config;
pub mod error;
pub mod ports;

use std::fmt;

use sortie_core::JoinEndpoint;
use sortie_core::codec::join_code::{self, JoinCode};
use sortie_core::config::PlacementStrategy;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{CreateDeploymentRequest, DeploymentApi, DeploymentUser, PublicIpLookup};

pub use config::OrchestratorConfig;
pub use error::DeployError;
pub use ports::select_external_port;

/// Progress of a create-and-wait run, published for status displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployPhase {
    Idle,
    Creating,
    Polling,
    Ready,
    Error,
    TimedOut,
    Cancelled,
}

impl DeployPhase {
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Ready | Self::Error | Self::TimedOut | Self::Cancelled
        )
    }
}

impl fmt::Display for DeployPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Idle => "Idle",
            Self::Creating => "Creating deployment...",
            Self::Polling => "Waiting for server...",
            Self::Ready => "Server ready",
            Self::Error => "Deployment failed",
            Self::TimedOut => "Server did not become ready in time",
            Self::Cancelled => "Deployment cancelled",
        };
        f.write_str(text)
    }
}

/// A routable deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployResult {
    pub request_id: String,
    pub fqdn: String,
    pub external_port: u16,
    pub join_code: JoinCode,
}

impl DeployResult {
    /// Address to hand straight to the transport layer.
    pub fn endpoint(&self) -> JoinEndpoint {
        JoinEndpoint {
            host: self.fqdn.clone(),
            port: self.external_port,
        }
    }
}

/// Drives one deployment from creation to a routable address.
pub struct DeploymentOrchestrator<A, P> {
    api: A,
    ip_lookup: P,
    config: OrchestratorConfig,
    phase: watch::Sender<DeployPhase>,
}

impl<A, P> DeploymentOrchestrator<A, P>
where
    A: DeploymentApi,
    P: PublicIpLookup,
{
    pub fn new(api: A, ip_lookup: P, config: OrchestratorConfig) -> Self {
        let (phase, _) = watch::channel(DeployPhase::Idle);
        Self {
            api,
            ip_lookup,
            config,
            phase,
        }
    }

    /// Watch phase transitions, e.g. to drive a status label.
    pub fn subscribe(&self) -> watch::Receiver<DeployPhase> {
        self.phase.subscribe()
    }

    pub fn phase(&self) -> DeployPhase {
        *self.phase.borrow()
    }

    pub const fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub const fn api(&self) -> &A {
        &self.api
    }

    pub const fn ip_lookup(&self) -> &P {
        &self.ip_lookup
    }

    fn set_phase(&self, phase: DeployPhase) {
        self.phase.send_replace(phase);
    }

    /// Create a deployment and wait until it is routable.
    ///
    /// The caller stays suspended for the whole create + poll sequence.
    /// Cancelling `cancel` aborts whichever step is in flight.
    pub async fn create_and_wait(
        &self,
        cancel: &CancellationToken,
    ) -> Result<DeployResult, DeployError> {
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(DeployError::Cancelled),
            res = self.run() => res,
        };

        let phase = match &result {
            Ok(_) => DeployPhase::Ready,
            Err(DeployError::PollTimeout { .. }) => DeployPhase::TimedOut,
            Err(DeployError::Cancelled) => DeployPhase::Cancelled,
            Err(_) => DeployPhase::Error,
        };
        self.set_phase(phase);

        match &result {
            Ok(r) => info!(
                request_id = %r.request_id,
                fqdn = %r.fqdn,
                port = r.external_port,
                join_code = %r.join_code,
                "Deployment ready"
            ),
            Err(e) => warn!(error = %e, kind = %e.kind(), "Deployment failed"),
        }
        result
    }

    async fn run(&self) -> Result<DeployResult, DeployError> {
        self.config.validate()?;

        self.set_phase(DeployPhase::Creating);
        let users = self.placement_users().await?;
        let request = CreateDeploymentRequest {
            application: self.config.app_name.clone(),
            version: self.config.version_name.clone(),
            users,
        };
        info!(
            app = %request.application,
            version = %request.version,
            "Creating deployment"
        );
        let request_id = self
            .api
            .create_deployment(&request)
            .await
            .map_err(DeployError::from_create)?;
        info!(request_id = %request_id, "Deployment requested");

        self.set_phase(DeployPhase::Polling);
        let budget = self.config.max_poll;
        tokio::time::timeout(budget, self.poll_until_ready(&request_id))
            .await
            .unwrap_or_else(|_| {
                Err(DeployError::PollTimeout {
                    request_id: request_id.clone(),
                    budget,
                })
            })
    }

    async fn placement_users(&self) -> Result<Vec<DeploymentUser>, DeployError> {
        match self.config.placement {
            PlacementStrategy::HostPublicIp => {
                let ip = self
                    .ip_lookup
                    .public_ip()
                    .await
                    .filter(|ip| !ip.trim().is_empty())
                    .ok_or(DeployError::PublicIpUnavailable)?;
                debug!(ip = %ip, "Placing deployment near host");
                Ok(vec![DeploymentUser::ip_address(ip)])
            }
            PlacementStrategy::None => Err(DeployError::NoPlacementStrategy),
        }
    }

    /// Poll until ready or failed. The caller bounds this with the budget.
    async fn poll_until_ready(&self, request_id: &str) -> Result<DeployResult, DeployError> {
        let mut polls: u32 = 0;
        loop {
            tokio::time::sleep(self.config.poll_interval).await;
            polls = polls.saturating_add(1);

            let status = self
                .api
                .deployment_status(request_id)
                .await
                .map_err(DeployError::from_status)?;

            if status.is_ready() {
                let fqdn = status.fqdn.unwrap_or_default().trim().to_string();
                let ports = status.ports.unwrap_or_default();
                let external_port =
                    select_external_port(&ports, &self.config.preferred_port_name).ok_or_else(
                        || DeployError::NoExternalPort {
                            request_id: request_id.to_string(),
                        },
                    )?;
                let join_code = join_code::encode(request_id, external_port)?;
                return Ok(DeployResult {
                    request_id: request_id.to_string(),
                    fqdn,
                    external_port,
                    join_code,
                });
            }

            if status.error {
                return Err(DeployError::DeploymentError {
                    request_id: request_id.to_string(),
                });
            }

            debug!(
                request_id,
                polls,
                running = status.running,
                current_status = status.current_status.as_deref().unwrap_or(""),
                "Deployment not ready yet"
            );
        }
    }
}
