//! Subcommand handlers for the `sortie-session` binary.

use std::sync::Arc;

use anyhow::{Context, Result};
use sortie_core::config::Config;
use sortie_core::{JoinTarget, codec::join_code};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::{DeployApiClient, HttpPublicIpLookup};
use crate::http::build_http_client;
use crate::idle::{ConnectionEvent, IdleOutcome, IdleShutdownMonitor};
use crate::orchestrator::{DeploymentOrchestrator, OrchestratorConfig};
use crate::teardown::{AuthenticatedDeleteClient, DeploymentTeardown, EnvCredentials, Teardown};

const EVENT_BUFFER: usize = 64;

/// Create a deployment, wait for it, and print where to connect.
#[allow(clippy::print_stdout)]
pub async fn deploy(config: &Config, cancel: &CancellationToken) -> Result<()> {
    let http = build_http_client().context("Failed to build HTTP client")?;
    let api = DeployApiClient::new(
        http.clone(),
        &config.deploy.api_base_url,
        config.deploy.api_token.as_deref(),
    )?;
    let ip_lookup = HttpPublicIpLookup::new(http, config.deploy.public_ip_endpoints.clone());
    let orchestrator =
        DeploymentOrchestrator::new(api, ip_lookup, OrchestratorConfig::from(&config.deploy));

    let mut phases = orchestrator.subscribe();
    let progress = tokio::spawn(async move {
        while phases.changed().await.is_ok() {
            let phase = *phases.borrow_and_update();
            info!(%phase, "Deployment status");
            if phase.is_terminal() {
                break;
            }
        }
    });

    let result = orchestrator.create_and_wait(cancel).await;
    progress.abort();
    let deployed = result.map_err(|e| {
        let hint = e.kind().hint();
        anyhow::Error::new(e).context(hint)
    })?;

    println!("request_id: {}", deployed.request_id);
    println!("address:    {}", deployed.endpoint());
    println!("join code:  {}", deployed.join_code);
    Ok(())
}

/// Decode a join code or parse a direct address.
#[allow(clippy::print_stdout)]
pub fn resolve(config: &Config, input: &str) -> Result<()> {
    let target = JoinTarget::parse(input, config.join.default_port)?;
    let source = if target.is_code() {
        "join code"
    } else {
        "direct address"
    };
    println!("{} ({source})", target.endpoint());
    Ok(())
}

/// Produce a join code for a request id and port.
#[allow(clippy::print_stdout)]
pub fn encode(request_id: &str, port: u16) -> Result<()> {
    let code = join_code::encode(request_id, port)?;
    println!("{code}");
    Ok(())
}

fn env_teardown(config: &Config) -> Result<DeploymentTeardown<EnvCredentials>> {
    let http = build_http_client().context("Failed to build HTTP client")?;
    Ok(DeploymentTeardown::new(
        AuthenticatedDeleteClient::new(http),
        EnvCredentials::from(&config.teardown),
    ))
}

/// Stop the deployment right now.
#[allow(clippy::print_stdout)]
pub async fn teardown(config: &Config) -> Result<()> {
    let teardown = env_teardown(config)?;
    teardown.log_readiness();
    let outcome = teardown.stop_deployment().await?;
    println!(
        "stopped (HTTP {}, {} auth, {} attempt(s))",
        outcome.status, outcome.scheme, outcome.attempts
    );
    Ok(())
}

/// Run the idle monitor over connection events read from stdin.
pub async fn monitor(config: &Config, cancel: CancellationToken) -> Result<()> {
    let teardown = Arc::new(env_teardown(config)?);
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let handle = IdleShutdownMonitor::new(&config.idle, teardown)?.spawn(rx, cancel.clone());

    let reader = tokio::io::BufReader::new(tokio::io::stdin());
    let pump = tokio::spawn(pump_events(reader, tx));

    let outcome = handle.await.context("Idle monitor task failed")?;
    pump.abort();
    match outcome {
        IdleOutcome::Cancelled => {
            info!("Idle monitor stopped");
            Ok(())
        }
        IdleOutcome::TeardownAttempted(Ok(_)) => Ok(()),
        IdleOutcome::TeardownAttempted(Err(e)) => Err(e.into()),
    }
}

/// Forward one [`ConnectionEvent`] per input line until EOF or the receiver
/// goes away. Blank lines are skipped; unparsable ones are logged.
pub async fn pump_events<R>(reader: R, tx: mpsc::Sender<ConnectionEvent>) -> usize
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut forwarded = 0;
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed to read connection events");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<ConnectionEvent>() {
            Ok(event) => {
                if tx.send(event).await.is_err() {
                    break;
                }
                forwarded += 1;
            }
            Err(reason) => warn!(line = %line.trim(), %reason, "Ignoring connection event"),
        }
    }
    forwarded
}
