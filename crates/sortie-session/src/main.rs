//! `Sortie` session tool
//!
//! Deploys a session server on demand, converts between join codes and
//! addresses, and stops idle deployments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

use sortie_core::config::{Config, load_config};
use sortie_session::cmd;

#[derive(Parser, Debug)]
#[command(name = "sortie-session")]
#[command(version, about = "On-demand game session lifecycle")]
struct Cli {
    /// Extra JSON settings file, applied over the global one
    #[arg(long, global = true, env = "SORTIE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level filter (e.g. "info", "debug", "warn")
    #[arg(long, global = true, default_value = "info", env = "SORTIE_LOG_LEVEL")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true, env = "SORTIE_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a deployment and wait until it can be joined.
    Deploy {
        /// Application name override
        #[arg(long)]
        app: Option<String>,

        /// Application version override
        #[arg(long)]
        app_version: Option<String>,

        /// Seconds to wait for the deployment to become ready
        #[arg(long)]
        max_poll_secs: Option<u64>,
    },

    /// Resolve a join code or `host[:port]` to an address.
    Resolve {
        input: String,
    },

    /// Build a join code from a deployment request id and port.
    Encode {
        request_id: String,
        port: u16,
    },

    /// Stop the current deployment using the teardown credentials.
    Teardown,

    /// Watch connection events on stdin and stop the deployment when idle.
    ///
    /// One event per line: `started` or `stopped`, optionally followed by
    /// `loopback` for the host's own client.
    Monitor {
        /// Idle seconds before teardown
        #[arg(long)]
        idle_secs: Option<f64>,

        /// Count loopback connections as occupancy
        #[arg(long)]
        count_loopback: bool,
    },
}

fn apply_cli_overrides(config: &mut Config, command: &Command) {
    match command {
        Command::Deploy {
            app,
            app_version,
            max_poll_secs,
        } => {
            if let Some(app) = app {
                config.deploy.app_name.clone_from(app);
            }
            if let Some(version) = app_version {
                config.deploy.version_name.clone_from(version);
            }
            if let Some(secs) = max_poll_secs {
                config.deploy.max_poll_secs = *secs;
            }
        }
        Command::Monitor {
            idle_secs,
            count_loopback,
        } => {
            if let Some(secs) = idle_secs {
                config.idle.idle_secs = *secs;
            }
            if *count_loopback {
                config.idle.count_loopback = true;
            }
        }
        Command::Resolve { .. } | Command::Encode { .. } | Command::Teardown => {}
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("sortie_session={0},sortie_core={0}", cli.log_level);
    sortie_core::tracing_init::init_tracing(&log_filter, cli.log_json);

    let mut config = load_config(cli.config.as_deref())?;
    apply_cli_overrides(&mut config, &cli.command);
    config.validate()?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, cancelling");
            ctrl_c.cancel();
        }
    });

    match cli.command {
        Command::Deploy { .. } => cmd::deploy(&config, &cancel).await,
        Command::Resolve { input } => cmd::resolve(&config, &input),
        Command::Encode { request_id, port } => cmd::encode(&request_id, port),
        Command::Teardown => cmd::teardown(&config).await,
        Command::Monitor { .. } => cmd::monitor(&config, cancel).await,
    }
}
