//! Configuration resolution for Sortie.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (`<config dir>/sortie/settings.json`)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables (`SORTIE_*`)
//! 5. CLI arguments (highest priority, applied by the binary)
//!
//! Teardown credentials are not part of this tree, only the names of the
//! environment variables that carry them. The values are read when a
//! teardown runs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result};

/// Complete Sortie configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub deploy: DeployConfig,
    #[serde(default)]
    pub idle: IdleConfig,
    #[serde(default)]
    pub teardown: TeardownConfig,
    #[serde(default)]
    pub join: JoinConfig,
}

/// How the deployment site is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementStrategy {
    /// Place the deployment near this machine's public IP.
    HostPublicIp,
    /// No strategy configured; deployment creation is refused.
    None,
}

/// Deployment API settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    pub api_base_url: String,
    /// API token sent as `Authorization: token <api_token>`.
    pub api_token: Option<String>,
    pub app_name: String,
    pub version_name: String,
    pub preferred_port_name: String,
    pub poll_interval_ms: u64,
    pub max_poll_secs: u64,
    pub placement: PlacementStrategy,
    /// Services queried in order for this machine's public IP.
    pub public_ip_endpoints: Vec<String>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.edgegap.com".to_string(),
            api_token: None,
            app_name: String::new(),
            version_name: String::new(),
            preferred_port_name: "gameport".to_string(),
            poll_interval_ms: 750,
            max_poll_secs: 90,
            placement: PlacementStrategy::HostPublicIp,
            public_ip_endpoints: vec![
                "https://api.ipify.org".to_string(),
                "https://checkip.amazonaws.com".to_string(),
            ],
        }
    }
}

// Hand-written so the API token never ends up in logs.
impl std::fmt::Debug for DeployConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeployConfig")
            .field("api_base_url", &self.api_base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("app_name", &self.app_name)
            .field("version_name", &self.version_name)
            .field("preferred_port_name", &self.preferred_port_name)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("max_poll_secs", &self.max_poll_secs)
            .field("placement", &self.placement)
            .field("public_ip_endpoints", &self.public_ip_endpoints)
            .finish()
    }
}

impl Config {
    /// Check values that parse but cannot be used.
    pub fn validate(&self) -> Result<()> {
        self.idle.idle_threshold()?;
        Ok(())
    }
}

impl DeployConfig {
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub const fn max_poll(&self) -> Duration {
        Duration::from_secs(self.max_poll_secs)
    }
}

/// Idle shutdown settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleConfig {
    /// Seconds with zero remote clients before the deployment is stopped.
    pub idle_secs: f64,
    /// How often the idle condition is evaluated.
    pub tick_ms: u64,
    /// Count loopback (host-local) connections as occupancy.
    pub count_loopback: bool,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            idle_secs: 30.0,
            tick_ms: 250,
            count_loopback: false,
        }
    }
}

impl IdleConfig {
    /// The idle window. Negative, NaN and infinite values are an error,
    /// never clamped.
    pub fn idle_threshold(&self) -> Result<Duration> {
        if !self.idle_secs.is_finite() || self.idle_secs < 0.0 {
            return Err(Error::Config(format!(
                "idle_secs must be a finite, non-negative number of seconds, got {}",
                self.idle_secs
            )));
        }
        Duration::try_from_secs_f64(self.idle_secs)
            .map_err(|e| Error::Config(format!("idle_secs {}: {e}", self.idle_secs)))
    }

    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

/// Names of the environment variables that carry teardown credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TeardownConfig {
    pub url_env: String,
    pub token_env: String,
}

impl Default for TeardownConfig {
    fn default() -> Self {
        Self {
            url_env: "ARBITRIUM_DELETE_URL".to_string(),
            token_env: "ARBITRIUM_DELETE_TOKEN".to_string(),
        }
    }
}

/// Join-side settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinConfig {
    /// Port used when a direct address names none.
    pub default_port: u16,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self { default_port: 7770 }
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            config = load_config_file(&global_path)?;
            debug!(path = %global_path.display(), "Loaded global config");
        }
    }

    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file {} does not exist",
                path.display()
            )));
        }
        merge_config(&mut config, load_config_file(path)?);
        debug!(path = %path.display(), "Loaded config file");
    }

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config.validate()?;

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("sortie").join("settings.json"))
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_config(base: &mut Config, overlay: Config) {
    // The API token is the only optional field; keep an earlier one if the
    // overlay does not carry its own.
    let api_token = overlay.deploy.api_token.or_else(|| base.deploy.api_token.take());
    base.deploy = DeployConfig {
        api_token,
        ..overlay.deploy
    };
    base.idle = overlay.idle;
    base.teardown = overlay.teardown;
    base.join = overlay.join;
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(val) = var("SORTIE_API_URL") {
        config.deploy.api_base_url = val;
    }
    if let Some(val) = var("SORTIE_API_TOKEN") {
        config.deploy.api_token = Some(val);
    }
    if let Some(val) = var("SORTIE_APP_NAME") {
        config.deploy.app_name = val;
    }
    if let Some(val) = var("SORTIE_APP_VERSION") {
        config.deploy.version_name = val;
    }
    if let Some(val) = var("SORTIE_PREFERRED_PORT") {
        config.deploy.preferred_port_name = val;
    }
    if let Some(n) = var("SORTIE_POLL_INTERVAL_MS").and_then(|v| v.parse().ok()) {
        config.deploy.poll_interval_ms = n;
    }
    if let Some(n) = var("SORTIE_MAX_POLL_SECS").and_then(|v| v.parse().ok()) {
        config.deploy.max_poll_secs = n;
    }
    if let Some(n) = var("SORTIE_IDLE_SECS").and_then(|v| v.parse().ok()) {
        config.idle.idle_secs = n;
    }
    if let Some(n) = var("SORTIE_DEFAULT_PORT").and_then(|v| v.parse().ok()) {
        config.join.default_port = n;
    }
}
