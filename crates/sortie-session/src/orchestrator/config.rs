//! Orchestrator configuration.

use std::time::Duration;

use sortie_core::config::{DeployConfig, PlacementStrategy};

use super::error::DeployError;

/// Settings for one create-and-wait run.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub app_name: String,
    pub version_name: String,
    pub preferred_port_name: String,
    pub placement: PlacementStrategy,
    /// Delay before each status poll.
    pub poll_interval: Duration,
    /// Wall-clock budget for the whole polling phase.
    pub max_poll: Duration,
}

impl OrchestratorConfig {
    /// Create a config with required fields and defaults.
    pub fn new(app_name: impl Into<String>, version_name: impl Into<String>) -> Self {
        let defaults = DeployConfig::default();
        Self {
            app_name: app_name.into(),
            version_name: version_name.into(),
            preferred_port_name: defaults.preferred_port_name.clone(),
            placement: defaults.placement,
            poll_interval: defaults.poll_interval(),
            max_poll: defaults.max_poll(),
        }
    }

    /// Check everything that can be checked without touching the network.
    pub fn validate(&self) -> Result<(), DeployError> {
        if self.app_name.trim().is_empty() {
            return Err(DeployError::InvalidConfiguration(
                "application name is empty".into(),
            ));
        }
        if self.version_name.trim().is_empty() {
            return Err(DeployError::InvalidConfiguration(
                "version name is empty".into(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(DeployError::InvalidConfiguration(
                "poll interval must be greater than zero".into(),
            ));
        }
        if self.placement == PlacementStrategy::None {
            return Err(DeployError::NoPlacementStrategy);
        }
        Ok(())
    }
}

impl From<&DeployConfig> for OrchestratorConfig {
    fn from(config: &DeployConfig) -> Self {
        Self {
            app_name: config.app_name.clone(),
            version_name: config.version_name.clone(),
            preferred_port_name: config.preferred_port_name.clone(),
            placement: config.placement,
            poll_interval: config.poll_interval(),
            max_poll: config.max_poll(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_platform_defaults() {
        let config = OrchestratorConfig::new("skyfight", "v3");
        assert_eq!(config.preferred_port_name, "gameport");
        assert_eq!(config.poll_interval, Duration::from_millis(750));
        assert_eq!(config.max_poll, Duration::from_secs(90));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn blank_names_are_invalid() {
        let config = OrchestratorConfig::new(" ", "v3");
        assert!(matches!(
            config.validate(),
            Err(DeployError::InvalidConfiguration(_))
        ));
        let config = OrchestratorConfig::new("skyfight", "");
        assert!(matches!(
            config.validate(),
            Err(DeployError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn missing_placement_is_reported() {
        let mut config = OrchestratorConfig::new("skyfight", "v3");
        config.placement = PlacementStrategy::None;
        assert!(matches!(
            config.validate(),
            Err(DeployError::NoPlacementStrategy)
        ));
    }

    #[test]
    fn from_deploy_config() {
        let deploy = DeployConfig {
            app_name: "skyfight".into(),
            version_name: "v9".into(),
            poll_interval_ms: 100,
            max_poll_secs: 5,
            ..DeployConfig::default()
        };
        let config = OrchestratorConfig::from(&deploy);
        assert_eq!(config.version_name, "v9");
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.max_poll, Duration::from_secs(5));
    }
}
