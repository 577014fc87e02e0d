//! Deployment teardown.
//!
//! Credentials are looked up on every call rather than at construction, so
//! values injected by the hosting platform after startup are honoured.

pub mod client;
pub mod error;

use async_trait::async_trait;
use sortie_core::config::TeardownConfig;
use sortie_core::tracing_init::mask_token;
use tracing::info;

pub use client::{AuthScheme, AuthenticatedDeleteClient, DeleteOutcome};
pub use error::TeardownError;

/// Resolved teardown target.
#[derive(Clone, PartialEq, Eq)]
pub struct TeardownCredentials {
    pub url: String,
    pub token: String,
}

impl std::fmt::Debug for TeardownCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeardownCredentials")
            .field("url", &self.url)
            .field("token", &mask_token(Some(&self.token)))
            .finish()
    }
}

/// Where the teardown URL and token come from.
pub trait CredentialSource: Send + Sync {
    fn url(&self) -> Option<String>;
    fn token(&self) -> Option<String>;

    /// Human-readable names of the two values, used in error messages.
    fn describe(&self) -> (String, String) {
        ("teardown url".into(), "teardown token".into())
    }

    /// Read both values, failing on anything missing or blank.
    fn load(&self) -> Result<TeardownCredentials, TeardownError> {
        let (url_name, token_name) = self.describe();
        let url = self
            .url()
            .filter(|v| !v.trim().is_empty())
            .ok_or(TeardownError::MissingCredentials(url_name))?;
        let token = self
            .token()
            .filter(|v| !v.trim().is_empty())
            .ok_or(TeardownError::MissingCredentials(token_name))?;
        Ok(TeardownCredentials {
            url: url.trim().to_string(),
            token: token.trim().to_string(),
        })
    }
}

/// Credentials read from environment variables.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    url_var: String,
    token_var: String,
}

impl EnvCredentials {
    pub fn new(url_var: impl Into<String>, token_var: impl Into<String>) -> Self {
        Self {
            url_var: url_var.into(),
            token_var: token_var.into(),
        }
    }
}

impl From<&TeardownConfig> for EnvCredentials {
    fn from(config: &TeardownConfig) -> Self {
        Self::new(config.url_env.clone(), config.token_env.clone())
    }
}

impl CredentialSource for EnvCredentials {
    fn url(&self) -> Option<String> {
        std::env::var(&self.url_var).ok()
    }

    fn token(&self) -> Option<String> {
        std::env::var(&self.token_var).ok()
    }

    fn describe(&self) -> (String, String) {
        (self.url_var.clone(), self.token_var.clone())
    }
}

/// Fixed credentials, for hosts that inject them directly.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    pub url: Option<String>,
    pub token: Option<String>,
}

impl CredentialSource for StaticCredentials {
    fn url(&self) -> Option<String> {
        self.url.clone()
    }

    fn token(&self) -> Option<String> {
        self.token.clone()
    }
}

/// Something that can stop the running deployment.
#[async_trait]
pub trait Teardown: Send + Sync {
    async fn stop_deployment(&self) -> Result<DeleteOutcome, TeardownError>;

    /// Log whether teardown looks configured. Never fails.
    fn log_readiness(&self) {}
}

/// Stops the deployment through [`AuthenticatedDeleteClient`].
#[derive(Debug, Clone)]
pub struct DeploymentTeardown<C> {
    client: AuthenticatedDeleteClient,
    credentials: C,
}

impl<C: CredentialSource> DeploymentTeardown<C> {
    pub const fn new(client: AuthenticatedDeleteClient, credentials: C) -> Self {
        Self {
            client,
            credentials,
        }
    }
}

#[async_trait]
impl<C: CredentialSource> Teardown for DeploymentTeardown<C> {
    async fn stop_deployment(&self) -> Result<DeleteOutcome, TeardownError> {
        let creds = self.credentials.load()?;
        self.client.delete(&creds.url, &creds.token).await
    }

    fn log_readiness(&self) {
        let (url_name, token_name) = self.credentials.describe();
        let url = self.credentials.url().filter(|v| !v.trim().is_empty());
        let token = self.credentials.token();
        info!(
            url_var = %url_name,
            url = if url.is_some() { "present" } else { "missing" },
            token_var = %token_name,
            token = %mask_token(token.as_deref()),
            "Teardown credentials check"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn creds(url: Option<&str>, token: Option<&str>) -> StaticCredentials {
        StaticCredentials {
            url: url.map(str::to_string),
            token: token.map(str::to_string),
        }
    }

    #[test]
    fn load_trims_values() {
        let loaded = creds(Some(" https://x/stop "), Some(" tok\n")).load().unwrap();
        assert_eq!(loaded.url, "https://x/stop");
        assert_eq!(loaded.token, "tok");
    }

    #[test]
    fn missing_or_blank_values_fail() {
        assert!(matches!(
            creds(None, Some("tok")).load(),
            Err(TeardownError::MissingCredentials(_))
        ));
        assert!(matches!(
            creds(Some("https://x"), Some("   ")).load(),
            Err(TeardownError::MissingCredentials(_))
        ));
    }

    #[test]
    fn env_credentials_name_their_variables() {
        let source = EnvCredentials::from(&TeardownConfig {
            url_env: "SORTIE_TEST_UNSET_URL_7F3A".into(),
            token_env: "SORTIE_TEST_UNSET_TOKEN_7F3A".into(),
        });
        match source.load() {
            Err(TeardownError::MissingCredentials(name)) => {
                assert_eq!(name, "SORTIE_TEST_UNSET_URL_7F3A");
            }
            other => panic!("expected MissingCredentials, got {other:?}"),
        }
    }

    #[test]
    fn debug_masks_token() {
        let loaded = creds(Some("https://x"), Some("0123456789")).load().unwrap();
        let rendered = format!("{loaded:?}");
        assert!(!rendered.contains("0123456789"));
        assert!(rendered.contains("012345•••"));
    }

    #[tokio::test]
    async fn missing_credentials_fail_without_network() {
        let http = crate::http::http_client_builder().no_proxy().build().unwrap();
        let teardown =
            DeploymentTeardown::new(AuthenticatedDeleteClient::new(http), creds(None, None));
        assert!(matches!(
            teardown.stop_deployment().await,
            Err(TeardownError::MissingCredentials(_))
        ));
    }
}
