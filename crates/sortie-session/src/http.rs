//! Shared HTTP client construction.

use std::time::Duration;

/// Upper bound on any single request, connect through body.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(100);

/// Client builder with TLS, user agent and [`REQUEST_TIMEOUT`] set.
///
/// Every client in this crate must start here: reqwest is built with
/// `rustls-no-provider`, and building a client before a crypto provider is
/// installed panics.
pub fn http_client_builder() -> reqwest::ClientBuilder {
    // The `Err` case just means a provider was already installed.
    let _ = rustls::crypto::ring::default_provider().install_default();

    reqwest::Client::builder()
        .user_agent(concat!("sortie-session/", env!("CARGO_PKG_VERSION")))
        .timeout(REQUEST_TIMEOUT)
}

/// Build the `reqwest` client shared by the deployment API, public IP
/// lookup and teardown calls.
pub fn build_http_client() -> Result<reqwest::Client, reqwest::Error> {
    http_client_builder().build()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn builder_installs_crypto_provider() {
        http_client_builder().no_proxy().build().unwrap();
        assert!(rustls::crypto::CryptoProvider::get_default().is_some());
    }

    #[test]
    fn shared_client_builds() {
        build_http_client().unwrap();
    }
}
