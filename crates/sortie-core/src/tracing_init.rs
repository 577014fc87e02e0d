//! Shared tracing/logging initialization.
//!
//! The session binary and any embedding game host use the same pattern for
//! setting up `tracing_subscriber` with an env-filter and optional JSON
//! output.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialise the global tracing subscriber.
///
/// * `default_filter` -- default `RUST_LOG` value when the env-var is not set
///   (e.g. `"sortie_session=info"`).
/// * `log_json` -- when `true`, emit structured JSON log lines instead of the
///   human-readable format.
///
/// Logs go to stderr so stdout stays free for command output such as join
/// codes.
pub fn init_tracing(default_filter: &str, log_json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
    );
    if log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Render a secret for logs: at most its first six characters, then `•••`.
///
/// Secrets of six characters or fewer are shown whole.
pub fn mask_token(token: Option<&str>) -> String {
    match token {
        None | Some("") => "null".to_string(),
        Some(t) if t.chars().count() <= 6 => t.to_string(),
        Some(t) => {
            let prefix: String = t.chars().take(6).collect();
            format!("{prefix}•••")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_token_variants() {
        assert_eq!(mask_token(None), "null");
        assert_eq!(mask_token(Some("")), "null");
        assert_eq!(mask_token(Some("abc")), "abc");
        assert_eq!(mask_token(Some("abcdefghij")), "abcdef•••");
    }
}
