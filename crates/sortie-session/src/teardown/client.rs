//! DELETE with authorization-scheme fallback.
//!
//! The platform's accepted `Authorization` format is not known up front, so
//! the request is tried with each scheme in turn. Only a 401 moves on to the
//! next scheme: a 401 means nothing was deleted, while any other answer is
//! final.

use std::fmt;

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use tracing::{info, warn};

use super::error::TeardownError;

/// `Authorization` header formats, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `authorization: <token>`
    Raw,
    /// `Authorization: Bearer <token>`
    Bearer,
    /// `Authorization: token <token>`
    Token,
}

impl AuthScheme {
    pub const ORDER: [Self; 3] = [Self::Raw, Self::Bearer, Self::Token];

    pub fn header_value(self, token: &str) -> Result<HeaderValue, TeardownError> {
        let text = match self {
            Self::Raw => token.to_string(),
            Self::Bearer => format!("Bearer {token}"),
            Self::Token => format!("token {token}"),
        };
        let mut value = HeaderValue::from_str(&text).map_err(|_| TeardownError::InvalidToken)?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Raw => "raw",
            Self::Bearer => "bearer",
            Self::Token => "token",
        })
    }
}

/// A successful delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub status: u16,
    pub scheme: AuthScheme,
    pub attempts: usize,
}

/// Issues authenticated DELETE requests.
#[derive(Debug, Clone)]
pub struct AuthenticatedDeleteClient {
    http: reqwest::Client,
}

impl AuthenticatedDeleteClient {
    pub const fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// DELETE `url`, trying each [`AuthScheme`] until one is not answered
    /// with 401.
    pub async fn delete(&self, url: &str, token: &str) -> Result<DeleteOutcome, TeardownError> {
        let mut last_body = String::new();

        for (idx, scheme) in AuthScheme::ORDER.into_iter().enumerate() {
            let attempts = idx + 1;
            let resp = self
                .http
                .delete(url)
                .header(AUTHORIZATION, scheme.header_value(token)?)
                .send()
                .await?;
            let status = resp.status();

            if status.is_success() {
                info!(%scheme, attempts, status = status.as_u16(), "Deployment stop accepted");
                return Ok(DeleteOutcome {
                    status: status.as_u16(),
                    scheme,
                    attempts,
                });
            }

            let body = resp.text().await.unwrap_or_default();
            if status != StatusCode::UNAUTHORIZED {
                return Err(TeardownError::Rejected {
                    status: status.as_u16(),
                    body,
                    attempts,
                });
            }
            warn!(%scheme, attempts, "Teardown got 401, trying next auth scheme");
            last_body = body;
        }

        Err(TeardownError::Rejected {
            status: StatusCode::UNAUTHORIZED.as_u16(),
            body: last_body,
            attempts: AuthScheme::ORDER.len(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn header_values_per_scheme() {
        assert_eq!(AuthScheme::Raw.header_value("abc").unwrap(), "abc");
        assert_eq!(AuthScheme::Bearer.header_value("abc").unwrap(), "Bearer abc");
        assert_eq!(AuthScheme::Token.header_value("abc").unwrap(), "token abc");
    }

    #[test]
    fn header_values_are_sensitive() {
        assert!(AuthScheme::Bearer.header_value("abc").unwrap().is_sensitive());
    }

    #[test]
    fn control_characters_are_rejected() {
        assert!(matches!(
            AuthScheme::Raw.header_value("a\r\nb"),
            Err(TeardownError::InvalidToken)
        ));
    }

    #[test]
    fn fallback_order_is_fixed() {
        assert_eq!(
            AuthScheme::ORDER,
            [AuthScheme::Raw, AuthScheme::Bearer, AuthScheme::Token]
        );
    }
}
