//! Resolution of what a player types into the "join" box.
//!
//! The input is tried as a join code first; anything that is not a valid
//! code is treated as a direct address (`host`, `host:port`, `[v6]:port`
//! or a bare IPv6 literal).

use std::net::Ipv6Addr;

use crate::codec::join_code::{self, JoinEndpoint};
use crate::error::CodecError;

/// Where a join request should connect, and how it was derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinTarget {
    /// Recovered from a join code.
    Code(JoinEndpoint),
    /// Parsed as a direct address.
    Direct(JoinEndpoint),
}

impl JoinTarget {
    /// Parse user input, falling back to `default_port` when a direct
    /// address names no port.
    pub fn parse(input: &str, default_port: u16) -> Result<Self, CodecError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(CodecError::Empty);
        }
        if let Some(endpoint) = join_code::try_decode(input) {
            return Ok(Self::Code(endpoint));
        }
        parse_direct(input, default_port).map(Self::Direct)
    }

    pub const fn endpoint(&self) -> &JoinEndpoint {
        match self {
            Self::Code(e) | Self::Direct(e) => e,
        }
    }

    pub fn into_endpoint(self) -> JoinEndpoint {
        match self {
            Self::Code(e) | Self::Direct(e) => e,
        }
    }

    pub const fn is_code(&self) -> bool {
        matches!(self, Self::Code(_))
    }
}

fn invalid(input: &str, reason: impl Into<String>) -> CodecError {
    CodecError::InvalidAddress {
        input: input.to_string(),
        reason: reason.into(),
    }
}

fn parse_port(input: &str, port: &str) -> Result<u16, CodecError> {
    port.parse()
        .map_err(|_| invalid(input, format!("port {port:?} is not in 0-65535")))
}

fn parse_direct(input: &str, default_port: u16) -> Result<JoinEndpoint, CodecError> {
    if input.chars().any(char::is_whitespace) {
        return Err(invalid(input, "contains whitespace"));
    }

    // [v6]:port or [v6]
    if let Some(rest) = input.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| invalid(input, "unterminated '['"))?;
        host.parse::<Ipv6Addr>()
            .map_err(|_| invalid(input, "bracketed host is not an IPv6 address"))?;
        let port = match tail {
            "" => default_port,
            _ => {
                let port = tail
                    .strip_prefix(':')
                    .ok_or_else(|| invalid(input, "expected ':' after ']'"))?;
                parse_port(input, port)?
            }
        };
        return Ok(JoinEndpoint {
            host: host.to_string(),
            port,
        });
    }

    // Bare IPv6 literal without a port.
    if input.parse::<Ipv6Addr>().is_ok() {
        return Ok(JoinEndpoint {
            host: input.to_string(),
            port: default_port,
        });
    }

    let (host, port) = match input.rsplit_once(':') {
        Some((host, port)) => (host, parse_port(input, port)?),
        None => (input, default_port),
    };
    if host.is_empty() {
        return Err(invalid(input, "missing host"));
    }
    Ok(JoinEndpoint {
        host: host.to_string(),
        port,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn join_code_wins_over_direct_address() {
        let target = JoinTarget::parse("  U3gDHxFBjtU\n", 7770).unwrap();
        assert!(target.is_code());
        assert_eq!(target.endpoint().host, "a1b2c3d4e5f6.pr.edgegap.net");
        assert_eq!(target.endpoint().port, 7777);
    }

    #[test]
    fn bare_host_uses_default_port() {
        let target = JoinTarget::parse("127.0.0.1", 7770).unwrap();
        assert_eq!(
            target,
            JoinTarget::Direct(JoinEndpoint {
                host: "127.0.0.1".into(),
                port: 7770,
            })
        );
    }

    #[test]
    fn host_with_port() {
        let target = JoinTarget::parse("play.example.net:9000", 7770).unwrap();
        assert_eq!(target.endpoint().host, "play.example.net");
        assert_eq!(target.endpoint().port, 9000);
    }

    #[test]
    fn ipv6_forms() {
        let bracketed = JoinTarget::parse("[::1]:7000", 7770).unwrap();
        assert_eq!(bracketed.endpoint().host, "::1");
        assert_eq!(bracketed.endpoint().port, 7000);

        let bare = JoinTarget::parse("fe80::1", 7770).unwrap();
        assert_eq!(bare.endpoint().host, "fe80::1");
        assert_eq!(bare.endpoint().port, 7770);

        let no_port = JoinTarget::parse("[::1]", 7770).unwrap();
        assert_eq!(no_port.endpoint().port, 7770);
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(JoinTarget::parse("   ", 7770).unwrap_err(), CodecError::Empty);
        assert!(matches!(
            JoinTarget::parse("host:99999", 7770),
            Err(CodecError::InvalidAddress { .. })
        ));
        assert!(matches!(
            JoinTarget::parse(":7000", 7770),
            Err(CodecError::InvalidAddress { .. })
        ));
        assert!(matches!(
            JoinTarget::parse("[::1", 7770),
            Err(CodecError::InvalidAddress { .. })
        ));
        assert!(matches!(
            JoinTarget::parse("two words", 7770),
            Err(CodecError::InvalidAddress { .. })
        ));
    }
}
