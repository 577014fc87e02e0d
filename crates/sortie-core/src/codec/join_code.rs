//! Join codes: short shareable strings that locate a deployed session.
//!
//! A join code is the base58 encoding of exactly eight bytes:
//!
//! ```text
//! +-------------------------------+-----------+
//! | request id, first 6 bytes     | port (BE) |
//! +-------------------------------+-----------+
//! ```
//!
//! Decoding relies on the platform exposing every deployment at
//! `<12 hex chars of the request id>.`[`JOIN_HOST_SUFFIX`]. That hostname
//! pattern is an external contract pinned by [`JOIN_CODE_VERSION`]; if the
//! platform changes it, every previously issued code resolves to the wrong
//! host. The payload carries no checksum or version tag, so such a mismatch
//! cannot be detected from the code itself.

use std::fmt;

use crate::codec::base58;
use crate::error::CodecError;

/// DNS zone under which the platform publishes per-request hostnames.
pub const JOIN_HOST_SUFFIX: &str = "pr.edgegap.net";

/// Revision of the join code layout and hostname contract described above.
pub const JOIN_CODE_VERSION: u8 = 1;

/// Bytes of the request id carried by a join code.
pub const REQUEST_ID_PREFIX_LEN: usize = 6;

/// Total payload length of a join code before base58 encoding.
pub const PAYLOAD_LEN: usize = REQUEST_ID_PREFIX_LEN + 2;

/// A base58 join code produced by [`encode`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinCode(String);

impl JoinCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for JoinCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for JoinCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Host and port recovered from a join code or a direct address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinEndpoint {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for JoinEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Encode a hex request id and an external port into a join code.
///
/// The id may carry a `0x` prefix and may have odd length (a leading zero
/// nibble is assumed). Only its first six bytes are kept.
pub fn encode(request_id_hex: &str, port: u16) -> Result<JoinCode, CodecError> {
    let rid = parse_request_id(request_id_hex)?;
    if rid.len() < REQUEST_ID_PREFIX_LEN {
        return Err(CodecError::InvalidRequestId(request_id_hex.to_string()));
    }

    let mut payload = [0u8; PAYLOAD_LEN];
    payload[..REQUEST_ID_PREFIX_LEN].copy_from_slice(&rid[..REQUEST_ID_PREFIX_LEN]);
    payload[REQUEST_ID_PREFIX_LEN..].copy_from_slice(&port.to_be_bytes());
    Ok(JoinCode(base58::encode(&payload)))
}

/// Decode a join code, reporting why it was rejected.
pub fn decode(code: &str) -> Result<JoinEndpoint, CodecError> {
    if code.trim().is_empty() {
        return Err(CodecError::Empty);
    }
    let data = base58::decode(code)?;
    let payload: [u8; PAYLOAD_LEN] =
        data.as_slice().try_into().map_err(|_| CodecError::InvalidLength {
            expected: PAYLOAD_LEN,
            actual: data.len(),
        })?;

    let host = format!(
        "{}.{JOIN_HOST_SUFFIX}",
        hex::encode(&payload[..REQUEST_ID_PREFIX_LEN])
    );
    let port = u16::from_be_bytes([payload[6], payload[7]]);
    Ok(JoinEndpoint { host, port })
}

/// Decode a join code, returning `None` for anything that is not one.
pub fn try_decode(code: &str) -> Option<JoinEndpoint> {
    decode(code).ok()
}

fn parse_request_id(input: &str) -> Result<Vec<u8>, CodecError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CodecError::InvalidRequestId(input.to_string()));
    }
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let decoded = if digits.len() % 2 == 1 {
        hex::decode(format!("0{digits}"))
    } else {
        hex::decode(digits)
    };
    decoded.map_err(|e| CodecError::InvalidHex(format!("{input:?}: {e}")))
}
