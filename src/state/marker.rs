//! State marker encoding.
//!
//! A rendered config carries one comment line of the form
//!
//! ```text
//! # proxy-reconciler-state v1 {"name":"web","is_tls":false,"host_port":8080,"remote_address":"10.0.0.5","remote_port":80}
//! ```
//!
//! which is enough to rebuild the exact [`ProxyDefinition`] that produced the
//! file. The version token lets the payload evolve without guessing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::proxy::{ProxyDefinition, ProxyFields, SiteLayout, ValidationError};

/// Literal every marker line starts with.
pub const MARKER_TOKEN: &str = "# proxy-reconciler-state";

/// Payload version written by this build.
pub const MARKER_VERSION: &str = "v1";

/// Why a marker line could not be turned back into a definition.
#[derive(Debug, Error)]
pub enum MarkerError {
    #[error("line does not start with the marker token")]
    NotAMarker,

    #[error("marker line is not valid UTF-8")]
    NotUtf8,

    #[error("marker has no version or payload")]
    Truncated,

    #[error("unsupported marker version '{0}'")]
    UnsupportedVersion(String),

    #[error("malformed marker payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("marker describes an invalid proxy: {0}")]
    Invalid(#[from] ValidationError),

    #[error("marker names proxy '{found}' but the file belongs to '{expected}'")]
    NameMismatch { expected: String, found: String },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct MarkerPayload {
    name: String,
    is_tls: bool,
    host_port: i64,
    remote_address: String,
    remote_port: i64,
}

impl From<ProxyFields> for MarkerPayload {
    fn from(fields: ProxyFields) -> Self {
        Self {
            name: fields.name,
            is_tls: fields.is_tls,
            host_port: fields.host_port,
            remote_address: fields.remote_address,
            remote_port: fields.remote_port,
        }
    }
}

impl From<MarkerPayload> for ProxyFields {
    fn from(payload: MarkerPayload) -> Self {
        Self {
            name: payload.name,
            is_tls: payload.is_tls,
            host_port: payload.host_port,
            remote_address: payload.remote_address,
            remote_port: payload.remote_port,
        }
    }
}

/// Render the marker line for `def` (no trailing newline).
pub fn encode(def: &ProxyDefinition) -> String {
    let payload = MarkerPayload::from(def.fields());
    // A struct of strings, integers and a bool always serializes.
    let json = serde_json::to_string(&payload).unwrap_or_default();
    format!("{} {} {}", MARKER_TOKEN, MARKER_VERSION, json)
}

/// Rebuild a definition from a marker line, placing it according to `layout`.
pub fn decode(line: &str, layout: &SiteLayout) -> Result<ProxyDefinition, MarkerError> {
    let rest = line
        .strip_prefix(MARKER_TOKEN)
        .ok_or(MarkerError::NotAMarker)?
        .trim();
    let (version, json) = rest.split_once(char::is_whitespace).ok_or(MarkerError::Truncated)?;
    if version != MARKER_VERSION {
        return Err(MarkerError::UnsupportedVersion(version.to_string()));
    }

    let payload: MarkerPayload = serde_json::from_str(json.trim())?;
    Ok(ProxyDefinition::new(layout, payload.into())?)
}
