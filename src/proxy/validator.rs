//! Desired-state validation.
//!
//! # Responsibilities
//! - Turn raw declarations into [`ProxyDefinition`]s
//! - Expand the deprecated flat `port:ip:port` lists
//! - Refuse the whole batch on the first invalid entry
//!
//! # Design Decisions
//! - Fail closed: no partial desired set is ever produced
//! - Structured input wins outright over the deprecated lists when present
//! - Flat entries that are not exactly three non-empty segments are dropped
//!   silently; entries that do parse are validated like any other

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::proxy::definition::{
    FieldIssue, ProxyDefinition, ProxyFields, SiteLayout, ValidationError,
};
use crate::proxy::set::ProxySet;

/// A port number as written in configuration: either a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawNumber {
    Int(i64),
    Text(String),
}

impl RawNumber {
    fn to_i64(&self, field: &'static str) -> Result<i64, FieldIssue> {
        match self {
            RawNumber::Int(value) => Ok(*value),
            RawNumber::Text(text) => text.trim().parse().map_err(|_| FieldIssue::NotAnInteger {
                field,
                value: text.clone(),
            }),
        }
    }
}

impl From<i64> for RawNumber {
    fn from(value: i64) -> Self {
        RawNumber::Int(value)
    }
}

/// One proxy declaration, as read from configuration.
///
/// Every field is optional here so that a missing field surfaces as a
/// validation issue rather than a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawProxy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, rename = "https", alias = "is_tls", skip_serializing_if = "Option::is_none")]
    pub is_tls: Option<bool>,

    #[serde(
        default,
        rename = "host-port",
        alias = "host_port",
        skip_serializing_if = "Option::is_none"
    )]
    pub host_port: Option<RawNumber>,

    #[serde(
        default,
        rename = "remote-ip",
        alias = "remote_ip",
        skip_serializing_if = "Option::is_none"
    )]
    pub remote_ip: Option<String>,

    #[serde(
        default,
        rename = "remote-port",
        alias = "remote_port",
        skip_serializing_if = "Option::is_none"
    )]
    pub remote_port: Option<RawNumber>,
}

impl fmt::Display for RawProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{:?}", self),
        }
    }
}

/// Everything the configuration says about which proxies should exist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredProxies {
    /// Structured `[[proxies]]` list. `Some` (even empty) disables the flat lists.
    pub structured: Option<Vec<RawProxy>>,
    /// Deprecated comma-separated plain-HTTP list.
    pub flat_plain: String,
    /// Deprecated comma-separated TLS list.
    pub flat_tls: String,
}

/// The declaration that stopped validation, with its problems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidDeclaration {
    /// Position in the (expanded) declaration list.
    pub index: usize,
    /// Rendering of the offending entry.
    pub entry: String,
    pub error: ValidationError,
}

impl fmt::Display for InvalidDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proxy #{} {}: {}", self.index, self.entry, self.error)
    }
}

impl std::error::Error for InvalidDeclaration {}

/// Builds the desired set for a given layout.
#[derive(Debug, Clone)]
pub struct Validator {
    layout: SiteLayout,
}

impl Validator {
    pub fn new(layout: SiteLayout) -> Self {
        Self { layout }
    }

    /// Validate every declaration, stopping at the first bad one.
    pub fn desired_set(&self, declared: &DeclaredProxies) -> Result<ProxySet, InvalidDeclaration> {
        let entries = match &declared.structured {
            Some(entries) => entries.clone(),
            None => {
                let mut entries = parse_flat_list(&declared.flat_plain, false);
                entries.extend(parse_flat_list(&declared.flat_tls, true));
                entries
            }
        };
        self.validate_all(&entries)
    }

    /// Validate an ordered list of raw declarations.
    pub fn validate_all(&self, entries: &[RawProxy]) -> Result<ProxySet, InvalidDeclaration> {
        let mut set = ProxySet::new();
        for (index, raw) in entries.iter().enumerate() {
            let outcome = self
                .validate(raw)
                .and_then(|def| {
                    set.insert(def).map_err(|dup| {
                        ValidationError::single(FieldIssue::DuplicateName(dup.name().to_string()))
                    })
                });

            if let Err(error) = outcome {
                tracing::error!(index, entry = %raw, error = %error, "Invalid proxy declaration");
                return Err(InvalidDeclaration {
                    index,
                    entry: raw.to_string(),
                    error,
                });
            }
        }
        Ok(set)
    }

    /// Validate a single declaration.
    pub fn validate(&self, raw: &RawProxy) -> Result<ProxyDefinition, ValidationError> {
        let mut issues = Vec::new();

        let name = require(&raw.name, "name", &mut issues);
        let is_tls = require(&raw.is_tls, "https", &mut issues);
        let remote_address = require(&raw.remote_ip, "remote-ip", &mut issues);
        let host_port = require(&raw.host_port, "host-port", &mut issues)
            .and_then(|n| collect(n.to_i64("host-port"), &mut issues));
        let remote_port = require(&raw.remote_port, "remote-port", &mut issues)
            .and_then(|n| collect(n.to_i64("remote-port"), &mut issues));

        match (name, is_tls, host_port, remote_address, remote_port) {
            (Some(name), Some(is_tls), Some(host_port), Some(remote_address), Some(remote_port))
                if issues.is_empty() =>
            {
                let fields = ProxyFields {
                    name,
                    is_tls,
                    host_port,
                    remote_address,
                    remote_port,
                };
                ProxyDefinition::new(&self.layout, fields)
            }
            _ => Err(ValidationError { issues }),
        }
    }
}

fn require<T: Clone>(
    value: &Option<T>,
    field: &'static str,
    issues: &mut Vec<FieldIssue>,
) -> Option<T> {
    if value.is_none() {
        issues.push(FieldIssue::Missing(field));
    }
    value.clone()
}

fn collect<T>(result: Result<T, FieldIssue>, issues: &mut Vec<FieldIssue>) -> Option<T> {
    result.map_err(|issue| issues.push(issue)).ok()
}

/// Expand a deprecated `host_port:remote_ip:remote_port,...` list.
///
/// Names are generated as `<scheme>-auto-<host_port>-<remote_ip>-<remote_port>`.
pub fn parse_flat_list(list: &str, is_tls: bool) -> Vec<RawProxy> {
    let scheme = if is_tls { "https" } else { "http" };

    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let segments: Vec<&str> = entry.split(':').map(str::trim).collect();
            match segments.as_slice() {
                [host, ip, remote] if !host.is_empty() && !ip.is_empty() && !remote.is_empty() => {
                    Some(RawProxy {
                        name: Some(format!("{}-auto-{}-{}-{}", scheme, host, ip, remote)),
                        is_tls: Some(is_tls),
                        host_port: Some(RawNumber::Text(host.to_string())),
                        remote_ip: Some(ip.to_string()),
                        remote_port: Some(RawNumber::Text(remote.to_string())),
                    })
                }
                _ => {
                    tracing::debug!(entry, "Dropping malformed flat proxy entry");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: &str, host_port: i64) -> RawProxy {
        RawProxy {
            name: Some(name.into()),
            is_tls: Some(false),
            host_port: Some(host_port.into()),
            remote_ip: Some("10.0.0.5".into()),
            remote_port: Some(80.into()),
        }
    }

    fn validator() -> Validator {
        Validator::new(SiteLayout::default())
    }

    #[test]
    fn test_flat_entry_expands() {
        let entries = parse_flat_list("8080:10.0.0.5:80", false);
        assert_eq!(entries.len(), 1);

        let def = validator().validate(&entries[0]).unwrap();
        assert_eq!(def.name(), "http-auto-8080-10.0.0.5-80");
        assert_eq!(def.host_port(), 8080);
        assert_eq!(def.remote_address().to_string(), "10.0.0.5");
        assert_eq!(def.remote_port(), 80);
        assert!(!def.is_tls());
    }

    #[test]
    fn test_flat_tls_list() {
        let entries = parse_flat_list(" 8443:10.0.0.7:443 ,", true);
        let def = validator().validate(&entries[0]).unwrap();
        assert_eq!(def.name(), "https-auto-8443-10.0.0.7-443");
        assert!(def.is_tls());
    }

    #[test]
    fn test_flat_malformed_entries_dropped() {
        assert!(parse_flat_list("8080:10.0.0.5", false).is_empty());
        assert!(parse_flat_list("", false).is_empty());
        assert!(parse_flat_list("8080::80", false).is_empty());
        assert!(parse_flat_list("1:2:3:4", false).is_empty());
        assert_eq!(parse_flat_list("8080:10.0.0.5,81:10.0.0.6:80", false).len(), 1);
    }

    #[test]
    fn test_flat_entry_with_bad_port_fails_validation() {
        let declared = DeclaredProxies {
            flat_plain: "80a:10.0.0.5:80".into(),
            ..Default::default()
        };
        let err = validator().desired_set(&declared).unwrap_err();
        assert!(matches!(
            err.error.issues.as_slice(),
            [FieldIssue::NotAnInteger { field: "host-port", .. }]
        ));
    }

    #[test]
    fn test_structured_takes_precedence() {
        let declared = DeclaredProxies {
            structured: Some(vec![raw("web", 8080)]),
            flat_plain: "9090:10.0.0.9:90".into(),
            flat_tls: "9443:10.0.0.9:443".into(),
        };
        let set = validator().desired_set(&declared).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.get("web").is_some());

        let empty = DeclaredProxies {
            structured: Some(Vec::new()),
            ..declared
        };
        assert!(validator().desired_set(&empty).unwrap().is_empty());
    }

    #[test]
    fn test_aborts_on_first_invalid_entry() {
        let entries = vec![raw("ok", 8080), raw("bad", 65536), raw("later", 0)];
        let err = validator().validate_all(&entries).unwrap_err();
        assert_eq!(err.index, 1);
        assert!(err.entry.contains("\"bad\""));
        assert_eq!(
            err.error.issues,
            vec![FieldIssue::PortOutOfRange { field: "host-port", value: 65536 }]
        );
    }

    #[test]
    fn test_missing_fields_reported() {
        let entry = RawProxy {
            name: Some("web".into()),
            ..Default::default()
        };
        let err = validator().validate(&entry).unwrap_err();
        assert_eq!(
            err.issues,
            vec![
                FieldIssue::Missing("https"),
                FieldIssue::Missing("remote-ip"),
                FieldIssue::Missing("host-port"),
                FieldIssue::Missing("remote-port"),
            ]
        );
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let entries = vec![raw("web", 8080), raw("web", 8081)];
        let err = validator().validate_all(&entries).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.error.issues, vec![FieldIssue::DuplicateName("web".into())]);
    }

    #[test]
    fn test_bad_address_rejected() {
        let mut entry = raw("web", 8080);
        entry.remote_ip = Some("10.0.0.256".into());
        let err = validator().validate(&entry).unwrap_err();
        assert_eq!(err.issues, vec![FieldIssue::InvalidAddress("10.0.0.256".into())]);
    }

    #[test]
    fn test_raw_proxy_accepts_both_key_styles() {
        let hyphenated: RawProxy = toml::from_str(
            "name = \"web\"\nhttps = true\nhost-port = 8080\nremote-ip = \"::1\"\nremote-port = \"80\"\n",
        )
        .unwrap();
        let underscored: RawProxy = toml::from_str(
            "name = \"web\"\nis_tls = true\nhost_port = 8080\nremote_ip = \"::1\"\nremote_port = \"80\"\n",
        )
        .unwrap();
        assert_eq!(hyphenated, underscored);
        assert!(validator().validate(&hyphenated).unwrap().is_tls());
    }
}
