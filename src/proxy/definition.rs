//! The proxy definition value object.
//!
//! # Responsibilities
//! - Hold one reverse-proxy rule (listen port, upstream address and port, TLS flag)
//! - Derive the on-disk locations of its rendered config and enabled link
//! - Enforce field invariants at construction time
//!
//! # Design Decisions
//! - Construction is the only way in; every instance is valid
//! - Equality and hashing cover the semantic fields only, never the derived paths
//! - Immutable after construction; replacing a proxy means building a new value

use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Directory layout and file naming shared by every managed proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteLayout {
    available_dir: PathBuf,
    enabled_dir: PathBuf,
    prefix: String,
}

impl SiteLayout {
    pub fn new(
        available_dir: impl Into<PathBuf>,
        enabled_dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            available_dir: available_dir.into(),
            enabled_dir: enabled_dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn available_dir(&self) -> &Path {
        &self.available_dir
    }

    pub fn enabled_dir(&self) -> &Path {
        &self.enabled_dir
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// File name used in both directories for the proxy called `name`.
    pub fn file_name(&self, name: &str) -> String {
        format!("{}-{}.conf", self.prefix, name)
    }

    /// Inverse of [`SiteLayout::file_name`]: extracts the proxy name from a
    /// file name owned by this layout, or `None` for foreign files.
    pub fn name_from_file(&self, file_name: &str) -> Option<String> {
        let name = file_name
            .strip_prefix(self.prefix.as_str())?
            .strip_prefix('-')?
            .strip_suffix(".conf")?;
        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }
}

impl Default for SiteLayout {
    fn default() -> Self {
        Self::new(
            "/etc/nginx/sites-available",
            "/etc/nginx/sites-enabled",
            "revproxy",
        )
    }
}

/// Unvalidated field values handed to [`ProxyDefinition::new`].
///
/// Ports are wide integers so range errors can be reported instead of being
/// lost to a narrowing conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyFields {
    pub name: String,
    pub is_tls: bool,
    pub host_port: i64,
    pub remote_address: String,
    pub remote_port: i64,
}

/// A single problem found while validating a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldIssue {
    #[error("missing required field '{0}'")]
    Missing(&'static str),

    #[error("field '{field}' must be an integer, got '{value}'")]
    NotAnInteger { field: &'static str, value: String },

    /// Raised for `host-port` and `remote-port` alike. The upstream port is a
    /// TCP port too, so it is held to the same range instead of accepting any
    /// positive integer.
    #[error("field '{field}' must be between 1 and 65535, got {value}")]
    PortOutOfRange { field: &'static str, value: i64 },

    #[error("'{0}' is not a valid IPv4 or IPv6 address")]
    InvalidAddress(String),

    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("name '{0}' is declared more than once")]
    DuplicateName(String),
}

/// All problems found in one declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn single(issue: FieldIssue) -> Self {
        Self { issues: vec![issue] }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", issue)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// One reverse-proxy rule plus its derived file locations.
#[derive(Debug, Clone, Serialize)]
pub struct ProxyDefinition {
    name: String,
    is_tls: bool,
    host_port: u16,
    remote_address: IpAddr,
    remote_port: u16,
    #[serde(skip)]
    available_path: PathBuf,
    #[serde(skip)]
    enabled_path: PathBuf,
}

impl ProxyDefinition {
    /// Validate `fields` and build a definition placed according to `layout`.
    ///
    /// Every violated invariant is reported, not just the first.
    pub fn new(layout: &SiteLayout, fields: ProxyFields) -> Result<Self, ValidationError> {
        let mut issues = Vec::new();

        if let Err(reason) = check_name(&fields.name) {
            issues.push(FieldIssue::InvalidName {
                name: fields.name.clone(),
                reason,
            });
        }
        let host_port = checked_port("host-port", fields.host_port, &mut issues);
        let remote_port = checked_port("remote-port", fields.remote_port, &mut issues);
        let remote_address = match fields.remote_address.trim().parse::<IpAddr>() {
            Ok(addr) => Some(addr),
            Err(_) => {
                issues.push(FieldIssue::InvalidAddress(fields.remote_address.clone()));
                None
            }
        };

        match (host_port, remote_port, remote_address) {
            (Some(host_port), Some(remote_port), Some(remote_address)) if issues.is_empty() => {
                let file_name = layout.file_name(&fields.name);
                Ok(Self {
                    available_path: layout.available_dir().join(&file_name),
                    enabled_path: layout.enabled_dir().join(&file_name),
                    name: fields.name,
                    is_tls: fields.is_tls,
                    host_port,
                    remote_address,
                    remote_port,
                })
            }
            _ => Err(ValidationError { issues }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_tls(&self) -> bool {
        self.is_tls
    }

    pub fn host_port(&self) -> u16 {
        self.host_port
    }

    pub fn remote_address(&self) -> IpAddr {
        self.remote_address
    }

    pub fn remote_port(&self) -> u16 {
        self.remote_port
    }

    /// Rendered config location in the available-sites directory.
    pub fn available_path(&self) -> &Path {
        &self.available_path
    }

    /// Symlink location in the enabled-sites directory.
    pub fn enabled_path(&self) -> &Path {
        &self.enabled_path
    }

    /// Field values that reproduce this definition through [`ProxyDefinition::new`].
    pub fn fields(&self) -> ProxyFields {
        ProxyFields {
            name: self.name.clone(),
            is_tls: self.is_tls,
            host_port: i64::from(self.host_port),
            remote_address: self.remote_address.to_string(),
            remote_port: i64::from(self.remote_port),
        }
    }

    /// Structural comparison over the semantic fields.
    pub fn same_fields(&self, other: &ProxyDefinition) -> bool {
        self.name == other.name
            && self.is_tls == other.is_tls
            && self.host_port == other.host_port
            && self.remote_address == other.remote_address
            && self.remote_port == other.remote_port
    }
}

impl PartialEq for ProxyDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.same_fields(other)
    }
}

impl Eq for ProxyDefinition {}

impl Hash for ProxyDefinition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.is_tls.hash(state);
        self.host_port.hash(state);
        self.remote_address.hash(state);
        self.remote_port.hash(state);
    }
}

impl fmt::Display for ProxyDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = if self.is_tls { "https" } else { "http" };
        write!(
            f,
            "{} (:{} -> {}://{})",
            self.name,
            self.host_port,
            scheme,
            std::net::SocketAddr::new(self.remote_address, self.remote_port)
        )
    }
}

fn checked_port(field: &'static str, value: i64, issues: &mut Vec<FieldIssue>) -> Option<u16> {
    match u16::try_from(value) {
        Ok(port) if port > 0 => Some(port),
        _ => {
            issues.push(FieldIssue::PortOutOfRange { field, value });
            None
        }
    }
}

// Names end up as path components.
fn check_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("must not be empty");
    }
    if name == "." || name == ".." {
        return Err("must not be a relative path component");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err("only ASCII letters, digits, '-', '_' and '.' are allowed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn web(host_port: i64) -> ProxyFields {
        ProxyFields {
            name: "web".into(),
            is_tls: false,
            host_port,
            remote_address: "10.0.0.5".into(),
            remote_port: 80,
        }
    }

    #[test]
    fn test_host_port_boundaries() {
        let layout = SiteLayout::default();
        assert!(ProxyDefinition::new(&layout, web(65535)).is_ok());
        assert!(ProxyDefinition::new(&layout, web(1)).is_ok());

        let err = ProxyDefinition::new(&layout, web(65536)).unwrap_err();
        assert_eq!(
            err.issues,
            vec![FieldIssue::PortOutOfRange { field: "host-port", value: 65536 }]
        );
        assert!(ProxyDefinition::new(&layout, web(0)).is_err());
        assert!(ProxyDefinition::new(&layout, web(-1)).is_err());
    }

    #[test]
    fn test_remote_port_shares_the_tcp_range() {
        let layout = SiteLayout::default();
        let mut fields = web(8080);
        fields.remote_port = 65535;
        assert!(ProxyDefinition::new(&layout, fields.clone()).is_ok());

        fields.remote_port = 70000;
        let err = ProxyDefinition::new(&layout, fields).unwrap_err();
        assert_eq!(
            err.issues,
            vec![FieldIssue::PortOutOfRange { field: "remote-port", value: 70000 }]
        );
    }

    #[test]
    fn test_derived_paths() {
        let layout = SiteLayout::new("/srv/avail", "/srv/enabled", "rp");
        let def = ProxyDefinition::new(&layout, web(8080)).unwrap();
        assert_eq!(def.available_path(), Path::new("/srv/avail/rp-web.conf"));
        assert_eq!(def.enabled_path(), Path::new("/srv/enabled/rp-web.conf"));
    }

    #[test]
    fn test_equality_ignores_paths() {
        let a = ProxyDefinition::new(&SiteLayout::default(), web(8080)).unwrap();
        let b = ProxyDefinition::new(&SiteLayout::new("/a", "/b", "x"), web(8080)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.available_path(), b.available_path());
    }

    #[test]
    fn test_equality_covers_every_semantic_field() {
        let layout = SiteLayout::default();
        let base = ProxyDefinition::new(&layout, web(8080)).unwrap();

        let mut tls = web(8080);
        tls.is_tls = true;
        let mut renamed = web(8080);
        renamed.name = "api".into();
        let mut other_ip = web(8080);
        other_ip.remote_address = "10.0.0.6".into();
        let mut other_remote = web(8080);
        other_remote.remote_port = 81;

        for fields in [tls, renamed, other_ip, other_remote, web(8081)] {
            let other = ProxyDefinition::new(&layout, fields).unwrap();
            assert_ne!(base, other, "{} should differ from {}", other, base);
        }
    }

    #[test]
    fn test_reports_all_issues() {
        let fields = ProxyFields {
            name: "../etc".into(),
            is_tls: false,
            host_port: 0,
            remote_address: "not-an-ip".into(),
            remote_port: 70000,
        };
        let err = ProxyDefinition::new(&SiteLayout::default(), fields).unwrap_err();
        assert_eq!(err.issues.len(), 4);
    }

    #[test]
    fn test_ipv6_upstream() {
        let mut fields = web(443);
        fields.remote_address = "::1".into();
        let def = ProxyDefinition::new(&SiteLayout::default(), fields).unwrap();
        assert!(def.remote_address().is_ipv6());
        assert_eq!(def.fields().remote_address, "::1");
    }

    #[test]
    fn test_name_from_file() {
        let layout = SiteLayout::default();
        assert_eq!(layout.name_from_file("revproxy-web.conf"), Some("web".into()));
        assert_eq!(layout.name_from_file("revproxy-.conf"), None);
        assert_eq!(layout.name_from_file("default"), None);
        assert_eq!(layout.name_from_file("revproxyweb.conf"), None);
    }
}
