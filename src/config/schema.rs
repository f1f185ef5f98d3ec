//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the reconciler.
//! All types derive Serde traits for deserialization from the TOML config file.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::proxy::{DeclaredProxies, RawProxy, SiteLayout};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcilerConfig {
    /// Deprecated: comma-separated `host_port:remote_ip:remote_port` list of plain proxies.
    #[serde(alias = "http-reverse-proxies")]
    pub http_reverse_proxies: String,

    /// Deprecated: same format as `http_reverse_proxies`, for TLS upstreams.
    #[serde(alias = "https-reverse-proxies")]
    pub https_reverse_proxies: String,

    /// Structured proxy declarations. When present the deprecated lists are ignored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxies: Option<Vec<RawProxy>>,

    /// Site directories and file naming.
    pub sites: SitesConfig,

    /// Proxy daemon service and how to reload it.
    pub service: ServiceConfig,

    /// Optional template overrides.
    pub templates: TemplateConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ReconcilerConfig {
    /// The desired-state input carried by this configuration.
    pub fn declared(&self) -> DeclaredProxies {
        DeclaredProxies {
            structured: self.proxies.clone(),
            flat_plain: self.http_reverse_proxies.clone(),
            flat_tls: self.https_reverse_proxies.clone(),
        }
    }

    pub fn layout(&self) -> SiteLayout {
        SiteLayout::new(
            &self.sites.available_dir,
            &self.sites.enabled_dir,
            &self.sites.prefix,
        )
    }
}

/// Site directory configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SitesConfig {
    /// Where rendered configs are written.
    pub available_dir: PathBuf,

    /// Where enabled configs are linked.
    pub enabled_dir: PathBuf,

    /// File name prefix marking files owned by the reconciler.
    pub prefix: String,

    /// Name of the distribution's default site in the enabled directory.
    pub default_site: String,
}

impl Default for SitesConfig {
    fn default() -> Self {
        Self {
            available_dir: PathBuf::from("/etc/nginx/sites-available"),
            enabled_dir: PathBuf::from("/etc/nginx/sites-enabled"),
            prefix: "revproxy".to_string(),
            default_site: "default".to_string(),
        }
    }
}

/// Proxy daemon service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Service name passed as the last argument of the reload command.
    pub name: String,

    /// Reload command and its leading arguments.
    pub reload_command: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "nginx".to_string(),
            reload_command: vec!["systemctl".to_string(), "reload".to_string()],
        }
    }
}

/// Template override configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct TemplateConfig {
    /// Template for plain-HTTP upstreams.
    pub http: Option<PathBuf>,

    /// Template for TLS upstreams.
    pub tls: Option<PathBuf>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the metrics endpoint (watch mode only).
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9595".to_string(),
        }
    }
}
