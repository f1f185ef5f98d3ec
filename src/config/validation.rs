//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation of settings (serde handles syntax)
//! - Directories, prefix, reload command, observability values
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ReconcilerConfig → Result<(), Vec<SettingsError>>
//! - Proxy declarations are not checked here; the reconciler validates them
//!   on every run so a bad declaration blocks that run instead of startup

use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ReconcilerConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single invalid setting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("sites.{field} must be an absolute path, got '{value}'")]
    RelativeDirectory { field: &'static str, value: String },

    #[error("sites.prefix must be non-empty and must not contain '/'")]
    InvalidPrefix,

    #[error("sites.default_site must be a plain file name")]
    InvalidDefaultSite,

    #[error("service.name must not be empty")]
    EmptyServiceName,

    #[error("service.reload_command must name a program")]
    EmptyReloadCommand,

    #[error("observability.log_level '{0}' is not one of trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Check every setting, collecting all problems.
pub fn validate_config(config: &ReconcilerConfig) -> Result<(), Vec<SettingsError>> {
    let mut errors = Vec::new();

    check_dir("available_dir", &config.sites.available_dir, &mut errors);
    check_dir("enabled_dir", &config.sites.enabled_dir, &mut errors);

    if config.sites.prefix.is_empty() || config.sites.prefix.contains('/') {
        errors.push(SettingsError::InvalidPrefix);
    }
    let default_site = &config.sites.default_site;
    if default_site.is_empty() || default_site.contains('/') || default_site == ".." {
        errors.push(SettingsError::InvalidDefaultSite);
    }

    if config.service.name.trim().is_empty() {
        errors.push(SettingsError::EmptyServiceName);
    }
    if config
        .service
        .reload_command
        .first()
        .map_or(true, |program| program.trim().is_empty())
    {
        errors.push(SettingsError::EmptyReloadCommand);
    }

    let level = config.observability.log_level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(SettingsError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(SettingsError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

// Enabled links point at absolute available paths.
fn check_dir(field: &'static str, dir: &Path, errors: &mut Vec<SettingsError>) {
    if !dir.is_absolute() {
        errors.push(SettingsError::RelativeDirectory {
            field,
            value: dir.display().to_string(),
        });
    }
}
