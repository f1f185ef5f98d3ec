//! Startup orchestration.
//!
//! # Responsibilities
//! - Turn a validated configuration into a ready reconciler
//! - Load custom templates, falling back to the built-in ones
//!
//! # Design Decisions
//! - Fail fast: a bad template or reload command is a startup error
//! - The reloader is injectable so tests never shell out

use crate::activation::{ActivationManager, CommandReloader, ServiceReloader};
use crate::config::loader::{read, ConfigError};
use crate::config::{ReconcilerConfig, SettingsError, TemplateConfig};
use crate::reconcile::Reconciler;
use crate::render::renderer::{DEFAULT_HTTP_TEMPLATE, DEFAULT_TLS_TEMPLATE};
use crate::render::ConfigRenderer;

/// Build the renderer, reading any template overrides from disk.
pub fn build_renderer(templates: &TemplateConfig) -> Result<ConfigRenderer, ConfigError> {
    if templates.http.is_none() && templates.tls.is_none() {
        return Ok(ConfigRenderer::builtin());
    }

    let http = match &templates.http {
        Some(path) => read(path)?,
        None => DEFAULT_HTTP_TEMPLATE.to_string(),
    };
    let tls = match &templates.tls {
        Some(path) => read(path)?,
        None => DEFAULT_TLS_TEMPLATE.to_string(),
    };
    Ok(ConfigRenderer::new(&http, &tls)?)
}

/// Build a reconciler that reloads through the configured command.
pub fn build_reconciler(config: &ReconcilerConfig) -> Result<Reconciler, ConfigError> {
    let reloader = CommandReloader::new(&config.service.reload_command, &config.service.name)
        .ok_or_else(|| ConfigError::Validation(vec![SettingsError::EmptyReloadCommand]))?;
    build_reconciler_with(config, Box::new(reloader))
}

/// Build a reconciler around an arbitrary reloader.
pub fn build_reconciler_with(
    config: &ReconcilerConfig,
    reloader: Box<dyn ServiceReloader>,
) -> Result<Reconciler, ConfigError> {
    let layout = config.layout();
    let renderer = build_renderer(&config.templates)?;
    let manager = ActivationManager::new(
        layout.clone(),
        &config.sites.default_site,
        renderer,
        reloader,
    );

    tracing::debug!(
        available_dir = %config.sites.available_dir.display(),
        enabled_dir = %config.sites.enabled_dir.display(),
        prefix = %config.sites.prefix,
        service = %config.service.name,
        "Reconciler initialised"
    );
    Ok(Reconciler::new(layout, manager))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_renderer_by_default() {
        assert!(build_renderer(&TemplateConfig::default()).is_ok());
    }

    #[test]
    fn test_custom_template_override() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("http.tmpl");
        fs::write(&path, "server { listen {{ listen_port }}; }\n").unwrap();

        let templates = TemplateConfig {
            http: Some(path),
            tls: None,
        };
        assert!(build_renderer(&templates).is_ok());
    }

    #[test]
    fn test_bad_custom_template_fails() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tls.tmpl");
        fs::write(&path, "{{ certificate }}").unwrap();

        let templates = TemplateConfig {
            http: None,
            tls: Some(path),
        };
        assert!(matches!(build_renderer(&templates), Err(ConfigError::Template(_))));
    }

    #[test]
    fn test_missing_template_file_fails() {
        let templates = TemplateConfig {
            http: Some("/nonexistent/http.tmpl".into()),
            tls: None,
        };
        assert!(matches!(build_renderer(&templates), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_empty_reload_command_fails() {
        let mut config = ReconcilerConfig::default();
        config.service.reload_command.clear();
        assert!(matches!(build_reconciler(&config), Err(ConfigError::Validation(_))));
    }
}
