//! Link-based activation of rendered site configs.
//!
//! # Responsibilities
//! - Write rendered configs into the available-sites directory
//! - Enable/disable them by symlinking into the enabled-sites directory
//! - Reload the daemon after every link change
//!
//! # Design Decisions
//! - "Already absent" counts as success for every delete
//! - Disabling never touches the content file, so a site can be re-enabled
//!   without re-rendering
//! - Reload failures are always returned; the daemon must never silently
//!   serve something other than what the filesystem says

use std::fs;
use std::io;
use std::os::unix::fs::symlink;
use std::path::Path;

use crate::activation::reload::ServiceReloader;
use crate::error::{ReconcileError, Result};
use crate::observability::metrics;
use crate::proxy::{ProxyDefinition, SiteLayout};
use crate::render::ConfigRenderer;

/// Applies configure/remove operations for single proxies.
#[derive(Debug)]
pub struct ActivationManager {
    layout: SiteLayout,
    default_site: String,
    renderer: ConfigRenderer,
    reloader: Box<dyn ServiceReloader>,
}

impl ActivationManager {
    pub fn new(
        layout: SiteLayout,
        default_site: impl Into<String>,
        renderer: ConfigRenderer,
        reloader: Box<dyn ServiceReloader>,
    ) -> Self {
        Self {
            layout,
            default_site: default_site.into(),
            renderer,
            reloader,
        }
    }

    pub fn renderer(&self) -> &ConfigRenderer {
        &self.renderer
    }

    /// Render `def`, write it and enable it.
    pub fn configure(&self, def: &ProxyDefinition) -> Result<()> {
        tracing::info!(proxy = %def, link = %def.enabled_path().display(), "Configuring proxy");
        self.disable(def)?;

        let text = self.renderer.render(def);
        fs::write(def.available_path(), text)
            .map_err(|e| ReconcileError::filesystem(def.available_path(), e))?;

        self.enable(def)
    }

    /// Disable `def` and delete its rendered config.
    pub fn remove(&self, def: &ProxyDefinition) -> Result<()> {
        self.disable(def)?;
        tracing::info!(file = %def.available_path().display(), "Removing proxy config");
        remove_if_exists(def.available_path())?;
        Ok(())
    }

    /// Link `def` into the enabled directory and reload.
    pub fn enable(&self, def: &ProxyDefinition) -> Result<()> {
        let link = def.enabled_path();
        let target = def.available_path();
        tracing::debug!(link = %link.display(), "Enabling proxy");

        let in_place = match fs::read_link(link) {
            Ok(current) => current == target,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            // Something other than a symlink sits at the link path.
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => false,
            Err(e) => return Err(ReconcileError::filesystem(link, e)),
        };

        if !in_place {
            remove_if_exists(link)?;
            symlink(target, link).map_err(|e| ReconcileError::filesystem(link, e))?;
        }

        self.reload()
    }

    /// Remove the enabled link of `def` (if any) and reload.
    pub fn disable(&self, def: &ProxyDefinition) -> Result<()> {
        tracing::debug!(link = %def.enabled_path().display(), "Disabling proxy");
        remove_if_exists(def.enabled_path())?;
        self.reload()
    }

    pub fn reload(&self) -> Result<()> {
        let result = self.reloader.reload();
        metrics::record_reload(result.is_ok());
        if let Err(e) = &result {
            tracing::error!(service = %self.reloader.service(), error = %e, "Reload failed");
        }
        result
    }

    /// Delete the enabled link of `name` without rendering anything, and
    /// reload. Used for managed links whose target has disappeared.
    pub fn unlink(&self, name: &str) -> Result<()> {
        let link = self.layout.enabled_dir().join(self.layout.file_name(name));
        if remove_if_exists(&link)? {
            tracing::info!(link = %link.display(), "Removed dangling link");
        }
        self.reload()
    }

    /// Remove the distribution's default site from the enabled directory.
    pub fn disable_default_site(&self) -> Result<()> {
        let path = self.layout.enabled_dir().join(&self.default_site);
        if remove_if_exists(&path)? {
            tracing::info!(path = %path.display(), "Disabled default site");
        }
        self.reload()
    }

    /// Remove the single-file configs written by older releases, which held
    /// every plain or every TLS proxy in one file.
    pub fn remove_legacy_configs(&self) -> Result<()> {
        for scheme in ["http", "https"] {
            let file_name = format!("{}-{}-reverse-proxy.conf", self.layout.prefix(), scheme);
            for dir in [self.layout.enabled_dir(), self.layout.available_dir()] {
                let path = dir.join(&file_name);
                if remove_if_exists(&path)? {
                    tracing::info!(path = %path.display(), "Removed legacy config");
                }
            }
        }
        self.reload()
    }
}

/// Delete a file or symlink, treating absence as success.
///
/// Returns whether something was actually removed.
fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ReconcileError::filesystem(path, e)),
    }
}
