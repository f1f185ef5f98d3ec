//! Shared fixtures for reconciliation integration tests.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use proxy_reconciler::config::ReconcilerConfig;
use proxy_reconciler::error::{ReconcileError, Result};
use proxy_reconciler::lifecycle::startup;
use proxy_reconciler::proxy::{DeclaredProxies, RawNumber, RawProxy};
use proxy_reconciler::{Reconciler, ServiceReloader};

/// Records every reload and, optionally, starts failing after a number of them.
///
/// Each recorded entry is the content visible through the watched enabled
/// path at the moment of the reload.
#[derive(Debug, Clone)]
pub struct RecordingReloader {
    pub reloads: Arc<Mutex<Vec<Option<String>>>>,
    pub watched: Option<PathBuf>,
    pub fail_from: Option<usize>,
}

impl ServiceReloader for RecordingReloader {
    fn service(&self) -> &str {
        "nginx"
    }

    fn reload(&self) -> Result<()> {
        let mut reloads = self.reloads.lock().unwrap();
        if let Some(limit) = self.fail_from {
            if reloads.len() >= limit {
                return Err(ReconcileError::Reload {
                    service: "nginx".into(),
                    reason: "exit status: 1".into(),
                });
            }
        }
        let seen = self.watched.as_ref().and_then(|p| fs::read_to_string(p).ok());
        reloads.push(seen);
        Ok(())
    }
}

/// A fake host: temporary site directories plus a recording reloader.
pub struct TestHost {
    _dir: tempfile::TempDir,
    pub config: ReconcilerConfig,
    pub reloads: Arc<Mutex<Vec<Option<String>>>>,
}

impl TestHost {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ReconcilerConfig::default();
        config.sites.available_dir = dir.path().join("sites-available");
        config.sites.enabled_dir = dir.path().join("sites-enabled");
        fs::create_dir_all(&config.sites.available_dir).unwrap();
        fs::create_dir_all(&config.sites.enabled_dir).unwrap();

        Self {
            _dir: dir,
            config,
            reloads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn reconciler(&self) -> Reconciler {
        self.build(None, None)
    }

    /// Reconciler whose reloads record what `name`'s enabled path shows.
    pub fn reconciler_watching(&self, name: &str) -> Reconciler {
        self.build(Some(self.enabled(name)), None)
    }

    /// Reconciler whose reloads fail once `n` have succeeded.
    pub fn reconciler_failing_after(&self, n: usize) -> Reconciler {
        self.build(None, Some(n))
    }

    /// Reconciler built from `config` instead of the host's own.
    pub fn reconciler_for(&self, config: &ReconcilerConfig) -> Reconciler {
        let reloader = self.reloader(None, None);
        startup::build_reconciler_with(config, Box::new(reloader)).unwrap()
    }

    fn build(&self, watched: Option<PathBuf>, fail_from: Option<usize>) -> Reconciler {
        let reloader = self.reloader(watched, fail_from);
        startup::build_reconciler_with(&self.config, Box::new(reloader)).unwrap()
    }

    fn reloader(&self, watched: Option<PathBuf>, fail_from: Option<usize>) -> RecordingReloader {
        RecordingReloader {
            reloads: self.reloads.clone(),
            watched,
            fail_from,
        }
    }

    pub fn reload_count(&self) -> usize {
        self.reloads.lock().unwrap().len()
    }

    pub fn last_reload_view(&self) -> Option<String> {
        self.reloads.lock().unwrap().last().cloned().flatten()
    }

    pub fn enabled(&self, name: &str) -> PathBuf {
        self.config.sites.enabled_dir.join(format!("revproxy-{}.conf", name))
    }

    pub fn available(&self, name: &str) -> PathBuf {
        self.config.sites.available_dir.join(format!("revproxy-{}.conf", name))
    }

    /// Names of everything in the enabled directory.
    pub fn enabled_files(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&self.config.sites.enabled_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

pub fn proxy(
    name: &str,
    is_tls: bool,
    host_port: i64,
    remote_ip: &str,
    remote_port: i64,
) -> RawProxy {
    RawProxy {
        name: Some(name.into()),
        is_tls: Some(is_tls),
        host_port: Some(RawNumber::Int(host_port)),
        remote_ip: Some(remote_ip.into()),
        remote_port: Some(RawNumber::Int(remote_port)),
    }
}

pub fn declared(entries: Vec<RawProxy>) -> DeclaredProxies {
    DeclaredProxies {
        structured: Some(entries),
        ..Default::default()
    }
}
