//! The reconciliation run.
//!
//! # Phases
//! ```text
//! Validate ──▶ Recover ──▶ Diff ──▶ Apply ──▶ Done
//!    │
//!    └──▶ Blocked (invalid declarations, nothing applied)
//! ```
//!
//! # Design Decisions
//! - Configures run before removes, dangling links are unlinked last
//! - Apply stops at the first failure and does not roll back; the error lists
//!   what had already been applied
//! - Any error raised before Apply leaves the host untouched
//! - One run at a time; callers provide the mutual exclusion

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::activation::ActivationManager;
use crate::error::{ReconcileError, Result};
use crate::observability::metrics;
use crate::proxy::{DeclaredProxies, ProxySet, SiteLayout, Validator};
use crate::reconcile::diff::{self, Operation, Plan};
use crate::state::StateRecovery;

/// Where a run is, or where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Validate,
    Recover,
    Diff,
    Apply,
    Done,
    Blocked,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Validate => "validate",
            Phase::Recover => "recover",
            Phase::Diff => "diff",
            Phase::Apply => "apply",
            Phase::Done => "done",
            Phase::Blocked => "blocked",
        };
        f.write_str(name)
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub phase: Phase,
    pub desired: usize,
    pub current: usize,
    pub applied: Vec<Operation>,
}

impl RunReport {
    /// True if the run found nothing to do.
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Orchestrates validation, recovery, diffing and activation.
#[derive(Debug)]
pub struct Reconciler {
    validator: Validator,
    recovery: StateRecovery,
    manager: ActivationManager,
}

impl Reconciler {
    pub fn new(layout: SiteLayout, manager: ActivationManager) -> Self {
        Self {
            validator: Validator::new(layout.clone()),
            recovery: StateRecovery::new(layout),
            manager,
        }
    }

    pub fn manager(&self) -> &ActivationManager {
        &self.manager
    }

    /// The proxies currently active on disk.
    pub fn current_set(&self) -> Result<ProxySet> {
        self.recovery.current_set()
    }

    /// Validate, recover and diff without changing anything.
    pub fn plan(&self, declared: &DeclaredProxies) -> Result<Plan> {
        let desired = self.validator.desired_set(declared)?;
        let recovered = self.recovery.scan()?;
        Ok(diff::plan(&desired, &recovered))
    }

    /// Converge the host onto `declared`.
    pub fn run(&self, declared: &DeclaredProxies) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("reconcile", %run_id);
        let _enter = span.enter();

        let result = self.run_phases(run_id, declared);
        match &result {
            Ok(report) => {
                metrics::record_run("converged");
                tracing::info!(
                    applied = report.applied.len(),
                    desired = report.desired,
                    "Reconciliation complete"
                );
            }
            Err(e) if e.is_blocking() => {
                metrics::record_run("blocked");
                tracing::error!(
                    phase = %Phase::Blocked,
                    error = %e,
                    "Reconciliation blocked; nothing applied"
                );
            }
            Err(e) => {
                metrics::record_run("failed");
                tracing::error!(error = %e, "Reconciliation failed part-way");
            }
        }
        result
    }

    fn run_phases(&self, run_id: Uuid, declared: &DeclaredProxies) -> Result<RunReport> {
        tracing::debug!(phase = %Phase::Validate, "Entering phase");
        let desired = self.validator.desired_set(declared)?;

        tracing::debug!(phase = %Phase::Recover, desired = desired.len(), "Entering phase");
        let recovered = self.recovery.scan()?;

        tracing::debug!(
            phase = %Phase::Diff,
            current = recovered.current.len(),
            dangling = recovered.dangling.len(),
            "Entering phase"
        );
        let plan = diff::plan(&desired, &recovered);

        tracing::debug!(
            phase = %Phase::Apply,
            configure = plan.configure.len(),
            remove = plan.remove.len(),
            unlink = plan.unlink.len(),
            "Entering phase"
        );
        let applied = self.apply(&plan)?;

        Ok(RunReport {
            run_id,
            phase: Phase::Done,
            desired: desired.len(),
            current: recovered.current.len(),
            applied,
        })
    }

    /// Execute `plan`, configures first, stopping at the first failure.
    pub fn apply(&self, plan: &Plan) -> Result<Vec<Operation>> {
        let mut completed = Vec::new();
        for def in &plan.configure {
            let operation = Operation::Configure(def.name().to_string());
            step(&mut completed, operation, self.manager.configure(def))?;
        }
        for def in &plan.remove {
            let operation = Operation::Remove(def.name().to_string());
            step(&mut completed, operation, self.manager.remove(def))?;
        }
        for name in &plan.unlink {
            let operation = Operation::Unlink(name.clone());
            step(&mut completed, operation, self.manager.unlink(name))?;
        }
        Ok(completed)
    }
}

fn step(completed: &mut Vec<Operation>, operation: Operation, outcome: Result<()>) -> Result<()> {
    match outcome {
        Ok(()) => {
            metrics::record_operation(operation.kind());
            completed.push(operation);
            Ok(())
        }
        Err(source) => Err(ReconcileError::Apply {
            completed: std::mem::take(completed),
            failed: operation,
            source: Box::new(source),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ServiceReloader;
    use crate::proxy::{RawNumber, RawProxy};
    use crate::render::ConfigRenderer;
    use tempfile::TempDir;

    #[derive(Debug)]
    struct NoopReloader;

    impl ServiceReloader for NoopReloader {
        fn service(&self) -> &str {
            "nginx"
        }

        fn reload(&self) -> Result<()> {
            Ok(())
        }
    }

    fn reconciler(tmp: &TempDir) -> Reconciler {
        let layout =
            SiteLayout::new(tmp.path().join("available"), tmp.path().join("enabled"), "revproxy");
        std::fs::create_dir_all(layout.available_dir()).unwrap();
        std::fs::create_dir_all(layout.enabled_dir()).unwrap();
        let manager = ActivationManager::new(
            layout.clone(),
            "default",
            ConfigRenderer::builtin(),
            Box::new(NoopReloader),
        );
        Reconciler::new(layout, manager)
    }

    fn declared(names: &[&str]) -> DeclaredProxies {
        let entries = names
            .iter()
            .enumerate()
            .map(|(i, name)| RawProxy {
                name: Some(name.to_string()),
                is_tls: Some(false),
                host_port: Some(RawNumber::Int(8000 + i as i64)),
                remote_ip: Some("10.0.0.5".into()),
                remote_port: Some(RawNumber::Int(80)),
            })
            .collect();
        DeclaredProxies {
            structured: Some(entries),
            ..Default::default()
        }
    }

    #[test]
    fn test_run_reports_counts() {
        let tmp = TempDir::new().unwrap();
        let reconciler = reconciler(&tmp);

        let report = reconciler.run(&declared(&["a", "b"])).unwrap();
        assert_eq!(report.phase, Phase::Done);
        assert_eq!(report.desired, 2);
        assert_eq!(report.current, 0);
        assert_eq!(report.applied.len(), 2);

        let report = reconciler.run(&declared(&["a"])).unwrap();
        assert_eq!(report.current, 2);
        assert_eq!(report.applied, vec![Operation::Remove("b".into())]);
    }

    #[test]
    fn test_apply_runs_configures_before_removes() {
        let tmp = TempDir::new().unwrap();
        let reconciler = reconciler(&tmp);
        reconciler.run(&declared(&["z"])).unwrap();

        let plan = reconciler.plan(&declared(&["a"])).unwrap();
        let applied = reconciler.apply(&plan).unwrap();
        assert_eq!(
            applied,
            vec![Operation::Configure("a".into()), Operation::Remove("z".into())]
        );
    }

    #[test]
    fn test_dangling_link_is_unlinked() {
        let tmp = TempDir::new().unwrap();
        let reconciler = reconciler(&tmp);
        reconciler.run(&declared(&["web"])).unwrap();
        std::fs::remove_file(tmp.path().join("available/revproxy-web.conf")).unwrap();

        let report = reconciler.run(&declared(&[])).unwrap();
        assert_eq!(report.applied, vec![Operation::Unlink("web".into())]);
        let link = tmp.path().join("enabled/revproxy-web.conf");
        assert!(std::fs::symlink_metadata(link).is_err());
    }

    #[test]
    fn test_dangling_link_of_desired_proxy_is_reconfigured() {
        let tmp = TempDir::new().unwrap();
        let reconciler = reconciler(&tmp);
        reconciler.run(&declared(&["web"])).unwrap();
        std::fs::remove_file(tmp.path().join("available/revproxy-web.conf")).unwrap();

        let report = reconciler.run(&declared(&["web"])).unwrap();
        assert_eq!(report.applied, vec![Operation::Configure("web".into())]);
        assert_eq!(reconciler.current_set().unwrap().len(), 1);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Blocked.to_string(), "blocked");
        assert_eq!(Phase::Apply.to_string(), "apply");
    }
}
