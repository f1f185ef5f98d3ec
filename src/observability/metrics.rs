//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Count reconciliation runs, applied operations and daemon reloads
//! - Optionally expose a Prometheus-compatible scrape endpoint
//!
//! # Metrics
//! - `reconciler_runs_total` (counter): runs by outcome (`converged`, `blocked`, `failed`)
//! - `reconciler_operations_total` (counter): applied operations by kind
//! - `reconciler_reloads_total` (counter): daemon reloads by result
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so one-shot CLI
//!   runs pay nothing
//! - The exporter is only started by the long-running watch mode

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_run(outcome: &'static str) {
    metrics::counter!("reconciler_runs_total", "outcome" => outcome).increment(1);
}

pub fn record_operation(operation: &'static str) {
    metrics::counter!("reconciler_operations_total", "operation" => operation).increment(1);
}

pub fn record_reload(success: bool) {
    let result = if success { "success" } else { "failure" };
    metrics::counter!("reconciler_reloads_total", "result" => result).increment(1);
}
