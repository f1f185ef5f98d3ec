//! Reconciliation of desired against current proxies.
//!
//! # Data Flow
//! ```text
//! DeclaredProxies ──▶ Validator ──▶ desired ─┐
//!                                            ├─▶ diff.rs ──▶ Plan ──▶ ActivationManager
//! enabled dir ──▶ StateRecovery ──▶ current ─┘  (+ dangling links ──▶ unlink)
//! ```

pub mod diff;
pub mod reconciler;

pub use diff::{diff, Operation, Plan};
pub use reconciler::{Phase, Reconciler, RunReport};
