//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build renderer, activation manager, reconciler
//!
//! Watch (watch.rs):
//!     Reconcile → wait for config change / SIGHUP → Reconcile → ...
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → broadcast shutdown → watch loop exits after the current run
//! ```
//!
//! # Design Decisions
//! - One run at a time: the watch loop is the only caller of the reconciler
//! - A run in progress is never interrupted; shutdown waits for it

pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod watch;

pub use shutdown::Shutdown;
pub use signals::{SignalEvent, Signals};
pub use watch::{watch, WatchInputs};
