//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, one span per reconciliation run)
//!     → metrics.rs (run, operation and reload counters)
//!
//! Consumers:
//!     → stderr / journald
//!     → Metrics endpoint (Prometheus scrape, watch mode only)
//! ```

pub mod logging;
pub mod metrics;
