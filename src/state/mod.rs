//! Current-state recovery.
//!
//! # Data Flow
//! ```text
//! <enabled-dir>/<prefix>-*.conf
//!     → recovery.rs (scan, find first marker line)
//!     → marker.rs (versioned decode)
//!     → Recovered (current set + dangling managed links)
//! ```

pub mod marker;
pub mod recovery;

pub use marker::MarkerError;
pub use recovery::{EnabledFile, Recovered, StateRecovery};
