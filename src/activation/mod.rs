//! Activation subsystem.
//!
//! # Data Flow
//! ```text
//! configure(def):
//!     disable (unlink, reload)
//!     → render → write <available-dir>/<prefix>-<name>.conf
//!     → enable (symlink into <enabled-dir>, reload)
//!
//! remove(def):
//!     disable (unlink, reload) → delete available file
//! ```

pub mod manager;
pub mod reload;

pub use manager::ActivationManager;
pub use reload::{CommandReloader, ServiceReloader};
