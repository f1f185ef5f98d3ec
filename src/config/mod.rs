//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks on settings)
//!     → ReconcilerConfig (validated, immutable)
//!     → lifecycle::startup builds the reconciler from it
//!
//! In watch mode:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → the watch loop reconciles against the new declarations
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Unknown keys are rejected so typos do not silently drop proxies

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{ObservabilityConfig, ReconcilerConfig, ServiceConfig, SitesConfig, TemplateConfig};
pub use validation::SettingsError;
