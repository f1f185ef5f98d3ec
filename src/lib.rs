//! Reverse-proxy site reconciler library.

// Core
pub mod proxy;
pub mod reconcile;
pub mod render;
pub mod state;

// Host side effects
pub mod activation;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use activation::{ActivationManager, CommandReloader, ServiceReloader};
pub use config::ReconcilerConfig;
pub use error::{ErrorKind, ReconcileError};
pub use proxy::{DeclaredProxies, ProxyDefinition, ProxySet, SiteLayout};
pub use reconcile::{Operation, Plan, Reconciler, RunReport};
pub use render::ConfigRenderer;
