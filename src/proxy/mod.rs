//! Proxy definitions and desired-state validation.
//!
//! # Data Flow
//! ```text
//! config file
//!     → [[proxies]] tables or deprecated flat lists
//!     → validator.rs (RawProxy → ProxyDefinition, fail closed)
//!     → ProxySet (desired set, unique names)
//! ```
//!
//! # Design Decisions
//! - ProxyDefinition is only obtainable through a validating constructor
//! - Equality is structural over semantic fields; paths are derived data

pub mod definition;
pub mod set;
pub mod validator;

pub use definition::{FieldIssue, ProxyDefinition, ProxyFields, SiteLayout, ValidationError};
pub use set::ProxySet;
pub use validator::{DeclaredProxies, InvalidDeclaration, RawNumber, RawProxy, Validator};
