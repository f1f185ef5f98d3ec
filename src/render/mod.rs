//! Site configuration rendering.
//!
//! # Data Flow
//! ```text
//! ProxyDefinition
//!     → renderer.rs (pick http/tls template, prepend state marker)
//!     → template.rs (placeholder substitution)
//!     → config text (written by the activation manager)
//! ```
//!
//! # Design Decisions
//! - Renderer is an explicit value passed to whoever needs it, no global template state
//! - Templates are validated once when the renderer is built
//! - Rendering is pure; nothing here touches the filesystem

pub mod renderer;
pub mod template;

pub use renderer::ConfigRenderer;
pub use template::TemplateError;
