//! Proxy definition → nginx site configuration.

use std::net::{IpAddr, SocketAddr};

use crate::proxy::ProxyDefinition;
use crate::render::template::{Placeholder, Template, TemplateError};
use crate::state::marker;

/// Built-in template for plain-HTTP upstreams.
pub const DEFAULT_HTTP_TEMPLATE: &str = include_str!("../../templates/http.conf");
/// Built-in template for TLS upstreams.
pub const DEFAULT_TLS_TEMPLATE: &str = include_str!("../../templates/tls.conf");

/// Renders site configs from a plain-upstream and a TLS-upstream template.
///
/// The marker line is always written first, independent of the templates, so a
/// custom template can never break state recovery.
#[derive(Debug, Clone)]
pub struct ConfigRenderer {
    http: Template,
    tls: Template,
}

impl ConfigRenderer {
    pub fn new(http_source: &str, tls_source: &str) -> Result<Self, TemplateError> {
        Ok(Self {
            http: Template::parse("http", http_source)?,
            tls: Template::parse("tls", tls_source)?,
        })
    }

    /// Renderer using the built-in templates.
    pub fn builtin() -> Self {
        Self::new(DEFAULT_HTTP_TEMPLATE, DEFAULT_TLS_TEMPLATE)
            .expect("built-in templates use only known placeholders")
    }

    pub fn render(&self, def: &ProxyDefinition) -> String {
        let template = if def.is_tls() { &self.tls } else { &self.http };
        let scheme = if def.is_tls() { "https" } else { "http" };
        let upstream = SocketAddr::new(def.remote_address(), def.remote_port());

        let body = template.render(|placeholder| match placeholder {
            Placeholder::Name => def.name().to_string(),
            Placeholder::ListenPort => def.host_port().to_string(),
            Placeholder::Upstream => format!("{}://{}", scheme, upstream),
            Placeholder::UpstreamHost => match def.remote_address() {
                IpAddr::V4(v4) => v4.to_string(),
                IpAddr::V6(v6) => format!("[{}]", v6),
            },
            Placeholder::UpstreamPort => def.remote_port().to_string(),
            Placeholder::Scheme => scheme.to_string(),
        });

        let mut out = marker::encode(def);
        out.push('\n');
        out.push_str(&body);
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out
    }
}

impl Default for ConfigRenderer {
    fn default() -> Self {
        Self::builtin()
    }
}
