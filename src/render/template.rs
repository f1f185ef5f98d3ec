//! Minimal `{{ placeholder }}` templates.

use thiserror::Error;

/// Values a template may refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Name,
    ListenPort,
    Upstream,
    UpstreamHost,
    UpstreamPort,
    Scheme,
}

impl Placeholder {
    fn parse(key: &str) -> Option<Self> {
        Some(match key {
            "name" => Placeholder::Name,
            "listen_port" => Placeholder::ListenPort,
            "upstream" => Placeholder::Upstream,
            "upstream_host" => Placeholder::UpstreamHost,
            "upstream_port" => Placeholder::UpstreamPort,
            "scheme" => Placeholder::Scheme,
            _ => return None,
        })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown placeholder '{{{{ {key} }}}}' in template '{template}'")]
    UnknownPlaceholder { template: String, key: String },

    #[error("unterminated placeholder in template '{template}'")]
    Unterminated { template: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Value(Placeholder),
}

/// A template checked once at construction and rendered many times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse `source`; `label` only identifies the template in errors.
    pub fn parse(label: &str, source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }
            let after_open = &rest[start + 2..];
            let end = after_open.find("}}").ok_or_else(|| TemplateError::Unterminated {
                template: label.to_string(),
            })?;
            let key = after_open[..end].trim();
            let placeholder =
                Placeholder::parse(key).ok_or_else(|| TemplateError::UnknownPlaceholder {
                    template: label.to_string(),
                    key: key.to_string(),
                })?;
            segments.push(Segment::Value(placeholder));
            rest = &after_open[end + 2..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self { segments })
    }

    /// Substitute every placeholder using `value`.
    pub fn render<F>(&self, mut value: F) -> String
    where
        F: FnMut(Placeholder) -> String,
    {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Value(placeholder) => out.push_str(&value(*placeholder)),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitution() {
        let template =
            Template::parse("t", "listen {{listen_port}}; pass {{ upstream }};").unwrap();
        let out = template.render(|p| match p {
            Placeholder::ListenPort => "8080".into(),
            Placeholder::Upstream => "http://10.0.0.5:80".into(),
            _ => String::new(),
        });
        assert_eq!(out, "listen 8080; pass http://10.0.0.5:80;");
    }

    #[test]
    fn test_single_braces_are_text() {
        let template = Template::parse("t", "server {\n}\n").unwrap();
        assert_eq!(template.render(|_| unreachable!()), "server {\n}\n");
    }

    #[test]
    fn test_rejects_bad_templates() {
        assert_eq!(
            Template::parse("custom", "{{ certificate }}"),
            Err(TemplateError::UnknownPlaceholder {
                template: "custom".into(),
                key: "certificate".into(),
            })
        );
        assert_eq!(
            Template::parse("custom", "listen {{ listen_port ;"),
            Err(TemplateError::Unterminated { template: "custom".into() })
        );
    }
}
