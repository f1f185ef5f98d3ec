//! Daemon reload.

use std::fmt;
use std::process::Command;

use crate::error::{ReconcileError, Result};

/// Something that can make the proxy daemon re-read its configuration.
pub trait ServiceReloader: Send + Sync + fmt::Debug {
    /// Name of the service being reloaded, for logs and errors.
    fn service(&self) -> &str;

    /// Reload synchronously. Any failure must be returned.
    fn reload(&self) -> Result<()>;
}

/// Runs an external command such as `systemctl reload <service>`.
#[derive(Debug, Clone)]
pub struct CommandReloader {
    program: String,
    args: Vec<String>,
    service: String,
}

impl CommandReloader {
    /// `command` is the program followed by its leading arguments; the
    /// service name is appended as the final argument.
    pub fn new(command: &[String], service: impl Into<String>) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            service: service.into(),
        })
    }
}

impl ServiceReloader for CommandReloader {
    fn service(&self) -> &str {
        &self.service
    }

    fn reload(&self) -> Result<()> {
        tracing::debug!(
            program = %self.program,
            args = ?self.args,
            service = %self.service,
            "Reloading service"
        );

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(&self.service)
            .output()
            .map_err(|e| ReconcileError::Reload {
                service: self.service.clone(),
                reason: format!("could not run '{}': {}", self.program, e),
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(ReconcileError::Reload {
            service: self.service.clone(),
            reason: format!("{} ({})", output.status, stderr.trim()),
        })
    }
}
