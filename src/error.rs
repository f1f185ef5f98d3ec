//! Reconciliation error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::proxy::InvalidDeclaration;
use crate::reconcile::Operation;
use crate::state::marker::MarkerError;

/// Error raised by a reconciliation run or one of its steps.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("invalid proxy declaration: {0}")]
    Validation(#[from] InvalidDeclaration),

    #[error("undecodable state marker in {}: {source}", path.display())]
    Decode { path: PathBuf, source: MarkerError },

    #[error("filesystem error on {}: {source}", path.display())]
    Filesystem { path: PathBuf, source: io::Error },

    #[error("reload of service '{service}' failed: {reason}")]
    Reload { service: String, reason: String },

    #[error("{failed} failed after {} completed operation(s): {source}", completed.len())]
    Apply {
        completed: Vec<Operation>,
        failed: Operation,
        source: Box<ReconcileError>,
    },
}

/// Result alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Broad classification of a [`ReconcileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad declarations; nothing was changed.
    Input,
    /// A managed file carries a marker that cannot be decoded; nothing was changed.
    Decode,
    /// A write, symlink or delete failed.
    Filesystem,
    /// The daemon refused or failed to reload.
    Reload,
}

impl ReconcileError {
    pub fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ReconcileError::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ReconcileError::Validation(_) => ErrorKind::Input,
            ReconcileError::Decode { .. } => ErrorKind::Decode,
            ReconcileError::Filesystem { .. } => ErrorKind::Filesystem,
            ReconcileError::Reload { .. } => ErrorKind::Reload,
            ReconcileError::Apply { source, .. } => source.kind(),
        }
    }

    /// True if the run stopped before touching the filesystem.
    ///
    /// Every failure during Apply is wrapped in [`ReconcileError::Apply`], so
    /// anything else was raised while validating or recovering.
    pub fn is_blocking(&self) -> bool {
        !matches!(self, ReconcileError::Apply { .. })
    }
}
