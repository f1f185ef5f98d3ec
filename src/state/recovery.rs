//! Recovery of the active proxy set from the enabled-sites directory.
//!
//! # Responsibilities
//! - Find files named `<prefix>-*.conf` in the enabled directory
//! - Decode the first marker line of each one
//! - Ignore files without a marker (managed by someone else)
//! - Report managed links whose target is gone
//!
//! # Design Decisions
//! - The filesystem is the only state store
//! - A present but undecodable marker stops recovery: skipping it would
//!   orphan the proxy, and its files could never be cleaned up
//! - A marker must name the proxy its file name says it is
//! - Lines are scanned as bytes; only a line carrying the marker token has to
//!   be UTF-8

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::error::{ReconcileError, Result};
use crate::proxy::{ProxyDefinition, ProxySet, SiteLayout};
use crate::state::marker::{self, MarkerError, MARKER_TOKEN};

/// What one managed entry of the enabled directory turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnabledFile {
    /// Carries a marker for this proxy.
    Proxy(ProxyDefinition),
    /// No marker; somebody else's file.
    Unmarked,
    /// A link whose target no longer exists.
    Dangling,
}

/// Everything recovered from the enabled directory in one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recovered {
    pub current: ProxySet,
    /// Names whose enabled link points nowhere, in name order.
    pub dangling: Vec<String>,
}

/// Reads the current set back from disk.
#[derive(Debug, Clone)]
pub struct StateRecovery {
    layout: SiteLayout,
}

impl StateRecovery {
    pub fn new(layout: SiteLayout) -> Self {
        Self { layout }
    }

    /// Every proxy currently enabled and owned by this layout's prefix.
    pub fn current_set(&self) -> Result<ProxySet> {
        Ok(self.scan()?.current)
    }

    /// Scan the enabled directory for managed proxies and dangling links.
    pub fn scan(&self) -> Result<Recovered> {
        let dir = self.layout.enabled_dir();
        tracing::debug!(dir = %dir.display(), "Reading existing proxies from the filesystem");

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(dir = %dir.display(), "Enabled-sites directory does not exist");
                return Ok(Recovered::default());
            }
            Err(e) => return Err(ReconcileError::filesystem(dir, e)),
        };

        let mut candidates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ReconcileError::filesystem(dir, e))?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str().and_then(|f| self.layout.name_from_file(f)) else {
                continue;
            };
            candidates.push((name, entry.path()));
        }
        candidates.sort();

        let mut recovered = Recovered::default();
        for (name, path) in candidates {
            tracing::debug!(path = %path.display(), "Found managed site");
            match self.recover_file(&name, &path)? {
                EnabledFile::Proxy(def) => {
                    tracing::debug!(proxy = %def, "Recovered proxy definition");
                    // Names come from distinct file names, so this cannot collide.
                    let _ = recovered.current.insert(def);
                }
                EnabledFile::Dangling => recovered.dangling.push(name),
                EnabledFile::Unmarked => {}
            }
        }
        Ok(recovered)
    }

    /// Classify a single enabled file by its marker.
    pub fn recover_file(&self, name: &str, path: &Path) -> Result<EnabledFile> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Found dangling enabled link");
                return Ok(EnabledFile::Dangling);
            }
            Err(e) => return Err(ReconcileError::filesystem(path, e)),
        };

        let decode_error = |source| ReconcileError::Decode {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(|e| ReconcileError::filesystem(path, e))?;
            if read == 0 {
                break;
            }
            if !buf.starts_with(MARKER_TOKEN.as_bytes()) {
                continue;
            }

            let line = std::str::from_utf8(&buf).map_err(|_| decode_error(MarkerError::NotUtf8))?;
            let line = line.trim_end_matches(['\n', '\r']);
            let def = marker::decode(line, &self.layout).map_err(decode_error)?;
            if def.name() != name {
                return Err(decode_error(MarkerError::NameMismatch {
                    expected: name.to_string(),
                    found: def.name().to_string(),
                }));
            }
            return Ok(EnabledFile::Proxy(def));
        }

        tracing::debug!(path = %path.display(), "No state marker; leaving file alone");
        Ok(EnabledFile::Unmarked)
    }
}
