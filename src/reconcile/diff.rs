//! Desired/current set comparison.

use std::fmt;

use serde::Serialize;

use crate::proxy::{ProxyDefinition, ProxySet};
use crate::state::Recovered;

/// One step of an apply phase, identified by proxy name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "operation", content = "proxy", rename_all = "lowercase")]
pub enum Operation {
    Configure(String),
    Remove(String),
    /// Delete a managed enabled link whose target is gone.
    Unlink(String),
}

impl Operation {
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Configure(_) => "configure",
            Operation::Remove(_) => "remove",
            Operation::Unlink(_) => "unlink",
        }
    }

    pub fn proxy(&self) -> &str {
        match self {
            Operation::Configure(name) | Operation::Remove(name) | Operation::Unlink(name) => name,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.proxy())
    }
}

/// What it takes to converge the current set onto the desired set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    /// Applied first.
    pub configure: Vec<ProxyDefinition>,
    /// Applied after every configure.
    pub remove: Vec<ProxyDefinition>,
    /// Dangling managed links to delete, applied last.
    pub unlink: Vec<String>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.configure.is_empty() && self.remove.is_empty() && self.unlink.is_empty()
    }

    /// Operations in apply order.
    pub fn operations(&self) -> Vec<Operation> {
        self.configure
            .iter()
            .map(|def| Operation::Configure(def.name().to_string()))
            .chain(self.remove.iter().map(|def| Operation::Remove(def.name().to_string())))
            .chain(self.unlink.iter().cloned().map(Operation::Unlink))
            .collect()
    }
}

/// Compute the plan by structural equality.
///
/// A current proxy whose name is reused by a changed desired proxy is not
/// removed: configuring the new one already replaces its files, and removing
/// afterwards would delete them again.
pub fn diff(desired: &ProxySet, current: &ProxySet) -> Plan {
    let configure: Vec<ProxyDefinition> = desired
        .iter()
        .filter(|def| !current.contains_equal(def))
        .cloned()
        .collect();

    let remove = current
        .iter()
        .filter(|def| !desired.contains_equal(def))
        .filter(|def| !configure.iter().any(|c| c.name() == def.name()))
        .cloned()
        .collect();

    Plan {
        configure,
        remove,
        unlink: Vec::new(),
    }
}

/// [`diff`] against a full recovery scan.
///
/// A dangling link is unlinked unless its name is desired, in which case the
/// configure replaces it.
pub fn plan(desired: &ProxySet, recovered: &Recovered) -> Plan {
    let mut plan = diff(desired, &recovered.current);
    plan.unlink = recovered
        .dangling
        .iter()
        .filter(|name| desired.get(name).is_none())
        .cloned()
        .collect();
    plan
}
