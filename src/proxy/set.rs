//! Name-keyed collection of proxy definitions.

use std::collections::btree_map::{self, BTreeMap};

use serde::{Serialize, Serializer};

use crate::proxy::definition::ProxyDefinition;

/// A set of definitions with unique names, iterated in name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxySet {
    by_name: BTreeMap<String, ProxyDefinition>,
}

impl ProxySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `def`, handing it back if its name is already taken.
    pub fn insert(&mut self, def: ProxyDefinition) -> Result<(), ProxyDefinition> {
        match self.by_name.entry(def.name().to_string()) {
            btree_map::Entry::Occupied(_) => Err(def),
            btree_map::Entry::Vacant(slot) => {
                slot.insert(def);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ProxyDefinition> {
        self.by_name.get(name)
    }

    /// True if some member is field-equal to `def`.
    pub fn contains_equal(&self, def: &ProxyDefinition) -> bool {
        self.by_name.values().any(|member| member.same_fields(def))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProxyDefinition> {
        self.by_name.values()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl IntoIterator for ProxySet {
    type Item = ProxyDefinition;
    type IntoIter = btree_map::IntoValues<String, ProxyDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.by_name.into_values()
    }
}

impl Serialize for ProxySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.by_name.values())
    }
}
