//! Binding engine — fills an invocation's arguments from the inventory.

use crate::marks::TopologyMark;
use multihost_core::MultihostError;
use multihost_roles::{Bound, Inventory, Role};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Arguments of one invocation.
///
/// Only names the test declares can receive a value; everything else a mark
/// could provide is silently skipped.
#[derive(Debug, Clone, Default)]
pub struct FuncArgs<'a> {
    declared: BTreeSet<String>,
    values: BTreeMap<String, Bound<'a>>,
    multihost: Option<&'a Inventory>,
}

impl<'a> FuncArgs<'a> {
    pub fn new<I, S>(declared: I, multihost: Option<&'a Inventory>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            declared: declared.into_iter().map(Into::into).collect(),
            values: BTreeMap::new(),
            multihost,
        }
    }

    pub fn declares(&self, name: &str) -> bool {
        self.declared.contains(name)
    }

    pub fn get(&self, name: &str) -> Option<&Bound<'a>> {
        self.values.get(name)
    }

    /// The single host bound to `name`, if any.
    pub fn host(&self, name: &str) -> Option<&'a dyn Role> {
        self.values.get(name).and_then(Bound::host)
    }

    /// Store `value` under `name`. Returns false, storing nothing, when the
    /// test does not declare `name`.
    pub fn set(&mut self, name: &str, value: Bound<'a>) -> bool {
        if !self.declares(name) {
            return false;
        }
        self.values.insert(name.to_string(), value);
        true
    }

    /// The whole inventory, available to every invocation when configured.
    pub fn multihost(&self) -> Option<&'a Inventory> {
        self.multihost
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bound<'a>)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Bind every path of `mark` into `args`.
///
/// Each path is written to the argument named like the path and to every
/// alias the mark maps onto it, where declared. A path the inventory cannot
/// resolve fails the invocation.
pub fn bind<'a>(
    mark: &TopologyMark,
    inventory: &'a Inventory,
    args: &mut FuncArgs<'a>,
) -> Result<(), MultihostError> {
    let mapping = mark.mapping();

    for path in mark.bound_paths() {
        let bound = inventory.lookup(path)?;

        if args.set(path, bound.clone()) {
            debug!("binding: {path} -> {:?}", bound.hostnames());
        }
        for alias in mapping.get(path).into_iter().flatten() {
            if args.set(alias, bound.clone()) {
                debug!("binding: {alias} ({path}) -> {:?}", bound.hostnames());
            }
        }
    }
    Ok(())
}

/// Client-side domains of `mark`, resolved to their provider hosts.
pub fn resolve_domains<'a>(
    mark: &TopologyMark,
    inventory: &'a Inventory,
) -> Result<Vec<(String, Bound<'a>)>, MultihostError> {
    mark.domains
        .iter()
        .map(|(name, path)| -> Result<(String, Bound<'a>), MultihostError> {
            Ok((name.clone(), inventory.lookup(path)?))
        })
        .collect()
}
