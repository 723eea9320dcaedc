//! Topology marks — a named requirement attached to a test.

use multihost_core::path::canonical;
use multihost_core::topology::DomainSpec;
use multihost_core::{MultihostError, Topology};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// A topology requirement plus the argument names it provides.
///
/// `fixtures` maps an argument name to the path it receives; several names
/// may point at the same path. `domains` maps client-side domain names to
/// the provider host that backs them.
#[derive(Debug, Clone, PartialEq)]
pub struct TopologyMark {
    pub name: String,
    pub topology: Topology,
    pub fixtures: BTreeMap<String, String>,
    pub domains: BTreeMap<String, String>,
}

/// Serialisable view of a mark.
#[derive(Debug, Clone, Serialize)]
pub struct MarkExport {
    pub name: String,
    pub fixtures: BTreeMap<String, String>,
    pub domains: BTreeMap<String, String>,
    pub topology: Vec<DomainSpec>,
}

impl TopologyMark {
    /// Build a mark. Fixture and domain targets may be dotted
    /// (`sssd.ldap[0]`) or canonical (`sssd_ldap_0`); they are stored
    /// canonically.
    pub fn new<F, D, K, V>(
        name: impl Into<String>,
        topology: Topology,
        fixtures: F,
        domains: D,
    ) -> Result<Self, MultihostError>
    where
        F: IntoIterator<Item = (K, V)>,
        D: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let canonicalize = |entries: Vec<(K, V)>| -> Result<BTreeMap<String, String>, MultihostError> {
            entries
                .into_iter()
                .map(|(k, v)| -> Result<(String, String), MultihostError> {
                    Ok((k.into(), canonical(v.as_ref())?))
                })
                .collect()
        };

        Ok(Self {
            name: name.into(),
            topology,
            fixtures: canonicalize(fixtures.into_iter().collect())?,
            domains: canonicalize(domains.into_iter().collect())?,
        })
    }

    /// Binding table: path → argument names.
    pub fn mapping(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut mapping: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (name, path) in &self.fixtures {
            mapping.entry(path.as_str()).or_default().push(name.as_str());
        }
        mapping
    }

    /// Every argument name this mark can fill: canonical paths and aliases.
    pub fn args(&self) -> BTreeSet<&str> {
        self.topology
            .paths()
            .iter()
            .map(String::as_str)
            .chain(self.fixtures.keys().map(String::as_str))
            .collect()
    }

    /// Paths this mark resolves during binding: the topology's own paths,
    /// then fixture and domain targets outside of them.
    pub fn bound_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.topology.paths().iter().map(String::as_str).collect();
        for target in self.fixtures.values().chain(self.domains.values()) {
            if !paths.contains(&target.as_str()) {
                paths.push(target);
            }
        }
        paths
    }

    pub fn export(&self) -> MarkExport {
        MarkExport {
            name: self.name.clone(),
            fixtures: self.fixtures.clone(),
            domains: self.domains.clone(),
            topology: self.topology.export(),
        }
    }
}
