//! Concrete inventory — the session's available topology and its hosts.
//!
//! Built once at session start from the declared configuration. Every path
//! the available topology enumerates resolves to a host (indexed path) or an
//! ordered list of hosts (list path). The inventory owns every role handle;
//! lookups hand out borrows.

use crate::registry::RoleRegistry;
use crate::role::Role;
use multihost_core::path::{is_list_key, Path};
use multihost_core::{MultihostConfig, MultihostError, Topology};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// A resolved path.
#[derive(Debug, Clone)]
pub enum Bound<'a> {
    Host(&'a dyn Role),
    Hosts(Vec<&'a dyn Role>),
}

impl<'a> Bound<'a> {
    /// The single host, if this is an indexed path.
    pub fn host(&self) -> Option<&'a dyn Role> {
        match self {
            Self::Host(h) => Some(*h),
            Self::Hosts(_) => None,
        }
    }

    /// Hosts as a list; an indexed path yields one element.
    pub fn hosts(&self) -> Vec<&'a dyn Role> {
        match self {
            Self::Host(h) => vec![*h],
            Self::Hosts(hs) => hs.clone(),
        }
    }

    /// Hostnames, for reporting.
    pub fn hostnames(&self) -> Vec<&'a str> {
        self.hosts().into_iter().map(|h| h.hostname()).collect()
    }
}

/// The session's machines, addressable by path.
#[derive(Debug)]
pub struct Inventory {
    topology: Topology,
    config: MultihostConfig,
    hosts: Vec<Box<dyn Role>>,
    by_host_path: HashMap<String, usize>,
    by_list_path: HashMap<String, Vec<usize>>,
    setup_order: Vec<usize>,
}

impl Inventory {
    /// Build the inventory. Fails with `UnknownRole` before creating
    /// anything usable if any host's role has no factory.
    pub fn build(config: MultihostConfig, registry: &RoleRegistry) -> Result<Self, MultihostError> {
        let topology = Topology::from_config(&config);
        let mut hosts: Vec<Box<dyn Role>> = Vec::with_capacity(config.host_count());
        let mut by_host_path = HashMap::new();
        let mut by_list_path: HashMap<String, Vec<usize>> = HashMap::new();

        for domain in &config.domains {
            for role in domain.roles() {
                let list_key = Path::list(&domain.domain_type, role).to_string();
                for host in domain.hosts_by_role(role) {
                    let handle = registry.create(host, domain)?;
                    let slot = hosts.len();
                    hosts.push(handle);

                    let list = by_list_path.entry(list_key.clone()).or_default();
                    let index = list.len();
                    list.push(slot);
                    by_host_path.insert(
                        Path::host(&domain.domain_type, role, index).to_string(),
                        slot,
                    );
                }
            }
        }

        info!(
            "inventory: {} host(s) in {} domain(s)",
            hosts.len(),
            config.domains.len()
        );

        Ok(Self {
            topology,
            config,
            hosts,
            by_host_path,
            by_list_path,
            setup_order: Vec::new(),
        })
    }

    /// The available topology.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// The configuration this inventory was built from.
    pub fn config(&self) -> &MultihostConfig {
        &self.config
    }

    /// All hosts in creation order.
    pub fn hosts(&self) -> impl Iterator<Item = &dyn Role> {
        self.hosts.iter().map(|h| h.as_ref() as &dyn Role)
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Resolve a canonical path.
    pub fn lookup(&self, path: &str) -> Result<Bound<'_>, MultihostError> {
        let unresolved = || MultihostError::UnresolvedPath(path.to_string());

        if is_list_key(path) {
            let slots = self.by_list_path.get(path).ok_or_else(unresolved)?;
            Ok(Bound::Hosts(
                slots.iter().map(|&i| self.hosts[i].as_ref() as &dyn Role).collect(),
            ))
        } else {
            let slot = *self.by_host_path.get(path).ok_or_else(unresolved)?;
            Ok(Bound::Host(&*self.hosts[slot]))
        }
    }

    fn slots(&self, path: &str) -> Result<Vec<usize>, MultihostError> {
        if is_list_key(path) {
            self.by_list_path
                .get(path)
                .cloned()
                .ok_or_else(|| MultihostError::UnresolvedPath(path.to_string()))
        } else {
            self.by_host_path
                .get(path)
                .map(|&i| vec![i])
                .ok_or_else(|| MultihostError::UnresolvedPath(path.to_string()))
        }
    }

    /// Run setup on every host referenced by `paths`, each at most once
    /// until the next teardown. The order is recorded for teardown.
    pub fn setup<'p, I>(&mut self, paths: I) -> Result<(), MultihostError>
    where
        I: IntoIterator<Item = &'p str>,
    {
        for path in paths {
            for slot in self.slots(path)? {
                if self.setup_order.contains(&slot) {
                    continue;
                }
                self.hosts[slot].setup()?;
                debug!("inventory: set up {}", self.hosts[slot].hostname());
                self.setup_order.push(slot);
            }
        }
        Ok(())
    }

    /// Hostnames that are set up and awaiting teardown, in setup order.
    pub fn active(&self) -> Vec<&str> {
        self.setup_order
            .iter()
            .map(|&i| self.hosts[i].hostname())
            .collect()
    }

    /// Tear down every set-up host in reverse setup order.
    ///
    /// All hosts are torn down even if some fail; the first failure is
    /// returned.
    pub fn teardown(&mut self) -> Result<(), MultihostError> {
        let mut first_error = None;

        while let Some(slot) = self.setup_order.pop() {
            let host = &mut self.hosts[slot];
            if let Err(e) = host.teardown() {
                warn!("inventory: teardown of {} failed: {e}", host.hostname());
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
