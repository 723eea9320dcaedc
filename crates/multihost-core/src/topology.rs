//! Topology value model and algebra.
//!
//! A [`Topology`] is an ordered list of [`TopologyDomain`]s. Each domain has
//! a type tag and a set of role-slots (role name, host count). The same type
//! is used for what a test requires and for what the inventory provides.
//!
//! ```text
//! required  = [sssd { client: 1 }]
//! available = [sssd { client: 1, ldap: 1 }]
//! required.satisfies(&available) == true
//! required == available          == false
//! ```

use crate::config::MultihostConfig;
use crate::error::MultihostError;
use crate::path::Path;
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

// ---------------------------------------------------------------------------
// Serialised form
// ---------------------------------------------------------------------------

/// Serialised domain: `{ type = "sssd", hosts = { client = 1, ldap = 1 } }`.
///
/// Used both for exporting a topology and for reading requirement
/// declarations. Role order in `hosts` is preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainSpec {
    #[serde(rename = "type")]
    pub domain_type: String,
    #[serde(with = "ordered_roles", default)]
    pub hosts: Vec<(String, i64)>,
}

mod ordered_roles {
    use serde::de::{MapAccess, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(roles: &[(String, i64)], s: S) -> Result<S::Ok, S::Error> {
        s.collect_map(roles.iter().map(|(k, v)| (k, v)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<(String, i64)>, D::Error> {
        struct RolesVisitor;

        impl<'de> Visitor<'de> for RolesVisitor {
            type Value = Vec<(String, i64)>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of role name to host count")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut out = Vec::new();
                while let Some((role, count)) = map.next_entry::<String, i64>()? {
                    out.push((role, count));
                }
                Ok(out)
            }
        }

        d.deserialize_map(RolesVisitor)
    }
}

// ---------------------------------------------------------------------------
// TopologyDomain
// ---------------------------------------------------------------------------

/// A domain type plus the roles it requires or provides.
#[derive(Debug, Clone, Eq)]
pub struct TopologyDomain {
    domain_type: String,
    roles: Vec<(String, u32)>,
}

impl TopologyDomain {
    /// Build a domain from a type tag and `(role, count)` pairs.
    ///
    /// Fails with `InvalidShape` on a negative count or when a role is given
    /// twice with different counts. Identical repeats collapse into one slot.
    pub fn new<I, S>(domain_type: impl Into<String>, roles: I) -> Result<Self, MultihostError>
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        let domain_type = domain_type.into();
        let mut slots: Vec<(String, u32)> = Vec::new();

        for (role, count) in roles {
            let role = role.into();
            let count = u32::try_from(count).map_err(|_| {
                MultihostError::InvalidShape(format!(
                    "domain '{domain_type}': role '{role}' has invalid count {count}"
                ))
            })?;

            match slots.iter().find(|(r, _)| *r == role) {
                Some((_, existing)) if *existing == count => {}
                Some((_, existing)) => {
                    return Err(MultihostError::InvalidShape(format!(
                        "domain '{domain_type}': role '{role}' declared with counts {existing} and {count}"
                    )));
                }
                None => slots.push((role, count)),
            }
        }

        Ok(Self {
            domain_type,
            roles: slots,
        })
    }

    pub fn domain_type(&self) -> &str {
        &self.domain_type
    }

    /// Role-slots in declaration order.
    pub fn roles(&self) -> &[(String, u32)] {
        &self.roles
    }

    /// Number of hosts for `role`, if the domain has it.
    pub fn get(&self, role: &str) -> Option<u32> {
        self.roles.iter().find(|(r, _)| r == role).map(|(_, c)| *c)
    }

    pub fn contains(&self, role: &str) -> bool {
        self.get(role).is_some()
    }

    /// Whether `available` covers every role this domain asks for.
    ///
    /// Types must match, and every required role must be present in
    /// `available`, even one required zero times.
    pub fn satisfies(&self, available: &TopologyDomain) -> bool {
        if self.domain_type != available.domain_type {
            return false;
        }

        self.roles.iter().all(|(role, count)| {
            available.get(role).is_some_and(|have| have >= *count)
        })
    }

    pub fn export(&self) -> DomainSpec {
        DomainSpec {
            domain_type: self.domain_type.clone(),
            hosts: self
                .roles
                .iter()
                .map(|(r, c)| (r.clone(), i64::from(*c)))
                .collect(),
        }
    }

    fn role_map(&self) -> BTreeMap<&str, u32> {
        self.roles.iter().map(|(r, c)| (r.as_str(), *c)).collect()
    }
}

impl PartialEq for TopologyDomain {
    fn eq(&self, other: &Self) -> bool {
        self.domain_type == other.domain_type && self.role_map() == other.role_map()
    }
}

impl TryFrom<DomainSpec> for TopologyDomain {
    type Error = MultihostError;

    fn try_from(spec: DomainSpec) -> Result<Self, Self::Error> {
        Self::new(spec.domain_type, spec.hosts)
    }
}

impl fmt::Display for TopologyDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(&self.export()).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

// ---------------------------------------------------------------------------
// Topology
// ---------------------------------------------------------------------------

/// An ordered sequence of domains.
///
/// Immutable once built. [`Topology::paths`] is computed on first use and
/// cached for the lifetime of the value.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    domains: Vec<TopologyDomain>,
    paths: OnceCell<Vec<String>>,
}

impl Topology {
    pub fn new(domains: Vec<TopologyDomain>) -> Self {
        Self {
            domains,
            paths: OnceCell::new(),
        }
    }

    /// A topology with no domains. Satisfied by anything.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from serialised domains, validating every shape.
    pub fn from_specs(specs: Vec<DomainSpec>) -> Result<Self, MultihostError> {
        let domains = specs
            .into_iter()
            .map(TopologyDomain::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(domains))
    }

    /// Infer the available topology from a declared configuration by
    /// counting hosts per role in every domain.
    pub fn from_config(config: &MultihostConfig) -> Self {
        let domains = config
            .domains
            .iter()
            .map(|d| TopologyDomain {
                domain_type: d.domain_type.clone(),
                roles: d
                    .roles()
                    .into_iter()
                    .map(|role| (role.to_string(), d.hosts_by_role(role).count() as u32))
                    .collect(),
            })
            .collect();
        Self::new(domains)
    }

    pub fn domains(&self) -> &[TopologyDomain] {
        &self.domains
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// First domain of the given type.
    pub fn get(&self, domain_type: &str) -> Option<&TopologyDomain> {
        self.domains.iter().find(|d| d.domain_type == domain_type)
    }

    pub fn contains(&self, domain_type: &str) -> bool {
        self.get(domain_type).is_some()
    }

    /// Whether `available` provides everything this topology requires.
    ///
    /// Each required domain is paired with the first available domain of the
    /// same type that no earlier required domain took. There is no search
    /// over alternative pairings: if two required domains of one type would
    /// only fit the available ones in a different order, the check fails.
    pub fn satisfies(&self, available: &Topology) -> bool {
        let mut taken = vec![false; available.domains.len()];

        for required in &self.domains {
            let slot = available
                .domains
                .iter()
                .enumerate()
                .find(|(i, d)| !taken[*i] && d.domain_type == required.domain_type);

            let Some((index, candidate)) = slot else {
                return false;
            };
            taken[index] = true;

            if !required.satisfies(candidate) {
                return false;
            }
        }

        true
    }

    /// Every path this topology addresses, in canonical order.
    ///
    /// Domain order, then role declaration order; each role contributes its
    /// list path followed by indexed paths `0..count`. When several domains
    /// share a type, a role's list path appears once and indices continue
    /// across those domains.
    pub fn paths(&self) -> &[String] {
        self.paths.get_or_init(|| self.compute_paths())
    }

    fn compute_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        let mut next: HashMap<(&str, &str), usize> = HashMap::new();

        for domain in &self.domains {
            for (role, count) in &domain.roles {
                let key = (domain.domain_type.as_str(), role.as_str());
                let start = match next.get(&key) {
                    Some(n) => *n,
                    None => {
                        paths.push(Path::list(&domain.domain_type, role).to_string());
                        0
                    }
                };
                let end = start + *count as usize;
                for index in start..end {
                    paths.push(Path::host(&domain.domain_type, role, index).to_string());
                }
                next.insert(key, end);
            }
        }

        paths
    }

    pub fn export(&self) -> Vec<DomainSpec> {
        self.domains.iter().map(TopologyDomain::export).collect()
    }
}

impl PartialEq for Topology {
    fn eq(&self, other: &Self) -> bool {
        self.domains == other.domains
    }
}

impl Eq for Topology {}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(&self.export()).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}
