//! Requirement extraction — from a test's topology declarations to marks.
//!
//! A declaration either names a registry entry:
//!
//! ```toml
//! [[test.topology]]
//! known = "ldap"
//! fixtures = { provider = false, directory = "sssd.ldap[0]" }
//! ```
//!
//! or spells the topology out:
//!
//! ```toml
//! [[test.topology]]
//! name = "two-clients"
//! topology = [{ type = "sssd", hosts = { client = 2 } }]
//! fixtures = { first = "sssd.client[0]", second = "sssd.client[1]" }
//! ```

use crate::known::KnownTopology;
use crate::marks::TopologyMark;
use multihost_core::path::canonical;
use multihost_core::topology::DomainSpec;
use multihost_core::{MultihostError, Topology, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// One `topology` entry attached to a test.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequirementDecl {
    /// Registry entry to start from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known: Option<String>,
    /// Name shown after the test name; defaults to the registry name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology: Option<Vec<DomainSpec>>,
    /// Argument name → target. `false` removes a binding the registry
    /// entry provides; an explicit topology starts with no bindings, so
    /// there it has nothing to remove.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fixtures: BTreeMap<String, FixtureTarget>,
    /// Client domain name → provider target.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub domains: BTreeMap<String, String>,
}

/// Right-hand side of a fixture entry: a path, or `false` to drop the
/// binding. `true` is rejected since it names no target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FixtureTarget {
    Path(String),
    Enabled(bool),
}

impl FixtureTarget {
    fn into_value(self, alias: &str) -> Result<Value<String>, MultihostError> {
        match self {
            Self::Path(target) => Ok(Value::Set(canonical(&target)?)),
            Self::Enabled(false) => Ok(Value::Delete),
            Self::Enabled(true) => Err(MultihostError::InvalidPath(format!(
                "{alias} = true (expected a host path or false)"
            ))),
        }
    }
}

/// Normalise every declaration attached to `test` into a mark.
///
/// No declarations means the test is unconstrained and yields no marks.
pub fn extract(test: &str, decls: &[RequirementDecl]) -> Result<Vec<TopologyMark>, MultihostError> {
    let marks = decls
        .iter()
        .enumerate()
        .map(|(i, decl)| extract_one(test, i, decl))
        .collect::<Result<Vec<_>, _>>()?;

    debug!("requirement: {test}: {} topology mark(s)", marks.len());
    Ok(marks)
}

fn extract_one(
    test: &str,
    position: usize,
    decl: &RequirementDecl,
) -> Result<TopologyMark, MultihostError> {
    let mut mark = match (&decl.known, &decl.topology) {
        (Some(_), Some(_)) => {
            return Err(MultihostError::InvalidShape(format!(
                "{test}: topology requirement sets both 'known' and 'topology'"
            )));
        }
        (Some(known), None) => KnownTopology::from_name(known)
            .ok_or_else(|| MultihostError::UnknownTopology(known.clone()))?
            .mark()?,
        (None, Some(specs)) => TopologyMark::new(
            format!("topology-{}", position + 1),
            Topology::from_specs(specs.clone())?,
            Vec::<(String, String)>::new(),
            Vec::<(String, String)>::new(),
        )?,
        (None, None) => {
            return Err(MultihostError::MissingRequirement {
                test: test.to_string(),
            });
        }
    };

    if let Some(name) = &decl.name {
        mark.name = name.clone();
    }

    for (alias, target) in &decl.fixtures {
        target.clone().into_value(alias)?.apply(&mut mark.fixtures, alias.clone());
    }

    for (domain, target) in &decl.domains {
        mark.domains.insert(domain.clone(), canonical(target)?);
    }

    Ok(mark)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decls(toml_src: &str) -> Vec<RequirementDecl> {
        #[derive(Deserialize)]
        struct Doc {
            topology: Vec<RequirementDecl>,
        }
        toml::from_str::<Doc>(toml_src).unwrap().topology
    }

    #[test]
    fn test_no_declarations_is_unconstrained() {
        assert!(extract("test_any", &[]).unwrap().is_empty());
    }

    #[test]
    fn test_known_reference() {
        let marks = extract("test_ldap", &decls("[[topology]]\nknown = \"ldap\"\n")).unwrap();
        assert_eq!(marks.len(), 1);
        assert_eq!(marks[0], KnownTopology::Ldap.mark().unwrap());
    }

    #[test]
    fn test_known_reference_with_overrides() {
        let marks = extract(
            "test_ldap",
            &decls(
                r#"
[[topology]]
known = "ldap"
name = "ldap-directory"
fixtures = { provider = false, directory = "sssd.ldap[0]" }
"#,
            ),
        )
        .unwrap();
        let mark = &marks[0];
        assert_eq!(mark.name, "ldap-directory");
        assert!(!mark.fixtures.contains_key("provider"));
        assert_eq!(mark.fixtures["directory"], "sssd_ldap_0");
        assert_eq!(mark.fixtures["client"], "sssd_client_0");
        assert_eq!(mark.fixtures["ldap"], "sssd_ldap_0");
    }

    #[test]
    fn test_explicit_topology() {
        let marks = extract(
            "test_two_clients",
            &decls(
                r#"
[[topology]]
topology = [{ type = "sssd", hosts = { client = 2 } }]
fixtures = { first = "sssd.client[0]", second = "sssd_client_1" }
domains = { test = "sssd.client[0]" }
"#,
            ),
        )
        .unwrap();
        let mark = &marks[0];
        assert_eq!(mark.name, "topology-1");
        assert_eq!(
            mark.topology.paths(),
            ["sssd_client_list", "sssd_client_0", "sssd_client_1"]
        );
        assert_eq!(mark.fixtures["first"], "sssd_client_0");
        assert_eq!(mark.fixtures["second"], "sssd_client_1");
        assert_eq!(mark.domains["test"], "sssd_client_0");
    }

    #[test]
    fn test_multiple_declarations_keep_order() {
        let marks = extract(
            "test_any_ad",
            &decls("[[topology]]\nknown = \"ad\"\n[[topology]]\nknown = \"samba\"\n"),
        )
        .unwrap();
        let names: Vec<_> = marks.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["ad", "samba"]);
    }

    #[test]
    fn test_missing_requirement() {
        let err = extract("test_broken", &[RequirementDecl::default()]).unwrap_err();
        assert!(
            matches!(err, MultihostError::MissingRequirement { ref test } if test == "test_broken")
        );
    }

    #[test]
    fn test_unknown_registry_name() {
        let err = extract("t", &decls("[[topology]]\nknown = \"kerberos\"\n")).unwrap_err();
        assert!(matches!(err, MultihostError::UnknownTopology(ref n) if n == "kerberos"));
    }

    #[test]
    fn test_known_and_topology_conflict() {
        let err = extract(
            "t",
            &decls("[[topology]]\nknown = \"ldap\"\ntopology = [{ type = \"sssd\", hosts = { client = 1 } }]\n"),
        )
        .unwrap_err();
        assert!(matches!(err, MultihostError::InvalidShape(_)));
    }

    #[test]
    fn test_negative_count_rejected() {
        let err = extract(
            "t",
            &decls("[[topology]]\ntopology = [{ type = \"sssd\", hosts = { client = -1 } }]\n"),
        )
        .unwrap_err();
        assert!(matches!(err, MultihostError::InvalidShape(_)));
    }

    #[test]
    fn test_bad_fixture_target() {
        let err = extract(
            "t",
            &decls("[[topology]]\nknown = \"client\"\nfixtures = { client = \"client[0]\" }\n"),
        )
        .unwrap_err();
        assert!(matches!(err, MultihostError::InvalidPath(_)));
    }

    #[test]
    fn test_true_fixture_target_rejected() {
        let err = extract(
            "t",
            &decls("[[topology]]\nknown = \"ldap\"\nfixtures = { provider = true }\n"),
        )
        .unwrap_err();
        assert!(matches!(err, MultihostError::InvalidPath(ref m) if m.contains("provider")));
    }

    #[test]
    fn test_false_on_explicit_topology_is_noop() {
        let marks = extract(
            "t",
            &decls(
                "[[topology]]\ntopology = [{ type = \"sssd\", hosts = { client = 1 } }]\nfixtures = { client = false }\n",
            ),
        )
        .unwrap();
        assert!(marks[0].fixtures.is_empty());
    }
}
