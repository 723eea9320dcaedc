//! Registry of well-known topologies.
//!
//! Tests should prefer these over hand-built topologies:
//!
//! ```toml
//! [[test]]
//! name = "test_ldap"
//! args = ["client", "ldap"]
//! topology = [{ known = "ldap" }]
//! ```

use crate::marks::TopologyMark;
use multihost_core::{MultihostError, Topology, TopologyDomain};
use std::fmt;

/// Domain type every built-in topology uses.
const DOMAIN_TYPE: &str = "sssd";

/// Common test shapes: a bare client, or a client plus one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownTopology {
    Client,
    Ldap,
    Ipa,
    Ad,
    Samba,
}

impl KnownTopology {
    pub const ALL: [KnownTopology; 5] = [
        Self::Client,
        Self::Ldap,
        Self::Ipa,
        Self::Ad,
        Self::Samba,
    ];

    /// Registry name, also used as the invocation suffix.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Ldap => "ldap",
            Self::Ipa => "ipa",
            Self::Ad => "ad",
            Self::Samba => "samba",
        }
    }

    /// Case-insensitive lookup by registry name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(name))
    }

    /// The provider role next to the client, if any.
    fn provider(&self) -> Option<&'static str> {
        match self {
            Self::Client => None,
            other => Some(other.name()),
        }
    }

    /// Build the mark for this entry.
    ///
    /// Every entry binds `client` to the first client. Provider entries also
    /// bind the provider under its role name and under `provider`, and
    /// configure a client domain named `test` backed by it.
    pub fn mark(&self) -> Result<TopologyMark, MultihostError> {
        let client = format!("{DOMAIN_TYPE}.client[0]");
        let mut roles = vec![("client", 1)];
        let mut fixtures = vec![("client", client)];
        let mut domains = Vec::new();

        if let Some(provider) = self.provider() {
            let target = format!("{DOMAIN_TYPE}.{provider}[0]");
            roles.push((provider, 1));
            fixtures.push((provider, target.clone()));
            fixtures.push(("provider", target.clone()));
            domains.push(("test", target));
        }

        let topology = Topology::new(vec![TopologyDomain::new(DOMAIN_TYPE, roles)?]);
        TopologyMark::new(self.name(), topology, fixtures, domains)
    }
}

impl fmt::Display for KnownTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
