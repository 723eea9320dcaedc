//! Role-name to factory mapping used by the inventory builder.

use crate::role::{GenericRole, Role};
use multihost_core::{DomainConfig, HostConfig, MultihostError};
use std::collections::BTreeMap;

/// Constructs a role handle from a declared host.
pub type RoleFactory = Box<dyn Fn(&HostConfig, &DomainConfig) -> Box<dyn Role>>;

/// Roles shipped with the harness.
const BUILTIN_ROLES: &[&str] = &["client", "ldap", "ipa", "ad", "samba"];

/// Which factory builds which role.
#[derive(Default)]
pub struct RoleRegistry {
    factories: BTreeMap<String, RoleFactory>,
}

impl RoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in role mapped to [`GenericRole`].
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for role in BUILTIN_ROLES {
            registry.register(role, |host, domain| {
                Box::new(GenericRole::new(host, domain)) as Box<dyn Role>
            });
        }
        registry
    }

    /// Register (or replace) the factory for `role`.
    pub fn register<F>(&mut self, role: &str, factory: F) -> &mut Self
    where
        F: Fn(&HostConfig, &DomainConfig) -> Box<dyn Role> + 'static,
    {
        self.factories.insert(role.to_string(), Box::new(factory));
        self
    }

    pub fn contains(&self, role: &str) -> bool {
        self.factories.contains_key(role)
    }

    /// Registered role names, sorted.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Build the handle for `host`, or fail with `UnknownRole`.
    pub fn create(
        &self,
        host: &HostConfig,
        domain: &DomainConfig,
    ) -> Result<Box<dyn Role>, MultihostError> {
        let factory = self
            .factories
            .get(&host.role)
            .ok_or_else(|| MultihostError::UnknownRole {
                role: host.role.clone(),
                hostname: host.hostname.clone(),
            })?;
        Ok(factory(host, domain))
    }
}

impl std::fmt::Debug for RoleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleRegistry")
            .field("roles", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(role: &str) -> HostConfig {
        HostConfig {
            hostname: format!("{role}.test"),
            role: role.into(),
            ip: None,
            username: None,
            password: None,
            config: BTreeMap::new(),
        }
    }

    fn domain() -> DomainConfig {
        DomainConfig {
            name: None,
            domain_type: "sssd".into(),
            hosts: Vec::new(),
        }
    }

    #[test]
    fn test_builtin_roles() {
        let registry = RoleRegistry::builtin();
        let roles: Vec<_> = registry.roles().collect();
        assert_eq!(roles, vec!["ad", "client", "ipa", "ldap", "samba"]);
    }

    #[test]
    fn test_create_known_role() {
        let registry = RoleRegistry::builtin();
        let role = registry.create(&host("ipa"), &domain()).unwrap();
        assert_eq!(role.role(), "ipa");
        assert_eq!(role.hostname(), "ipa.test");
    }

    #[test]
    fn test_create_unknown_role() {
        let registry = RoleRegistry::builtin();
        let err = registry.create(&host("kdc"), &domain()).unwrap_err();
        assert!(matches!(err, MultihostError::UnknownRole { ref role, .. } if role == "kdc"));
    }

    #[test]
    fn test_register_custom_factory() {
        let mut registry = RoleRegistry::new();
        registry.register("kdc", |h, d| Box::new(GenericRole::new(h, d)) as Box<dyn Role>);
        assert!(registry.contains("kdc"));
        assert!(!registry.contains("client"));
    }
}
