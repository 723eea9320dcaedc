//! Declared multihost configuration.
//!
//! The configuration lists domains, each with the hosts it contains and the
//! role every host plays. TOML is the default format; files ending in
//! `.json` are read as JSON.
//!
//! ```toml
//! [[domains]]
//! type = "sssd"
//!
//! [[domains.hosts]]
//! hostname = "client.test"
//! role = "client"
//!
//! [[domains.hosts]]
//! hostname = "master.ldap.test"
//! role = "ldap"
//! config = { binddn = "cn=Directory Manager", bindpw = "Secret123" }
//! ```

use crate::error::MultihostError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Shown in place of a password when the configuration is logged.
const REDACTED: &str = "********";

/// Root configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MultihostConfig {
    #[serde(default)]
    pub domains: Vec<DomainConfig>,
}

/// One declared domain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DomainConfig {
    /// Informational domain name (e.g. "ldap.test").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Domain type tag matched against topology requirements.
    #[serde(rename = "type", default = "default_domain_type")]
    pub domain_type: String,
    #[serde(default)]
    pub hosts: Vec<HostConfig>,
}

fn default_domain_type() -> String {
    "default".to_string()
}

/// One declared machine. `hostname` and `role` are required.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    pub hostname: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Role-specific settings handed to the role collaborator untouched.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, serde_json::Value>,
}

impl MultihostConfig {
    /// Load a configuration file. `~` in the path is expanded.
    pub fn load(path: &str) -> Result<Self, MultihostError> {
        let expanded = shellexpand(path);
        let content = std::fs::read_to_string(&expanded)
            .map_err(|e| MultihostError::Config(format!("failed to read {expanded}: {e}")))?;

        let is_json = Path::new(&expanded)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let config = if is_json {
            Self::from_json(&content)
        } else {
            Self::from_toml(&content)
        }
        .map_err(|e| match e {
            MultihostError::Config(msg) => MultihostError::Config(format!("{expanded}: {msg}")),
            other => other,
        })?;

        debug!(
            "config: loaded {} domain(s) from {expanded}",
            config.domains.len()
        );
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, MultihostError> {
        toml::from_str(content).map_err(|e| MultihostError::Config(e.to_string()))
    }

    pub fn from_json(content: &str) -> Result<Self, MultihostError> {
        serde_json::from_str(content).map_err(|e| MultihostError::Config(e.to_string()))
    }

    /// Total number of declared hosts.
    pub fn host_count(&self) -> usize {
        self.domains.iter().map(|d| d.hosts.len()).sum()
    }

    /// Copy with every password masked, for logging.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        for host in config.domains.iter_mut().flat_map(|d| d.hosts.iter_mut()) {
            if host.password.is_some() {
                host.password = Some(REDACTED.to_string());
            }
        }
        config
    }
}

impl DomainConfig {
    /// Hosts of `role`, in declaration order.
    pub fn hosts_by_role<'a>(&'a self, role: &'a str) -> impl Iterator<Item = &'a HostConfig> {
        self.hosts.iter().filter(move |h| h.role == role)
    }

    /// Distinct roles in order of first appearance.
    pub fn roles(&self) -> Vec<&str> {
        let mut roles: Vec<&str> = Vec::new();
        for host in &self.hosts {
            if !roles.contains(&host.role.as_str()) {
                roles.push(&host.role);
            }
        }
        roles
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LDAP_TOML: &str = r#"
[[domains]]
name = "ldap.test"
type = "sssd"

[[domains.hosts]]
hostname = "client.ldap.test"
role = "client"

[[domains.hosts]]
hostname = "master.ldap.test"
role = "ldap"
config = { binddn = "cn=Directory Manager", bindpw = "Secret123" }
"#;

    #[test]
    fn test_parse_toml() {
        let cfg = MultihostConfig::from_toml(LDAP_TOML).unwrap();
        assert_eq!(cfg.domains.len(), 1);
        let domain = &cfg.domains[0];
        assert_eq!(domain.domain_type, "sssd");
        assert_eq!(domain.name.as_deref(), Some("ldap.test"));
        assert_eq!(domain.roles(), vec!["client", "ldap"]);
        assert_eq!(
            domain.hosts[1].config["binddn"],
            serde_json::json!("cn=Directory Manager")
        );
        assert_eq!(cfg.host_count(), 2);
    }

    #[test]
    fn test_parse_json() {
        let cfg = MultihostConfig::from_json(
            r#"{"domains": [{"type": "sssd", "hosts": [{"hostname": "c.test", "role": "client"}]}]}"#,
        )
        .unwrap();
        assert_eq!(cfg.domains[0].hosts[0].hostname, "c.test");
    }

    #[test]
    fn test_domain_type_defaults() {
        let cfg = MultihostConfig::from_toml(
            "[[domains]]\n[[domains.hosts]]\nhostname = \"c.test\"\nrole = \"client\"\n",
        )
        .unwrap();
        assert_eq!(cfg.domains[0].domain_type, "default");
    }

    #[test]
    fn test_unknown_host_attribute_rejected() {
        let err = MultihostConfig::from_toml(
            "[[domains]]\ntype = \"sssd\"\n[[domains.hosts]]\nhostname = \"c\"\nrole = \"client\"\nflavor = \"x\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, MultihostError::Config(_)));
    }

    #[test]
    fn test_missing_role_rejected() {
        let err = MultihostConfig::from_toml(
            "[[domains]]\ntype = \"sssd\"\n[[domains.hosts]]\nhostname = \"c\"\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("role"));
    }

    #[test]
    fn test_hosts_by_role_keeps_order() {
        let cfg = MultihostConfig::from_toml(
            r#"
[[domains]]
type = "sssd"
hosts = [
  { hostname = "a", role = "client" },
  { hostname = "b", role = "ldap" },
  { hostname = "c", role = "client" },
]
"#,
        )
        .unwrap();
        let names: Vec<_> = cfg.domains[0]
            .hosts_by_role("client")
            .map(|h| h.hostname.as_str())
            .collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = MultihostConfig::load("/tmp/__multihost_no_such_config__.toml").unwrap_err();
        assert!(matches!(err, MultihostError::Config(_)));
    }

    #[test]
    fn test_load_from_disk() {
        let path = std::env::temp_dir().join("__multihost_test_config__.toml");
        std::fs::write(&path, LDAP_TOML).unwrap();
        let cfg = MultihostConfig::load(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.domains[0].hosts.len(), 2);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_shellexpand_passthrough() {
        assert_eq!(shellexpand("/etc/mhc.toml"), "/etc/mhc.toml");
    }

    #[test]
    fn test_redacted_masks_passwords() {
        let config = MultihostConfig::from_toml(
            r#"
[[domains]]
type = "sssd"
hosts = [
  { hostname = "client.test", role = "client", password = "Secret123" },
  { hostname = "master.ldap.test", role = "ldap" },
]
"#,
        )
        .unwrap();
        let redacted = config.redacted();
        assert_eq!(redacted.domains[0].hosts[0].password.as_deref(), Some("********"));
        assert_eq!(redacted.domains[0].hosts[1].password, None);
        assert!(!serde_json::to_string(&redacted).unwrap().contains("Secret123"));
        assert_eq!(config.domains[0].hosts[0].password.as_deref(), Some("Secret123"));
    }
}
