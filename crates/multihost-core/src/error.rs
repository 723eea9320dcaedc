//! Error taxonomy for topology parsing, inventory construction, and binding.

use thiserror::Error;

/// Everything that can go wrong between reading the configuration and
/// binding hosts into a test invocation.
///
/// Deselecting a test is not an error and never produces one of these.
#[derive(Debug, Error)]
pub enum MultihostError {
    /// A topology or domain was constructed from a malformed shape.
    #[error("invalid topology shape: {0}")]
    InvalidShape(String),

    /// A declared host plays a role that no factory can construct.
    #[error("unknown role '{role}' for host {hostname}")]
    UnknownRole { role: String, hostname: String },

    /// A test declared a topology requirement without a topology.
    #[error("{test}: topology requirement declared without a topology")]
    MissingRequirement { test: String },

    /// A requirement references a registry entry that does not exist.
    #[error("unknown topology '{0}'")]
    UnknownTopology(String),

    /// A fixture target could not be parsed as a path.
    #[error("invalid path '{0}'")]
    InvalidPath(String),

    /// A path judged satisfiable is missing from the inventory.
    #[error("host \"{0}\" does not exist")]
    UnresolvedPath(String),

    /// The declared configuration could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),

    /// A role collaborator failed during setup or teardown.
    #[error("role on {hostname} failed: {message}")]
    Role { hostname: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_role_message_names_host() {
        let err = MultihostError::UnknownRole {
            role: "kdc".into(),
            hostname: "kdc.test".into(),
        };
        assert_eq!(err.to_string(), "unknown role 'kdc' for host kdc.test");
    }

    #[test]
    fn test_unresolved_path_message() {
        let err = MultihostError::UnresolvedPath("sssd_ldap_3".into());
        assert!(err.to_string().contains("sssd_ldap_3"));
    }
}
