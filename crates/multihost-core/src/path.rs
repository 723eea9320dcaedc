//! Path naming — the string keys that address role-slots.
//!
//! Canonical form:
//! - `<domain-type>_<role>_list` — every host of a role
//! - `<domain-type>_<role>_<index>` — one host, zero-based in declaration order
//!
//! Fixture targets may also be written in dotted form, `sssd.client` and
//! `sssd.client[0]`, which [`Path::parse`] turns into the same keys.

use crate::error::MultihostError;
use std::fmt;

/// A parsed path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Path {
    /// All hosts of `role` inside domains of `domain_type`.
    List { domain_type: String, role: String },
    /// The host at `index` within the list.
    Host {
        domain_type: String,
        role: String,
        index: usize,
    },
}

impl Path {
    pub fn list(domain_type: &str, role: &str) -> Self {
        Self::List {
            domain_type: domain_type.to_string(),
            role: role.to_string(),
        }
    }

    pub fn host(domain_type: &str, role: &str, index: usize) -> Self {
        Self::Host {
            domain_type: domain_type.to_string(),
            role: role.to_string(),
            index,
        }
    }

    /// Parse a dotted target such as `sssd.ldap[0]` or `sssd.client`.
    pub fn parse(target: &str) -> Result<Self, MultihostError> {
        let invalid = || MultihostError::InvalidPath(target.to_string());

        let (domain_type, rest) = target.split_once('.').ok_or_else(invalid)?;
        if domain_type.is_empty() {
            return Err(invalid());
        }

        let (role, index) = match rest.strip_suffix(']') {
            Some(inner) => {
                let (role, index) = inner.split_once('[').ok_or_else(invalid)?;
                let index = index.parse::<usize>().map_err(|_| invalid())?;
                (role, Some(index))
            }
            None => (rest, None),
        };

        if role.is_empty() || role.contains(&['.', '[', ']'][..]) {
            return Err(invalid());
        }

        Ok(match index {
            Some(index) => Self::host(domain_type, role, index),
            None => Self::list(domain_type, role),
        })
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Self::List { .. })
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List { domain_type, role } => write!(f, "{domain_type}_{role}_list"),
            Self::Host {
                domain_type,
                role,
                index,
            } => write!(f, "{domain_type}_{role}_{index}"),
        }
    }
}

/// Whether a canonical key names a list path.
pub fn is_list_key(key: &str) -> bool {
    key.ends_with("_list")
}

/// Normalize a fixture target to its canonical key.
///
/// Dotted targets are parsed; anything else must already look like a
/// canonical key (`<type>_<role>_list` or `<type>_<role>_<index>`).
pub fn canonical(target: &str) -> Result<String, MultihostError> {
    if target.contains(&['.', '['][..]) {
        return Path::parse(target).map(|p| p.to_string());
    }

    let invalid = || MultihostError::InvalidPath(target.to_string());
    let (prefix, last) = target.rsplit_once('_').ok_or_else(invalid)?;
    let (domain_type, role) = prefix.split_once('_').ok_or_else(invalid)?;
    if domain_type.is_empty() || role.is_empty() {
        return Err(invalid());
    }
    if last != "list" && (last.is_empty() || !last.bytes().all(|b| b.is_ascii_digit())) {
        return Err(invalid());
    }

    Ok(target.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_indexed() {
        let p = Path::parse("sssd.ldap[0]").unwrap();
        assert_eq!(p, Path::host("sssd", "ldap", 0));
        assert_eq!(p.to_string(), "sssd_ldap_0");
        assert!(!p.is_list());
    }

    #[test]
    fn test_parse_list() {
        let p = Path::parse("sssd.client").unwrap();
        assert_eq!(p.to_string(), "sssd_client_list");
        assert!(p.is_list());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["sssd", ".client", "sssd.", "sssd.client[", "sssd.client[x]", "sssd.a.b"] {
            assert!(
                matches!(Path::parse(bad), Err(MultihostError::InvalidPath(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_canonical_accepts_both_forms() {
        assert_eq!(canonical("sssd.ipa[1]").unwrap(), "sssd_ipa_1");
        assert_eq!(canonical("sssd_ipa_1").unwrap(), "sssd_ipa_1");
        assert_eq!(canonical("sssd_client_list").unwrap(), "sssd_client_list");
    }

    #[test]
    fn test_canonical_rejects_garbage() {
        assert!(canonical("client").is_err());
        assert!(canonical("sssd_client").is_err());
        assert!(canonical("sssd_client_x").is_err());
    }

    #[test]
    fn test_is_list_key() {
        assert!(is_list_key("sssd_client_list"));
        assert!(!is_list_key("sssd_client_0"));
    }
}
