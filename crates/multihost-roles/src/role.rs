//! The role collaborator interface.
//!
//! Roles wrap one declared host and do the actual remote work (commands,
//! LDAP operations, service control). Everything a role changes during a
//! test is reverted by its `teardown`.

use multihost_core::{DomainConfig, HostConfig, MultihostError};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// A host bound to the role it plays.
pub trait Role: fmt::Debug {
    /// Role name as declared in the configuration (e.g. "client").
    fn role(&self) -> &str;

    fn hostname(&self) -> &str;

    /// Prepare the host before a test body runs.
    fn setup(&mut self) -> Result<(), MultihostError> {
        Ok(())
    }

    /// Revert whatever the test changed.
    fn teardown(&mut self) -> Result<(), MultihostError> {
        Ok(())
    }

    /// Access to the concrete role type for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// Role used when no specialised implementation is registered.
///
/// Keeps the connection attributes and counts setup/teardown cycles.
#[derive(Debug, Clone)]
pub struct GenericRole {
    role: String,
    hostname: String,
    domain_type: String,
    domain_name: Option<String>,
    ip: Option<String>,
    config: BTreeMap<String, serde_json::Value>,
    active: bool,
    cycles: u32,
}

impl GenericRole {
    pub fn new(host: &HostConfig, domain: &DomainConfig) -> Self {
        Self {
            role: host.role.clone(),
            hostname: host.hostname.clone(),
            domain_type: domain.domain_type.clone(),
            domain_name: domain.name.clone(),
            ip: host.ip.clone(),
            config: host.config.clone(),
            active: false,
            cycles: 0,
        }
    }

    pub fn domain_type(&self) -> &str {
        &self.domain_type
    }

    /// Domain name from the configuration, falling back to the hostname
    /// without its first label.
    pub fn domain_name(&self) -> Option<&str> {
        self.domain_name
            .as_deref()
            .or_else(|| self.hostname.split_once('.').map(|(_, rest)| rest))
    }

    pub fn ip(&self) -> Option<&str> {
        self.ip.as_deref()
    }

    /// Role-specific setting from the host's `config` table.
    pub fn config(&self, key: &str) -> Option<&serde_json::Value> {
        self.config.get(key)
    }

    /// Whether setup ran without a matching teardown yet.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Number of completed setup/teardown cycles.
    pub fn cycles(&self) -> u32 {
        self.cycles
    }
}

impl Role for GenericRole {
    fn role(&self) -> &str {
        &self.role
    }

    fn hostname(&self) -> &str {
        &self.hostname
    }

    fn setup(&mut self) -> Result<(), MultihostError> {
        debug!("role: setup {} ({})", self.hostname, self.role);
        self.active = true;
        Ok(())
    }

    fn teardown(&mut self) -> Result<(), MultihostError> {
        debug!("role: teardown {} ({})", self.hostname, self.role);
        if self.active {
            self.active = false;
            self.cycles += 1;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
