//! Test manifest — the collected tests and the topology each declares.
//!
//! ```toml
//! [[test]]
//! name = "test_client"
//! args = ["client"]
//! topology = [{ known = "client" }]
//!
//! [[test]]
//! name = "test_generic_provider"
//! args = ["client", "provider"]
//!
//! [[test.topology]]
//! known = "ldap"
//!
//! [[test.topology]]
//! known = "ipa"
//! ```

use crate::requirement::RequirementDecl;
use multihost_core::{shellexpand, MultihostError};
use serde::{Deserialize, Serialize};

/// All collected tests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestManifest {
    #[serde(default, rename = "test")]
    pub tests: Vec<TestDecl>,
}

/// One collected test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestDecl {
    pub name: String,
    /// Argument names the test body accepts.
    #[serde(default)]
    pub args: Vec<String>,
    /// Alternative topologies; each satisfied one is a separate run.
    #[serde(default, rename = "topology")]
    pub requirements: Vec<RequirementDecl>,
}

impl TestManifest {
    pub fn load(path: &str) -> Result<Self, MultihostError> {
        let expanded = shellexpand(path);
        let content = std::fs::read_to_string(&expanded)
            .map_err(|e| MultihostError::Config(format!("failed to read {expanded}: {e}")))?;
        Self::from_toml(&content)
            .map_err(|e| MultihostError::Config(format!("{expanded}: {e}")))
    }

    pub fn from_toml(content: &str) -> Result<Self, MultihostError> {
        toml::from_str(content).map_err(|e| MultihostError::Config(e.to_string()))
    }
}
