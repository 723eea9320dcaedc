//! Multihost session — the state one test run carries from start to finish.

use crate::binding::{bind, FuncArgs};
use crate::manifest::TestDecl;
use crate::selection::{CollectedTest, SelectionEngine, SelectionReport, TestInvocation};
use multihost_core::{MultihostConfig, MultihostError};
use multihost_roles::{Inventory, RoleRegistry};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use tracing::{info, warn};

/// When to collect artifacts from the hosts after an invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactsPolicy {
    Never,
    #[default]
    OnFailure,
    Always,
}

impl ArtifactsPolicy {
    pub fn should_collect(&self, outcome: Outcome) -> bool {
        match self {
            Self::Never => false,
            Self::OnFailure => outcome == Outcome::Failed,
            Self::Always => true,
        }
    }
}

impl FromStr for ArtifactsPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "never" => Ok(Self::Never),
            "on-failure" => Ok(Self::OnFailure),
            "always" => Ok(Self::Always),
            other => Err(format!(
                "invalid artifacts policy \"{other}\", expected never, on-failure or always"
            )),
        }
    }
}

impl fmt::Display for ArtifactsPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Never => "never",
            Self::OnFailure => "on-failure",
            Self::Always => "always",
        })
    }
}

/// Result of a test body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed,
    Skipped,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        })
    }
}

/// Resolved command-line switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOptions {
    pub exact_topology: bool,
    pub multihost_log_path: Option<String>,
    pub collect_artifacts: ArtifactsPolicy,
    pub artifacts_dir: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            exact_topology: false,
            multihost_log_path: None,
            collect_artifacts: ArtifactsPolicy::OnFailure,
            artifacts_dir: "./artifacts".to_string(),
        }
    }
}

/// What happened to one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationRecord {
    pub name: String,
    pub outcome: Outcome,
    pub collect_artifacts: bool,
}

/// Session state: the options, and the inventory when configured.
#[derive(Debug)]
pub struct MultihostSession {
    options: SessionOptions,
    inventory: Option<Inventory>,
    records: Vec<InvocationRecord>,
}

impl MultihostSession {
    /// Build the session. Without a configuration every test that declares
    /// a topology will be deselected.
    pub fn new(
        options: SessionOptions,
        config: Option<MultihostConfig>,
        registry: &RoleRegistry,
    ) -> Result<Self, MultihostError> {
        let inventory = config
            .map(|config| Inventory::build(config, registry))
            .transpose()?;
        Ok(Self {
            options,
            inventory,
            records: Vec::new(),
        })
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn inventory(&self) -> Option<&Inventory> {
        self.inventory.as_ref()
    }

    pub fn records(&self) -> &[InvocationRecord] {
        &self.records
    }

    /// Log the session banner.
    pub fn start(&self) {
        let Some(inventory) = &self.inventory else {
            info!("session: No multihost configuration provided.");
            info!("session: Make sure to run tests with --multihost-config parameter.");
            return;
        };

        match serde_json::to_string_pretty(&inventory.config().redacted()) {
            Ok(json) => info!("session: multihost configuration:\n{json}"),
            Err(e) => warn!("session: cannot render configuration: {e}"),
        }
        info!("session: detected topology: {}", inventory.topology());
        info!(
            "session: exact topology={} artifacts={} artifacts dir={} log path={}",
            self.options.exact_topology,
            self.options.collect_artifacts,
            self.options.artifacts_dir,
            self.options.multihost_log_path.as_deref().unwrap_or("-"),
        );
    }

    /// Normalise test declarations into collected tests.
    pub fn collect(&self, decls: &[TestDecl]) -> Result<Vec<CollectedTest>, MultihostError> {
        decls.iter().map(CollectedTest::from_decl).collect()
    }

    pub fn select(&self, tests: &[CollectedTest]) -> SelectionReport {
        SelectionEngine::new(
            self.inventory.as_ref().map(Inventory::topology),
            self.options.exact_topology,
        )
        .select(tests)
    }

    /// Run one invocation.
    ///
    /// Hosts the mark references are set up, bound into the arguments, and
    /// handed to `body`. Hosts are torn down afterwards in reverse setup
    /// order, also when setup or binding fails or the body panics; the
    /// panic is resumed once teardown is done.
    pub fn run<F>(
        &mut self,
        invocation: &TestInvocation,
        body: F,
    ) -> Result<InvocationRecord, MultihostError>
    where
        F: FnOnce(&FuncArgs<'_>) -> Outcome,
    {
        let outcome = match (&invocation.mark, self.inventory.as_mut()) {
            (None, inventory) => {
                let args = FuncArgs::new(&invocation.args, inventory.as_deref());
                body(&args)
            }
            (Some(mark), Some(inventory)) => {
                if let Err(e) = inventory.setup(mark.bound_paths()) {
                    if let Err(teardown) = inventory.teardown() {
                        warn!("session: {}: teardown after failed setup: {teardown}", invocation.name);
                    }
                    return Err(e);
                }

                let result = {
                    let shared: &Inventory = inventory;
                    panic::catch_unwind(AssertUnwindSafe(|| {
                        let mut args = FuncArgs::new(&invocation.args, Some(shared));
                        bind(mark, shared, &mut args).map(|()| body(&args))
                    }))
                };

                let teardown = inventory.teardown();
                let result = match result {
                    Ok(result) => result,
                    Err(payload) => {
                        if let Err(e) = teardown {
                            warn!("session: {}: teardown after panic: {e}", invocation.name);
                        }
                        panic::resume_unwind(payload);
                    }
                };
                let outcome = result?;
                teardown?;
                outcome
            }
            (Some(mark), None) => {
                return Err(MultihostError::Config(format!(
                    "{} requires topology {} but no multihost configuration was provided",
                    invocation.name, mark.name
                )));
            }
        };

        let record = InvocationRecord {
            name: invocation.name.clone(),
            outcome,
            collect_artifacts: self.options.collect_artifacts.should_collect(outcome),
        };
        info!("session: {} {}", record.name, record.outcome);
        self.records.push(record.clone());
        Ok(record)
    }

    /// Tear down anything still set up and log the summary.
    pub fn finish(&mut self) -> Result<(), MultihostError> {
        let count = |outcome: Outcome| self.records.iter().filter(|r| r.outcome == outcome).count();
        info!(
            "session: {} passed, {} failed, {} skipped",
            count(Outcome::Passed),
            count(Outcome::Failed),
            count(Outcome::Skipped),
        );

        match self.inventory.as_mut() {
            Some(inventory) => inventory.teardown(),
            None => Ok(()),
        }
    }
}
