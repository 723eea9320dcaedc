//! # multihost-plugin
//!
//! Test-runner side of multihost: only tests whose topology the inventory
//! can satisfy are run, each satisfied topology mark becomes one invocation,
//! and the hosts a mark names are bound into the invocation's arguments.
//!
//! Flow per session:
//! 1. [`MultihostSession::new`] builds the inventory from the configuration.
//! 2. [`MultihostSession::collect`] turns test declarations into marks.
//! 3. [`MultihostSession::select`] keeps or deselects every test.
//! 4. [`MultihostSession::run`] sets up, binds, runs, and tears down one
//!    invocation.

pub mod binding;
pub mod known;
pub mod manifest;
pub mod marks;
pub mod requirement;
pub mod selection;
pub mod session;

pub use binding::{bind, resolve_domains, FuncArgs};
pub use known::KnownTopology;
pub use manifest::{TestDecl, TestManifest};
pub use marks::TopologyMark;
pub use requirement::{extract, FixtureTarget, RequirementDecl};
pub use selection::{CollectedTest, Selection, SelectionEngine, SelectionReport, TestInvocation};
pub use session::{ArtifactsPolicy, InvocationRecord, MultihostSession, Outcome, SessionOptions};
