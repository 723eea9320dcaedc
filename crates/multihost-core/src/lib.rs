//! # multihost-core
//!
//! Topology value model, path naming, declared configuration, and the error
//! taxonomy shared by the multihost crates. Pure data and algebra; no I/O
//! apart from reading the configuration file.

pub mod config;
pub mod error;
pub mod path;
pub mod topology;
pub mod value;

pub use config::{shellexpand, DomainConfig, HostConfig, MultihostConfig};
pub use error::MultihostError;
pub use path::Path;
pub use topology::{Topology, TopologyDomain};
pub use value::Value;
