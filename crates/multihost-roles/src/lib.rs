//! # multihost-roles
//!
//! Role handles and the concrete inventory. The inventory turns the declared
//! configuration into the available topology plus a path lookup table over
//! role handles it owns for the whole session.

pub mod inventory;
pub mod registry;
pub mod role;

pub use inventory::{Bound, Inventory};
pub use registry::{RoleFactory, RoleRegistry};
pub use role::{GenericRole, Role};
