//! Group hierarchy.
//!
//! - Type table: which group types exist, which are layers, which roles they offer
//! - Tree: nested-set snapshot of all groups with layer caching

pub mod error;
pub mod tree;
pub mod types;

pub use error::TreeError;
pub use tree::{collapse_to_highest, Group, GroupTree, NewGroup};
pub use types::{GroupTypeDef, RegistryError, RoleRegistry, RoleTypeDef, TypeRegistry};
