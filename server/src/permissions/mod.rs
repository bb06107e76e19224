//! Person visibility.
//!
//! - Flags: what each role type grants
//! - Context: a viewer's grants resolved to group and layer ids
//! - Condition: predicates over people and the disjunction builder
//! - Resolver: global and group-scoped visibility decisions

pub mod condition;
pub mod context;
pub mod flags;
pub mod resolver;

pub use condition::{Disjunction, Predicate};
pub use context::UserContext;
pub use flags::RolePermissions;
pub use resolver::{resolve_for_group, resolve_global, Decision, GlobalVisibility, GroupAccess};
