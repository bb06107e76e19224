//! Roster Common Library
//!
//! Person records and field projections shared by the server and its callers.

pub mod types;

pub use types::*;
