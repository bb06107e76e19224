//! Roster Server
//!
//! Group tree, role bookkeeping and person visibility for multi-tenant
//! organizations.

pub mod config;
pub mod db;
pub mod groups;
pub mod observability;
pub mod people;
pub mod permissions;

#[cfg(test)]
mod testing;
