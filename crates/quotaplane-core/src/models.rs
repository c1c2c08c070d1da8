//! Domain models for Quotaplane.
//!
//! These are the core types shared across all crates.

pub mod actor;
pub mod org;
pub mod project;
pub mod quota;
pub mod server;
