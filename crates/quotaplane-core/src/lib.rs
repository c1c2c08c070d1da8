//! Quotaplane Core — domain models and allocation invariants.
//!
//! This crate has no I/O: it defines the org hierarchy and quota types,
//! the error taxonomy, the repository traits the engine is generic over,
//! the RBAC guard, the CPU tier calculator, and the generic headroom/limit
//! checks that every quota mutation goes through.

pub mod calculator;
pub mod error;
pub mod models;
pub mod namespace;
pub mod rbac;
pub mod repository;
pub mod sla;
