//! Caller identity.
//!
//! An [`Actor`] carries the claims extracted from a verified token. The
//! allocation engine only reads them; issuing and verifying tokens belongs
//! to the (out-of-scope) authentication layer. Every engine operation takes
//! the actor as an explicit argument — there is no ambient request context.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Platform-wide super-admin, assignable through the admin API.
    PlatformAdmin,
    /// Top-level admin mapped from the directory service; same powers as
    /// `PlatformAdmin` inside the allocation engine.
    CenterAdmin,
    /// Admin of exactly one field.
    FieldAdmin,
    /// Admin of exactly one department.
    DeptAdmin,
    /// Lead of exactly one team.
    TeamLead,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    /// Login subject (username).
    pub subject: String,
    pub role: Role,
    /// Node the role is scoped to: a field for `FieldAdmin`, a department
    /// for `DeptAdmin`, a team for `TeamLead`. `None` for global roles.
    pub scope_id: Option<Uuid>,
}

impl Actor {
    pub fn new(subject: impl Into<String>, role: Role, scope_id: Option<Uuid>) -> Self {
        Self {
            subject: subject.into(),
            role,
            scope_id,
        }
    }
}
