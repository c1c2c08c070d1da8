//! Org hierarchy domain models: Center → Field → Department → Team.
//!
//! The tree itself is administered through the engine's admin service; the
//! allocation engine reads it and refuses structural deletes while dependent
//! resources exist (cascade block).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Top of the hierarchy. Centers have no parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Center {
    pub id: Uuid,
    /// Human-readable name, unique across centers.
    pub name: String,
}

/// A field groups departments and owns the physical server capacity
/// assigned to it at its site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub id: Uuid,
    pub center_id: Uuid,
    /// Unique per center.
    pub name: String,
    /// Physical location tag; quota rows are keyed by (node, site).
    pub site: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: Uuid,
    pub field_id: Uuid,
    /// Unique per field.
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: Uuid,
    pub department_id: Uuid,
    /// Unique per department.
    pub name: String,
    /// External directory group used for login mapping. Irrelevant to the
    /// allocation logic itself.
    pub directory_group: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCenter {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateField {
    pub center_id: Uuid,
    pub name: String,
    pub site: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDepartment {
    pub field_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTeam {
    pub department_id: Uuid,
    pub name: String,
    pub directory_group: Option<String>,
}
