//! Physical server inventory and server→field allocations.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerStatus {
    Active,
    Offline,
}

/// One physical server as reported by the (out-of-scope) inventory sync.
/// Most hardware fields are optional because the upstream inventory is
/// incomplete for older machines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub id: Uuid,
    /// Inventory hostname, unique.
    pub name: String,
    pub vendor: Option<String>,
    pub site: Option<String>,
    pub cpu: Option<u32>,
    pub ram_gb: Option<u32>,
    pub serial_number: Option<String>,
    pub status: ServerStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateServer {
    pub name: String,
    pub vendor: Option<String>,
    pub site: Option<String>,
    pub cpu: Option<u32>,
    pub ram_gb: Option<u32>,
    pub serial_number: Option<String>,
}

/// Binding of one server to exactly one field. At most one allocation may
/// exist per server at any time (unique index on `server_id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerAllocation {
    pub id: Uuid,
    pub server_id: Uuid,
    pub field_id: Uuid,
    /// Subject of the actor that created the binding.
    pub allocated_by: String,
}
