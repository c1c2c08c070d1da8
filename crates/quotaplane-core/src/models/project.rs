//! Project domain model.
//!
//! A project is a provisioned namespace owned by one team. Its quota
//! reservation is debited from the team quota at creation and credited
//! back on deletion or provisioning failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::quota::Resources;
use crate::sla::{PerformanceTier, SlaTier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectStatus {
    /// Created locally; external provisioning in flight.
    Provisioning,
    /// Backend reported synced and healthy.
    Active,
    /// Provisioning failed or timed out.
    Failed,
    /// Deletion committed locally; external deprovisioning in flight.
    Deleting,
    /// External deprovisioning confirmed. Row is retained.
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub team_id: Uuid,
    pub name: String,
    pub site: String,
    pub sla_tier: SlaTier,
    pub performance_tier: PerformanceTier,
    /// Deterministic external namespace name derived from (team, name).
    pub namespace: String,
    pub status: ProjectStatus,
    /// Reservation debited from the team quota at creation time.
    pub quota: Resources,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    pub team_id: Uuid,
    pub name: String,
    pub site: String,
    pub sla_tier: SlaTier,
    pub performance_tier: PerformanceTier,
    pub namespace: String,
    pub quota: Resources,
}
