//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Multi-row mutations that must be
//! atomic (swap, project create + debit, credit + status transitions) are
//! single repository methods so an implementation can batch them into one
//! transaction; callers never compose them from separate writes.

use uuid::Uuid;

use crate::error::QpResult;
use crate::models::{
    org::{Center, CreateCenter, CreateDepartment, CreateField, CreateTeam, Department, Field, Team},
    project::{CreateProject, Project, ProjectStatus},
    quota::{CreateQuota, QuotaLevel, ResourceQuota, Resources},
    server::{CreateServer, Server, ServerAllocation},
};

// ---------------------------------------------------------------------------
// Org hierarchy
// ---------------------------------------------------------------------------

pub trait OrgRepository: Send + Sync {
    fn create_center(&self, input: CreateCenter) -> impl Future<Output = QpResult<Center>> + Send;
    fn get_center(&self, id: Uuid) -> impl Future<Output = QpResult<Center>> + Send;
    fn list_centers(&self) -> impl Future<Output = QpResult<Vec<Center>>> + Send;
    fn update_center(&self, id: Uuid, name: String)
    -> impl Future<Output = QpResult<Center>> + Send;
    fn delete_center(&self, id: Uuid) -> impl Future<Output = QpResult<()>> + Send;
    fn center_has_fields(&self, id: Uuid) -> impl Future<Output = QpResult<bool>> + Send;

    fn create_field(&self, input: CreateField) -> impl Future<Output = QpResult<Field>> + Send;
    fn get_field(&self, id: Uuid) -> impl Future<Output = QpResult<Field>> + Send;
    fn list_fields_for_center(
        &self,
        center_id: Uuid,
    ) -> impl Future<Output = QpResult<Vec<Field>>> + Send;
    fn update_field(
        &self,
        id: Uuid,
        name: String,
        site: String,
    ) -> impl Future<Output = QpResult<Field>> + Send;
    fn delete_field(&self, id: Uuid) -> impl Future<Output = QpResult<()>> + Send;
    fn field_has_departments(&self, id: Uuid) -> impl Future<Output = QpResult<bool>> + Send;

    fn create_department(
        &self,
        input: CreateDepartment,
    ) -> impl Future<Output = QpResult<Department>> + Send;
    fn get_department(&self, id: Uuid) -> impl Future<Output = QpResult<Department>> + Send;
    fn list_departments_for_field(
        &self,
        field_id: Uuid,
    ) -> impl Future<Output = QpResult<Vec<Department>>> + Send;
    fn update_department(
        &self,
        id: Uuid,
        name: String,
    ) -> impl Future<Output = QpResult<Department>> + Send;
    fn delete_department(&self, id: Uuid) -> impl Future<Output = QpResult<()>> + Send;
    fn department_has_teams(&self, id: Uuid) -> impl Future<Output = QpResult<bool>> + Send;

    fn create_team(&self, input: CreateTeam) -> impl Future<Output = QpResult<Team>> + Send;
    fn get_team(&self, id: Uuid) -> impl Future<Output = QpResult<Team>> + Send;
    fn list_teams_for_department(
        &self,
        department_id: Uuid,
    ) -> impl Future<Output = QpResult<Vec<Team>>> + Send;
    fn update_team(
        &self,
        id: Uuid,
        name: String,
        directory_group: Option<String>,
    ) -> impl Future<Output = QpResult<Team>> + Send;
    fn delete_team(&self, id: Uuid) -> impl Future<Output = QpResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Server inventory (rows maintained by the out-of-scope sync job)
// ---------------------------------------------------------------------------

pub trait ServerRepository: Send + Sync {
    fn create_server(&self, input: CreateServer) -> impl Future<Output = QpResult<Server>> + Send;
    fn get_server(&self, id: Uuid) -> impl Future<Output = QpResult<Server>> + Send;
    fn list_servers(&self) -> impl Future<Output = QpResult<Vec<Server>>> + Send;
}

// ---------------------------------------------------------------------------
// Server → field allocations
// ---------------------------------------------------------------------------

pub trait AllocationRepository: Send + Sync {
    /// Current binding for a server, if any. A server has at most one.
    fn get_allocation_for_server(
        &self,
        server_id: Uuid,
    ) -> impl Future<Output = QpResult<Option<ServerAllocation>>> + Send;
    fn get_allocation(
        &self,
        id: Uuid,
    ) -> impl Future<Output = QpResult<ServerAllocation>> + Send;
    fn create_allocation(
        &self,
        server_id: Uuid,
        field_id: Uuid,
        allocated_by: String,
    ) -> impl Future<Output = QpResult<ServerAllocation>> + Send;
    fn delete_allocation(&self, id: Uuid) -> impl Future<Output = QpResult<()>> + Send;
    /// Atomically delete `old_id` and bind `server_id` to `to_field_id`.
    /// Either both writes apply or neither does.
    fn replace_allocation(
        &self,
        old_id: Uuid,
        server_id: Uuid,
        to_field_id: Uuid,
        allocated_by: String,
    ) -> impl Future<Output = QpResult<ServerAllocation>> + Send;
    fn list_allocations_for_field(
        &self,
        field_id: Uuid,
    ) -> impl Future<Output = QpResult<Vec<ServerAllocation>>> + Send;
    /// Sum of assigned servers' CPU/RAM for a field, counting only servers
    /// located at `site`.
    fn field_capacity(
        &self,
        field_id: Uuid,
        site: &str,
    ) -> impl Future<Output = QpResult<Resources>> + Send;
}

// ---------------------------------------------------------------------------
// Quotas (one table for both levels)
// ---------------------------------------------------------------------------

pub trait QuotaRepository: Send + Sync {
    fn create_quota(
        &self,
        input: CreateQuota,
    ) -> impl Future<Output = QpResult<ResourceQuota>> + Send;
    fn get_quota(
        &self,
        level: QuotaLevel,
        node_id: Uuid,
        site: &str,
    ) -> impl Future<Output = QpResult<Option<ResourceQuota>>> + Send;
    fn get_quota_by_id(&self, id: Uuid)
    -> impl Future<Output = QpResult<ResourceQuota>> + Send;
    /// Sibling quotas: all rows of `level` under `parent_id` at `site`.
    fn list_quotas(
        &self,
        level: QuotaLevel,
        parent_id: Uuid,
        site: &str,
    ) -> impl Future<Output = QpResult<Vec<ResourceQuota>>> + Send;
    /// All rows of `level` under `parent_id`, every site (tree view).
    fn list_quotas_for_parent(
        &self,
        level: QuotaLevel,
        parent_id: Uuid,
    ) -> impl Future<Output = QpResult<Vec<ResourceQuota>>> + Send;
    /// Whether any quota of `level` under `parent_id` has nonzero usage.
    fn parent_has_used_quota(
        &self,
        level: QuotaLevel,
        parent_id: Uuid,
    ) -> impl Future<Output = QpResult<bool>> + Send;
    /// Whether the node's own quota rows (any site) have nonzero usage.
    fn node_has_used_quota(
        &self,
        level: QuotaLevel,
        node_id: Uuid,
    ) -> impl Future<Output = QpResult<bool>> + Send;
    /// Insert a child quota and set the parent quota's `used` to
    /// `parent_used` in one transaction. Team quotas are carved from a
    /// department quota, so the parent's usage moves with them.
    fn create_quota_with_parent_debit(
        &self,
        input: CreateQuota,
        parent_quota_id: Uuid,
        parent_used: Resources,
    ) -> impl Future<Output = QpResult<ResourceQuota>> + Send;
    fn set_limits(
        &self,
        id: Uuid,
        limits: Resources,
    ) -> impl Future<Output = QpResult<ResourceQuota>> + Send;
    /// Update a child quota's limits and the parent quota's `used`
    /// atomically.
    fn set_limits_with_parent_debit(
        &self,
        id: Uuid,
        limits: Resources,
        parent_quota_id: Uuid,
        parent_used: Resources,
    ) -> impl Future<Output = QpResult<ResourceQuota>> + Send;
    fn set_used(
        &self,
        id: Uuid,
        used: Resources,
    ) -> impl Future<Output = QpResult<ResourceQuota>> + Send;
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

pub trait ProjectRepository: Send + Sync {
    /// Insert the project (status `Provisioning`) and set the team quota's
    /// `used` to `quota_used` in one transaction.
    fn create_project_with_debit(
        &self,
        input: CreateProject,
        quota_id: Uuid,
        quota_used: Resources,
    ) -> impl Future<Output = QpResult<Project>> + Send;
    fn get_project(&self, id: Uuid) -> impl Future<Output = QpResult<Project>> + Send;
    /// Whether any project already occupies `namespace`.
    fn namespace_in_use(&self, namespace: &str) -> impl Future<Output = QpResult<bool>> + Send;
    /// All projects, or only one team's when `team_id` is set.
    fn list_projects(
        &self,
        team_id: Option<Uuid>,
    ) -> impl Future<Output = QpResult<Vec<Project>>> + Send;
    /// Whether the team owns any project in a non-terminal state
    /// (provisioning, active or deleting).
    fn team_has_live_projects(
        &self,
        team_id: Uuid,
    ) -> impl Future<Output = QpResult<bool>> + Send;
    /// Compensating transaction: set the team quota's `used` to
    /// `quota_used` and mark the project `Failed`, atomically.
    fn mark_failed_with_credit(
        &self,
        project_id: Uuid,
        quota_id: Uuid,
        quota_used: Resources,
    ) -> impl Future<Output = QpResult<()>> + Send;
    /// Deletion commit: set the team quota's `used` to `quota_used`, mark
    /// the project `Deleting` and stamp `deleted_at`, atomically.
    fn mark_deleting_with_credit(
        &self,
        project_id: Uuid,
        quota_id: Uuid,
        quota_used: Resources,
    ) -> impl Future<Output = QpResult<()>> + Send;
    /// Deletion commit without a quota credit (failed project, or the
    /// quota row no longer exists).
    fn mark_deleting(&self, project_id: Uuid) -> impl Future<Output = QpResult<()>> + Send;
    fn set_status(
        &self,
        project_id: Uuid,
        status: ProjectStatus,
    ) -> impl Future<Output = QpResult<()>> + Send;
}
