//! Allocation service — server↔field bindings, department and team quotas,
//! and the scoped allocation tree.
//!
//! Every quota mutation follows the same discipline: authorize, acquire the
//! ordered locks for the affected nodes, re-read the authoritative rows,
//! validate both resource dimensions, then commit. Department and team
//! quotas run through the same code paths; only the parent-capacity source
//! differs (field server capacity vs. department quota limits).

use std::sync::Arc;

use quotaplane_core::error::{QpResult, QuotaplaneError};
use quotaplane_core::models::actor::{Actor, Role};
use quotaplane_core::models::org::{Center, Department, Field, Team};
use quotaplane_core::models::quota::{
    CreateQuota, QuotaLevel, ResourceDelta, ResourceQuota, Resources, ensure_not_below_used,
    ensure_parent_headroom, ensure_within_limit,
};
use quotaplane_core::models::server::ServerAllocation;
use quotaplane_core::rbac::{Capability, has_scoped_capability, is_super_admin};
use quotaplane_core::repository::{
    AllocationRepository, OrgRepository, QuotaRepository, ServerRepository,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::lock::{LockKey, QuotaLockManager};

/// Scoped view of the whole hierarchy with capacity and quota figures.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationTree {
    pub centers: Vec<CenterNode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CenterNode {
    pub center: Center,
    pub fields: Vec<FieldNode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldNode {
    pub field: Field,
    /// Total CPU/RAM of servers assigned to the field at its site.
    pub capacity: Resources,
    pub departments: Vec<DepartmentNode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepartmentNode {
    pub department: Department,
    pub quotas: Vec<ResourceQuota>,
    pub teams: Vec<TeamNode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamNode {
    pub team: Team,
    pub quotas: Vec<ResourceQuota>,
}

/// Allocation service.
///
/// Generic over repository implementations so the engine has no dependency
/// on the database crate.
pub struct AllocationService<O, S, A, Q>
where
    O: OrgRepository,
    S: ServerRepository,
    A: AllocationRepository,
    Q: QuotaRepository,
{
    org: O,
    servers: S,
    allocations: A,
    quotas: Q,
    locks: Arc<QuotaLockManager>,
}

impl<O, S, A, Q> AllocationService<O, S, A, Q>
where
    O: OrgRepository,
    S: ServerRepository,
    A: AllocationRepository,
    Q: QuotaRepository,
{
    pub fn new(org: O, servers: S, allocations: A, quotas: Q, locks: Arc<QuotaLockManager>) -> Self {
        Self {
            org,
            servers,
            allocations,
            quotas,
            locks,
        }
    }

    fn require_assign_capability(actor: &Actor) -> QpResult<()> {
        if !has_scoped_capability(actor, Capability::AssignServers, None) {
            return Err(QuotaplaneError::forbidden(
                "only top-level administrators can manage server assignments",
            ));
        }
        Ok(())
    }

    /// Bind an unassigned server to a field.
    pub async fn assign_server(
        &self,
        actor: &Actor,
        server_id: Uuid,
        field_id: Uuid,
    ) -> QpResult<ServerAllocation> {
        Self::require_assign_capability(actor)?;

        // Existence before the lock; neither row is mutated here.
        self.servers.get_server(server_id).await?;
        self.org.get_field(field_id).await?;

        let _guard = self.locks.acquire(LockKey::Server(server_id)).await;

        if let Some(existing) = self.allocations.get_allocation_for_server(server_id).await? {
            return Err(QuotaplaneError::conflict(format!(
                "server '{server_id}' is already assigned to field '{}'",
                existing.field_id
            )));
        }

        let allocation = self
            .allocations
            .create_allocation(server_id, field_id, actor.subject.clone())
            .await?;
        info!(%server_id, %field_id, by = %actor.subject, "Server assigned to field");
        Ok(allocation)
    }

    /// Unbind a server from its field. Blocked while any department quota
    /// in the field has nonzero usage.
    pub async fn remove_server(&self, actor: &Actor, allocation_id: Uuid) -> QpResult<()> {
        Self::require_assign_capability(actor)?;

        let allocation = self.allocations.get_allocation(allocation_id).await?;
        let _guard = self.locks.acquire(LockKey::Server(allocation.server_id)).await;

        // Re-read under the lock; a concurrent swap may have replaced it.
        let allocation = self.allocations.get_allocation(allocation_id).await?;

        if self
            .quotas
            .parent_has_used_quota(QuotaLevel::Department, allocation.field_id)
            .await?
        {
            return Err(QuotaplaneError::conflict(
                "cannot remove server: department quotas in the field have resources in use",
            ));
        }

        self.allocations.delete_allocation(allocation_id).await?;
        info!(server_id = %allocation.server_id, field_id = %allocation.field_id,
              "Server removed from field");
        Ok(())
    }

    /// Atomically move a server from one field to another. The caller must
    /// name the current field; a stale `from_field_id` is a conflict.
    pub async fn swap_server(
        &self,
        actor: &Actor,
        server_id: Uuid,
        from_field_id: Uuid,
        to_field_id: Uuid,
    ) -> QpResult<ServerAllocation> {
        Self::require_assign_capability(actor)?;

        self.org.get_field(from_field_id).await?;
        self.org.get_field(to_field_id).await?;

        let _guard = self.locks.acquire(LockKey::Server(server_id)).await;

        let current = self
            .allocations
            .get_allocation_for_server(server_id)
            .await?
            .filter(|a| a.field_id == from_field_id)
            .ok_or_else(|| {
                QuotaplaneError::conflict(format!(
                    "server '{server_id}' is not currently assigned to field '{from_field_id}'"
                ))
            })?;

        let allocation = self
            .allocations
            .replace_allocation(current.id, server_id, to_field_id, actor.subject.clone())
            .await?;
        info!(%server_id, %from_field_id, %to_field_id, "Server swapped between fields");
        Ok(allocation)
    }

    /// Carve a department quota out of a field's server capacity at `site`.
    pub async fn create_department_quota(
        &self,
        actor: &Actor,
        field_id: Uuid,
        dept_id: Uuid,
        site: String,
        limits: Resources,
    ) -> QpResult<ResourceQuota> {
        if !has_scoped_capability(actor, Capability::SetDepartmentQuota, Some(field_id)) {
            return Err(QuotaplaneError::forbidden(
                "only an administrator of this field can set department quotas",
            ));
        }
        self.org.get_field(field_id).await?;
        let dept = self.org.get_department(dept_id).await?;
        if dept.field_id != field_id {
            return Err(QuotaplaneError::validation(format!(
                "department '{dept_id}' does not belong to field '{field_id}'"
            )));
        }

        let _guards = self
            .locks
            .acquire_ordered(vec![
                LockKey::Field(field_id, site.clone()),
                LockKey::Department(dept_id, site.clone()),
            ])
            .await;

        if self
            .quotas
            .get_quota(QuotaLevel::Department, dept_id, &site)
            .await?
            .is_some()
        {
            return Err(QuotaplaneError::conflict(format!(
                "department quota for '{dept_id}' at site '{site}' already exists"
            )));
        }

        let capacity = self.allocations.field_capacity(field_id, &site).await?;
        let sibling_sum = self
            .quotas
            .list_quotas(QuotaLevel::Department, field_id, &site)
            .await?
            .iter()
            .fold(Resources::ZERO, |acc, q| acc.saturating_add(q.limits()));
        ensure_parent_headroom(capacity, sibling_sum, ResourceDelta::addition(limits))?;

        let quota = self
            .quotas
            .create_quota(CreateQuota {
                level: QuotaLevel::Department,
                parent_id: field_id,
                node_id: dept_id,
                site,
                limits,
            })
            .await?;
        info!(%field_id, %dept_id, cpu = limits.cpu, ram_gb = limits.ram_gb,
              "Department quota created");
        Ok(quota)
    }

    /// Change a department quota's limits. New limits must cover current
    /// usage and fit the field's capacity alongside sibling quotas.
    pub async fn update_department_quota(
        &self,
        actor: &Actor,
        quota_id: Uuid,
        limits: Resources,
    ) -> QpResult<ResourceQuota> {
        let quota = self.quotas.get_quota_by_id(quota_id).await?;
        if quota.level != QuotaLevel::Department {
            return Err(QuotaplaneError::validation(format!(
                "quota '{quota_id}' is not a department quota"
            )));
        }

        let _guards = self
            .locks
            .acquire_ordered(vec![
                LockKey::Field(quota.parent_id, quota.site.clone()),
                LockKey::Department(quota.node_id, quota.site.clone()),
            ])
            .await;

        // Authoritative row; scope for the RBAC check comes from it.
        let quota = self.quotas.get_quota_by_id(quota_id).await?;
        if !has_scoped_capability(actor, Capability::SetDepartmentQuota, Some(quota.parent_id)) {
            return Err(QuotaplaneError::forbidden(
                "only an administrator of this field can set department quotas",
            ));
        }

        ensure_not_below_used(&quota, limits)?;
        let capacity = self
            .allocations
            .field_capacity(quota.parent_id, &quota.site)
            .await?;
        let sibling_sum = self
            .quotas
            .list_quotas(QuotaLevel::Department, quota.parent_id, &quota.site)
            .await?
            .iter()
            .fold(Resources::ZERO, |acc, q| acc.saturating_add(q.limits()));
        ensure_parent_headroom(capacity, sibling_sum, ResourceDelta::between(limits, quota.limits()))?;

        let updated = self.quotas.set_limits(quota_id, limits).await?;
        info!(%quota_id, cpu = limits.cpu, ram_gb = limits.ram_gb, "Department quota updated");
        Ok(updated)
    }

    /// Carve a team quota out of a department quota at `site`.
    pub async fn create_team_quota(
        &self,
        actor: &Actor,
        dept_id: Uuid,
        team_id: Uuid,
        site: String,
        limits: Resources,
    ) -> QpResult<ResourceQuota> {
        if !has_scoped_capability(actor, Capability::SetTeamQuota, Some(dept_id)) {
            return Err(QuotaplaneError::forbidden(
                "only an administrator of this department can set team quotas",
            ));
        }
        self.org.get_department(dept_id).await?;
        let team = self.org.get_team(team_id).await?;
        if team.department_id != dept_id {
            return Err(QuotaplaneError::validation(format!(
                "team '{team_id}' does not belong to department '{dept_id}'"
            )));
        }

        let _guards = self
            .locks
            .acquire_ordered(vec![
                LockKey::Department(dept_id, site.clone()),
                LockKey::Team(team_id, site.clone()),
            ])
            .await;

        if self
            .quotas
            .get_quota(QuotaLevel::Team, team_id, &site)
            .await?
            .is_some()
        {
            return Err(QuotaplaneError::conflict(format!(
                "team quota for '{team_id}' at site '{site}' already exists"
            )));
        }

        let parent = self
            .quotas
            .get_quota(QuotaLevel::Department, dept_id, &site)
            .await?
            .ok_or_else(|| {
                QuotaplaneError::quota_exceeded(format!(
                    "no department quota exists for '{dept_id}' at site '{site}'"
                ))
            })?;
        let sibling_sum = self
            .quotas
            .list_quotas(QuotaLevel::Team, dept_id, &site)
            .await?
            .iter()
            .fold(Resources::ZERO, |acc, q| acc.saturating_add(q.limits()));
        ensure_parent_headroom(parent.limits(), sibling_sum, ResourceDelta::addition(limits))?;

        // The department quota's usage is the sum of team limits carved
        // from it; it moves together with the new row.
        let parent_used = sibling_sum.saturating_add(limits);
        let quota = self
            .quotas
            .create_quota_with_parent_debit(
                CreateQuota {
                    level: QuotaLevel::Team,
                    parent_id: dept_id,
                    node_id: team_id,
                    site,
                    limits,
                },
                parent.id,
                parent_used,
            )
            .await?;
        info!(%dept_id, %team_id, cpu = limits.cpu, ram_gb = limits.ram_gb, "Team quota created");
        Ok(quota)
    }

    /// Change a team quota's limits.
    pub async fn update_team_quota(
        &self,
        actor: &Actor,
        quota_id: Uuid,
        limits: Resources,
    ) -> QpResult<ResourceQuota> {
        let quota = self.quotas.get_quota_by_id(quota_id).await?;
        if quota.level != QuotaLevel::Team {
            return Err(QuotaplaneError::validation(format!(
                "quota '{quota_id}' is not a team quota"
            )));
        }

        let _guards = self
            .locks
            .acquire_ordered(vec![
                LockKey::Department(quota.parent_id, quota.site.clone()),
                LockKey::Team(quota.node_id, quota.site.clone()),
            ])
            .await;

        let quota = self.quotas.get_quota_by_id(quota_id).await?;
        if !has_scoped_capability(actor, Capability::SetTeamQuota, Some(quota.parent_id)) {
            return Err(QuotaplaneError::forbidden(
                "only an administrator of this department can set team quotas",
            ));
        }

        ensure_not_below_used(&quota, limits)?;
        let parent = self
            .quotas
            .get_quota(QuotaLevel::Department, quota.parent_id, &quota.site)
            .await?
            .ok_or_else(|| {
                QuotaplaneError::quota_exceeded(format!(
                    "no department quota exists for '{}' at site '{}'",
                    quota.parent_id, quota.site
                ))
            })?;
        let sibling_sum = self
            .quotas
            .list_quotas(QuotaLevel::Team, quota.parent_id, &quota.site)
            .await?
            .iter()
            .fold(Resources::ZERO, |acc, q| acc.saturating_add(q.limits()));
        ensure_parent_headroom(
            parent.limits(),
            sibling_sum,
            ResourceDelta::between(limits, quota.limits()),
        )?;

        let parent_used = sibling_sum
            .saturating_sub(quota.limits())
            .saturating_add(limits);
        let updated = self
            .quotas
            .set_limits_with_parent_debit(quota_id, limits, parent.id, parent_used)
            .await?;
        info!(%quota_id, cpu = limits.cpu, ram_gb = limits.ram_gb, "Team quota updated");
        Ok(updated)
    }

    /// Build the hierarchy view, filtered at every level by the actor's
    /// scope. Super-admins see the whole tree including empty centers;
    /// scoped admins see only the branch containing their node, pruned
    /// bottom-up.
    pub async fn allocation_tree(&self, actor: &Actor) -> QpResult<AllocationTree> {
        let mut centers = Vec::new();
        for center in self.org.list_centers().await? {
            let mut fields = Vec::new();
            for field in self.org.list_fields_for_center(center.id).await? {
                if actor.role == Role::FieldAdmin && actor.scope_id != Some(field.id) {
                    continue;
                }
                let node = self.field_node(actor, field).await?;
                // Department- and team-scoped actors only see fields that
                // still contain their node after filtering.
                if matches!(actor.role, Role::DeptAdmin | Role::TeamLead)
                    && node.departments.is_empty()
                {
                    continue;
                }
                fields.push(node);
            }
            if !is_super_admin(actor) && fields.is_empty() {
                continue;
            }
            centers.push(CenterNode { center, fields });
        }
        Ok(AllocationTree { centers })
    }

    async fn field_node(&self, actor: &Actor, field: Field) -> QpResult<FieldNode> {
        let capacity = self.allocations.field_capacity(field.id, &field.site).await?;
        let mut departments = Vec::new();
        for department in self.org.list_departments_for_field(field.id).await? {
            if actor.role == Role::DeptAdmin && actor.scope_id != Some(department.id) {
                continue;
            }
            let quotas = self
                .quotas
                .list_quotas_for_parent(QuotaLevel::Department, field.id)
                .await?
                .into_iter()
                .filter(|q| q.node_id == department.id)
                .collect();

            let mut teams = Vec::new();
            for team in self.org.list_teams_for_department(department.id).await? {
                if actor.role == Role::TeamLead && actor.scope_id != Some(team.id) {
                    continue;
                }
                let team_quotas = self
                    .quotas
                    .list_quotas_for_parent(QuotaLevel::Team, department.id)
                    .await?
                    .into_iter()
                    .filter(|q| q.node_id == team.id)
                    .collect();
                teams.push(TeamNode {
                    team,
                    quotas: team_quotas,
                });
            }
            // A team lead only sees departments that still contain their
            // team after filtering.
            if actor.role == Role::TeamLead && teams.is_empty() {
                continue;
            }
            departments.push(DepartmentNode {
                department,
                quotas,
                teams,
            });
        }
        Ok(FieldNode {
            field,
            capacity,
            departments,
        })
    }
}
