//! Admin service — org hierarchy CRUD with cascade-block guards.
//!
//! Structural mutations are super-admin only. Deletes refuse while
//! dependent resources exist: fields under a center, departments under a
//! field, teams under a department, live projects or in-use quota under a
//! team or department. Nothing cascades.

use quotaplane_core::error::{QpResult, QuotaplaneError};
use quotaplane_core::models::actor::Actor;
use quotaplane_core::models::org::{
    Center, CreateCenter, CreateDepartment, CreateField, CreateTeam, Department, Field, Team,
};
use quotaplane_core::models::quota::QuotaLevel;
use quotaplane_core::rbac::is_super_admin;
use quotaplane_core::repository::{OrgRepository, ProjectRepository, QuotaRepository};
use tracing::info;
use uuid::Uuid;

/// Org hierarchy administration.
pub struct AdminService<O, Q, P>
where
    O: OrgRepository,
    Q: QuotaRepository,
    P: ProjectRepository,
{
    org: O,
    quotas: Q,
    projects: P,
}

impl<O, Q, P> AdminService<O, Q, P>
where
    O: OrgRepository,
    Q: QuotaRepository,
    P: ProjectRepository,
{
    pub fn new(org: O, quotas: Q, projects: P) -> Self {
        Self {
            org,
            quotas,
            projects,
        }
    }

    fn require_super_admin(actor: &Actor) -> QpResult<()> {
        if !is_super_admin(actor) {
            return Err(QuotaplaneError::forbidden(
                "only top-level administrators can manage the org hierarchy",
            ));
        }
        Ok(())
    }

    pub async fn create_center(&self, actor: &Actor, input: CreateCenter) -> QpResult<Center> {
        Self::require_super_admin(actor)?;
        let center = self.org.create_center(input).await?;
        info!(center_id = %center.id, name = %center.name, "Center created");
        Ok(center)
    }

    pub async fn update_center(&self, actor: &Actor, id: Uuid, name: String) -> QpResult<Center> {
        Self::require_super_admin(actor)?;
        self.org.update_center(id, name).await
    }

    pub async fn delete_center(&self, actor: &Actor, id: Uuid) -> QpResult<()> {
        Self::require_super_admin(actor)?;
        self.org.get_center(id).await?;
        if self.org.center_has_fields(id).await? {
            return Err(QuotaplaneError::conflict(
                "cannot delete center: fields still exist under it",
            ));
        }
        self.org.delete_center(id).await?;
        info!(center_id = %id, "Center deleted");
        Ok(())
    }

    pub async fn create_field(&self, actor: &Actor, input: CreateField) -> QpResult<Field> {
        Self::require_super_admin(actor)?;
        self.org.get_center(input.center_id).await?;
        let field = self.org.create_field(input).await?;
        info!(field_id = %field.id, name = %field.name, site = %field.site, "Field created");
        Ok(field)
    }

    pub async fn update_field(
        &self,
        actor: &Actor,
        id: Uuid,
        name: String,
        site: String,
    ) -> QpResult<Field> {
        Self::require_super_admin(actor)?;
        self.org.update_field(id, name, site).await
    }

    pub async fn delete_field(&self, actor: &Actor, id: Uuid) -> QpResult<()> {
        Self::require_super_admin(actor)?;
        self.org.get_field(id).await?;
        if self.org.field_has_departments(id).await? {
            return Err(QuotaplaneError::conflict(
                "cannot delete field: departments still exist under it",
            ));
        }
        self.org.delete_field(id).await?;
        info!(field_id = %id, "Field deleted");
        Ok(())
    }

    pub async fn create_department(
        &self,
        actor: &Actor,
        input: CreateDepartment,
    ) -> QpResult<Department> {
        Self::require_super_admin(actor)?;
        self.org.get_field(input.field_id).await?;
        let department = self.org.create_department(input).await?;
        info!(department_id = %department.id, name = %department.name, "Department created");
        Ok(department)
    }

    pub async fn update_department(
        &self,
        actor: &Actor,
        id: Uuid,
        name: String,
    ) -> QpResult<Department> {
        Self::require_super_admin(actor)?;
        self.org.update_department(id, name).await
    }

    pub async fn delete_department(&self, actor: &Actor, id: Uuid) -> QpResult<()> {
        Self::require_super_admin(actor)?;
        self.org.get_department(id).await?;
        if self.org.department_has_teams(id).await? {
            return Err(QuotaplaneError::conflict(
                "cannot delete department: teams still exist under it",
            ));
        }
        if self
            .quotas
            .node_has_used_quota(QuotaLevel::Department, id)
            .await?
        {
            return Err(QuotaplaneError::conflict(
                "cannot delete department: its quota has resources in use",
            ));
        }
        self.org.delete_department(id).await?;
        info!(department_id = %id, "Department deleted");
        Ok(())
    }

    pub async fn create_team(&self, actor: &Actor, input: CreateTeam) -> QpResult<Team> {
        Self::require_super_admin(actor)?;
        self.org.get_department(input.department_id).await?;
        let team = self.org.create_team(input).await?;
        info!(team_id = %team.id, name = %team.name, "Team created");
        Ok(team)
    }

    pub async fn update_team(
        &self,
        actor: &Actor,
        id: Uuid,
        name: String,
        directory_group: Option<String>,
    ) -> QpResult<Team> {
        Self::require_super_admin(actor)?;
        self.org.update_team(id, name, directory_group).await
    }

    pub async fn delete_team(&self, actor: &Actor, id: Uuid) -> QpResult<()> {
        Self::require_super_admin(actor)?;
        self.org.get_team(id).await?;
        if self.projects.team_has_live_projects(id).await? {
            return Err(QuotaplaneError::conflict(
                "cannot delete team: it still owns projects that are not deleted",
            ));
        }
        if self
            .quotas
            .node_has_used_quota(QuotaLevel::Team, id)
            .await?
        {
            return Err(QuotaplaneError::conflict(
                "cannot delete team: its quota has resources in use",
            ));
        }
        self.org.delete_team(id).await?;
        info!(team_id = %id, "Team deleted");
        Ok(())
    }
}
