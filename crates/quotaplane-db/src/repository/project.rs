//! SurrealDB implementation of [`ProjectRepository`].
//!
//! The create/fail/delete operations that touch both the project row and
//! the team quota row are single `BEGIN`/`COMMIT` batches: the quota
//! adjustment and the status transition commit together or not at all.

use chrono::{DateTime, Utc};
use quotaplane_core::error::QpResult;
use quotaplane_core::models::project::{CreateProject, Project, ProjectStatus};
use quotaplane_core::models::quota::Resources;
use quotaplane_core::repository::ProjectRepository;
use quotaplane_core::sla::{PerformanceTier, SlaTier};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::{CountRow, parse_uuid};

#[derive(Debug, SurrealValue)]
struct ProjectRow {
    team_id: String,
    name: String,
    site: String,
    sla_tier: String,
    performance_tier: String,
    namespace: String,
    status: String,
    quota_cpu: u32,
    quota_ram_gb: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, SurrealValue)]
struct ProjectRowWithId {
    record_id: String,
    team_id: String,
    name: String,
    site: String,
    sla_tier: String,
    performance_tier: String,
    namespace: String,
    status: String,
    quota_cpu: u32,
    quota_ram_gb: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

fn parse_status(s: &str) -> Result<ProjectStatus, DbError> {
    match s {
        "Provisioning" => Ok(ProjectStatus::Provisioning),
        "Active" => Ok(ProjectStatus::Active),
        "Failed" => Ok(ProjectStatus::Failed),
        "Deleting" => Ok(ProjectStatus::Deleting),
        "Deleted" => Ok(ProjectStatus::Deleted),
        other => Err(DbError::CorruptRow(format!(
            "unknown project status: {other}"
        ))),
    }
}

fn status_to_string(status: ProjectStatus) -> &'static str {
    match status {
        ProjectStatus::Provisioning => "Provisioning",
        ProjectStatus::Active => "Active",
        ProjectStatus::Failed => "Failed",
        ProjectStatus::Deleting => "Deleting",
        ProjectStatus::Deleted => "Deleted",
    }
}

impl ProjectRow {
    fn into_project(self, id: Uuid) -> Result<Project, DbError> {
        Ok(Project {
            id,
            team_id: parse_uuid("team", &self.team_id)?,
            name: self.name,
            site: self.site,
            sla_tier: SlaTier::parse(&self.sla_tier)
                .map_err(|e| DbError::CorruptRow(e.to_string()))?,
            performance_tier: PerformanceTier::parse(&self.performance_tier)
                .map_err(|e| DbError::CorruptRow(e.to_string()))?,
            namespace: self.namespace,
            status: parse_status(&self.status)?,
            quota: Resources::new(self.quota_cpu, self.quota_ram_gb),
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}

impl ProjectRowWithId {
    fn try_into_project(self) -> Result<Project, DbError> {
        let id = parse_uuid("project", &self.record_id)?;
        ProjectRow {
            team_id: self.team_id,
            name: self.name,
            site: self.site,
            sla_tier: self.sla_tier,
            performance_tier: self.performance_tier,
            namespace: self.namespace,
            status: self.status,
            quota_cpu: self.quota_cpu,
            quota_ram_gb: self.quota_ram_gb,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        }
        .into_project(id)
    }
}

/// SurrealDB implementation of the project repository.
#[derive(Clone)]
pub struct SurrealProjectRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealProjectRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ProjectRepository for SurrealProjectRepository<C> {
    async fn create_project_with_debit(
        &self,
        input: CreateProject,
        quota_id: Uuid,
        quota_used: Resources,
    ) -> QpResult<Project> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        self.db
            .query(
                "BEGIN; \
                 CREATE type::record('project', $id) SET \
                 team_id = $team_id, name = $name, site = $site, \
                 sla_tier = $sla_tier, performance_tier = $performance_tier, \
                 namespace = $namespace, quota_cpu = $quota_cpu, \
                 quota_ram_gb = $quota_ram_gb; \
                 UPDATE type::record('resource_quota', $quota_id) SET \
                 cpu_used = $cpu_used, ram_gb_used = $ram_gb_used; \
                 COMMIT;",
            )
            .bind(("id", id_str.clone()))
            .bind(("team_id", input.team_id.to_string()))
            .bind(("name", input.name))
            .bind(("site", input.site))
            .bind(("sla_tier", input.sla_tier.as_str()))
            .bind(("performance_tier", input.performance_tier.as_str()))
            .bind(("namespace", input.namespace))
            .bind(("quota_cpu", input.quota.cpu))
            .bind(("quota_ram_gb", input.quota.ram_gb))
            .bind(("quota_id", quota_id.to_string()))
            .bind(("cpu_used", quota_used.cpu))
            .bind(("ram_gb_used", quota_used.ram_gb))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        // The batch either committed both writes or neither; read the row
        // back for the DB-assigned timestamps.
        self.get_project(id).await
    }

    async fn get_project(&self, id: Uuid) -> QpResult<Project> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query("SELECT * FROM type::record('project', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<ProjectRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "project".into(),
            id: id_str,
        })?;
        Ok(row.into_project(id)?)
    }

    async fn namespace_in_use(&self, namespace: &str) -> QpResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM project \
                 WHERE namespace = $namespace GROUP ALL",
            )
            .bind(("namespace", namespace.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    async fn list_projects(&self, team_id: Option<Uuid>) -> QpResult<Vec<Project>> {
        let mut result = match team_id {
            Some(team_id) => self
                .db
                .query(
                    "SELECT meta::id(id) AS record_id, * FROM project \
                     WHERE team_id = $team_id ORDER BY created_at ASC",
                )
                .bind(("team_id", team_id.to_string()))
                .await
                .map_err(DbError::from)?,
            None => self
                .db
                .query(
                    "SELECT meta::id(id) AS record_id, * FROM project \
                     ORDER BY created_at ASC",
                )
                .await
                .map_err(DbError::from)?,
        };
        let rows: Vec<ProjectRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|r| r.try_into_project().map_err(Into::into))
            .collect()
    }

    async fn team_has_live_projects(&self, team_id: Uuid) -> QpResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM project \
                 WHERE team_id = $team_id \
                 AND status IN ['Provisioning', 'Active', 'Deleting'] \
                 GROUP ALL",
            )
            .bind(("team_id", team_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    async fn mark_failed_with_credit(
        &self,
        project_id: Uuid,
        quota_id: Uuid,
        quota_used: Resources,
    ) -> QpResult<()> {
        self.db
            .query(
                "BEGIN; \
                 UPDATE type::record('resource_quota', $quota_id) SET \
                 cpu_used = $cpu_used, ram_gb_used = $ram_gb_used; \
                 UPDATE type::record('project', $project_id) SET \
                 status = 'Failed', updated_at = time::now(); \
                 COMMIT;",
            )
            .bind(("quota_id", quota_id.to_string()))
            .bind(("cpu_used", quota_used.cpu))
            .bind(("ram_gb_used", quota_used.ram_gb))
            .bind(("project_id", project_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;
        Ok(())
    }

    async fn mark_deleting_with_credit(
        &self,
        project_id: Uuid,
        quota_id: Uuid,
        quota_used: Resources,
    ) -> QpResult<()> {
        self.db
            .query(
                "BEGIN; \
                 UPDATE type::record('resource_quota', $quota_id) SET \
                 cpu_used = $cpu_used, ram_gb_used = $ram_gb_used; \
                 UPDATE type::record('project', $project_id) SET \
                 status = 'Deleting', updated_at = time::now(), \
                 deleted_at = time::now(); \
                 COMMIT;",
            )
            .bind(("quota_id", quota_id.to_string()))
            .bind(("cpu_used", quota_used.cpu))
            .bind(("ram_gb_used", quota_used.ram_gb))
            .bind(("project_id", project_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;
        Ok(())
    }

    async fn mark_deleting(&self, project_id: Uuid) -> QpResult<()> {
        self.db
            .query(
                "UPDATE type::record('project', $id) SET \
                 status = 'Deleting', updated_at = time::now(), \
                 deleted_at = time::now()",
            )
            .bind(("id", project_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;
        Ok(())
    }

    async fn set_status(&self, project_id: Uuid, status: ProjectStatus) -> QpResult<()> {
        self.db
            .query(
                "UPDATE type::record('project', $id) SET \
                 status = $status, updated_at = time::now()",
            )
            .bind(("id", project_id.to_string()))
            .bind(("status", status_to_string(status)))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;
        Ok(())
    }
}
