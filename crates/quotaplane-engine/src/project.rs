//! Project lifecycle — creation with quota debit, deletion with credit,
//! and the compensating rollback used when provisioning fails.
//!
//! The quota debit commits together with the project row before any
//! external work starts; provisioning itself is fire-and-forget through
//! the job queue. The caller gets the project back in `Provisioning`
//! state immediately.

use std::sync::Arc;

use quotaplane_core::error::{QpResult, QuotaplaneError};
use quotaplane_core::models::actor::{Actor, Role};
use quotaplane_core::models::project::{CreateProject, Project, ProjectStatus};
use quotaplane_core::models::quota::{QuotaLevel, ensure_within_limit};
use quotaplane_core::namespace::namespace_name;
use quotaplane_core::rbac::{Capability, has_scoped_capability};
use quotaplane_core::repository::{OrgRepository, ProjectRepository, QuotaRepository};
use quotaplane_core::sla::{self, PerformanceTier, SlaTier};
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

use crate::lock::{LockKey, QuotaLockManager};
use crate::worker::ProvisionJob;

/// Input for project creation. The owning team comes from the actor's
/// scope, never from the request.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub site: String,
    pub sla_tier: SlaTier,
    pub performance_tier: PerformanceTier,
}

/// Project lifecycle service.
pub struct ProjectService<O, Q, P>
where
    O: OrgRepository,
    Q: QuotaRepository,
    P: ProjectRepository,
{
    org: O,
    quotas: Q,
    projects: P,
    locks: Arc<QuotaLockManager>,
    jobs: mpsc::UnboundedSender<ProvisionJob>,
}

impl<O, Q, P> ProjectService<O, Q, P>
where
    O: OrgRepository,
    Q: QuotaRepository,
    P: ProjectRepository,
{
    pub fn new(
        org: O,
        quotas: Q,
        projects: P,
        locks: Arc<QuotaLockManager>,
        jobs: mpsc::UnboundedSender<ProvisionJob>,
    ) -> Self {
        Self {
            org,
            quotas,
            projects,
            locks,
            jobs,
        }
    }

    fn enqueue(&self, job: ProvisionJob) {
        // The queue only closes on shutdown. Local state is already
        // committed at this point, so the miss is only logged.
        if let Err(e) = self.jobs.send(job) {
            error!(error = %e, "Provisioning queue closed, job dropped");
        }
    }

    /// Create a project for the actor's team, debiting the team quota.
    pub async fn create_project(&self, actor: &Actor, input: NewProject) -> QpResult<Project> {
        // 1. Resolve the acting team from the actor's scope.
        let team_id = match (actor.role, actor.scope_id) {
            (Role::TeamLead, Some(team_id)) => team_id,
            _ => {
                return Err(QuotaplaneError::forbidden(
                    "only a team lead can create projects",
                ));
            }
        };
        self.org.get_team(team_id).await?;

        // 2. Resolve the reservation from the SLA table.
        let required = sla::quota_for(input.sla_tier, input.performance_tier);
        let namespace = namespace_name(team_id, &input.name);

        // 3. Lock the team quota, check headroom, debit and insert as one
        //    transaction.
        let _guard = self
            .locks
            .acquire(LockKey::Team(team_id, input.site.clone()))
            .await;

        // The namespace derives from (team, name); a duplicate name within
        // the team would otherwise only surface as a unique-index error.
        if self.projects.namespace_in_use(&namespace).await? {
            return Err(QuotaplaneError::conflict(format!(
                "a project named '{}' already exists for this team",
                input.name
            )));
        }

        let quota = self
            .quotas
            .get_quota(QuotaLevel::Team, team_id, &input.site)
            .await?
            .ok_or_else(|| {
                QuotaplaneError::quota_exceeded(format!(
                    "no team quota exists for team '{team_id}' at site '{}'",
                    input.site
                ))
            })?;
        ensure_within_limit(&quota, required)?;

        let new_used = quota.used().saturating_add(required);
        let project = self
            .projects
            .create_project_with_debit(
                CreateProject {
                    team_id,
                    name: input.name,
                    site: input.site,
                    sla_tier: input.sla_tier,
                    performance_tier: input.performance_tier,
                    namespace,
                    quota: required,
                },
                quota.id,
                new_used,
            )
            .await?;

        info!(project_id = %project.id, %team_id, namespace = %project.namespace,
              cpu = required.cpu, ram_gb = required.ram_gb, "Project created, provisioning queued");

        // 4. Kick off provisioning after the commit.
        self.enqueue(ProvisionJob::Provision {
            project_id: project.id,
        });
        Ok(project)
    }

    /// Fetch one project. Team leads can only see their own team's
    /// projects; a foreign project reads as missing, not forbidden.
    pub async fn get_project(&self, actor: &Actor, project_id: Uuid) -> QpResult<Project> {
        let project = self.projects.get_project(project_id).await?;
        if actor.role == Role::TeamLead && actor.scope_id != Some(project.team_id) {
            return Err(QuotaplaneError::not_found("project", project_id));
        }
        Ok(project)
    }

    /// List projects visible to the actor.
    pub async fn list_projects(&self, actor: &Actor) -> QpResult<Vec<Project>> {
        let team_filter = match actor.role {
            Role::TeamLead => actor.scope_id,
            _ => None,
        };
        self.projects.list_projects(team_filter).await
    }

    /// Delete a project: credit the team quota and mark it `Deleting` in
    /// one transaction, then enqueue deprovisioning.
    pub async fn delete_project(&self, actor: &Actor, project_id: Uuid) -> QpResult<()> {
        if actor.role != Role::TeamLead {
            return Err(QuotaplaneError::forbidden(
                "only a team lead can delete projects",
            ));
        }

        let project = self.projects.get_project(project_id).await?;
        let _guard = self
            .locks
            .acquire(LockKey::Team(project.team_id, project.site.clone()))
            .await;
        let project = self.projects.get_project(project_id).await?;

        if !has_scoped_capability(actor, Capability::DeleteProject, Some(project.team_id)) {
            return Err(QuotaplaneError::forbidden(
                "project belongs to a different team",
            ));
        }
        if matches!(
            project.status,
            ProjectStatus::Deleting | ProjectStatus::Deleted
        ) {
            return Err(QuotaplaneError::conflict(format!(
                "project '{project_id}' is already deleted"
            )));
        }

        // The credit saturates at zero, so deleting a project whose
        // reservation was already returned by the rollback cannot push
        // usage negative.
        let quota = self
            .quotas
            .get_quota(QuotaLevel::Team, project.team_id, &project.site)
            .await?;
        match quota {
            Some(quota) => {
                let new_used = quota.used().saturating_sub(project.quota);
                self.projects
                    .mark_deleting_with_credit(project_id, quota.id, new_used)
                    .await?;
            }
            // Quota row gone: nothing to credit.
            None => {
                self.projects.mark_deleting(project_id).await?;
            }
        }

        info!(project_id = %project_id, team_id = %project.team_id,
              "Project deletion committed, deprovisioning queued");
        self.enqueue(ProvisionJob::Deprovision {
            project_id: project.id,
        });
        Ok(())
    }
}

/// Compensating transaction for a failed provisioning attempt: credit the
/// reservation back to the team quota and mark the project `Failed`.
///
/// Idempotent: only a project still in `Provisioning` is compensated, so a
/// duplicate invocation (or a racing delete) is a no-op.
pub async fn rollback_provisioning<Q, P>(
    locks: &QuotaLockManager,
    quotas: &Q,
    projects: &P,
    project_id: Uuid,
) -> QpResult<()>
where
    Q: QuotaRepository,
    P: ProjectRepository,
{
    let project = projects.get_project(project_id).await?;
    let _guard = locks
        .acquire(LockKey::Team(project.team_id, project.site.clone()))
        .await;

    let project = projects.get_project(project_id).await?;
    if project.status != ProjectStatus::Provisioning {
        return Ok(());
    }

    match quotas
        .get_quota(QuotaLevel::Team, project.team_id, &project.site)
        .await?
    {
        Some(quota) => {
            let new_used = quota.used().saturating_sub(project.quota);
            projects
                .mark_failed_with_credit(project_id, quota.id, new_used)
                .await?;
        }
        // Quota row gone: nothing to credit, still record the failure.
        None => {
            projects
                .set_status(project_id, ProjectStatus::Failed)
                .await?;
        }
    }
    info!(%project_id, cpu = project.quota.cpu, ram_gb = project.quota.ram_gb,
          "Provisioning rolled back, reservation credited");
    Ok(())
}
