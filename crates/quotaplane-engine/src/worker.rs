//! Provisioning worker — drains the job queue and drives the backend.
//!
//! Jobs are fire-and-forget from the caller's point of view: each one is
//! handled on its own task so a slow status poll never delays other
//! projects. Failures never propagate to the original caller; a failed
//! provision runs the compensating rollback, a failed deprovision is
//! logged and the project stays `Deleting`.

use std::sync::Arc;
use std::time::Duration;

use quotaplane_core::models::project::ProjectStatus;
use quotaplane_core::repository::{ProjectRepository, QuotaRepository};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::lock::QuotaLockManager;
use crate::project::rollback_provisioning;
use crate::provisioner::ProvisioningBackend;

/// Work item on the provisioning queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionJob {
    Provision { project_id: Uuid },
    Deprovision { project_id: Uuid },
}

/// Polling cadence for backend status after a successful provision call.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Pause between status polls.
    pub interval: Duration,
    /// Wall-clock budget before the project is marked failed.
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(300),
        }
    }
}

/// Background worker owning the queue's receiving end.
pub struct ProvisionWorker<Q, P, B>
where
    Q: QuotaRepository + 'static,
    P: ProjectRepository + 'static,
    B: ProvisioningBackend + 'static,
{
    quotas: Q,
    projects: P,
    backend: B,
    locks: Arc<QuotaLockManager>,
    poll: PollConfig,
}

impl<Q, P, B> ProvisionWorker<Q, P, B>
where
    Q: QuotaRepository + 'static,
    P: ProjectRepository + 'static,
    B: ProvisioningBackend + 'static,
{
    pub fn new(
        quotas: Q,
        projects: P,
        backend: B,
        locks: Arc<QuotaLockManager>,
        poll: PollConfig,
    ) -> Self {
        Self {
            quotas,
            projects,
            backend,
            locks,
            poll,
        }
    }

    /// Run the worker on a detached task until the queue closes.
    pub fn spawn(self, jobs: mpsc::UnboundedReceiver<ProvisionJob>) -> JoinHandle<()> {
        tokio::spawn(self.run(jobs))
    }

    async fn run(self, mut jobs: mpsc::UnboundedReceiver<ProvisionJob>) {
        let worker = Arc::new(self);
        while let Some(job) = jobs.recv().await {
            let worker = Arc::clone(&worker);
            tokio::spawn(async move {
                match job {
                    ProvisionJob::Provision { project_id } => {
                        worker.handle_provision(project_id).await;
                    }
                    ProvisionJob::Deprovision { project_id } => {
                        worker.handle_deprovision(project_id).await;
                    }
                }
            });
        }
    }

    async fn handle_provision(&self, project_id: Uuid) {
        let project = match self.projects.get_project(project_id).await {
            Ok(project) => project,
            Err(e) => {
                error!(%project_id, error = %e, "Provision job for unknown project");
                return;
            }
        };

        if let Err(e) = self.backend.provision(&project).await {
            error!(%project_id, namespace = %project.namespace, error = %e,
                   "Provisioning failed, rolling back");
            if let Err(e) =
                rollback_provisioning(&self.locks, &self.quotas, &self.projects, project_id).await
            {
                error!(%project_id, error = %e, "Provisioning rollback failed");
            }
            return;
        }

        self.poll_until_ready(project_id).await;
    }

    /// Poll the backend until the namespace is synced and healthy, or the
    /// timeout elapses. A timeout marks the project failed but leaves the
    /// quota reservation in place: the namespace may still converge, so
    /// its resources stay accounted for until the project is deleted.
    async fn poll_until_ready(&self, project_id: Uuid) {
        let deadline = Instant::now() + self.poll.timeout;
        while Instant::now() < deadline {
            tokio::time::sleep(self.poll.interval).await;
            match self.backend.poll_status(project_id).await {
                Ok(status) if status.is_ready() => {
                    if let Err(e) = self
                        .projects
                        .set_status(project_id, ProjectStatus::Active)
                        .await
                    {
                        error!(%project_id, error = %e, "Failed to mark project active");
                    } else {
                        info!(%project_id, "Project active");
                    }
                    return;
                }
                Ok(_) => {}
                // Transient poll errors don't abort the wait.
                Err(e) => warn!(%project_id, error = %e, "Status poll error"),
            }
        }

        error!(%project_id, timeout_secs = self.poll.timeout.as_secs(),
               "Provisioning timed out");
        if let Err(e) = self
            .projects
            .set_status(project_id, ProjectStatus::Failed)
            .await
        {
            error!(%project_id, error = %e, "Failed to mark project failed after timeout");
        }
    }

    async fn handle_deprovision(&self, project_id: Uuid) {
        let project = match self.projects.get_project(project_id).await {
            Ok(project) => project,
            Err(e) => {
                error!(%project_id, error = %e, "Deprovision job for unknown project");
                return;
            }
        };

        match self.backend.deprovision(&project).await {
            Ok(()) => {
                if let Err(e) = self
                    .projects
                    .set_status(project_id, ProjectStatus::Deleted)
                    .await
                {
                    error!(%project_id, error = %e, "Failed to mark project deleted");
                } else {
                    info!(%project_id, namespace = %project.namespace, "Project deprovisioned");
                }
            }
            // The project stays Deleting; the quota credit already
            // happened at delete time and is not repeated.
            Err(e) => error!(%project_id, error = %e, "Deprovisioning failed"),
        }
    }
}
