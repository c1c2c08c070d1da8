//! Placeholder provisioning backend for the bare server binary.
//!
//! Accepts every provision/deprovision request and reports namespaces as
//! immediately ready. Deployments wire a real backend here.

use quotaplane_core::error::QpResult;
use quotaplane_core::models::project::Project;
use quotaplane_engine::{BackendStatus, ProvisioningBackend};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub struct NoopBackend;

impl ProvisioningBackend for NoopBackend {
    async fn provision(&self, project: &Project) -> QpResult<()> {
        tracing::info!(project_id = %project.id, namespace = %project.namespace,
                       "No-op backend: provision accepted");
        Ok(())
    }

    async fn poll_status(&self, _project_id: Uuid) -> QpResult<BackendStatus> {
        Ok(BackendStatus {
            synced: true,
            healthy: true,
        })
    }

    async fn deprovision(&self, project: &Project) -> QpResult<()> {
        tracing::info!(project_id = %project.id, namespace = %project.namespace,
                       "No-op backend: deprovision accepted");
        Ok(())
    }
}
