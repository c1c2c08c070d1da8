//! Provisioning backend abstraction.
//!
//! The engine only decides *when* to provision, poll and deprovision; the
//! mechanics live behind this trait. Implementations are expected to be
//! idempotent per project: re-provisioning an already-provisioned namespace
//! must not fail.

use quotaplane_core::error::QpResult;
use quotaplane_core::models::project::Project;
use uuid::Uuid;

/// Backend-reported state of a provisioned namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendStatus {
    /// Desired state has been applied.
    pub synced: bool,
    /// Applied resources are running.
    pub healthy: bool,
}

impl BackendStatus {
    pub fn is_ready(&self) -> bool {
        self.synced && self.healthy
    }
}

/// External system that realizes project namespaces.
pub trait ProvisioningBackend: Send + Sync {
    /// Start provisioning the project's namespace.
    fn provision(&self, project: &Project) -> impl Future<Output = QpResult<()>> + Send;

    /// Report the current state of a previously provisioned namespace.
    fn poll_status(&self, project_id: Uuid) -> impl Future<Output = QpResult<BackendStatus>> + Send;

    /// Tear the namespace down.
    fn deprovision(&self, project: &Project) -> impl Future<Output = QpResult<()>> + Send;
}
