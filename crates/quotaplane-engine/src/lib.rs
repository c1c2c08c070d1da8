//! Quotaplane Engine — allocation, admin and project lifecycle services.
//!
//! Services are generic over the repository traits from `quotaplane-core`
//! and share one [`lock::QuotaLockManager`]; correctness of the quota
//! invariants depends on every mutation path going through the same lock
//! keys.

pub mod admin;
pub mod allocation;
pub mod lock;
pub mod project;
pub mod provisioner;
pub mod worker;

pub use admin::AdminService;
pub use allocation::{AllocationService, AllocationTree};
pub use lock::{LockKey, QuotaLockManager};
pub use project::{NewProject, ProjectService, rollback_provisioning};
pub use provisioner::{BackendStatus, ProvisioningBackend};
pub use worker::{PollConfig, ProvisionJob, ProvisionWorker};
