//! Keyed async locks serializing quota mutations.
//!
//! Every quota write follows lock → re-read → validate → commit. Locks are
//! exclusive per key; distinct (node, site) pairs never contend. Multi-key
//! acquisition goes through [`QuotaLockManager::acquire_ordered`], which
//! sorts keys by hierarchy rank so two operations locking the same pair of
//! nodes always take them in the same order.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Lock key. Variant declaration order is the hierarchy rank used by
/// [`QuotaLockManager::acquire_ordered`]: a parent is always locked before
/// any of its children.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockKey {
    /// One server's field binding.
    Server(Uuid),
    /// A field's department quotas at one site.
    Field(Uuid, String),
    /// A department's quota at one site.
    Department(Uuid, String),
    /// A team's quota at one site.
    Team(Uuid, String),
}

/// Exclusive guard; the key stays locked until dropped.
pub type LockGuard = OwnedMutexGuard<()>;

/// Process-wide registry of per-key mutexes.
///
/// Entries are created on first use and kept for the manager's lifetime;
/// the key space is bounded by the org tree, so no eviction is needed.
#[derive(Default)]
pub struct QuotaLockManager {
    locks: Mutex<HashMap<LockKey, Arc<Mutex<()>>>>,
}

impl QuotaLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the exclusive lock for one key, waiting if held.
    pub async fn acquire(&self, key: LockKey) -> LockGuard {
        let entry = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(key).or_default())
        };
        entry.lock_owned().await
    }

    /// Acquire several keys in hierarchy rank order (deduplicated).
    pub async fn acquire_ordered(&self, mut keys: Vec<LockKey>) -> Vec<LockGuard> {
        keys.sort();
        keys.dedup();
        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            guards.push(self.acquire(key).await);
        }
        guards
    }
}
