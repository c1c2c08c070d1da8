//! Resource quotas and the generic invariant routines.
//!
//! Department and team quotas share one row shape, tagged by
//! [`QuotaLevel`], so the limit/headroom checks exist exactly once and
//! behave identically at every level of the hierarchy:
//!
//! - `used + requested <= limit` at the quota itself, and
//! - `sum(sibling limits) + delta <= parent capacity` one level up.
//!
//! Both CPU and RAM are validated before either field is mutated; a quota
//! write never partially applies.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{QpResult, QuotaplaneError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuotaLevel {
    /// Carved from a field's server capacity.
    Department,
    /// Carved from a department quota.
    Team,
}

/// A CPU/RAM pair. All quota arithmetic goes through this type so the two
/// dimensions are always handled together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Resources {
    pub cpu: u32,
    pub ram_gb: u32,
}

impl Resources {
    pub const ZERO: Resources = Resources { cpu: 0, ram_gb: 0 };

    pub fn new(cpu: u32, ram_gb: u32) -> Self {
        Self { cpu, ram_gb }
    }

    pub fn saturating_add(self, other: Resources) -> Resources {
        Resources {
            cpu: self.cpu.saturating_add(other.cpu),
            ram_gb: self.ram_gb.saturating_add(other.ram_gb),
        }
    }

    /// Subtraction floored at zero. Guards against double-credit bugs on
    /// concurrent rollback paths; a correct caller never hits the floor.
    pub fn saturating_sub(self, other: Resources) -> Resources {
        Resources {
            cpu: self.cpu.saturating_sub(other.cpu),
            ram_gb: self.ram_gb.saturating_sub(other.ram_gb),
        }
    }
}

/// Signed change of a CPU/RAM pair, used for limit updates where the new
/// limit may be below the old one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDelta {
    pub cpu: i64,
    pub ram_gb: i64,
}

impl ResourceDelta {
    /// Delta introduced by adding a brand-new quota of `limits`.
    pub fn addition(limits: Resources) -> Self {
        Self {
            cpu: i64::from(limits.cpu),
            ram_gb: i64::from(limits.ram_gb),
        }
    }

    /// Delta between an existing quota's limits and proposed new limits.
    pub fn between(new: Resources, old: Resources) -> Self {
        Self {
            cpu: i64::from(new.cpu) - i64::from(old.cpu),
            ram_gb: i64::from(new.ram_gb) - i64::from(old.ram_gb),
        }
    }
}

/// One quota row: a (limit, used) pair bounding CPU/RAM consumption at a
/// (node, site). Unique per (level, node_id, site).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceQuota {
    pub id: Uuid,
    pub level: QuotaLevel,
    /// Field for department quotas, department for team quotas.
    pub parent_id: Uuid,
    /// Department or team the quota belongs to.
    pub node_id: Uuid,
    pub site: String,
    pub cpu_limit: u32,
    pub ram_gb_limit: u32,
    pub cpu_used: u32,
    pub ram_gb_used: u32,
}

impl ResourceQuota {
    pub fn limits(&self) -> Resources {
        Resources::new(self.cpu_limit, self.ram_gb_limit)
    }

    pub fn used(&self) -> Resources {
        Resources::new(self.cpu_used, self.ram_gb_used)
    }

    pub fn available(&self) -> Resources {
        self.limits().saturating_sub(self.used())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateQuota {
    pub level: QuotaLevel,
    pub parent_id: Uuid,
    pub node_id: Uuid,
    pub site: String,
    pub limits: Resources,
}

/// `used + requested <= limit`, both dimensions.
pub fn ensure_within_limit(quota: &ResourceQuota, requested: Resources) -> QpResult<()> {
    if u64::from(quota.cpu_used) + u64::from(requested.cpu) > u64::from(quota.cpu_limit) {
        return Err(QuotaplaneError::quota_exceeded(format!(
            "need {} CPU, available {}",
            requested.cpu,
            quota.available().cpu
        )));
    }
    if u64::from(quota.ram_gb_used) + u64::from(requested.ram_gb) > u64::from(quota.ram_gb_limit) {
        return Err(QuotaplaneError::quota_exceeded(format!(
            "need {} GB RAM, available {} GB",
            requested.ram_gb,
            quota.available().ram_gb
        )));
    }
    Ok(())
}

/// A limit may never shrink below the amount already in use.
pub fn ensure_not_below_used(quota: &ResourceQuota, new_limits: Resources) -> QpResult<()> {
    if new_limits.cpu < quota.cpu_used {
        return Err(QuotaplaneError::quota_exceeded(format!(
            "cannot reduce cpu_limit to {}: {} CPU already in use",
            new_limits.cpu, quota.cpu_used
        )));
    }
    if new_limits.ram_gb < quota.ram_gb_used {
        return Err(QuotaplaneError::quota_exceeded(format!(
            "cannot reduce ram_gb_limit to {}: {} GB already in use",
            new_limits.ram_gb, quota.ram_gb_used
        )));
    }
    Ok(())
}

/// `sum(sibling limits) + delta <= parent capacity`, both dimensions.
///
/// For a department quota the parent capacity is the owning field's total
/// assigned server CPU/RAM at the site; for a team quota it is the owning
/// department quota's limits.
pub fn ensure_parent_headroom(
    parent_capacity: Resources,
    sibling_limits: Resources,
    delta: ResourceDelta,
) -> QpResult<()> {
    if i64::from(sibling_limits.cpu) + delta.cpu > i64::from(parent_capacity.cpu) {
        return Err(QuotaplaneError::quota_exceeded(format!(
            "insufficient CPU: capacity {}, allocated {}, requested change {}",
            parent_capacity.cpu, sibling_limits.cpu, delta.cpu
        )));
    }
    if i64::from(sibling_limits.ram_gb) + delta.ram_gb > i64::from(parent_capacity.ram_gb) {
        return Err(QuotaplaneError::quota_exceeded(format!(
            "insufficient RAM: capacity {} GB, allocated {} GB, requested change {} GB",
            parent_capacity.ram_gb, sibling_limits.ram_gb, delta.ram_gb
        )));
    }
    Ok(())
}
