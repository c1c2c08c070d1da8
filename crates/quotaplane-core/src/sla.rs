//! SLA tier → resource quota mapping.
//!
//! The table is static by design: changing an entry is a product decision,
//! not configuration.

use serde::{Deserialize, Serialize};

use crate::error::{QpResult, QuotaplaneError};
use crate::models::quota::Resources;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlaTier {
    Bronze,
    Silver,
    Gold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerformanceTier {
    Regular,
    HighPerformance,
}

impl SlaTier {
    pub fn parse(s: &str) -> QpResult<Self> {
        match s {
            "bronze" => Ok(Self::Bronze),
            "silver" => Ok(Self::Silver),
            "gold" => Ok(Self::Gold),
            other => Err(QuotaplaneError::validation(format!(
                "unknown SLA tier '{other}'"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bronze => "bronze",
            Self::Silver => "silver",
            Self::Gold => "gold",
        }
    }
}

impl PerformanceTier {
    pub fn parse(s: &str) -> QpResult<Self> {
        match s {
            "regular" => Ok(Self::Regular),
            "high_performance" => Ok(Self::HighPerformance),
            other => Err(QuotaplaneError::validation(format!(
                "unknown performance tier '{other}'"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::HighPerformance => "high_performance",
        }
    }
}

/// Resources reserved for a project of the given SLA × performance tier.
pub fn quota_for(sla: SlaTier, perf: PerformanceTier) -> Resources {
    use PerformanceTier::*;
    use SlaTier::*;
    let (cpu, ram_gb) = match (sla, perf) {
        (Bronze, Regular) => (2, 4),
        (Bronze, HighPerformance) => (4, 8),
        (Silver, Regular) => (4, 16),
        (Silver, HighPerformance) => (8, 32),
        (Gold, Regular) => (8, 32),
        (Gold, HighPerformance) => (16, 64),
    };
    Resources::new(cpu, ram_gb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_product_matrix() {
        assert_eq!(quota_for(SlaTier::Bronze, PerformanceTier::Regular), Resources::new(2, 4));
        assert_eq!(
            quota_for(SlaTier::Silver, PerformanceTier::HighPerformance),
            Resources::new(8, 32)
        );
        assert_eq!(
            quota_for(SlaTier::Gold, PerformanceTier::HighPerformance),
            Resources::new(16, 64)
        );
    }

    #[test]
    fn parse_round_trips() {
        for tier in ["bronze", "silver", "gold"] {
            assert_eq!(SlaTier::parse(tier).unwrap().as_str(), tier);
        }
        for tier in ["regular", "high_performance"] {
            assert_eq!(PerformanceTier::parse(tier).unwrap().as_str(), tier);
        }
    }

    #[test]
    fn parse_rejects_unknown() {
        assert!(matches!(
            SlaTier::parse("platinum"),
            Err(QuotaplaneError::Validation { .. })
        ));
        assert!(matches!(
            PerformanceTier::parse("turbo"),
            Err(QuotaplaneError::Validation { .. })
        ));
    }
}
