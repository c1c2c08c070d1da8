//! CPU tier conversion.
//!
//! Stateless helper translating CPU counts between performance tiers, used
//! by operators sizing quota requests. Nothing here touches storage.

use serde::Serialize;

use crate::error::{QpResult, QuotaplaneError};
use crate::sla::PerformanceTier;

/// Regular CPUs per high-performance CPU. Fixed by product, like the SLA
/// table.
pub const CPU_HP_TO_REGULAR_RATIO: f64 = 2.0;

/// Outcome of one conversion, echoing the inputs alongside the result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CpuConversion {
    pub input_cpu: u32,
    pub output_cpu: f64,
    pub from_tier: PerformanceTier,
    pub to_tier: PerformanceTier,
    pub ratio_used: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversionInfo {
    pub ratio: f64,
    pub description: String,
}

/// Round up to the nearest half core. Fractional high-performance results
/// are always rounded in the requester's favor.
fn round_up_to_half(value: f64) -> f64 {
    (value * 2.0).ceil() / 2.0
}

/// Convert a CPU count from one performance tier to the other.
pub fn convert_cpu(
    cpu_count: u32,
    from_tier: PerformanceTier,
    to_tier: PerformanceTier,
) -> QpResult<CpuConversion> {
    if cpu_count == 0 {
        return Err(QuotaplaneError::validation(
            "cpu_count must be greater than 0",
        ));
    }
    if from_tier == to_tier {
        return Err(QuotaplaneError::validation(
            "from_tier and to_tier must be different",
        ));
    }

    // Tiers differ, so the source tier determines the direction.
    let output_cpu = match from_tier {
        PerformanceTier::HighPerformance => f64::from(cpu_count) * CPU_HP_TO_REGULAR_RATIO,
        PerformanceTier::Regular => round_up_to_half(f64::from(cpu_count) / CPU_HP_TO_REGULAR_RATIO),
    };

    Ok(CpuConversion {
        input_cpu: cpu_count,
        output_cpu,
        from_tier,
        to_tier,
        ratio_used: CPU_HP_TO_REGULAR_RATIO,
    })
}

pub fn conversion_info() -> ConversionInfo {
    ConversionInfo {
        ratio: CPU_HP_TO_REGULAR_RATIO,
        description: format!(
            "1 high_performance CPU = {CPU_HP_TO_REGULAR_RATIO} regular CPUs"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PerformanceTier::{HighPerformance, Regular};

    #[test]
    fn hp_to_regular_multiplies_by_ratio() {
        let result = convert_cpu(8, HighPerformance, Regular).unwrap();
        assert_eq!(result.output_cpu, 16.0);
        assert_eq!(result.input_cpu, 8);
        assert_eq!(result.from_tier, HighPerformance);
        assert_eq!(result.to_tier, Regular);
        assert_eq!(result.ratio_used, CPU_HP_TO_REGULAR_RATIO);
    }

    #[test]
    fn regular_to_hp_divides_by_ratio() {
        let result = convert_cpu(8, Regular, HighPerformance).unwrap();
        assert_eq!(result.output_cpu, 4.0);
    }

    #[test]
    fn regular_to_hp_rounds_up_to_nearest_half() {
        // 3 / 2.0 = 1.5, already a half core.
        assert_eq!(
            convert_cpu(3, Regular, HighPerformance).unwrap().output_cpu,
            1.5
        );
        // 5 / 2.0 = 2.5.
        assert_eq!(
            convert_cpu(5, Regular, HighPerformance).unwrap().output_cpu,
            2.5
        );
        // 1 / 2.0 = 0.5, the smallest grantable slice.
        assert_eq!(
            convert_cpu(1, Regular, HighPerformance).unwrap().output_cpu,
            0.5
        );
    }

    #[test]
    fn zero_cpu_count_is_rejected() {
        assert!(matches!(
            convert_cpu(0, Regular, HighPerformance),
            Err(QuotaplaneError::Validation { .. })
        ));
    }

    #[test]
    fn same_tier_is_rejected() {
        assert!(matches!(
            convert_cpu(8, Regular, Regular),
            Err(QuotaplaneError::Validation { .. })
        ));
        assert!(matches!(
            convert_cpu(8, HighPerformance, HighPerformance),
            Err(QuotaplaneError::Validation { .. })
        ));
    }

    #[test]
    fn info_names_the_ratio() {
        let info = conversion_info();
        assert_eq!(info.ratio, 2.0);
        assert!(info.description.contains("high_performance"));
    }
}
