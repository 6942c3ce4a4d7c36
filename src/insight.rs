//! Shared vocabulary for plain-language insight generation.
//!
//! Insight strings are assembled from a small set of tagged classifications
//! and fixed templates rather than ad hoc string branching, so the wording
//! stays testable.

use std::cmp::Ordering;

/// Directionality policy for judging which group performs "best".
///
/// Whether a low or a high outcome is desirable depends on the measurement
/// (cycle time vs. yield) and cannot be inferred from the data, so callers
/// supply it explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Goal {
    /// Lower outcome values are better (defects, cycle time, cost).
    LowerIsBetter,
    /// Higher outcome values are better (yield, throughput, strength).
    HigherIsBetter,
}

impl Default for Goal {
    fn default() -> Self {
        Self::LowerIsBetter
    }
}

/// How one mean compares to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ComparisonDirection {
    /// The first mean is higher.
    Higher,
    /// The first mean is lower.
    Lower,
    /// The means are equal.
    Equal,
}

impl ComparisonDirection {
    /// Classify how `a` compares to `b`.
    #[must_use]
    pub fn of(a: f64, b: f64) -> Self {
        match a.partial_cmp(&b) {
            Some(Ordering::Greater) => Self::Higher,
            Some(Ordering::Less) => Self::Lower,
            _ => Self::Equal,
        }
    }

    /// The comparative word used in insight templates.
    #[must_use]
    pub fn word(self) -> &'static str {
        match self {
            Self::Higher => "higher",
            Self::Lower => "lower",
            Self::Equal => "equal",
        }
    }
}

/// Format a p-value for display.
///
/// Values below 0.001 render as `< 0.001` rather than an exact small
/// number; everything else renders as `= 0.xxx` with three decimals.
#[must_use]
pub fn format_p_value(p: f64) -> String {
    if p < 0.001 {
        "< 0.001".to_owned()
    } else {
        format!("= {p:.3}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparison_direction() {
        assert_eq!(ComparisonDirection::of(2.0, 1.0), ComparisonDirection::Higher);
        assert_eq!(ComparisonDirection::of(1.0, 2.0), ComparisonDirection::Lower);
        assert_eq!(ComparisonDirection::of(1.0, 1.0), ComparisonDirection::Equal);
        assert_eq!(ComparisonDirection::Higher.word(), "higher");
        assert_eq!(ComparisonDirection::Lower.word(), "lower");
    }

    #[test]
    fn test_format_p_value_small() {
        assert_eq!(format_p_value(0.0001), "< 0.001");
        assert_eq!(format_p_value(0.000_999), "< 0.001");
    }

    #[test]
    fn test_format_p_value_regular() {
        assert_eq!(format_p_value(0.034), "= 0.034");
        assert_eq!(format_p_value(0.001), "= 0.001");
        assert_eq!(format_p_value(0.5), "= 0.500");
    }

    #[test]
    fn test_goal_default_is_lower() {
        assert_eq!(Goal::default(), Goal::LowerIsBetter);
    }
}
