//! Process statistics and capability indices.
//!
//! Computes descriptive statistics, natural control limits, and the Cp/Cpk
//! capability family for one numeric series against optional specification
//! limits. All functions are total: degenerate inputs (empty series, zero
//! spread) produce defined values, never panics or NaN in displayed fields.

use std::fmt;

use crate::error::{Error, Result};

/// Specification limits for a numeric outcome.
///
/// Any subset of the bounds may be present; a chart without specs uses
/// [`SpecLimits::none`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpecLimits {
    /// Upper specification limit.
    pub usl: Option<f64>,
    /// Lower specification limit.
    pub lsl: Option<f64>,
    /// Target value.
    pub target: Option<f64>,
}

impl SpecLimits {
    /// Create validated specification limits.
    ///
    /// # Errors
    /// Returns [`Error::InvalidSpecLimits`] if either limit is non-finite,
    /// or `usl <= lsl` when both are provided.
    pub fn new(usl: Option<f64>, lsl: Option<f64>) -> Result<Self> {
        if let Some(u) = usl {
            if !u.is_finite() {
                return Err(Error::invalid_spec_limits("USL must be finite"));
            }
        }
        if let Some(l) = lsl {
            if !l.is_finite() {
                return Err(Error::invalid_spec_limits("LSL must be finite"));
            }
        }
        if let (Some(u), Some(l)) = (usl, lsl) {
            if u <= l {
                return Err(Error::invalid_spec_limits(format!(
                    "USL ({u}) must be greater than LSL ({l})"
                )));
            }
        }
        Ok(Self {
            usl,
            lsl,
            target: None,
        })
    }

    /// Limits with no bounds set.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Set the target value.
    #[must_use]
    pub fn with_target(mut self, target: f64) -> Self {
        self.target = Some(target);
        self
    }

    /// Returns `true` if neither bound is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.usl.is_none() && self.lsl.is_none()
    }
}

/// Descriptive statistics for one numeric series.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcessStats {
    /// Sample mean.
    pub mean: f64,
    /// Sample standard deviation (n-1 denominator), 0 for fewer than 2 values.
    pub std_dev: f64,
    /// Upper natural control limit: mean + 3 sigma.
    pub ucl: f64,
    /// Lower natural control limit: mean - 3 sigma.
    pub lcl: f64,
    /// Cp = (USL - LSL) / 6 sigma. `None` unless both limits are present
    /// and the spread is positive.
    pub cp: Option<f64>,
    /// Cpk = min(Cpu, Cpl) over the present limits. `None` when no limit
    /// is present or the spread is zero.
    pub cpk: Option<f64>,
    /// Percentage of values strictly outside the present limits.
    pub out_of_spec_pct: f64,
}

/// Spec comparison status for a single measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpecStatus {
    /// Within (or exactly on) the present limits.
    Pass,
    /// Above the upper specification limit.
    FailUsl,
    /// Below the lower specification limit.
    FailLsl,
    /// No limits are set.
    NotApplicable,
}

impl fmt::Display for SpecStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pass => "PASS",
            Self::FailUsl => "FAIL_USL",
            Self::FailLsl => "FAIL_LSL",
            Self::NotApplicable => "N/A",
        };
        write!(f, "{s}")
    }
}

/// Classify one measurement against the specification limits.
///
/// A value equal to a limit counts as `Pass`; only values strictly beyond
/// a bound fail on that side.
#[must_use]
pub fn spec_status(value: f64, limits: &SpecLimits) -> SpecStatus {
    if limits.is_empty() {
        return SpecStatus::NotApplicable;
    }
    if let Some(usl) = limits.usl {
        if value > usl {
            return SpecStatus::FailUsl;
        }
    }
    if let Some(lsl) = limits.lsl {
        if value < lsl {
            return SpecStatus::FailLsl;
        }
    }
    SpecStatus::Pass
}

/// Compute descriptive statistics and capability indices for one series.
///
/// Non-finite values are skipped. An empty series yields all-zero statistics
/// with `cp`/`cpk` undefined; the function never fails.
///
/// # Algorithm
/// - `std_dev` is the sample standard deviation (n-1 denominator).
/// - `ucl`/`lcl` are the natural process limits mean +/- 3 sigma, not the
///   specification limits.
/// - `cp = (USL - LSL) / 6 sigma`, both limits required.
/// - `cpk = min(Cpu, Cpl)` over the present limits, where
///   `Cpu = (USL - mean) / 3 sigma` and `Cpl = (mean - LSL) / 3 sigma`.
/// - Zero spread leaves `cp`/`cpk` undefined (`None`) rather than infinite.
#[must_use]
pub fn process_stats(values: &[f64], limits: &SpecLimits) -> ProcessStats {
    let data: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let n = data.len();

    if n == 0 {
        return ProcessStats {
            mean: 0.0,
            std_dev: 0.0,
            ucl: 0.0,
            lcl: 0.0,
            cp: None,
            cpk: None,
            out_of_spec_pct: 0.0,
        };
    }

    let mean = data.iter().sum::<f64>() / n as f64;
    let std_dev = if n < 2 {
        0.0
    } else {
        let ss: f64 = data.iter().map(|&v| (v - mean).powi(2)).sum();
        (ss / (n - 1) as f64).sqrt()
    };

    let ucl = mean + 3.0 * std_dev;
    let lcl = mean - 3.0 * std_dev;

    let (cp, cpk) = if std_dev > 0.0 {
        let cpu = limits.usl.map(|usl| (usl - mean) / (3.0 * std_dev));
        let cpl = limits.lsl.map(|lsl| (mean - lsl) / (3.0 * std_dev));
        let cp = match (limits.usl, limits.lsl) {
            (Some(usl), Some(lsl)) => Some((usl - lsl) / (6.0 * std_dev)),
            _ => None,
        };
        let cpk = match (cpu, cpl) {
            (Some(u), Some(l)) => Some(u.min(l)),
            (Some(u), None) => Some(u),
            (None, Some(l)) => Some(l),
            (None, None) => None,
        };
        (cp, cpk)
    } else {
        (None, None)
    };

    let out_of_spec_pct = if limits.is_empty() {
        0.0
    } else {
        let out = data
            .iter()
            .filter(|&&v| spec_status(v, limits) != SpecStatus::Pass)
            .count();
        out as f64 / n as f64 * 100.0
    };

    ProcessStats {
        mean,
        std_dev,
        ucl,
        lcl,
        cp,
        cpk,
        out_of_spec_pct,
    }
}
