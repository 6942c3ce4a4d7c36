//! One-way ANOVA with effect size and insight generation.
//!
//! Partitions a numeric outcome by a categorical factor, computes the
//! between/within sum-of-squares decomposition, F-statistic, p-value, and
//! eta-squared effect size, and renders a plain-language insight naming the
//! best-performing group under the caller's [`Goal`] policy.

use std::collections::HashMap;

use crate::dist::f_distribution_p_value;
use crate::error::{Error, Result};
use crate::insight::{format_p_value, ComparisonDirection, Goal};
use crate::table::{Table, Value, ValueKey};

/// Fixed significance threshold for all hypothesis tests.
pub const ALPHA: f64 = 0.05;

/// Configuration for ANOVA insight generation.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnovaConfig {
    /// Directionality policy for naming the best group.
    pub goal: Goal,
}

/// Descriptive statistics for one factor group.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupStat {
    /// Display name of the group's factor value.
    pub name: String,
    /// Group mean.
    pub mean: f64,
    /// Number of valid observations in the group.
    pub n: usize,
    /// Sample standard deviation (0 for fewer than 2 observations).
    pub std_dev: f64,
}

/// Result of a one-way ANOVA.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnovaResult {
    /// F-statistic (MS_between / MS_within).
    pub f_statistic: f64,
    /// p-value from the F-distribution at (df_between, df_within).
    pub p_value: f64,
    /// Whether `p_value < 0.05`.
    pub is_significant: bool,
    /// Proportion of total outcome variance explained by group membership.
    pub eta_squared: f64,
    /// Per-group statistics, in first-seen order.
    pub groups: Vec<GroupStat>,
    /// Sum of squares between groups.
    pub ss_between: f64,
    /// Sum of squares within groups.
    pub ss_within: f64,
    /// Degrees of freedom between groups (k - 1).
    pub df_between: usize,
    /// Degrees of freedom within groups (N - k).
    pub df_within: usize,
    /// Mean square between.
    pub ms_between: f64,
    /// Mean square within.
    pub ms_within: f64,
    /// Plain-language summary of the comparison.
    pub insight: String,
}

/// One-way ANOVA of `outcome` partitioned by `factor`.
///
/// Groups are formed by exact value equality on the factor column (missing
/// values form their own group) over rows with a finite numeric outcome,
/// and keep first-seen order.
///
/// # Returns
/// * `Ok(None)` when there are no valid observations, fewer than 2 distinct
///   groups, or no within-group degrees of freedom (N = k) — "not enough
///   data" is a value, not an error, so callers can render it.
///
/// # Errors
/// * [`Error::UnknownColumn`] if either column is absent from every row.
///
/// # Algorithm
/// SS_between = sum n_i (mean_i - grand)^2, SS_within = sum (x_ij - mean_i)^2,
/// F = MS_between / MS_within with df (k-1, N-k),
/// eta^2 = SS_between / (SS_between + SS_within).
pub fn one_way_anova(
    table: &Table,
    outcome: &str,
    factor: &str,
    config: &AnovaConfig,
) -> Result<Option<AnovaResult>> {
    if table.is_empty() {
        return Ok(None);
    }
    if !table.has_column(outcome) {
        return Err(Error::unknown_column(outcome));
    }
    if !table.has_column(factor) {
        return Err(Error::unknown_column(factor));
    }

    let pairs = table.factor_outcome_pairs(factor, outcome, &table.all_indices());
    Ok(anova_on_pairs(&pairs, factor, config))
}

/// Core ANOVA over pre-extracted `(group value, outcome)` pairs.
///
/// Shared with the drill-down engine, which scores factors over filtered
/// row subsets.
pub(crate) fn anova_on_pairs(
    pairs: &[(&Value, f64)],
    factor: &str,
    config: &AnovaConfig,
) -> Option<AnovaResult> {
    let total_n = pairs.len();
    if total_n == 0 {
        return None;
    }

    // Group observations by exact factor value, first-seen order.
    let mut index: HashMap<ValueKey, usize> = HashMap::new();
    let mut names: Vec<String> = Vec::new();
    let mut groups: Vec<Vec<f64>> = Vec::new();
    for (value, y) in pairs {
        let key = ValueKey::of(value);
        let gi = *index.entry(key).or_insert_with(|| {
            names.push(value.to_string());
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[gi].push(*y);
    }

    let k = groups.len();
    if k < 2 || total_n <= k {
        return None;
    }

    let grand_sum: f64 = groups.iter().flat_map(|g| g.iter()).sum();
    let grand_mean = grand_sum / total_n as f64;

    let group_stats: Vec<GroupStat> = groups
        .iter()
        .zip(names.iter())
        .map(|(g, name)| {
            let n = g.len();
            let mean = g.iter().sum::<f64>() / n as f64;
            let std_dev = if n < 2 {
                0.0
            } else {
                let ss: f64 = g.iter().map(|&x| (x - mean).powi(2)).sum();
                (ss / (n - 1) as f64).sqrt()
            };
            GroupStat {
                name: name.clone(),
                mean,
                n,
                std_dev,
            }
        })
        .collect();

    let ss_between: f64 = group_stats
        .iter()
        .map(|g| g.n as f64 * (g.mean - grand_mean).powi(2))
        .sum();
    let ss_within: f64 = groups
        .iter()
        .zip(group_stats.iter())
        .map(|(g, gs)| g.iter().map(|&x| (x - gs.mean).powi(2)).sum::<f64>())
        .sum();

    let df_between = k - 1;
    let df_within = total_n - k;
    let ms_between = ss_between / df_between as f64;
    let ms_within = ss_within / df_within as f64;

    let f_statistic = if ms_within > 1e-300 {
        ms_between / ms_within
    } else if ms_between > 1e-300 {
        f64::INFINITY
    } else {
        0.0
    };

    let p_value = if f_statistic.is_infinite() {
        0.0
    } else {
        f_distribution_p_value(f_statistic, df_between, df_within)
    };
    let is_significant = p_value < ALPHA;

    let ss_total = ss_between + ss_within;
    let eta_squared = if ss_total > 1e-300 {
        ss_between / ss_total
    } else {
        0.0
    };

    let insight = build_insight(
        factor,
        &group_stats,
        grand_sum,
        total_n,
        is_significant,
        p_value,
        config.goal,
    );

    Some(AnovaResult {
        f_statistic,
        p_value,
        is_significant,
        eta_squared,
        groups: group_stats,
        ss_between,
        ss_within,
        df_between,
        df_within,
        ms_between,
        ms_within,
        insight,
    })
}

// Insight template selection. The winning group is the extreme mean under
// the goal policy; ties keep the first-seen group.
fn build_insight(
    factor: &str,
    groups: &[GroupStat],
    grand_sum: f64,
    total_n: usize,
    is_significant: bool,
    p_value: f64,
    goal: Goal,
) -> String {
    if !is_significant {
        return format!(
            "No significant difference between {factor} groups (p {})",
            format_p_value(p_value)
        );
    }

    let winner = groups
        .iter()
        .fold(&groups[0], |best, g| match goal {
            Goal::LowerIsBetter if g.mean < best.mean => g,
            Goal::HigherIsBetter if g.mean > best.mean => g,
            _ => best,
        });

    // Mean of all observations outside the winning group.
    let rest_n = total_n - winner.n;
    let rest_mean = (grand_sum - winner.mean * winner.n as f64) / rest_n as f64;
    let direction = ComparisonDirection::of(winner.mean, rest_mean);

    format!(
        "{} performs best for {factor}: its mean ({:.2}) is significantly {} \
         than the other groups ({:.2}, p {})",
        winner.name,
        winner.mean,
        direction.word(),
        rest_mean,
        format_p_value(p_value)
    )
}
