//! Factor scoring and subset partitioning for drill steps.
//!
//! Each drill step asks two questions of the current row subset: how much
//! outcome variation each remaining candidate factor explains (eta-squared
//! for categorical factors, recommended-fit R² for numeric ones), and how
//! the best factor's values split the subset into child nodes with their
//! local variation shares.

use std::collections::{HashMap, HashSet};

use crate::anova::{anova_on_pairs, AnovaConfig};
use crate::regression::fit_series;
use crate::table::{Table, Value, ValueKey};

/// How a candidate factor is treated when scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FactorKind {
    /// Grouped by exact value; scored with ANOVA eta-squared.
    Categorical,
    /// Treated as a continuous predictor; scored with regression R².
    Numeric,
}

/// Explanatory power of one candidate factor over the current subset.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FactorScore {
    /// The candidate factor.
    pub factor: String,
    /// How the factor was scored.
    pub kind: FactorKind,
    /// Percentage of the subset's outcome variation the factor explains.
    pub variation_pct: f64,
}

/// One value/bucket split of a subset, ready to become a child node.
#[derive(Debug, Clone)]
pub(crate) struct Partition {
    pub label: String,
    pub members: Vec<Value>,
    pub row_indices: Vec<usize>,
    pub local_pct: f64,
}

/// Classify a factor over a row subset.
///
/// A factor is numeric when every non-null value is a number and the
/// distinct value count exceeds the bucket count; numbers with only a
/// handful of distinct values (machine codes, line ids) behave like
/// categories and are grouped instead.
pub(crate) fn classify_factor(
    table: &Table,
    factor: &str,
    indices: &[usize],
    numeric_buckets: usize,
) -> FactorKind {
    let mut distinct: HashSet<ValueKey> = HashSet::new();
    let mut all_numeric = true;
    for &i in indices {
        let value = table.value(i, factor);
        if value.is_null() {
            continue;
        }
        if !matches!(value, Value::Number(_)) {
            all_numeric = false;
        }
        distinct.insert(ValueKey::of(value));
    }
    if all_numeric && distinct.len() > numeric_buckets {
        FactorKind::Numeric
    } else {
        FactorKind::Categorical
    }
}

/// Score one candidate factor over a row subset.
///
/// Returns `None` when the factor cannot be scored there (fewer than 2
/// distinct values, or too little valid data): such factors are excluded
/// from ranking, not errors.
pub(crate) fn score_factor(
    table: &Table,
    outcome: &str,
    factor: &str,
    indices: &[usize],
    numeric_buckets: usize,
) -> Option<FactorScore> {
    let kind = classify_factor(table, factor, indices, numeric_buckets);
    let variation_pct = match kind {
        FactorKind::Categorical => {
            let pairs = table.factor_outcome_pairs(factor, outcome, indices);
            let result = anova_on_pairs(&pairs, factor, &AnovaConfig::default())?;
            result.eta_squared * 100.0
        }
        FactorKind::Numeric => {
            let mut xs = Vec::new();
            let mut ys = Vec::new();
            for &i in indices {
                if let (Some(x), Some(y)) = (
                    table.value(i, factor).as_number(),
                    table.value(i, outcome).as_number(),
                ) {
                    xs.push(x);
                    ys.push(y);
                }
            }
            let result = fit_series(&xs, &ys, factor, outcome).ok()?;
            let r2 = match result.recommended_fit {
                crate::regression::RecommendedFit::Linear => result.linear.r_squared,
                crate::regression::RecommendedFit::Quadratic => {
                    result.quadratic.as_ref().map_or(0.0, |q| q.r_squared)
                }
            };
            r2 * 100.0
        }
    };
    Some(FactorScore {
        factor: factor.to_owned(),
        kind,
        variation_pct,
    })
}

/// Share of the parent subset's outcome variation isolated by one child
/// subset: `n_child * (mean_child - mean_parent)^2 / SS_total(parent)`,
/// in percent. Zero when the parent has no spread or the child has no
/// valid outcome rows.
pub(crate) fn subset_share(
    table: &Table,
    outcome: &str,
    parent_rows: &[usize],
    child_rows: &[usize],
) -> f64 {
    let parent_ys = table.numeric_column(outcome, parent_rows);
    if parent_ys.len() < 2 {
        return 0.0;
    }
    let grand = parent_ys.iter().sum::<f64>() / parent_ys.len() as f64;
    let ss_total: f64 = parent_ys.iter().map(|&y| (y - grand).powi(2)).sum();
    if ss_total < 1e-300 {
        return 0.0;
    }

    let child_ys = table.numeric_column(outcome, child_rows);
    if child_ys.is_empty() {
        return 0.0;
    }
    let mean = child_ys.iter().sum::<f64>() / child_ys.len() as f64;
    (child_ys.len() as f64 * (mean - grand).powi(2) / ss_total * 100.0).min(100.0)
}

/// Partition a subset by the chosen factor's values or buckets.
///
/// Categorical factors yield one partition per distinct value (missing
/// values form their own partition); numeric factors yield quantile
/// buckets. Each partition carries its local variation share.
pub(crate) fn partitions(
    table: &Table,
    outcome: &str,
    factor: &str,
    indices: &[usize],
    numeric_buckets: usize,
) -> Vec<Partition> {
    let kind = classify_factor(table, factor, indices, numeric_buckets);
    let raw = match kind {
        FactorKind::Categorical => categorical_partitions(table, factor, indices),
        FactorKind::Numeric => numeric_partitions(table, factor, indices, numeric_buckets),
    };

    raw.into_iter()
        .map(|(label, members, row_indices)| {
            let local_pct = subset_share(table, outcome, indices, &row_indices);
            Partition {
                label,
                members,
                row_indices,
                local_pct,
            }
        })
        .collect()
}

// One partition per distinct value, first-seen order.
fn categorical_partitions(
    table: &Table,
    factor: &str,
    indices: &[usize],
) -> Vec<(String, Vec<Value>, Vec<usize>)> {
    let mut index: HashMap<ValueKey, usize> = HashMap::new();
    let mut parts: Vec<(String, Vec<Value>, Vec<usize>)> = Vec::new();
    for &i in indices {
        let value = table.value(i, factor);
        let key = ValueKey::of(value);
        let pi = *index.entry(key).or_insert_with(|| {
            parts.push((value.to_string(), vec![value.clone()], Vec::new()));
            parts.len() - 1
        });
        parts[pi].2.push(i);
    }
    parts
}

// Quantile buckets over the finite numeric values; missing values form a
// trailing partition of their own.
fn numeric_partitions(
    table: &Table,
    factor: &str,
    indices: &[usize],
    buckets: usize,
) -> Vec<(String, Vec<Value>, Vec<usize>)> {
    let buckets = buckets.max(1);

    let mut sorted: Vec<f64> = indices
        .iter()
        .filter_map(|&i| table.value(i, factor).as_number())
        .collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    if sorted.is_empty() {
        return Vec::new();
    }

    // Quantile edges: [min, q1, ..., max]
    let n = sorted.len();
    let mut edges = Vec::with_capacity(buckets + 1);
    edges.push(sorted[0]);
    for b in 1..buckets {
        edges.push(sorted[b * n / buckets]);
    }
    edges.push(sorted[n - 1]);

    let assign = |x: f64| -> usize {
        for b in 0..buckets {
            if b == buckets - 1 || x < edges[b + 1] {
                return b;
            }
        }
        buckets - 1
    };

    let mut bucket_rows: Vec<Vec<usize>> = vec![Vec::new(); buckets];
    let mut bucket_members: Vec<Vec<Value>> = vec![Vec::new(); buckets];
    let mut seen: Vec<HashSet<ValueKey>> = vec![HashSet::new(); buckets];
    let mut null_rows: Vec<usize> = Vec::new();

    for &i in indices {
        let value = table.value(i, factor);
        if value.is_null() {
            null_rows.push(i);
            continue;
        }
        let Some(x) = value.as_number() else {
            continue; // non-finite numbers cannot be bucketed
        };
        let b = assign(x);
        bucket_rows[b].push(i);
        if seen[b].insert(ValueKey::of(value)) {
            bucket_members[b].push(value.clone());
        }
    }

    let mut parts = Vec::new();
    for b in 0..buckets {
        if bucket_rows[b].is_empty() {
            continue; // duplicate quantile edges leave empty buckets
        }
        let label = if b == buckets - 1 {
            format!("[{}, {}]", edges[b], edges[b + 1])
        } else {
            format!("[{}, {})", edges[b], edges[b + 1])
        };
        parts.push((
            label,
            std::mem::take(&mut bucket_members[b]),
            std::mem::take(&mut bucket_rows[b]),
        ));
    }
    if !null_rows.is_empty() {
        parts.push(("(missing)".to_owned(), vec![Value::Null], null_rows));
    }
    parts
}
