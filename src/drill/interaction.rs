//! Pairwise factor interaction detection.
//!
//! After a drill path is established, factor pairs already drilled are
//! tested for an above-additive combined effect: when the variation
//! explained by the pair jointly exceeds the sum of each factor alone by
//! more than a fixed margin, an interaction edge is emitted for the
//! mindmap. Both sides of the comparison use grouped eta-squared on the
//! same granularity (numeric factors are bucketed), so the additive
//! baseline and the joint effect are commensurable.

use std::collections::{HashMap, HashSet};

use crate::table::{Table, Value, ValueKey};

/// An above-additive combined effect between two drilled factors.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InteractionEdge {
    /// First factor of the pair (path order).
    pub factor_a: String,
    /// Second factor of the pair.
    pub factor_b: String,
    /// Variation explained by the pair jointly, in percent.
    pub joint_pct: f64,
    /// Sum of the variation each factor explains alone, in percent.
    pub additive_pct: f64,
    /// How far the joint effect exceeds the additive baseline.
    pub excess_pct: f64,
}

// Group key for interaction scoring: exact value for categorical factors,
// bucket ordinal for numeric ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey {
    Value(ValueKey),
    Bucket(usize),
}

/// Joint and individual explained-variation percentages for a factor pair
/// over a row subset. `None` when either factor cannot form at least two
/// groups there.
pub(crate) fn pair_variation(
    table: &Table,
    outcome: &str,
    factor_a: &str,
    factor_b: &str,
    indices: &[usize],
    numeric_buckets: usize,
) -> Option<(f64, f64, f64)> {
    let keys_a = row_keys(table, factor_a, indices, numeric_buckets);
    let keys_b = row_keys(table, factor_b, indices, numeric_buckets);

    let mut single_a = Vec::new();
    let mut single_b = Vec::new();
    let mut joint = Vec::new();
    for (pos, &i) in indices.iter().enumerate() {
        let Some(y) = table.value(i, outcome).as_number() else {
            continue;
        };
        let (Some(ka), Some(kb)) = (keys_a[pos].clone(), keys_b[pos].clone()) else {
            continue;
        };
        single_a.push((ka.clone(), y));
        single_b.push((kb.clone(), y));
        joint.push(((ka, kb), y));
    }

    let a_pct = grouped_eta_squared(&single_a)? * 100.0;
    let b_pct = grouped_eta_squared(&single_b)? * 100.0;
    let joint_pct = grouped_eta_squared(&joint)? * 100.0;
    Some((a_pct, b_pct, joint_pct))
}

// Per-row group keys for one factor, aligned with `indices`. Numeric
// factors are assigned to quantile buckets; rows whose value cannot be
// keyed (non-finite numbers) yield None.
fn row_keys(
    table: &Table,
    factor: &str,
    indices: &[usize],
    numeric_buckets: usize,
) -> Vec<Option<GroupKey>> {
    let numeric = {
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
        all_numeric && distinct.len() > numeric_buckets
    };

    if !numeric {
        return indices
            .iter()
            .map(|&i| Some(GroupKey::Value(ValueKey::of(table.value(i, factor)))))
            .collect();
    }

    let buckets = numeric_buckets.max(1);
    let mut sorted: Vec<f64> = indices
        .iter()
        .filter_map(|&i| table.value(i, factor).as_number())
        .collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len();
    let mut edges = Vec::with_capacity(buckets + 1);
    edges.push(sorted[0]);
    for b in 1..buckets {
        edges.push(sorted[b * n / buckets]);
    }
    edges.push(sorted[n - 1]);

    indices
        .iter()
        .map(|&i| {
            let value = table.value(i, factor);
            if value.is_null() {
                return Some(GroupKey::Value(ValueKey::Null));
            }
            let x = value.as_number()?;
            let b = (0..buckets)
                .find(|&b| b == buckets - 1 || x < edges[b + 1])
                .unwrap_or(buckets - 1);
            Some(GroupKey::Bucket(b))
        })
        .collect()
}

// Eta-squared over keyed observations: SS_between / SS_total.
// None with fewer than 2 groups or fewer observations than groups.
fn grouped_eta_squared<K: std::hash::Hash + Eq>(pairs: &[(K, f64)]) -> Option<f64> {
    let n = pairs.len();
    if n == 0 {
        return None;
    }

    let mut groups: HashMap<&K, (usize, f64)> = HashMap::new();
    let mut grand_sum = 0.0;
    for (key, y) in pairs {
        let entry = groups.entry(key).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += y;
        grand_sum += y;
    }

    let k = groups.len();
    if k < 2 || n <= k {
        return None;
    }

    let grand_mean = grand_sum / n as f64;
    let ss_total: f64 = pairs.iter().map(|(_, y)| (y - grand_mean).powi(2)).sum();
    if ss_total < 1e-300 {
        return Some(0.0);
    }

    let ss_between: f64 = groups
        .values()
        .map(|&(gn, gsum)| {
            let gmean = gsum / gn as f64;
            gn as f64 * (gmean - grand_mean).powi(2)
        })
        .sum();

    Some((ss_between / ss_total).clamp(0.0, 1.0))
}
