//! Drill-down variation attribution (the mindmap core).
//!
//! A [`DrillSession`] repeatedly partitions a dataset by the factor that
//! explains the most outcome variation, producing a navigable tree of drill
//! nodes with cumulative variation capture:
//!
//! - At every node the remaining candidate factors are ranked by explained
//!   variation (ANOVA eta-squared for categorical factors, regression R²
//!   for numeric ones); ties break on factor name so identical input always
//!   produces identical trees.
//! - Children are emitted for every value (or quantile bucket) of the best
//!   factor, each tagged with the share of the parent's variation it
//!   isolates and the cumulative capture from the root.
//! - The active path is a sequence of [`FilterAction`]s; replaying it
//!   against the raw table reproduces the filtered dataset exactly, which
//!   is what persistence collaborators rely on to reconstruct a session.
//!
//! All transitions are synchronous and must be issued one at a time; the
//! session holds no hidden global state. Per-step factor scores are cached
//! in the session, keyed by `(path hash, outcome, factor)`.
//!
//! ## Example
//!
//! ```rust
//! use variscope::drill::{DrillConfig, DrillSession};
//! use variscope::table::{DataRow, Table, Value};
//!
//! let rows = vec![
//!     ("A", 10.0), ("A", 11.0), ("A", 12.0), ("A", 10.5),
//!     ("B", 30.0), ("B", 31.0), ("B", 32.0), ("B", 30.5),
//! ]
//! .into_iter()
//! .map(|(machine, defects)| {
//!     let mut row = DataRow::new();
//!     row.insert("machine".into(), Value::Text(machine.into()));
//!     row.insert("defects".into(), Value::Number(defects));
//!     row
//! })
//! .collect();
//!
//! let mut session = DrillSession::new(
//!     Table::new(rows),
//!     "defects",
//!     vec!["machine".into()],
//!     DrillConfig::default(),
//! )
//! .unwrap();
//!
//! let ranked = session.rank_factors();
//! assert_eq!(ranked[0].factor, "machine");
//!
//! let node = session.drill_into("machine", Value::Text("A".into())).unwrap();
//! assert!(session.tree().get(node).unwrap().local_variation_pct > 40.0);
//! ```

mod interaction;
mod narrative;
mod score;
mod tree;

pub use interaction::InteractionEdge;
pub use narrative::{Narrative, NarrativeStep};
pub use score::{FactorKind, FactorScore};
pub use tree::{DrillNode, DrillTree, NodeId};

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

use crate::error::{Error, Result};
use crate::table::{FilterAction, Table, Value, ValueKey};

/// Configuration for a drill session.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DrillConfig {
    /// Maximum drill depth below the root (default: 6).
    pub max_depth: usize,
    /// Minimum explained-variation percentage a factor must reach to keep
    /// drilling (default: 5.0). Below it the branch becomes a leaf.
    pub min_capture_pct: f64,
    /// Number of quantile buckets for numeric factors (default: 4).
    pub numeric_buckets: usize,
    /// How far a factor pair's joint effect must exceed the sum of the
    /// individual effects before an interaction edge is emitted
    /// (default: 5.0 percentage points).
    pub interaction_margin_pct: f64,
}

impl Default for DrillConfig {
    fn default() -> Self {
        Self {
            max_depth: 6,
            min_capture_pct: 5.0,
            numeric_buckets: 4,
            interaction_margin_pct: 5.0,
        }
    }
}

// Session cache key for per-step factor scores.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    path_hash: u64,
    outcome: String,
    factor: String,
}

/// A stateful drill-down investigation over one dataset and outcome.
///
/// The session owns the table; transitions (`drill_into`, `navigate_to`,
/// `clear`, `remove_filter`) mutate only the session. Callers must
/// serialize transitions — the engine assumes a single UI thread.
#[derive(Debug, Clone)]
pub struct DrillSession {
    table: Table,
    outcome: String,
    factors: Vec<String>,
    config: DrillConfig,
    path: Vec<FilterAction>,
    tree: DrillTree,
    current: NodeId,
    narrative: Narrative,
    cache: HashMap<CacheKey, Option<FactorScore>>,
}

impl DrillSession {
    /// Start a session at the root (no filters) and expand the first level.
    ///
    /// # Errors
    /// Returns [`Error::UnknownColumn`] if the outcome or any candidate
    /// factor is absent from a non-empty table.
    pub fn new(
        table: Table,
        outcome: impl Into<String>,
        factors: Vec<String>,
        config: DrillConfig,
    ) -> Result<Self> {
        let outcome = outcome.into();
        if !table.is_empty() {
            if !table.has_column(&outcome) {
                return Err(Error::unknown_column(outcome));
            }
            for factor in &factors {
                if !table.has_column(factor) {
                    return Err(Error::unknown_column(factor.clone()));
                }
            }
        }

        let tree = DrillTree::with_root(table.all_indices());
        let current = tree.root();
        let mut session = Self {
            table,
            outcome,
            factors,
            config,
            path: Vec::new(),
            tree,
            current,
            narrative: Narrative::default(),
            cache: HashMap::new(),
        };
        session.expand_current();
        Ok(session)
    }

    /// The dataset this session investigates.
    #[must_use]
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// The outcome column.
    #[must_use]
    pub fn outcome(&self) -> &str {
        &self.outcome
    }

    /// The candidate factors.
    #[must_use]
    pub fn factors(&self) -> &[String] {
        &self.factors
    }

    /// The session configuration.
    #[must_use]
    pub fn config(&self) -> &DrillConfig {
        &self.config
    }

    /// The active filter path, in drill order.
    #[must_use]
    pub fn path(&self) -> &[FilterAction] {
        &self.path
    }

    /// The drill tree.
    #[must_use]
    pub fn tree(&self) -> &DrillTree {
        &self.tree
    }

    /// The node the session currently stands on.
    #[must_use]
    pub fn current(&self) -> NodeId {
        self.current
    }

    /// The current node's data.
    #[must_use]
    pub fn current_node(&self) -> &DrillNode {
        self.tree.get(self.current).expect("current node exists")
    }

    /// The investigation narrative.
    #[must_use]
    pub fn narrative(&self) -> &Narrative {
        &self.narrative
    }

    /// Mutable narrative access, for step rewording and annotation cleanup.
    pub fn narrative_mut(&mut self) -> &mut Narrative {
        &mut self.narrative
    }

    /// Row indices of the active filtered dataset, computed by replaying
    /// the filter path against the full table.
    #[must_use]
    pub fn filtered_indices(&self) -> Vec<usize> {
        self.table.filter_indices(&self.path)
    }

    /// Rank the remaining candidate factors at the current node by
    /// explained variation, descending; ties break on factor name.
    ///
    /// Factors with fewer than 2 distinct values in the current subset are
    /// excluded, not errors.
    pub fn rank_factors(&mut self) -> Vec<FactorScore> {
        let rows = self.current_node().row_indices.clone();
        self.rank_at(self.current, &rows)
    }

    /// Drill into one factor value: append a filter, move to the matching
    /// child node (created if the value was not among the suggestions),
    /// and expand the new subset.
    ///
    /// # Errors
    /// * [`Error::UnknownColumn`] if the factor is not a session candidate.
    /// * [`Error::DuplicateFilter`] if the factor is already on the path.
    pub fn drill_into(&mut self, factor: &str, value: Value) -> Result<NodeId> {
        if !self.factors.iter().any(|f| f == factor) {
            return Err(Error::unknown_column(factor));
        }
        if self.path.iter().any(|a| a.factor == factor) {
            return Err(Error::DuplicateFilter {
                factor: factor.to_owned(),
            });
        }

        let action = FilterAction::equals(factor, value);
        self.path.push(action.clone());
        let child = self.step_to_child(&action);
        self.expand_current();

        let label = self
            .tree
            .get(child)
            .and_then(|n| n.value.clone())
            .unwrap_or_default();
        self.narrative
            .record(child, format!("Drilled into {factor} = {label}"));
        Ok(child)
    }

    /// Jump to any node in the tree: the filter path is truncated to the
    /// target's ancestor chain and the tree is rebuilt forward from the
    /// root, discarding children of abandoned branches. This is also how a
    /// numeric bucket child is entered.
    ///
    /// Returns the target's id in the rebuilt tree.
    ///
    /// # Errors
    /// Returns [`Error::UnknownNode`] if the id is not in the tree.
    pub fn navigate_to(&mut self, id: NodeId) -> Result<NodeId> {
        let Some(node) = self.tree.get(id) else {
            return Err(Error::UnknownNode { id: id.0 });
        };
        let description = match (&node.factor, &node.value) {
            (Some(factor), Some(value)) => format!("Navigated to {factor} = {value}"),
            _ => "Navigated to root".to_owned(),
        };

        self.path = self.actions_for(id);
        self.rebuild();
        self.narrative.record(self.current, description);
        Ok(self.current)
    }

    /// Reset to the unfiltered root.
    pub fn clear(&mut self) {
        self.path.clear();
        self.rebuild();
        self.narrative.record(self.current, "Cleared all filters");
    }

    /// Remove one filter from anywhere in the path and replay the
    /// remainder in original order.
    ///
    /// # Errors
    /// Returns [`Error::FilterNotActive`] if the factor is not filtered.
    pub fn remove_filter(&mut self, factor: &str) -> Result<()> {
        let position = self
            .path
            .iter()
            .position(|a| a.factor == factor)
            .ok_or_else(|| Error::FilterNotActive {
                factor: factor.to_owned(),
            })?;
        self.path.remove(position);
        self.rebuild();
        self.narrative
            .record(self.current, format!("Removed filter on {factor}"));
        Ok(())
    }

    /// Attach an annotation to a node. Annotations are a pure overlay and
    /// never mutate the computed tree.
    ///
    /// # Errors
    /// Returns [`Error::UnknownNode`] if the id is not in the tree.
    pub fn annotate(&mut self, id: NodeId, text: impl Into<String>) -> Result<()> {
        if !self.tree.contains(id) {
            return Err(Error::UnknownNode { id: id.0 });
        }
        self.narrative.set_annotation(id, text);
        Ok(())
    }

    /// The annotation for a node, if any.
    #[must_use]
    pub fn annotation(&self, id: NodeId) -> Option<&str> {
        self.narrative.annotation(id)
    }

    /// Test pairs of drilled factors for an above-additive combined effect
    /// on the full dataset. An edge is emitted when the joint explained
    /// variation exceeds the sum of the individual effects by more than
    /// the configured margin.
    #[must_use]
    pub fn detect_interactions(&self) -> Vec<InteractionEdge> {
        let drilled: Vec<&str> = self.path.iter().map(|a| a.factor.as_str()).collect();
        let indices = self.table.all_indices();
        let mut edges = Vec::new();

        for i in 0..drilled.len() {
            for j in (i + 1)..drilled.len() {
                let Some((a_pct, b_pct, joint_pct)) = interaction::pair_variation(
                    &self.table,
                    &self.outcome,
                    drilled[i],
                    drilled[j],
                    &indices,
                    self.config.numeric_buckets,
                ) else {
                    continue;
                };
                let additive_pct = a_pct + b_pct;
                if joint_pct > additive_pct + self.config.interaction_margin_pct {
                    edges.push(InteractionEdge {
                        factor_a: drilled[i].to_owned(),
                        factor_b: drilled[j].to_owned(),
                        joint_pct,
                        additive_pct,
                        excess_pct: joint_pct - additive_pct,
                    });
                }
            }
        }
        edges
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    // FilterActions for the chain root -> node, derived from node splits.
    fn actions_for(&self, id: NodeId) -> Vec<FilterAction> {
        self.tree
            .path_to(id)
            .into_iter()
            .filter_map(|nid| {
                let node = self.tree.get(nid)?;
                let factor = node.factor.clone()?;
                Some(FilterAction {
                    factor,
                    values: node.members.clone(),
                })
            })
            .collect()
    }

    // Rebuild the tree from scratch by replaying the active path. Node
    // creation order is deterministic, so a shared path prefix keeps its
    // node ids across rebuilds.
    fn rebuild(&mut self) {
        self.tree = DrillTree::with_root(self.table.all_indices());
        self.current = self.tree.root();
        self.expand_current();
        let actions = self.path.clone();
        for action in &actions {
            self.step_to_child(action);
            self.expand_current();
        }
    }

    // Move to the child matching the action, creating it if the action
    // does not correspond to an emitted suggestion.
    fn step_to_child(&mut self, action: &FilterAction) -> NodeId {
        let current = self.current;
        let existing = self.tree.children(current).into_iter().find(|&cid| {
            self.tree.get(cid).is_some_and(|c| {
                c.factor.as_deref() == Some(action.factor.as_str()) && c.members == action.values
            })
        });
        if let Some(cid) = existing {
            self.current = cid;
            return cid;
        }

        let parent_rows = self.tree.get(current).expect("current exists").row_indices.clone();
        let child_rows: Vec<usize> = parent_rows
            .iter()
            .copied()
            .filter(|&i| action.matches(&self.table.rows()[i]))
            .collect();
        let local_pct = score::subset_share(&self.table, &self.outcome, &parent_rows, &child_rows);
        let label = if action.values.len() == 1 {
            action.values[0].to_string()
        } else {
            format!("{} values", action.values.len())
        };
        let child_ys = self.table.numeric_column(&self.outcome, &child_rows);
        let is_leaf = child_ys.len() < 2 || variation_is_zero(&child_ys);

        let id = self.tree.add_child(
            current,
            action.factor.clone(),
            label,
            action.values.clone(),
            local_pct,
            child_rows,
            is_leaf,
        );
        self.current = id;
        id
    }

    // Expand the current node: terminal checks, factor ranking, and child
    // emission for the best factor's values/buckets.
    fn expand_current(&mut self) {
        let node_id = self.current;
        if !self.tree.children(node_id).is_empty() {
            return; // already expanded
        }
        let (rows, depth) = {
            let node = self.tree.get(node_id).expect("current exists");
            (node.row_indices.clone(), node.depth)
        };

        let ys = self.table.numeric_column(&self.outcome, &rows);
        if ys.len() < 2 || variation_is_zero(&ys) {
            self.mark_leaf(node_id);
            return;
        }
        if depth >= self.config.max_depth {
            self.mark_leaf(node_id);
            return;
        }

        let ranked = self.rank_at(node_id, &rows);
        let Some(best) = ranked.first() else {
            self.mark_leaf(node_id);
            return;
        };
        if best.variation_pct < self.config.min_capture_pct {
            self.mark_leaf(node_id);
            return;
        }
        let best_factor = best.factor.clone();

        let parts = score::partitions(
            &self.table,
            &self.outcome,
            &best_factor,
            &rows,
            self.config.numeric_buckets,
        );
        for part in parts {
            let child_ys = self.table.numeric_column(&self.outcome, &part.row_indices);
            let is_leaf = child_ys.len() < 2 || variation_is_zero(&child_ys);
            self.tree.add_child(
                node_id,
                best_factor.clone(),
                part.label,
                part.members,
                part.local_pct,
                part.row_indices,
                is_leaf,
            );
        }
    }

    fn mark_leaf(&mut self, id: NodeId) {
        if let Some(node) = self.tree.get_mut(id) {
            node.is_leaf = true;
        }
    }

    // Score candidate factors at a node, consulting the session cache.
    fn rank_at(&mut self, node_id: NodeId, rows: &[usize]) -> Vec<FactorScore> {
        let actions = self.actions_for(node_id);
        let used: HashSet<&str> = actions.iter().map(|a| a.factor.as_str()).collect();
        let path_hash = hash_actions(&actions);

        let mut scores = Vec::new();
        for factor in self.factors.clone() {
            if used.contains(factor.as_str()) {
                continue;
            }
            let key = CacheKey {
                path_hash,
                outcome: self.outcome.clone(),
                factor: factor.clone(),
            };
            let score = match self.cache.get(&key) {
                Some(cached) => cached.clone(),
                None => {
                    let computed = score::score_factor(
                        &self.table,
                        &self.outcome,
                        &factor,
                        rows,
                        self.config.numeric_buckets,
                    );
                    self.cache.insert(key, computed.clone());
                    computed
                }
            };
            if let Some(score) = score {
                scores.push(score);
            }
        }

        scores.sort_by(|a, b| {
            b.variation_pct
                .partial_cmp(&a.variation_pct)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.factor.cmp(&b.factor))
        });
        scores
    }
}

fn variation_is_zero(ys: &[f64]) -> bool {
    let mean = ys.iter().sum::<f64>() / ys.len() as f64;
    ys.iter().map(|&y| (y - mean).powi(2)).sum::<f64>() < 1e-300
}

// Deterministic hash of a filter path, for cache keys.
fn hash_actions(actions: &[FilterAction]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for action in actions {
        action.factor.hash(&mut hasher);
        for value in &action.values {
            ValueKey::of(value).hash(&mut hasher);
        }
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::DataRow;

    // machine drives most variation, shift a further step within each
    // machine; temp is numeric and only weakly related.
    fn shop_table() -> Table {
        let mut rows = Vec::new();
        for (mi, machine) in ["A", "B"].iter().enumerate() {
            for shift in ["day", "night"] {
                for rep in 0..4_usize {
                    let base = if *machine == "A" { 10.0 } else { 30.0 };
                    let bump = if shift == "night" { 5.0 } else { 0.0 };
                    let mut row = DataRow::new();
                    row.insert("machine".into(), Value::Text((*machine).into()));
                    row.insert("shift".into(), Value::Text(shift.into()));
                    row.insert("temp".into(), Value::Number((rep * 2 + mi) as f64));
                    row.insert(
                        "defects".into(),
                        Value::Number(base + bump + rep as f64 * 0.5),
                    );
                    rows.push(row);
                }
            }
        }
        Table::new(rows)
    }

    fn shop_session() -> DrillSession {
        DrillSession::new(
            shop_table(),
            "defects",
            vec!["machine".into(), "shift".into(), "temp".into()],
            DrillConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_new_validates_columns() {
        let err = DrillSession::new(
            shop_table(),
            "weight",
            vec!["machine".into()],
            DrillConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, Error::unknown_column("weight"));

        let err = DrillSession::new(
            shop_table(),
            "defects",
            vec!["operator".into()],
            DrillConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, Error::unknown_column("operator"));
    }

    #[test]
    fn test_root_ranking_prefers_dominant_factor() {
        let mut session = shop_session();
        let ranked = session.rank_factors();
        assert_eq!(ranked[0].factor, "machine");
        assert!(ranked[0].variation_pct > 90.0);
        assert_eq!(ranked[0].kind, FactorKind::Categorical);
    }

    #[test]
    fn test_root_expansion_emits_value_children() {
        let session = shop_session();
        let children = session.tree().children(session.tree().root());
        assert_eq!(children.len(), 2);

        let labels: Vec<_> = children
            .iter()
            .map(|&id| session.tree().get(id).unwrap().value.clone().unwrap())
            .collect();
        assert_eq!(labels, vec!["A", "B"]);

        // Root cumulative is 0; each child's cumulative equals its local share
        let root = session.tree().get(session.tree().root()).unwrap();
        assert_eq!(root.cumulative_variation_pct, 0.0);
        for &id in &children {
            let node = session.tree().get(id).unwrap();
            assert!(node.local_variation_pct > 0.0);
            assert!(
                (node.cumulative_variation_pct - node.local_variation_pct).abs() < 1e-12
            );
        }
    }

    #[test]
    fn test_drill_into_descends_and_reranks() {
        let mut session = shop_session();
        let node = session
            .drill_into("machine", Value::Text("A".into()))
            .unwrap();

        assert_eq!(session.current(), node);
        assert_eq!(session.current_node().value.as_deref(), Some("A"));
        assert_eq!(session.filtered_indices().len(), 8);

        // Within machine A, shift dominates
        let ranked = session.rank_factors();
        assert_eq!(ranked[0].factor, "shift");
        assert!(ranked[0].variation_pct > 90.0);

        // Children of the A node are the shift values
        let children = session.tree().children(node);
        assert_eq!(children.len(), 2);
        for &id in &children {
            assert_eq!(
                session.tree().get(id).unwrap().factor.as_deref(),
                Some("shift")
            );
        }
    }

    #[test]
    fn test_tree_invariants_hold_everywhere() {
        let mut session = shop_session();
        session.drill_into("machine", Value::Text("A".into())).unwrap();
        session.drill_into("shift", Value::Text("night".into())).unwrap();

        for node in session.tree().nodes() {
            assert!(node.local_variation_pct >= 0.0);
            assert!(node.local_variation_pct <= 100.0);
            assert!(node.cumulative_variation_pct <= 100.0);
            if let Some(parent) = node.parent {
                let parent_cum = session
                    .tree()
                    .get(parent)
                    .unwrap()
                    .cumulative_variation_pct;
                assert!(node.cumulative_variation_pct >= parent_cum - 1e-12);
            }
        }
    }

    #[test]
    fn test_drill_into_rejects_bad_requests() {
        let mut session = shop_session();
        assert_eq!(
            session.drill_into("operator", Value::Text("X".into())),
            Err(Error::unknown_column("operator"))
        );

        session.drill_into("machine", Value::Text("A".into())).unwrap();
        assert_eq!(
            session.drill_into("machine", Value::Text("B".into())),
            Err(Error::DuplicateFilter {
                factor: "machine".into()
            })
        );
    }

    #[test]
    fn test_navigate_to_switches_branch_and_discards_children() {
        let mut session = shop_session();
        let root_children = session.tree().children(session.tree().root());
        let b_child = root_children[1];

        session.drill_into("machine", Value::Text("A".into())).unwrap();
        session.drill_into("shift", Value::Text("day".into())).unwrap();

        let landed = session.navigate_to(b_child).unwrap();
        assert_eq!(session.current(), landed);
        assert_eq!(session.current_node().value.as_deref(), Some("B"));
        assert_eq!(session.path().len(), 1);

        // Filtered set matches a direct replay of the truncated path
        let direct = session
            .table()
            .filter_indices(&[FilterAction::equals("machine", Value::Text("B".into()))]);
        assert_eq!(session.filtered_indices(), direct);

        // The abandoned A branch lost its children; B gained its own
        let a_child = session.tree().children(session.tree().root())[0];
        assert!(session.tree().children(a_child).is_empty());
        assert!(!session.tree().children(landed).is_empty());
    }

    #[test]
    fn test_navigate_to_unknown_node() {
        let mut session = shop_session();
        assert_eq!(
            session.navigate_to(NodeId(999)),
            Err(Error::UnknownNode { id: 999 })
        );
    }

    #[test]
    fn test_clear_resets_to_root() {
        let mut session = shop_session();
        session.drill_into("machine", Value::Text("A".into())).unwrap();
        session.clear();

        assert_eq!(session.current(), session.tree().root());
        assert!(session.path().is_empty());
        assert_eq!(session.filtered_indices().len(), 16);
    }

    #[test]
    fn test_remove_filter_mid_sequence_replays_remainder() {
        let mut session = shop_session();
        session.drill_into("machine", Value::Text("A".into())).unwrap();
        session.drill_into("shift", Value::Text("day".into())).unwrap();

        session.remove_filter("machine").unwrap();

        assert_eq!(session.path().len(), 1);
        assert_eq!(session.path()[0].factor, "shift");
        let direct = session
            .table()
            .filter_indices(&[FilterAction::equals("shift", Value::Text("day".into()))]);
        assert_eq!(session.filtered_indices(), direct);
        assert_eq!(session.filtered_indices().len(), 8);
    }

    #[test]
    fn test_remove_filter_not_active() {
        let mut session = shop_session();
        assert_eq!(
            session.remove_filter("shift"),
            Err(Error::FilterNotActive {
                factor: "shift".into()
            })
        );
    }

    #[test]
    fn test_identical_drills_yield_identical_trees() {
        let mut first = shop_session();
        let mut second = shop_session();
        for session in [&mut first, &mut second] {
            session.drill_into("machine", Value::Text("A".into())).unwrap();
            session.drill_into("shift", Value::Text("night".into())).unwrap();
        }
        assert_eq!(first.tree(), second.tree());
        assert_eq!(first.filtered_indices(), second.filtered_indices());
    }

    #[test]
    fn test_constant_outcome_marks_root_leaf() {
        let rows = (0..6)
            .map(|i| {
                let mut row = DataRow::new();
                row.insert(
                    "machine".into(),
                    Value::Text(if i % 2 == 0 { "A" } else { "B" }.into()),
                );
                row.insert("defects".into(), Value::Number(5.0));
                row
            })
            .collect();
        let session = DrillSession::new(
            Table::new(rows),
            "defects",
            vec!["machine".into()],
            DrillConfig::default(),
        )
        .unwrap();

        let root = session.tree().get(session.tree().root()).unwrap();
        assert!(root.is_leaf);
        assert!(session.tree().children(session.tree().root()).is_empty());
    }

    #[test]
    fn test_weak_factors_fall_below_capture_threshold() {
        // Same outcome distribution in both groups: eta-squared is 0
        let rows = [1.0, 2.0, 3.0, 1.0, 2.0, 3.0]
            .iter()
            .enumerate()
            .map(|(i, &y)| {
                let mut row = DataRow::new();
                row.insert(
                    "machine".into(),
                    Value::Text(if i < 3 { "A" } else { "B" }.into()),
                );
                row.insert("defects".into(), Value::Number(y));
                row
            })
            .collect();
        let session = DrillSession::new(
            Table::new(rows),
            "defects",
            vec!["machine".into()],
            DrillConfig::default(),
        )
        .unwrap();

        let root = session.tree().get(session.tree().root()).unwrap();
        assert!(root.is_leaf);
    }

    #[test]
    fn test_rank_tie_breaks_on_factor_name() {
        // Two identical columns: scores tie exactly, name order decides
        let rows = [10.0, 11.0, 30.0, 31.0, 10.5, 30.5]
            .iter()
            .enumerate()
            .map(|(i, &y)| {
                let group = if y < 20.0 { "low" } else { "high" };
                let mut row = DataRow::new();
                row.insert("beta".into(), Value::Text(group.into()));
                row.insert("alpha".into(), Value::Text(group.into()));
                row.insert("defects".into(), Value::Number(y + i as f64 * 1e-9));
                row
            })
            .collect();
        let mut session = DrillSession::new(
            Table::new(rows),
            "defects",
            vec!["beta".into(), "alpha".into()],
            DrillConfig::default(),
        )
        .unwrap();

        let ranked = session.rank_factors();
        assert_eq!(ranked.len(), 2);
        assert!((ranked[0].variation_pct - ranked[1].variation_pct).abs() < 1e-12);
        assert_eq!(ranked[0].factor, "alpha");
        assert_eq!(ranked[1].factor, "beta");
    }

    #[test]
    fn test_numeric_factor_buckets_and_navigation() {
        let rows = (1..=12)
            .map(|i| {
                let mut row = DataRow::new();
                row.insert("temp".into(), Value::Number(f64::from(i)));
                row.insert("defects".into(), Value::Number(f64::from(i) * 2.0));
                row
            })
            .collect();
        let mut session = DrillSession::new(
            Table::new(rows),
            "defects",
            vec!["temp".into()],
            DrillConfig::default(),
        )
        .unwrap();

        let children = session.tree().children(session.tree().root());
        assert_eq!(children.len(), 4);
        let first = session.tree().get(children[0]).unwrap();
        assert!(first.value.as_deref().unwrap().starts_with('['));
        assert_eq!(first.members.len(), 3);

        // Entering a bucket goes through navigate_to; the bucket's member
        // list replays to exactly its rows
        let landed = session.navigate_to(children[0]).unwrap();
        assert_eq!(session.filtered_indices(), vec![0, 1, 2]);
        assert_eq!(
            session.filtered_indices(),
            session.tree().get(landed).unwrap().row_indices
        );

        // temp is consumed on the path, so the bucket is terminal
        assert!(session.rank_factors().is_empty());
    }

    #[test]
    fn test_interaction_edge_for_crossed_factors() {
        // Outcome low exactly when machine and shift "agree"
        let mut rows = Vec::new();
        for (machine, shift, reps) in [
            ("A", "day", [10.0, 10.5, 9.5]),
            ("A", "night", [20.0, 20.5, 19.5]),
            ("B", "day", [20.0, 20.5, 19.5]),
            ("B", "night", [10.0, 10.5, 9.5]),
        ] {
            for y in reps {
                let mut row = DataRow::new();
                row.insert("machine".into(), Value::Text(machine.into()));
                row.insert("shift".into(), Value::Text(shift.into()));
                row.insert("defects".into(), Value::Number(y));
                rows.push(row);
            }
        }
        let mut session = DrillSession::new(
            Table::new(rows),
            "defects",
            vec!["machine".into(), "shift".into()],
            DrillConfig::default(),
        )
        .unwrap();

        session.drill_into("machine", Value::Text("A".into())).unwrap();
        session.drill_into("shift", Value::Text("day".into())).unwrap();

        let edges = session.detect_interactions();
        assert_eq!(edges.len(), 1);
        let edge = &edges[0];
        assert_eq!(edge.factor_a, "machine");
        assert_eq!(edge.factor_b, "shift");
        assert!(edge.joint_pct > 95.0);
        assert!(edge.excess_pct > 90.0);
    }

    #[test]
    fn test_no_interaction_for_additive_factors() {
        let mut session = shop_session();
        session.drill_into("machine", Value::Text("A".into())).unwrap();
        session.drill_into("shift", Value::Text("night".into())).unwrap();
        assert!(session.detect_interactions().is_empty());
    }

    #[test]
    fn test_annotations_do_not_mutate_tree() {
        let mut session = shop_session();
        let node = session
            .drill_into("machine", Value::Text("A".into()))
            .unwrap();

        let before = session.tree().clone();
        session.annotate(node, "worst performer this month").unwrap();
        assert_eq!(*session.tree(), before);
        assert_eq!(session.annotation(node), Some("worst performer this month"));

        assert_eq!(
            session.annotate(NodeId(999), "nope"),
            Err(Error::UnknownNode { id: 999 })
        );
    }

    #[test]
    fn test_narrative_records_each_transition() {
        let mut session = shop_session();
        session.drill_into("machine", Value::Text("A".into())).unwrap();
        session.drill_into("shift", Value::Text("day".into())).unwrap();
        session.remove_filter("machine").unwrap();
        session.clear();

        let steps = session.narrative().steps();
        assert_eq!(steps.len(), 4);
        assert!(steps[0].text.contains("machine = A"));
        assert!(steps[1].text.contains("shift = day"));
        assert!(steps[2].text.contains("Removed filter on machine"));
        assert!(steps[3].text.contains("Cleared"));

        session.narrative_mut().edit_step(0, "Started with the suspect machine");
        assert_eq!(
            session.narrative().steps()[0].text,
            "Started with the suspect machine"
        );
    }

    #[test]
    fn test_max_depth_limits_expansion() {
        let config = DrillConfig {
            max_depth: 1,
            ..DrillConfig::default()
        };
        let mut session = DrillSession::new(
            shop_table(),
            "defects",
            vec!["machine".into(), "shift".into(), "temp".into()],
            config,
        )
        .unwrap();

        let node = session
            .drill_into("machine", Value::Text("A".into()))
            .unwrap();
        let drilled = session.tree().get(node).unwrap();
        assert!(drilled.is_leaf);
        assert!(session.tree().children(node).is_empty());
    }
}
