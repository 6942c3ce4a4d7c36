//! Drill tree arena.
//!
//! The drill tree is stored as an arena of nodes indexed by id with explicit
//! parent pointers, so navigation and branch truncation are cheap operations
//! on the path list rather than mutations of an owned recursive structure.

use std::fmt;

use crate::table::Value;

/// Identifier of a node in the drill tree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One node of the drill-down tree.
///
/// The root carries no split (`factor`/`value` are `None`) and owns the
/// full filtered dataset; every other node represents one factor value or
/// numeric bucket within its parent's subset.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DrillNode {
    /// This node's id.
    pub id: NodeId,
    /// Parent node id; `None` for the root.
    pub parent: Option<NodeId>,
    /// Factor this node's split is on; `None` for the root.
    pub factor: Option<String>,
    /// Display label of the factor value or bucket; `None` for the root.
    pub value: Option<String>,
    /// Exact factor values belonging to this node's subset (one for a
    /// categorical value, several for a numeric bucket).
    pub members: Vec<Value>,
    /// Share of the parent subset's outcome variation isolated by this
    /// node, in percent.
    pub local_variation_pct: f64,
    /// Variation captured from the root down to this node, in percent.
    /// 0 at the root, non-decreasing along any path, capped at 100.
    pub cumulative_variation_pct: f64,
    /// Indices into the session's table for this node's row subset.
    pub row_indices: Vec<usize>,
    /// `true` once no further split can isolate meaningful variation here.
    pub is_leaf: bool,
    /// Distance from the root (root is 0).
    pub depth: usize,
}

/// Arena of drill nodes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DrillTree {
    nodes: Vec<DrillNode>,
}

impl DrillTree {
    /// Create a tree containing only a root node over the given rows.
    pub(crate) fn with_root(row_indices: Vec<usize>) -> Self {
        Self {
            nodes: vec![DrillNode {
                id: NodeId(0),
                parent: None,
                factor: None,
                value: None,
                members: Vec::new(),
                local_variation_pct: 0.0,
                cumulative_variation_pct: 0.0,
                row_indices,
                is_leaf: false,
                depth: 0,
            }],
        }
    }

    /// The root node id.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the arena is empty (never the case for a live tree).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns `true` if the id names a node in this tree.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    /// Look up a node by id.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&DrillNode> {
        self.nodes.get(id.0)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut DrillNode> {
        self.nodes.get_mut(id.0)
    }

    /// All nodes, in creation order.
    #[must_use]
    pub fn nodes(&self) -> &[DrillNode] {
        &self.nodes
    }

    /// Child ids of a node, in creation order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.parent == Some(id))
            .map(|n| n.id)
            .collect()
    }

    /// Node ids from the root down to (and including) `id`.
    #[must_use]
    pub fn path_to(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut cursor = Some(id);
        while let Some(node_id) = cursor {
            path.push(node_id);
            cursor = self.nodes.get(node_id.0).and_then(|n| n.parent);
        }
        path.reverse();
        path
    }

    /// Append a child node, deriving its cumulative capture from the parent.
    ///
    /// The cumulative percentage is the parent's plus the child's local
    /// share, capped at 100.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn add_child(
        &mut self,
        parent: NodeId,
        factor: String,
        value: String,
        members: Vec<Value>,
        local_variation_pct: f64,
        row_indices: Vec<usize>,
        is_leaf: bool,
    ) -> NodeId {
        let (parent_cum, parent_depth) = {
            let p = &self.nodes[parent.0];
            (p.cumulative_variation_pct, p.depth)
        };
        let id = NodeId(self.nodes.len());
        self.nodes.push(DrillNode {
            id,
            parent: Some(parent),
            factor: Some(factor),
            value: Some(value),
            members,
            local_variation_pct,
            cumulative_variation_pct: (parent_cum + local_variation_pct).min(100.0),
            row_indices,
            is_leaf,
            depth: parent_depth + 1,
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_level_tree() -> DrillTree {
        let mut tree = DrillTree::with_root(vec![0, 1, 2, 3]);
        let a = tree.add_child(
            tree.root(),
            "machine".into(),
            "A".into(),
            vec!["A".into()],
            60.0,
            vec![0, 1],
            false,
        );
        tree.add_child(
            tree.root(),
            "machine".into(),
            "B".into(),
            vec!["B".into()],
            20.0,
            vec![2, 3],
            false,
        );
        tree.add_child(
            a,
            "shift".into(),
            "day".into(),
            vec!["day".into()],
            30.0,
            vec![0],
            true,
        );
        tree
    }

    #[test]
    fn test_root_has_zero_cumulative() {
        let tree = DrillTree::with_root(vec![0, 1]);
        let root = tree.get(tree.root()).unwrap();
        assert_eq!(root.cumulative_variation_pct, 0.0);
        assert_eq!(root.depth, 0);
        assert!(root.parent.is_none());
    }

    #[test]
    fn test_cumulative_accumulates_along_path() {
        let tree = two_level_tree();
        let leaf = tree.get(NodeId(3)).unwrap();
        assert_eq!(leaf.depth, 2);
        assert!((leaf.cumulative_variation_pct - 90.0).abs() < 1e-12);
    }

    #[test]
    fn test_cumulative_capped_at_100() {
        let mut tree = DrillTree::with_root(vec![0]);
        let a = tree.add_child(
            tree.root(),
            "f".into(),
            "x".into(),
            vec!["x".into()],
            80.0,
            vec![0],
            false,
        );
        let b = tree.add_child(a, "g".into(), "y".into(), vec!["y".into()], 80.0, vec![0], true);
        assert_eq!(tree.get(b).unwrap().cumulative_variation_pct, 100.0);
    }

    #[test]
    fn test_children_in_creation_order() {
        let tree = two_level_tree();
        assert_eq!(tree.children(tree.root()), vec![NodeId(1), NodeId(2)]);
        assert_eq!(tree.children(NodeId(1)), vec![NodeId(3)]);
        assert!(tree.children(NodeId(3)).is_empty());
    }

    #[test]
    fn test_path_to() {
        let tree = two_level_tree();
        assert_eq!(tree.path_to(NodeId(3)), vec![NodeId(0), NodeId(1), NodeId(3)]);
        assert_eq!(tree.path_to(tree.root()), vec![NodeId(0)]);
    }

    #[test]
    fn test_contains() {
        let tree = two_level_tree();
        assert!(tree.contains(NodeId(3)));
        assert!(!tree.contains(NodeId(4)));
    }
}
