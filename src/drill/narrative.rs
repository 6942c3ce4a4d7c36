//! Investigation narrative: the annotatable log of drill actions.
//!
//! Every session transition appends one step describing what happened.
//! Users can reword a step and attach free-text annotations to tree nodes;
//! annotations are a pure key-value overlay and never touch the computed
//! tree.

use std::collections::HashMap;

use super::tree::NodeId;

/// One entry of the investigation trail.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NarrativeStep {
    /// The node the session stood on after the action.
    pub node: NodeId,
    /// Human-readable description of the action; editable.
    pub text: String,
}

/// The linear log of drill actions plus the annotation overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Narrative {
    steps: Vec<NarrativeStep>,
    annotations: HashMap<NodeId, String>,
}

impl Narrative {
    /// Append a step for a completed action.
    pub(crate) fn record(&mut self, node: NodeId, text: impl Into<String>) {
        self.steps.push(NarrativeStep {
            node,
            text: text.into(),
        });
    }

    /// The recorded steps, oldest first.
    #[must_use]
    pub fn steps(&self) -> &[NarrativeStep] {
        &self.steps
    }

    /// Replace the text of an existing step.
    ///
    /// Returns `false` when the index is out of range.
    pub fn edit_step(&mut self, index: usize, text: impl Into<String>) -> bool {
        match self.steps.get_mut(index) {
            Some(step) => {
                step.text = text.into();
                true
            }
            None => false,
        }
    }

    /// Attach (or replace) the annotation for a node.
    pub(crate) fn set_annotation(&mut self, node: NodeId, text: impl Into<String>) {
        self.annotations.insert(node, text.into());
    }

    /// The annotation for a node, if any.
    #[must_use]
    pub fn annotation(&self, node: NodeId) -> Option<&str> {
        self.annotations.get(&node).map(String::as_str)
    }

    /// Remove the annotation for a node, returning it if present.
    pub fn remove_annotation(&mut self, node: NodeId) -> Option<String> {
        self.annotations.remove(&node)
    }
}
