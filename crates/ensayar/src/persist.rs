//! Persisted tree snapshots and merge-by-name reconciliation.
//!
//! The tree is rebuilt from scratch on every discovery pass. To keep the
//! UI stable across recompiles, the previous tree is captured as a
//! [`TreeSnapshot`] and merged onto the freshly built tree: both trees
//! are walked in lock-step by matching name path and only UI-only fields
//! (selection, openness) are copied. Everything else in the snapshot is
//! discarded.

use crate::node::{NodeId, NodeState, NodeTree};
use crate::result::EnsayarResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Serializable snapshot of one node and its subtree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeSnapshot {
    /// Node name (path segment)
    pub name: String,
    /// Selection flag
    pub is_selected: bool,
    /// UI expand state
    pub is_opened: bool,
    /// Visibility filter result
    pub is_hidden: bool,
    /// Last known state
    pub state: NodeState,
    /// Children in discovery order
    #[serde(default)]
    pub children: Vec<TreeSnapshot>,
}

impl TreeSnapshot {
    /// Capture the whole tree
    #[must_use]
    pub fn capture(tree: &NodeTree) -> Self {
        Self::capture_node(tree, tree.root())
    }

    fn capture_node(tree: &NodeTree, id: NodeId) -> Self {
        Self {
            name: tree.name(id).to_string(),
            is_selected: tree.is_selected(id),
            is_opened: tree.is_opened(id),
            is_hidden: tree.is_hidden(id),
            state: tree.state(id),
            children: tree
                .children(id)
                .iter()
                .map(|child| Self::capture_node(tree, *child))
                .collect(),
        }
    }

    /// Find a direct child snapshot by name
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&TreeSnapshot> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Serialize to a JSON file
    pub fn save_to(&self, path: &Path) -> EnsayarResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Deserialize from a JSON file
    pub fn load_from(path: &Path) -> EnsayarResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Copy UI-only state (leaf selection, per-node openness) from a snapshot
/// of the previous tree onto a freshly rebuilt one.
///
/// No-op when the root names differ: a snapshot of a different root must
/// not contaminate this tree. Selection is restored by re-selecting
/// matched leaves so the counter aggregation stays consistent.
pub fn merge_ui_state(tree: &mut NodeTree, snapshot: &TreeSnapshot) {
    if tree.name(tree.root()) != snapshot.name {
        return;
    }
    tree.set_opened(tree.root(), snapshot.is_opened);
    merge_children(tree, tree.root(), snapshot);
}

fn merge_children(tree: &mut NodeTree, id: NodeId, snapshot: &TreeSnapshot) {
    let children: Vec<NodeId> = tree.children(id).to_vec();
    for child in children {
        let name = tree.name(child).to_string();
        let Some(old) = snapshot.child(&name) else {
            continue;
        };
        tree.set_opened(child, old.is_opened);
        if tree.is_method(child) {
            if old.is_selected {
                tree.set_selected(child, true);
            }
        } else {
            merge_children(tree, child, old);
        }
    }
}
