//! Hierarchical node model.
//!
//! An arena-backed tree of group nodes (namespace / nested-class path
//! segments) and method leaves. The tree owns three aggregations that
//! must stay consistent at all times:
//!
//! - tri-state selection, maintained through per-node counters of
//!   selected and semi-selected children;
//! - visibility, counter-based the same way, with auto-hide when every
//!   child is hidden;
//! - pass/fail state, cached on group nodes behind a dirty flag that is
//!   invalidated upward on every leaf state change and recomputed lazily
//!   on read.
//!
//! All counter mutation funnels through two narrow propagation paths:
//! a downward force over a subtree and an upward bubble along parent
//! pointers. The tree is acyclic and the bubble stops as soon as a
//! node's own derived flags stop changing, so propagation terminates and
//! is idempotent.

use crate::registry::MethodRef;
use crate::settings::MethodTestSettings;
use crate::step::LogRecord;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::HashMap;
use tracing::error;

/// Stable identity of a node within its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Aggregated or terminal test state of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NodeState {
    /// Not yet run
    #[default]
    Undefined,
    /// All relevant descendants passed (or the leaf passed)
    Passed,
    /// Skipped by an ignore marker
    Ignored,
    /// At least one failure
    Failed,
}

enum NodeKind {
    Group {
        cached_state: Cell<NodeState>,
        state_dirty: Cell<bool>,
    },
    Method {
        settings: MethodTestSettings,
        method_ref: MethodRef,
        state: NodeState,
        passed_amount: u32,
        failed_amount: u32,
        logs: Vec<LogRecord>,
    },
}

struct NodeData {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    child_index: HashMap<String, NodeId>,
    is_selected: bool,
    is_semi_selected: bool,
    selected_children: usize,
    semi_selected_children: usize,
    is_hidden: bool,
    hidden_children: usize,
    is_opened: bool,
    kind: NodeKind,
}

impl NodeData {
    fn group(name: String, parent: Option<NodeId>) -> Self {
        Self::new(
            name,
            parent,
            NodeKind::Group {
                cached_state: Cell::new(NodeState::Undefined),
                state_dirty: Cell::new(true),
            },
        )
    }

    fn method(
        name: String,
        parent: Option<NodeId>,
        settings: MethodTestSettings,
        method_ref: MethodRef,
    ) -> Self {
        Self::new(
            name,
            parent,
            NodeKind::Method {
                settings,
                method_ref,
                state: NodeState::Undefined,
                passed_amount: 0,
                failed_amount: 0,
                logs: Vec::new(),
            },
        )
    }

    fn new(name: String, parent: Option<NodeId>, kind: NodeKind) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            child_index: HashMap::new(),
            is_selected: false,
            is_semi_selected: false,
            selected_children: 0,
            semi_selected_children: 0,
            is_hidden: false,
            hidden_children: 0,
            is_opened: true,
            kind,
        }
    }
}

/// The node tree: one root group, built once per discovery pass
pub struct NodeTree {
    nodes: Vec<NodeData>,
    root: NodeId,
    pending_state_events: Vec<NodeId>,
}

impl std::fmt::Debug for NodeTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeTree")
            .field("root", &self.nodes[self.root.0].name)
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

impl NodeTree {
    /// Create a tree holding only a root group with the given name
    #[must_use]
    pub fn new(root_name: impl Into<String>) -> Self {
        let root = NodeData::group(root_name.into(), None);
        Self {
            nodes: vec![root],
            root: NodeId(0),
            pending_state_events: Vec::new(),
        }
    }

    /// Root node id
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Total node count including the root
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds only the root
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    /// Append a group child. The tree is additive: children are never
    /// removed within a build pass.
    pub fn add_group(&mut self, parent: NodeId, name: impl Into<String>) -> NodeId {
        let name = name.into();
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData::group(name.clone(), Some(parent)));
        self.attach(parent, id, name);
        id
    }

    /// Append a method leaf
    pub fn add_method(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        settings: MethodTestSettings,
        method_ref: MethodRef,
    ) -> NodeId {
        let name = name.into();
        let id = NodeId(self.nodes.len());
        self.nodes
            .push(NodeData::method(name.clone(), Some(parent), settings, method_ref));
        self.attach(parent, id, name);
        id
    }

    fn attach(&mut self, parent: NodeId, child: NodeId, name: String) {
        self.nodes[parent.0].children.push(child);
        self.nodes[parent.0].child_index.insert(name, child);
        // A fresh child is unselected and visible, which can demote a
        // fully-selected ancestor chain to semi-selected (and reveal a
        // hidden one)
        self.refresh_derived_flags_upward(parent);
        self.invalidate_state_upward(parent);
    }

    /// Find an existing child by exact name
    #[must_use]
    pub fn find_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.nodes[parent.0].child_index.get(name).copied()
    }

    /// Find the group child by name, creating it if missing
    pub fn ensure_group(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.find_child(parent, name)
            .unwrap_or_else(|| self.add_group(parent, name))
    }

    /// Node name (path segment)
    #[must_use]
    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    /// Parent, None for the root
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Children in discovery order
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Number of direct children
    #[must_use]
    pub fn children_count(&self, id: NodeId) -> usize {
        self.nodes[id.0].children.len()
    }

    /// Whether the node is a method leaf
    #[must_use]
    pub fn is_method(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Method { .. })
    }

    /// Dotted path from the root down to this node
    #[must_use]
    pub fn full_name(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut cursor = Some(id);
        while let Some(node) = cursor {
            segments.push(self.nodes[node.0].name.as_str());
            cursor = self.nodes[node.0].parent;
        }
        segments.reverse();
        segments.join(".")
    }

    /// Resolve a dotted path relative to the root (root name excluded)
    #[must_use]
    pub fn find_by_path(&self, path: &str) -> Option<NodeId> {
        let mut cursor = self.root;
        for segment in path.split('.') {
            cursor = self.find_child(cursor, segment)?;
        }
        Some(cursor)
    }

    /// All method leaves in depth-first discovery order
    #[must_use]
    pub fn method_leaves(&self) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if self.is_method(id) {
                leaves.push(id);
            }
            for child in self.nodes[id.0].children.iter().rev() {
                stack.push(*child);
            }
        }
        leaves
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Whether every relevant descendant (or the leaf itself) is selected
    #[must_use]
    pub fn is_selected(&self, id: NodeId) -> bool {
        self.nodes[id.0].is_selected
    }

    /// Whether some but not all descendants are selected
    #[must_use]
    pub fn is_semi_selected(&self, id: NodeId) -> bool {
        self.nodes[id.0].is_semi_selected
    }

    /// Select or deselect this node and every descendant, then update
    /// ancestors
    pub fn set_selected(&mut self, id: NodeId, selected: bool) {
        self.force_subtree(id, selected, Aggregation::Selection);
        self.refresh_derived_flags_upward_from(id);
    }

    // ------------------------------------------------------------------
    // Visibility
    // ------------------------------------------------------------------

    /// Whether the node is hidden by the active filter
    #[must_use]
    pub fn is_hidden(&self, id: NodeId) -> bool {
        self.nodes[id.0].is_hidden
    }

    /// Hide or reveal this node and every descendant. Ancestors auto-hide
    /// when all of their children are hidden and auto-reveal otherwise.
    pub fn set_hidden(&mut self, id: NodeId, hidden: bool) {
        self.force_subtree(id, hidden, Aggregation::Visibility);
        self.refresh_derived_flags_upward_from(id);
    }

    // ------------------------------------------------------------------
    // Open state
    // ------------------------------------------------------------------

    /// UI expand state; defaults to open
    #[must_use]
    pub fn is_opened(&self, id: NodeId) -> bool {
        self.nodes[id.0].is_opened
    }

    /// Set the UI expand state (no propagation)
    pub fn set_opened(&mut self, id: NodeId, opened: bool) {
        self.nodes[id.0].is_opened = opened;
    }

    // ------------------------------------------------------------------
    // State aggregation
    // ------------------------------------------------------------------

    /// Node state. Group nodes recompute lazily from children when their
    /// dirty flag is set: first Failed child wins, else any Undefined,
    /// else any Ignored, else Passed.
    #[must_use]
    pub fn state(&self, id: NodeId) -> NodeState {
        match &self.nodes[id.0].kind {
            NodeKind::Method { state, .. } => *state,
            NodeKind::Group {
                cached_state,
                state_dirty,
            } => {
                if state_dirty.get() {
                    let recomputed = self.aggregate_children_state(id);
                    cached_state.set(recomputed);
                    state_dirty.set(false);
                }
                cached_state.get()
            }
        }
    }

    fn aggregate_children_state(&self, id: NodeId) -> NodeState {
        let children = &self.nodes[id.0].children;
        if children.is_empty() {
            return NodeState::Undefined;
        }
        let mut any_undefined = false;
        let mut any_ignored = false;
        for child in children {
            match self.state(*child) {
                NodeState::Failed => return NodeState::Failed,
                NodeState::Undefined => any_undefined = true,
                NodeState::Ignored => any_ignored = true,
                NodeState::Passed => {}
            }
        }
        if any_undefined {
            NodeState::Undefined
        } else if any_ignored {
            NodeState::Ignored
        } else {
            NodeState::Passed
        }
    }

    /// Write a terminal state onto a method leaf and invalidate every
    /// ancestor's cached state (O(depth), recomputation stays lazy)
    pub fn set_leaf_state(&mut self, id: NodeId, new_state: NodeState) {
        if !self.is_method(id) {
            error!(node = %self.full_name(id), "set_leaf_state called on a group node");
            return;
        }
        if let NodeKind::Method { state, .. } = &mut self.nodes[id.0].kind {
            *state = new_state;
        }
        self.pending_state_events.push(id);
        self.invalidate_state_upward_from(id);
    }

    fn invalidate_state_upward_from(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent {
            self.invalidate_state_upward(parent);
        }
    }

    fn invalidate_state_upward(&mut self, mut id: NodeId) {
        loop {
            if let NodeKind::Group { state_dirty, .. } = &self.nodes[id.0].kind {
                state_dirty.set(true);
            }
            self.pending_state_events.push(id);
            match self.nodes[id.0].parent {
                Some(parent) => id = parent,
                None => break,
            }
        }
    }

    /// Drain the nodes whose aggregated state was invalidated since the
    /// last drain, in notification order. Consumed by run observers.
    pub fn drain_state_events(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.pending_state_events)
    }

    /// Reset every leaf to Undefined and clear run counters and logs,
    /// keeping selection/open/hidden flags. Called at run-session start.
    pub fn reset_results(&mut self) {
        for index in 0..self.nodes.len() {
            if let NodeKind::Method {
                state,
                passed_amount,
                failed_amount,
                logs,
                ..
            } = &mut self.nodes[index].kind
            {
                *state = NodeState::Undefined;
                *passed_amount = 0;
                *failed_amount = 0;
                logs.clear();
            } else if let NodeKind::Group { state_dirty, .. } = &self.nodes[index].kind {
                state_dirty.set(true);
            }
        }
        self.pending_state_events.clear();
    }

    // ------------------------------------------------------------------
    // Leaf accessors
    // ------------------------------------------------------------------

    /// Settings of a method leaf
    #[must_use]
    pub fn settings(&self, id: NodeId) -> Option<&MethodTestSettings> {
        match &self.nodes[id.0].kind {
            NodeKind::Method { settings, .. } => Some(settings),
            NodeKind::Group { .. } => None,
        }
    }

    /// Registered-body reference of a method leaf
    #[must_use]
    pub fn method_ref(&self, id: NodeId) -> Option<MethodRef> {
        match &self.nodes[id.0].kind {
            NodeKind::Method { method_ref, .. } => Some(*method_ref),
            NodeKind::Group { .. } => None,
        }
    }

    /// Accumulated pass count across repeated runs
    #[must_use]
    pub fn passed_amount(&self, id: NodeId) -> u32 {
        match &self.nodes[id.0].kind {
            NodeKind::Method { passed_amount, .. } => *passed_amount,
            NodeKind::Group { .. } => 0,
        }
    }

    /// Accumulated fail count across repeated runs
    #[must_use]
    pub fn failed_amount(&self, id: NodeId) -> u32 {
        match &self.nodes[id.0].kind {
            NodeKind::Method { failed_amount, .. } => *failed_amount,
            NodeKind::Group { .. } => 0,
        }
    }

    /// Increment the pass accumulator
    pub fn record_pass(&mut self, id: NodeId) {
        if let NodeKind::Method { passed_amount, .. } = &mut self.nodes[id.0].kind {
            *passed_amount += 1;
        }
    }

    /// Increment the fail accumulator
    pub fn record_fail(&mut self, id: NodeId) {
        if let NodeKind::Method { failed_amount, .. } = &mut self.nodes[id.0].kind {
            *failed_amount += 1;
        }
    }

    /// Append to the leaf's ordered log buffer
    pub fn push_log(&mut self, id: NodeId, record: LogRecord) {
        if let NodeKind::Method { logs, .. } = &mut self.nodes[id.0].kind {
            logs.push(record);
        }
    }

    /// The leaf's ordered log buffer
    #[must_use]
    pub fn logs(&self, id: NodeId) -> &[LogRecord] {
        match &self.nodes[id.0].kind {
            NodeKind::Method { logs, .. } => logs,
            NodeKind::Group { .. } => &[],
        }
    }

    // ------------------------------------------------------------------
    // Propagation internals
    // ------------------------------------------------------------------

    /// Force a whole subtree to one flag value, rewriting the counters of
    /// every group inside it to the trivially consistent full/zero value
    fn force_subtree(&mut self, id: NodeId, value: bool, what: Aggregation) {
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            let count = self.nodes[node.0].children.len();
            let data = &mut self.nodes[node.0];
            match what {
                Aggregation::Selection => {
                    data.is_selected = value;
                    data.is_semi_selected = false;
                    data.selected_children = if value { count } else { 0 };
                    data.semi_selected_children = 0;
                }
                Aggregation::Visibility => {
                    data.is_hidden = value;
                    data.hidden_children = if value { count } else { 0 };
                }
            }
            stack.extend_from_slice(&self.nodes[node.0].children);
        }
    }

    fn refresh_derived_flags_upward_from(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent {
            self.refresh_derived_flags_upward(parent);
        }
    }

    /// Recompute counters and derived flags at `id` from its direct
    /// children, then continue upward while flags keep changing
    fn refresh_derived_flags_upward(&mut self, mut id: NodeId) {
        loop {
            let changed = self.recount(id);
            match (changed, self.nodes[id.0].parent) {
                (true, Some(parent)) => id = parent,
                _ => break,
            }
        }
    }

    /// Rebuild one node's counters by scanning its children and derive
    /// its own flags. Returns whether the derived flags changed.
    fn recount(&mut self, id: NodeId) -> bool {
        let count = self.nodes[id.0].children.len();
        if count == 0 {
            return false;
        }
        let mut selected = 0usize;
        let mut semi = 0usize;
        let mut hidden = 0usize;
        for child in &self.nodes[id.0].children {
            let child = &self.nodes[child.0];
            selected += usize::from(child.is_selected);
            semi += usize::from(child.is_semi_selected);
            hidden += usize::from(child.is_hidden);
        }
        self.store_counter(id, selected, count, Counter::Selected);
        self.store_counter(id, semi, count, Counter::SemiSelected);
        self.store_counter(id, hidden, count, Counter::Hidden);

        let data = &mut self.nodes[id.0];
        let was = (data.is_selected, data.is_semi_selected, data.is_hidden);
        data.is_selected = data.selected_children == count;
        data.is_semi_selected =
            !data.is_selected && (data.selected_children > 0 || data.semi_selected_children > 0);
        data.is_hidden = data.hidden_children == count;
        was != (data.is_selected, data.is_semi_selected, data.is_hidden)
    }

    /// Store a counter value, clamping into range. Out-of-range values are
    /// a programming error; the UI must stay usable, so log and clamp.
    fn store_counter(&mut self, id: NodeId, value: usize, max: usize, which: Counter) {
        let clamped = value.min(max);
        if clamped != value {
            error!(
                node = %self.full_name(id),
                counter = which.name(),
                value,
                max,
                "counter out of range; clamping"
            );
        }
        let data = &mut self.nodes[id.0];
        match which {
            Counter::Selected => data.selected_children = clamped,
            Counter::SemiSelected => data.semi_selected_children = clamped,
            Counter::Hidden => data.hidden_children = clamped,
        }
    }

    /// Counter snapshot for invariant checks: (selected, semi, hidden)
    #[must_use]
    pub fn counters(&self, id: NodeId) -> (usize, usize, usize) {
        let data = &self.nodes[id.0];
        (
            data.selected_children,
            data.semi_selected_children,
            data.hidden_children,
        )
    }
}

#[derive(Clone, Copy)]
enum Aggregation {
    Selection,
    Visibility,
}

#[derive(Clone, Copy)]
enum Counter {
    Selected,
    SemiSelected,
    Hidden,
}

impl Counter {
    const fn name(self) -> &'static str {
        match self {
            Self::Selected => "selected_children",
            Self::SemiSelected => "semi_selected_children",
            Self::Hidden => "hidden_children",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MethodTestSettings;

    fn leaf_settings() -> MethodTestSettings {
        MethodTestSettings::default()
    }

    fn method_ref(n: usize) -> MethodRef {
        MethodRef {
            fixture: 0,
            method: n,
        }
    }

    /// Root -> ns -> class -> [m0, m1, m2]
    fn sample_tree() -> (NodeTree, NodeId, NodeId, Vec<NodeId>) {
        let mut tree = NodeTree::new("UiTests");
        let ns = tree.add_group(tree.root(), "Game");
        let class = tree.add_group(ns, "MenuTests");
        let leaves = (0..3)
            .map(|i| tree.add_method(class, format!("test_{i}"), leaf_settings(), method_ref(i)))
            .collect();
        (tree, ns, class, leaves)
    }

    mod structure {
        use super::*;

        #[test]
        fn test_full_name_is_dotted_path() {
            let (tree, _, class, leaves) = sample_tree();
            assert_eq!(tree.full_name(class), "UiTests.Game.MenuTests");
            assert_eq!(
                tree.full_name(leaves[0]),
                "UiTests.Game.MenuTests.test_0"
            );
        }

        #[test]
        fn test_children_keep_discovery_order() {
            let (tree, _, class, leaves) = sample_tree();
            assert_eq!(tree.children(class), leaves.as_slice());
        }

        #[test]
        fn test_name_index_lookup() {
            let (tree, _, class, leaves) = sample_tree();
            assert_eq!(tree.find_child(class, "test_1"), Some(leaves[1]));
            assert_eq!(tree.find_child(class, "nope"), None);
        }

        #[test]
        fn test_find_by_path() {
            let (tree, _, class, _) = sample_tree();
            assert_eq!(tree.find_by_path("Game.MenuTests"), Some(class));
            assert_eq!(tree.find_by_path("Game.Missing"), None);
        }

        #[test]
        fn test_ensure_group_reuses_existing() {
            let (mut tree, ns, _, _) = sample_tree();
            let again = tree.ensure_group(tree.root(), "Game");
            assert_eq!(again, ns);
            let fresh = tree.ensure_group(tree.root(), "Other");
            assert_ne!(fresh, ns);
        }

        #[test]
        fn test_nodes_default_opened() {
            let (tree, ns, _, leaves) = sample_tree();
            assert!(tree.is_opened(ns));
            assert!(tree.is_opened(leaves[0]));
        }

        #[test]
        fn test_method_leaves_depth_first() {
            let (tree, _, _, leaves) = sample_tree();
            assert_eq!(tree.method_leaves(), leaves);
        }
    }

    mod selection {
        use super::*;

        #[test]
        fn test_select_group_selects_descendant_leaves() {
            let (mut tree, _, class, leaves) = sample_tree();
            tree.set_selected(class, true);
            for leaf in &leaves {
                assert!(tree.is_selected(*leaf));
            }
            assert!(tree.is_selected(class));
            assert!(tree.is_selected(tree.root()));
        }

        #[test]
        fn test_deselect_group_deselects_all() {
            let (mut tree, _, class, leaves) = sample_tree();
            tree.set_selected(class, true);
            tree.set_selected(class, false);
            for leaf in &leaves {
                assert!(!tree.is_selected(*leaf));
            }
            assert!(!tree.is_selected(tree.root()));
            assert!(!tree.is_semi_selected(tree.root()));
        }

        #[test]
        fn test_single_leaf_semi_selects_root() {
            let (mut tree, ns, class, leaves) = sample_tree();
            tree.set_selected(leaves[0], true);
            assert!(tree.is_semi_selected(class));
            assert!(tree.is_semi_selected(ns));
            assert!(tree.is_semi_selected(tree.root()));
            assert!(!tree.is_selected(tree.root()));
        }

        #[test]
        fn test_all_leaves_selected_promotes_ancestors() {
            let (mut tree, _, class, leaves) = sample_tree();
            for leaf in &leaves {
                tree.set_selected(*leaf, true);
            }
            assert!(tree.is_selected(class));
            assert!(!tree.is_semi_selected(class));
            assert!(tree.is_selected(tree.root()));
        }

        #[test]
        fn test_set_selected_is_idempotent() {
            let (mut tree, _, class, leaves) = sample_tree();
            tree.set_selected(leaves[1], true);
            tree.set_selected(leaves[1], true);
            assert_eq!(tree.counters(class).0, 1);
            assert!(tree.is_semi_selected(class));
        }

        #[test]
        fn test_counters_within_bounds_after_mixed_ops() {
            let (mut tree, ns, class, leaves) = sample_tree();
            tree.set_selected(class, true);
            tree.set_selected(leaves[2], false);
            tree.set_selected(ns, true);
            tree.set_selected(leaves[0], false);
            for id in [tree.root(), ns, class] {
                let (selected, semi, hidden) = tree.counters(id);
                let count = tree.children_count(id);
                assert!(selected <= count);
                assert!(semi <= count);
                assert!(hidden <= count);
            }
        }

        #[test]
        fn test_adding_child_demotes_selected_parent() {
            let (mut tree, _, class, _) = sample_tree();
            tree.set_selected(class, true);
            assert!(tree.is_selected(tree.root()));
            let _ = tree.add_method(class, "late", leaf_settings(), method_ref(9));
            assert!(!tree.is_selected(class));
            assert!(tree.is_semi_selected(class));
            assert!(tree.is_semi_selected(tree.root()));
        }
    }

    mod visibility {
        use super::*;

        #[test]
        fn test_hiding_all_children_auto_hides_parent() {
            let (mut tree, _, class, leaves) = sample_tree();
            for leaf in &leaves {
                tree.set_hidden(*leaf, true);
            }
            assert!(tree.is_hidden(class));
        }

        #[test]
        fn test_revealing_one_child_auto_reveals_parent() {
            let (mut tree, _, class, leaves) = sample_tree();
            tree.set_hidden(class, true);
            assert!(tree.is_hidden(class));
            tree.set_hidden(leaves[1], false);
            assert!(!tree.is_hidden(class));
        }

        #[test]
        fn test_hidden_counter_tracks_children() {
            let (mut tree, _, class, leaves) = sample_tree();
            tree.set_hidden(leaves[0], true);
            tree.set_hidden(leaves[2], true);
            assert_eq!(tree.counters(class).2, 2);
        }
    }

    mod state {
        use super::*;

        #[test]
        fn test_initial_state_undefined() {
            let (tree, _, class, leaves) = sample_tree();
            assert_eq!(tree.state(leaves[0]), NodeState::Undefined);
            assert_eq!(tree.state(class), NodeState::Undefined);
        }

        #[test]
        fn test_failed_child_wins() {
            let (mut tree, _, class, leaves) = sample_tree();
            tree.set_leaf_state(leaves[0], NodeState::Passed);
            tree.set_leaf_state(leaves[1], NodeState::Failed);
            tree.set_leaf_state(leaves[2], NodeState::Passed);
            assert_eq!(tree.state(class), NodeState::Failed);
            assert_eq!(tree.state(tree.root()), NodeState::Failed);
        }

        #[test]
        fn test_undefined_beats_ignored_and_passed() {
            let (mut tree, _, class, leaves) = sample_tree();
            tree.set_leaf_state(leaves[0], NodeState::Passed);
            tree.set_leaf_state(leaves[1], NodeState::Ignored);
            assert_eq!(tree.state(class), NodeState::Undefined);
        }

        #[test]
        fn test_ignored_beats_passed() {
            let (mut tree, _, class, leaves) = sample_tree();
            tree.set_leaf_state(leaves[0], NodeState::Passed);
            tree.set_leaf_state(leaves[1], NodeState::Ignored);
            tree.set_leaf_state(leaves[2], NodeState::Passed);
            assert_eq!(tree.state(class), NodeState::Ignored);
        }

        #[test]
        fn test_all_passed() {
            let (mut tree, _, class, leaves) = sample_tree();
            for leaf in &leaves {
                tree.set_leaf_state(*leaf, NodeState::Passed);
            }
            assert_eq!(tree.state(class), NodeState::Passed);
            assert_eq!(tree.state(tree.root()), NodeState::Passed);
        }

        #[test]
        fn test_state_events_walk_to_root() {
            let (mut tree, ns, class, leaves) = sample_tree();
            let _ = tree.drain_state_events();
            tree.set_leaf_state(leaves[0], NodeState::Passed);
            let events = tree.drain_state_events();
            assert!(events.contains(&leaves[0]));
            assert!(events.contains(&class));
            assert!(events.contains(&ns));
            assert!(events.contains(&tree.root()));
        }

        #[test]
        fn test_cache_recomputes_after_invalidation() {
            let (mut tree, _, class, leaves) = sample_tree();
            for leaf in &leaves {
                tree.set_leaf_state(*leaf, NodeState::Passed);
            }
            assert_eq!(tree.state(class), NodeState::Passed);
            tree.set_leaf_state(leaves[1], NodeState::Failed);
            assert_eq!(tree.state(class), NodeState::Failed);
        }

        #[test]
        fn test_reset_results_clears_leaves() {
            let (mut tree, _, _, leaves) = sample_tree();
            tree.set_leaf_state(leaves[0], NodeState::Failed);
            tree.record_fail(leaves[0]);
            tree.push_log(
                leaves[0],
                LogRecord::new(crate::step::LogLevel::Error, "boom", ""),
            );
            tree.reset_results();
            assert_eq!(tree.state(leaves[0]), NodeState::Undefined);
            assert_eq!(tree.failed_amount(leaves[0]), 0);
            assert!(tree.logs(leaves[0]).is_empty());
        }
    }

    mod counters_accumulate {
        use super::*;

        #[test]
        fn test_pass_fail_amounts_accumulate() {
            let (mut tree, _, _, leaves) = sample_tree();
            tree.record_pass(leaves[0]);
            tree.record_pass(leaves[0]);
            tree.record_fail(leaves[0]);
            assert_eq!(tree.passed_amount(leaves[0]), 2);
            assert_eq!(tree.failed_amount(leaves[0]), 1);
        }
    }

    mod invariant_properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Random select/hide operations never break counter bounds
            /// or the semi-selected definition
            #[test]
            fn prop_counters_stay_bounded(ops in proptest::collection::vec((0usize..8, any::<bool>(), any::<bool>()), 0..40)) {
                let (mut tree, ns, class, leaves) = sample_tree();
                let targets = [tree.root(), ns, class, leaves[0], leaves[1], leaves[2]];
                for (pick, value, hide) in ops {
                    let target = targets[pick % targets.len()];
                    if hide {
                        tree.set_hidden(target, value);
                    } else {
                        tree.set_selected(target, value);
                    }
                    for id in targets {
                        let count = tree.children_count(id);
                        let (selected, semi, hidden) = tree.counters(id);
                        prop_assert!(selected <= count);
                        prop_assert!(semi <= count);
                        prop_assert!(hidden <= count);
                        prop_assert!(!(tree.is_selected(id) && tree.is_semi_selected(id)));
                    }
                }
            }
        }
    }
}
