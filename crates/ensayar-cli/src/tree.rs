//! Terminal rendering of the discovered test tree

use console::style;
use ensayar::{NodeId, NodeState, NodeTree};

/// Render the whole tree as an indented listing.
///
/// Closed groups still render; openness only affects the marker so a
/// saved UI state stays visible from the terminal.
#[must_use]
pub fn render_tree(tree: &NodeTree, use_color: bool) -> String {
    let mut out = String::new();
    push_label(tree, tree.root(), use_color, &mut out);
    render_children(tree, tree.root(), "", use_color, &mut out);
    out
}

fn render_children(tree: &NodeTree, id: NodeId, prefix: &str, use_color: bool, out: &mut String) {
    let children = tree.children(id);
    let last = children.len().saturating_sub(1);
    for (i, &child) in children.iter().enumerate() {
        out.push_str(prefix);
        out.push_str(if i == last { "└── " } else { "├── " });
        push_label(tree, child, use_color, out);
        let child_prefix = format!("{prefix}{}", if i == last { "    " } else { "│   " });
        render_children(tree, child, &child_prefix, use_color, out);
    }
}

fn push_label(tree: &NodeTree, id: NodeId, use_color: bool, out: &mut String) {
    out.push_str(&state_glyph(tree.state(id), use_color));
    out.push(' ');
    out.push_str(tree.name(id));
    if tree.is_selected(id) {
        out.push_str(" *");
    }
    if tree.is_hidden(id) {
        out.push_str(" (hidden)");
    }
    out.push('\n');
}

fn state_glyph(state: NodeState, use_color: bool) -> String {
    match (state, use_color) {
        (NodeState::Passed, true) => style("✓").green().to_string(),
        (NodeState::Passed, false) => "✓".to_string(),
        (NodeState::Failed, true) => style("✗").red().to_string(),
        (NodeState::Failed, false) => "✗".to_string(),
        (NodeState::Ignored, true) => style("-").yellow().to_string(),
        (NodeState::Ignored, false) => "-".to_string(),
        (NodeState::Undefined, _) => "·".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensayar::{FixtureDescriptor, MethodDescriptor, TestRegistry, TreeBuilder};

    fn sample_tree() -> NodeTree {
        let mut registry = TestRegistry::new();
        let _ = registry.register(
            FixtureDescriptor::new("game.tests", "Game.MenuTests")
                .method(MethodDescriptor::test("opens", |_| Ok(())))
                .method(MethodDescriptor::test("closes", |_| Ok(()))),
        );
        let (tree, _) = TreeBuilder::new().build(&registry);
        tree
    }

    #[test]
    fn test_renders_every_node() {
        let tree = sample_tree();
        let rendered = render_tree(&tree, false);
        assert!(rendered.contains("UiTests"));
        assert!(rendered.contains("Game"));
        assert!(rendered.contains("MenuTests"));
        assert!(rendered.contains("opens"));
        assert!(rendered.contains("closes"));
    }

    #[test]
    fn test_marks_selection() {
        let mut tree = sample_tree();
        let leaf = tree.find_by_path("Game.MenuTests.opens").unwrap();
        tree.set_selected(leaf, true);
        let rendered = render_tree(&tree, false);
        assert!(rendered.contains("opens *"));
    }

    #[test]
    fn test_undefined_glyph_before_run() {
        let tree = sample_tree();
        let rendered = render_tree(&tree, false);
        assert!(rendered.contains("· opens"));
    }
}
