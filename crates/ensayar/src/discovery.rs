//! Test discovery: builds the node tree from the registry.
//!
//! Walks registered fixtures, filters them by assembly denylist and
//! optional base-class allowlist, and places each qualifying class under
//! its namespace / nested-class path, attaching a settings-backed method
//! leaf per test method. Also owns the fixture-method ordering contract:
//! one-time setups run base-most first, one-time teardowns derived-most
//! first, mirroring constructor/destructor ordering.

use crate::node::NodeTree;
use crate::registry::{FixtureDescriptor, MethodRef, MethodRole, TestRegistry};
use crate::settings::MethodTestSettings;
use tracing::debug;

/// Assembly name prefixes excluded from discovery by default
pub const DEFAULT_ASSEMBLY_DENYLIST: &[&str] = &["engine.", "editor.", "framework."];

/// Default root node name
pub const DEFAULT_ROOT_NAME: &str = "UiTests";

/// Discovery configuration
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Root node name; snapshots merge only when root names match
    pub root_name: String,
    /// Assembly name prefixes to exclude
    pub denylist_prefixes: Vec<String>,
    /// Restrict discovery to classes deriving from these bases
    /// (empty = no restriction)
    pub base_class_filter: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            root_name: DEFAULT_ROOT_NAME.to_string(),
            denylist_prefixes: DEFAULT_ASSEMBLY_DENYLIST
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            base_class_filter: Vec::new(),
        }
    }
}

impl DiscoveryConfig {
    /// Create the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the root node name
    #[must_use]
    pub fn with_root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = name.into();
        self
    }

    /// Exclude assemblies whose name starts with the given prefix
    #[must_use]
    pub fn deny_assembly_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.denylist_prefixes.push(prefix.into());
        self
    }

    /// Restrict discovery to classes deriving from the named base
    #[must_use]
    pub fn filter_base_class(mut self, name: impl Into<String>) -> Self {
        self.base_class_filter.push(name.into());
        self
    }
}

/// Outcome of a build pass: non-fatal problems and counts
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Non-fatal errors (e.g. unresolved base-class names)
    pub errors: Vec<String>,
    /// Classes that contributed a node
    pub classes: usize,
    /// Method leaves attached
    pub tests: usize,
}

/// Builds a [`NodeTree`] from a [`TestRegistry`]
#[derive(Debug, Default)]
pub struct TreeBuilder {
    config: DiscoveryConfig,
}

impl TreeBuilder {
    /// Builder with the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder with an explicit configuration
    #[must_use]
    pub fn with_config(config: DiscoveryConfig) -> Self {
        Self { config }
    }

    /// Build the tree. Unresolved base-class names are reported but never
    /// abort the build.
    #[must_use]
    pub fn build(&self, registry: &TestRegistry) -> (NodeTree, BuildReport) {
        let mut tree = NodeTree::new(self.config.root_name.clone());
        let mut report = BuildReport::default();

        let resolved_bases = self.resolve_base_filter(registry, &mut report);

        for (fixture_index, fixture) in registry.fixtures().iter().enumerate() {
            if !self.qualifies(fixture, &resolved_bases) {
                continue;
            }
            self.attach_class(&mut tree, &mut report, fixture, fixture_index);
        }

        // Build-time bookkeeping is nobody's notification
        let _ = tree.drain_state_events();
        (tree, report)
    }

    /// Resolve configured base-class names against the set of names the
    /// registry actually knows about. Returns None when no filter is
    /// configured.
    fn resolve_base_filter(
        &self,
        registry: &TestRegistry,
        report: &mut BuildReport,
    ) -> Option<Vec<String>> {
        if self.config.base_class_filter.is_empty() {
            return None;
        }
        let mut resolved = Vec::new();
        for name in &self.config.base_class_filter {
            let known = registry.fixtures().iter().any(|f| {
                f.type_path == *name || f.base_chain.iter().any(|b| b == name)
            });
            if known {
                resolved.push(name.clone());
            } else {
                report
                    .errors
                    .push(format!("base class '{name}' could not be resolved"));
            }
        }
        Some(resolved)
    }

    fn qualifies(&self, fixture: &FixtureDescriptor, resolved_bases: &Option<Vec<String>>) -> bool {
        if fixture.is_abstract || !fixture.has_tests() {
            return false;
        }
        if self
            .config
            .denylist_prefixes
            .iter()
            .any(|prefix| fixture.assembly.starts_with(prefix.as_str()))
        {
            debug!(assembly = %fixture.assembly, "assembly denylisted, skipping");
            return false;
        }
        match resolved_bases {
            None => true,
            Some(bases) => bases.iter().any(|base| fixture.derives_from(base)),
        }
    }

    fn attach_class(
        &self,
        tree: &mut NodeTree,
        report: &mut BuildReport,
        fixture: &FixtureDescriptor,
        fixture_index: usize,
    ) {
        // Namespace segments are dotted; the final segment may carry
        // `+`-separated nested class names
        let mut cursor = tree.root();
        for segment in path_segments(&fixture.type_path) {
            cursor = tree.ensure_group(cursor, segment);
        }
        report.classes += 1;

        for (method_index, method) in fixture.methods.iter().enumerate() {
            if !method.role.is_test() {
                continue;
            }
            let mut settings = MethodTestSettings::build(&method.markers);
            if let Some(reason) = &fixture.class_ignore {
                settings.apply_class_ignore(if reason.is_empty() {
                    "ignored by test class"
                } else {
                    reason
                });
            }
            let _ = tree.add_method(
                cursor,
                method.name.clone(),
                settings,
                MethodRef {
                    fixture: fixture_index,
                    method: method_index,
                },
            );
            report.tests += 1;
        }
    }
}

/// Split a reflected type path into tree segments: dots separate
/// namespaces, `+` separates nested classes
fn path_segments(type_path: &str) -> impl Iterator<Item = &str> {
    type_path
        .split('.')
        .flat_map(|segment| segment.split('+'))
        .filter(|segment| !segment.is_empty())
}

/// Indices of a fixture's one-time setup methods, base-most first
#[must_use]
pub fn one_time_set_ups(fixture: &FixtureDescriptor) -> Vec<usize> {
    sorted_by_depth(fixture, MethodRole::OneTimeSetUp, false)
}

/// Indices of a fixture's one-time teardown methods, derived-most first
#[must_use]
pub fn one_time_tear_downs(fixture: &FixtureDescriptor) -> Vec<usize> {
    sorted_by_depth(fixture, MethodRole::OneTimeTearDown, true)
}

/// Indices of a fixture's per-test setup methods, base-most first
#[must_use]
pub fn set_ups(fixture: &FixtureDescriptor) -> Vec<usize> {
    sorted_by_depth(fixture, MethodRole::SetUp, false)
}

/// Indices of a fixture's per-test teardown methods, derived-most first
#[must_use]
pub fn tear_downs(fixture: &FixtureDescriptor) -> Vec<usize> {
    sorted_by_depth(fixture, MethodRole::TearDown, true)
}

fn sorted_by_depth(fixture: &FixtureDescriptor, role: MethodRole, descending: bool) -> Vec<usize> {
    let mut indices: Vec<usize> = fixture
        .methods
        .iter()
        .enumerate()
        .filter(|(_, m)| m.role == role)
        .map(|(i, _)| i)
        .collect();
    indices.sort_by_key(|&i| fixture.methods[i].declaring_depth);
    if descending {
        indices.reverse();
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeState;
    use crate::registry::MethodDescriptor;
    use crate::settings::MethodMarker;

    fn simple_fixture(assembly: &str, type_path: &str) -> FixtureDescriptor {
        FixtureDescriptor::new(assembly, type_path)
            .method(MethodDescriptor::test("works", |_| Ok(())))
    }

    mod filtering {
        use super::*;

        #[test]
        fn test_denylisted_assembly_skipped() {
            let mut registry = TestRegistry::new();
            let _ = registry.register(simple_fixture("engine.core", "Engine.Internal"));
            let _ = registry.register(simple_fixture("game.tests", "Game.MenuTests"));

            let (tree, report) = TreeBuilder::new().build(&registry);
            assert_eq!(report.classes, 1);
            assert!(tree.find_by_path("Game.MenuTests").is_some());
            assert!(tree.find_by_path("Engine.Internal").is_none());
        }

        #[test]
        fn test_abstract_class_skipped() {
            let mut registry = TestRegistry::new();
            let _ = registry
                .register(simple_fixture("game.tests", "Game.BaseTests").abstract_class());
            let (tree, report) = TreeBuilder::new().build(&registry);
            assert_eq!(report.classes, 0);
            assert!(tree.is_empty());
        }

        #[test]
        fn test_class_without_tests_contributes_no_node() {
            let mut registry = TestRegistry::new();
            let _ = registry.register(
                FixtureDescriptor::new("game.tests", "Game.Helpers")
                    .method(MethodDescriptor::set_up("set_up", |_| Ok(()))),
            );
            let (tree, report) = TreeBuilder::new().build(&registry);
            assert_eq!(report.classes, 0);
            assert_eq!(report.tests, 0);
            assert!(tree.is_empty());
        }

        #[test]
        fn test_base_class_filter() {
            let mut registry = TestRegistry::new();
            let _ = registry
                .register(simple_fixture("game.tests", "Game.A").with_base("UiFixture"));
            let _ = registry.register(simple_fixture("game.tests", "Game.B"));

            let config = DiscoveryConfig::new().filter_base_class("UiFixture");
            let (tree, report) = TreeBuilder::with_config(config).build(&registry);
            assert_eq!(report.classes, 1);
            assert!(tree.find_by_path("Game.A").is_some());
            assert!(tree.find_by_path("Game.B").is_none());
        }

        #[test]
        fn test_unresolved_base_reported_but_not_fatal() {
            let mut registry = TestRegistry::new();
            let _ = registry
                .register(simple_fixture("game.tests", "Game.A").with_base("UiFixture"));

            let config = DiscoveryConfig::new()
                .filter_base_class("UiFixture")
                .filter_base_class("DoesNotExist");
            let (tree, report) = TreeBuilder::with_config(config).build(&registry);
            assert_eq!(report.errors.len(), 1);
            assert!(report.errors[0].contains("DoesNotExist"));
            assert!(tree.find_by_path("Game.A").is_some());
        }
    }

    mod placement {
        use super::*;

        #[test]
        fn test_namespace_segments_become_groups() {
            let mut registry = TestRegistry::new();
            let _ = registry.register(simple_fixture("game.tests", "Game.Ui.MenuTests"));
            let (tree, _) = TreeBuilder::new().build(&registry);
            let class = tree.find_by_path("Game.Ui.MenuTests").unwrap();
            assert_eq!(tree.full_name(class), "UiTests.Game.Ui.MenuTests");
        }

        #[test]
        fn test_nested_class_segments_split_on_plus() {
            let mut registry = TestRegistry::new();
            let _ = registry.register(simple_fixture("game.tests", "Game.Menu+LoginTests"));
            let (tree, _) = TreeBuilder::new().build(&registry);
            assert!(tree.find_by_path("Game.Menu.LoginTests").is_some());
        }

        #[test]
        fn test_sibling_classes_share_namespace_group() {
            let mut registry = TestRegistry::new();
            let _ = registry.register(simple_fixture("game.tests", "Game.ATests"));
            let _ = registry.register(simple_fixture("game.tests", "Game.BTests"));
            let (tree, _) = TreeBuilder::new().build(&registry);
            let ns = tree.find_by_path("Game").unwrap();
            assert_eq!(tree.children_count(ns), 2);
        }

        #[test]
        fn test_method_leaves_attached_under_class() {
            let mut registry = TestRegistry::new();
            let _ = registry.register(
                FixtureDescriptor::new("game.tests", "Game.MenuTests")
                    .method(MethodDescriptor::test("opens", |_| Ok(())))
                    .method(MethodDescriptor::test("closes", |_| Ok(())))
                    .method(MethodDescriptor::set_up("set_up", |_| Ok(()))),
            );
            let (tree, report) = TreeBuilder::new().build(&registry);
            assert_eq!(report.tests, 2);
            let class = tree.find_by_path("Game.MenuTests").unwrap();
            // Only test methods produce leaves
            assert_eq!(tree.children_count(class), 2);
        }
    }

    mod ignore_propagation {
        use super::*;

        #[test]
        fn test_class_ignore_propagates_to_methods() {
            let mut registry = TestRegistry::new();
            let _ = registry.register(
                FixtureDescriptor::new("game.tests", "Game.OldTests")
                    .ignored("superseded by v2 suite")
                    .method(MethodDescriptor::test("legacy", |_| Ok(()))),
            );
            let (tree, _) = TreeBuilder::new().build(&registry);
            let leaf = tree.find_by_path("Game.OldTests.legacy").unwrap();
            let settings = tree.settings(leaf).unwrap();
            assert!(settings.is_ignored);
            assert_eq!(
                settings.ignore_reason.as_deref(),
                Some("superseded by v2 suite")
            );
        }

        #[test]
        fn test_method_ignore_overrides_class_reason() {
            let mut registry = TestRegistry::new();
            let _ = registry.register(
                FixtureDescriptor::new("game.tests", "Game.OldTests")
                    .ignored("class reason")
                    .method(
                        MethodDescriptor::test("own", |_| Ok(()))
                            .with_marker(MethodMarker::Ignore(Some("own reason".into()))),
                    ),
            );
            let (tree, _) = TreeBuilder::new().build(&registry);
            let leaf = tree.find_by_path("Game.OldTests.own").unwrap();
            assert_eq!(
                tree.settings(leaf).unwrap().ignore_reason.as_deref(),
                Some("own reason")
            );
        }
    }

    mod fixture_ordering {
        use super::*;

        #[test]
        fn test_one_time_set_ups_base_most_first() {
            let fixture = FixtureDescriptor::new("game.tests", "Game.Derived")
                .method(MethodDescriptor::one_time_set_up("derived_boot", |_| Ok(())).at_depth(1))
                .method(MethodDescriptor::one_time_set_up("base_boot", |_| Ok(())).at_depth(0))
                .method(MethodDescriptor::test("t", |_| Ok(())));
            let order = one_time_set_ups(&fixture);
            assert_eq!(order, vec![1, 0], "base (depth 0) before derived (depth 1)");
        }

        #[test]
        fn test_one_time_tear_downs_derived_most_first() {
            let fixture = FixtureDescriptor::new("game.tests", "Game.Derived")
                .method(MethodDescriptor::one_time_tear_down("base_down", |_| Ok(())).at_depth(0))
                .method(
                    MethodDescriptor::one_time_tear_down("derived_down", |_| Ok(())).at_depth(1),
                )
                .method(MethodDescriptor::test("t", |_| Ok(())));
            let order = one_time_tear_downs(&fixture);
            assert_eq!(order, vec![1, 0], "derived (depth 1) before base (depth 0)");
        }

        #[test]
        fn test_depth_three_chain_ordering() {
            let fixture = FixtureDescriptor::new("game.tests", "Game.Deep")
                .method(MethodDescriptor::one_time_set_up("mid", |_| Ok(())).at_depth(1))
                .method(MethodDescriptor::one_time_set_up("leaf", |_| Ok(())).at_depth(2))
                .method(MethodDescriptor::one_time_set_up("base", |_| Ok(())).at_depth(0))
                .method(MethodDescriptor::test("t", |_| Ok(())));
            assert_eq!(one_time_set_ups(&fixture), vec![2, 0, 1]);
        }
    }

    mod fresh_tree_state {
        use super::*;

        #[test]
        fn test_fresh_leaves_start_undefined() {
            let mut registry = TestRegistry::new();
            let _ = registry.register(simple_fixture("game.tests", "Game.MenuTests"));
            let (tree, _) = TreeBuilder::new().build(&registry);
            let leaf = tree.find_by_path("Game.MenuTests.works").unwrap();
            assert_eq!(tree.state(leaf), NodeState::Undefined);
        }
    }
}
