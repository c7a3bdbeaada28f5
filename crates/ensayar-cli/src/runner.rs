//! Drives a full run session from the command line.
//!
//! The runner owns the headless frame loop: it builds the tree from the
//! registered fixtures, applies the CLI selection, then ticks a
//! [`FrameClock`] and the scheduler until the run finishes.

use crate::commands::{ListArgs, RunArgs, TreeArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::ProgressPrinter;
use crate::tree::render_tree;
use ensayar::persist;
use ensayar::{
    DiscoveryConfig, FrameClock, NodeTree, Reporter, RunObserver, RunOptions, RunPlan, RunReport,
    Scheduler, TestRegistry, TreeBuilder, TreeSnapshot,
};
use std::path::Path;
use tracing::{info, warn};

/// Orchestrates discovery, selection, execution and reporting
#[derive(Debug)]
pub struct TestRunner {
    config: CliConfig,
}

impl TestRunner {
    /// Create a runner with the given configuration
    #[must_use]
    pub const fn new(config: CliConfig) -> Self {
        Self { config }
    }

    /// Execute `ensayador run`.
    ///
    /// # Errors
    ///
    /// Returns an error when discovery selects nothing runnable, when
    /// the frame budget runs out, when report/snapshot IO fails, or
    /// when any test fails (so the process exits non-zero).
    pub fn run(&self, registry: &mut TestRegistry, args: &RunArgs) -> CliResult<RunReport> {
        let mut tree = self.discover(registry, args.root.as_deref())?;

        if let Some(path) = &args.ui_state {
            load_ui_state(&mut tree, path);
        }

        let options = self.options_from_args(args);
        let plan = RunPlan::select(&tree, registry, &options);
        if plan.is_empty() {
            return Err(CliError::invalid_argument(
                "no tests match the given selection",
            ));
        }
        info!(methods = plan.total_methods(), repeat = options.repeat, "starting run");

        let mut scheduler = Scheduler::new(plan, options);
        scheduler.observe(ProgressPrinter::new(
            self.config.color.should_color(),
            self.config.verbosity.is_quiet(),
        ));

        // The scheduler owns its observers, so the JSON reporter is
        // shared out through a handle we keep
        let collected = std::sync::Arc::new(std::sync::Mutex::new(Reporter::new()));
        let sink = collected.clone();
        scheduler.observe(move |event: &ensayar::RunEvent| {
            if let Ok(mut reporter) = sink.lock() {
                reporter.on_event(event);
            }
        });

        let mut clock = FrameClock::new(args.fps);
        scheduler.run_to_completion(registry, &mut tree, &mut clock, args.max_frames)?;

        if let Some(path) = &args.ui_state {
            save_ui_state(&tree, path)?;
        }

        let report = match collected.lock() {
            Ok(mut reporter) => std::mem::take(&mut *reporter).into_report(),
            Err(_) => Reporter::new().into_report(),
        };
        if let Some(path) = &args.json {
            write_json_report(&report, path)?;
        }

        let summary = scheduler.summary();
        if summary.all_passed() {
            Ok(report)
        } else {
            Err(CliError::test_execution(format!(
                "{} test(s) failed",
                summary.failed
            )))
        }
    }

    /// Execute `ensayador list`: print one full name per line
    pub fn list(&self, registry: &TestRegistry, args: &ListArgs) -> CliResult<Vec<String>> {
        let tree = self.discover(registry, args.root.as_deref())?;
        let mut names = Vec::new();
        for leaf in tree.method_leaves() {
            if args.smoke {
                let smoke = tree.settings(leaf).is_some_and(|s| s.is_smoke);
                if !smoke {
                    continue;
                }
            }
            names.push(tree.full_name(leaf));
        }
        Ok(names)
    }

    /// Execute `ensayador tree`: render the discovered hierarchy
    pub fn tree(&self, registry: &TestRegistry, args: &TreeArgs) -> CliResult<String> {
        let mut tree = self.discover(registry, args.root.as_deref())?;
        if let Some(path) = &args.ui_state {
            load_ui_state(&mut tree, path);
        }
        Ok(render_tree(&tree, self.config.color.should_color()))
    }

    fn discover(&self, registry: &TestRegistry, root: Option<&str>) -> CliResult<NodeTree> {
        let mut discovery = DiscoveryConfig::new();
        if let Some(root) = root {
            discovery = discovery.with_root_name(root);
        }
        let (tree, report) = TreeBuilder::with_config(discovery).build(registry);
        for error in &report.errors {
            warn!(%error, "discovery");
        }
        if report.tests == 0 {
            return Err(CliError::config("no test methods registered"));
        }
        info!(classes = report.classes, tests = report.tests, "discovered");
        Ok(tree)
    }

    fn options_from_args(&self, args: &RunArgs) -> RunOptions {
        let mut options = if args.selected {
            RunOptions::default()
        } else {
            RunOptions::all()
        };
        options = options.with_repeat(args.repeat);
        if args.smoke {
            options = options.smoke_only();
        }
        if let Some(filter) = &args.filter {
            options = options.with_name_filter(filter.clone());
        }
        if let Some(resolution) = args.resolution {
            options = options.with_resolution(resolution);
        }
        options
    }
}

/// Best-effort restore; a missing or stale snapshot only warns
fn load_ui_state(tree: &mut NodeTree, path: &Path) {
    match TreeSnapshot::load_from(path) {
        Ok(snapshot) => persist::merge_ui_state(tree, &snapshot),
        Err(e) => warn!(path = %path.display(), error = %e, "could not load UI state"),
    }
}

fn save_ui_state(tree: &NodeTree, path: &Path) -> CliResult<()> {
    let snapshot = TreeSnapshot::capture(tree);
    snapshot.save_to(path)?;
    Ok(())
}

fn write_json_report(report: &RunReport, path: &Path) -> CliResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let payload = serde_json::to_string_pretty(report)
        .map_err(|e| CliError::report_generation(e.to_string()))?;
    std::fs::write(path, payload)?;
    Ok(())
}
