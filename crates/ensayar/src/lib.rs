//! Ensayar: In-Engine UI Test Automation
//!
//! Ensayar (Spanish: "to rehearse") runs UI test suites inside a live
//! game loop. Test classes register their methods once at startup; a
//! tree builder folds them into a hierarchical node model; a cooperative
//! scheduler executes them one frame slice at a time so the render loop
//! keeps running while tests drive the UI.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    ENSAYAR Architecture                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐    ┌───────────┐    ┌───────────┐             │
//! │  │ Registered │──►│ Node Tree │──►│ Scheduler │──► events    │
//! │  │ Fixtures   │   │ (select /  │   │ (1 step   │    reports  │
//! │  │            │   │  aggregate)│   │  per tick)│             │
//! │  └───────────┘    └───────────┘    └─────┬─────┘             │
//! │                                          │ FrameClock        │
//! └──────────────────────────────────────────┴───────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use ensayar::{
//!     check, FixtureDescriptor, FrameClock, MethodDescriptor, RunOptions, RunPlan,
//!     Scheduler, TestRegistry, TreeBuilder,
//! };
//!
//! let mut registry = TestRegistry::new();
//! registry.register(
//!     FixtureDescriptor::new("game.tests", "Game.MenuTests")
//!         .method(MethodDescriptor::test("opens", |_| check(2 + 2 == 4, "math broke"))),
//! );
//!
//! let (mut tree, _report) = TreeBuilder::new().build(&registry);
//! let options = RunOptions::all();
//! let plan = RunPlan::select(&tree, &registry, &options);
//! let mut scheduler = Scheduler::new(plan, options);
//! let mut clock = FrameClock::new(60);
//! scheduler
//!     .run_to_completion(&mut registry, &mut tree, &mut clock, 1_000)
//!     .unwrap();
//! assert!(scheduler.summary().all_passed());
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod clock;
mod events;
mod node;
mod permitted;
mod registry;
mod reporter;
mod result;
mod settings;
mod step;

/// Tree construction from the registered fixtures
pub mod discovery;
/// Snapshot persistence for UI state across sessions
pub mod persist;
/// Cooperative frame-driven execution engine
pub mod scheduler;

pub use clock::{FrameClock, DEFAULT_FPS};
pub use discovery::{
    BuildReport, DiscoveryConfig, TreeBuilder, DEFAULT_ASSEMBLY_DENYLIST, DEFAULT_ROOT_NAME,
};
pub use events::{RunEvent, RunObserver, RunSummary};
pub use node::{NodeId, NodeState, NodeTree};
pub use persist::{merge_ui_state, TreeSnapshot};
pub use permitted::{
    shared, PermittedErrorHandle, PermittedErrors, SharedPermittedErrors,
};
pub use registry::{
    FixtureDescriptor, MethodBody, MethodDescriptor, MethodRef, MethodRole, TestRegistry,
};
pub use reporter::{MethodOutcome, Reporter, RunReport};
pub use result::{EnsayarError, EnsayarResult};
pub use scheduler::{PlannedMethod, RunOptions, RunPlan, Scheduler, TickOutcome};
pub use settings::{
    MethodMarker, MethodTestSettings, Resolution, DEFAULT_RESOLUTION, DEFAULT_TIMEOUT_SECONDS,
};
pub use step::{
    check, LogLevel, LogRecord, StepOutcome, Steps, SyncBody, TestContext, TestCoroutine,
    WaitPredicate,
};
