//! Execution scheduler: the cooperative, frame-driven engine.
//!
//! Single logical thread of control. The host frame loop ticks a
//! [`FrameClock`] and then the scheduler; each tick advances at most one
//! invocation (a fixture call, a coroutine resume, or a wait check) and
//! returns control to the host, so tests never starve the render loop.
//!
//! Per-method phase machine:
//!
//! ```text
//! Idle -> OneTimeSetUp -> SetUp -> Body -> TearDown -> terminal
//!                                          (Passed | Failed | Ignored)
//! ```
//!
//! One-time setup/teardown run once per class per pass. Every error is
//! caught at the scheduler boundary and converted into a failure on the
//! current method; nothing propagates into host frame-tick code.

use crate::clock::FrameClock;
use crate::events::{RunEvent, RunObserver, RunSummary};
use crate::node::{NodeId, NodeState, NodeTree};
use crate::permitted::{self, SharedPermittedErrors};
use crate::registry::{MethodBody, MethodRef, TestRegistry};
use crate::result::EnsayarError;
use crate::settings::Resolution;
use crate::step::{LogLevel, LogRecord, StepOutcome, TestContext, TestCoroutine, WaitPredicate};
use crate::{discovery, EnsayarResult};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, error, warn};

/// What a scheduler tick reports back to the driver loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The run is still in progress
    Working,
    /// Every pass completed; further ticks are no-ops
    Finished,
}

/// Selection and repetition options for one run session
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Number of repeat passes over the same ordering
    pub repeat: u32,
    /// Only run leaves with the selection flag set
    pub selected_only: bool,
    /// Only run leaves tagged as smoke tests
    pub smoke_only: bool,
    /// Only run leaves whose full name contains this substring
    pub name_filter: Option<String>,
    /// Only run leaves declaring (or not restricting) this resolution
    pub resolution: Option<Resolution>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            repeat: 1,
            selected_only: true,
            smoke_only: false,
            name_filter: None,
            resolution: None,
        }
    }
}

impl RunOptions {
    /// Run everything regardless of selection
    #[must_use]
    pub fn all() -> Self {
        Self {
            selected_only: false,
            ..Self::default()
        }
    }

    /// Set the repeat pass count (clamped to at least one)
    #[must_use]
    pub fn with_repeat(mut self, repeat: u32) -> Self {
        self.repeat = repeat.max(1);
        self
    }

    /// Restrict to smoke-tagged leaves
    #[must_use]
    pub const fn smoke_only(mut self) -> Self {
        self.smoke_only = true;
        self
    }

    /// Restrict to leaves whose full name contains the substring
    #[must_use]
    pub fn with_name_filter(mut self, needle: impl Into<String>) -> Self {
        self.name_filter = Some(needle.into());
        self
    }

    /// Restrict to leaves runnable at the given resolution
    #[must_use]
    pub const fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = Some(resolution);
        self
    }
}

/// One selected method, resolved against tree and registry
#[derive(Debug, Clone)]
pub struct PlannedMethod {
    /// Leaf node the outcome is written to
    pub node: NodeId,
    /// Registered body
    pub reference: MethodRef,
    /// Dotted node path
    pub full_name: String,
    /// Body-phase timeout in seconds
    pub timeout_seconds: f64,
    /// Short-circuits before invocation when set
    pub ignored: bool,
    /// Ignore reason, when any
    pub ignore_reason: Option<String>,
}

#[derive(Debug, Clone)]
struct PlannedClass {
    fixture: usize,
    one_time_set_ups: Vec<usize>,
    one_time_tear_downs: Vec<usize>,
    set_ups: Vec<usize>,
    tear_downs: Vec<usize>,
    methods: Vec<PlannedMethod>,
}

/// The selected subset of leaves, grouped by class in discovery order
#[derive(Debug, Clone, Default)]
pub struct RunPlan {
    classes: Vec<PlannedClass>,
    total_methods: usize,
}

impl RunPlan {
    /// Resolve the selection against the tree and registry
    #[must_use]
    pub fn select(tree: &NodeTree, registry: &TestRegistry, options: &RunOptions) -> Self {
        let mut plan = Self::default();

        for leaf in tree.method_leaves() {
            if options.selected_only && !tree.is_selected(leaf) {
                continue;
            }
            let Some(settings) = tree.settings(leaf) else {
                continue;
            };
            let Some(reference) = tree.method_ref(leaf) else {
                continue;
            };
            if options.smoke_only && !settings.is_smoke {
                continue;
            }
            let full_name = tree.full_name(leaf);
            if let Some(needle) = &options.name_filter {
                if !full_name.contains(needle.as_str()) {
                    continue;
                }
            }
            if let Some(resolution) = options.resolution {
                if !settings.contains_target_resolution(resolution.width, resolution.height) {
                    continue;
                }
            }

            let index = match plan
                .classes
                .iter()
                .position(|c| c.fixture == reference.fixture)
            {
                Some(index) => index,
                None => {
                    let Some(fixture) = registry.fixture(reference.fixture) else {
                        continue;
                    };
                    plan.classes.push(PlannedClass {
                        fixture: reference.fixture,
                        one_time_set_ups: discovery::one_time_set_ups(fixture),
                        one_time_tear_downs: discovery::one_time_tear_downs(fixture),
                        set_ups: discovery::set_ups(fixture),
                        tear_downs: discovery::tear_downs(fixture),
                        methods: Vec::new(),
                    });
                    plan.classes.len() - 1
                }
            };
            plan.classes[index].methods.push(PlannedMethod {
                node: leaf,
                reference,
                full_name,
                timeout_seconds: settings.timeout_seconds,
                ignored: settings.is_ignored,
                ignore_reason: settings.ignore_reason.clone(),
            });
            plan.total_methods += 1;
        }

        plan
    }

    /// Selected method count per pass
    #[must_use]
    pub const fn total_methods(&self) -> usize {
        self.total_methods
    }

    /// Whether nothing was selected
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_methods == 0
    }
}

enum Wait {
    Ready,
    Seconds(f64),
    Until(WaitPredicate),
}

struct ActiveBody {
    coroutine: Box<dyn TestCoroutine>,
    wait: Wait,
    timeout_left: f64,
}

#[derive(Debug, Clone)]
enum Phase {
    NextClass,
    OneTimeSetUp(usize),
    NextMethod,
    SetUp(usize),
    StartBody,
    Body,
    TearDown(usize),
    OneTimeTearDown(usize),
}

/// Cooperative frame-driven test runner
pub struct Scheduler {
    plan: RunPlan,
    repeat: u32,
    pass: u32,
    class_idx: usize,
    method_idx: usize,
    phase: Phase,
    body: Option<ActiveBody>,
    failure: Option<String>,
    class_abort: Option<String>,
    permitted: SharedPermittedErrors,
    cx: TestContext,
    observers: Vec<Box<dyn RunObserver>>,
    summary: RunSummary,
    started: bool,
    finished: bool,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("pass", &self.pass)
            .field("class", &self.class_idx)
            .field("method", &self.method_idx)
            .field("phase", &self.phase)
            .field("finished", &self.finished)
            .finish()
    }
}

impl Scheduler {
    /// Create a scheduler for the given plan and options
    #[must_use]
    pub fn new(plan: RunPlan, options: RunOptions) -> Self {
        let permitted = permitted::shared();
        Self {
            plan,
            repeat: options.repeat.max(1),
            pass: 0,
            class_idx: 0,
            method_idx: 0,
            phase: Phase::NextClass,
            body: None,
            failure: None,
            class_abort: None,
            cx: TestContext::new(permitted.clone()),
            permitted,
            observers: Vec::new(),
            summary: RunSummary::default(),
            started: false,
            finished: false,
        }
    }

    /// Use an explicit permitted-error registry (e.g. the process-wide one)
    #[must_use]
    pub fn with_permitted_errors(mut self, permitted: SharedPermittedErrors) -> Self {
        self.cx = TestContext::new(permitted.clone());
        self.permitted = permitted;
        self
    }

    /// Register a run observer
    pub fn observe(&mut self, observer: impl RunObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Aggregated counts so far
    #[must_use]
    pub const fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Whether every pass completed
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Advance the run by one tick.
    ///
    /// Exactly one invocation happens per tick; bookkeeping transitions
    /// between phases are free. Returns [`TickOutcome::Finished`] once
    /// every pass is done (and on every later call).
    pub fn tick(
        &mut self,
        registry: &mut TestRegistry,
        tree: &mut NodeTree,
        clock: &FrameClock,
    ) -> TickOutcome {
        if self.finished {
            return TickOutcome::Finished;
        }
        if !self.started {
            self.started = true;
            self.emit(RunEvent::RunStarted {
                total_methods: self.plan.total_methods,
                passes: self.repeat,
            });
        }
        self.summary.frames += 1;
        self.cx.sync_clock(clock.frame(), clock.elapsed_seconds());

        loop {
            match self.phase.clone() {
                Phase::NextClass => {
                    if self.class_idx >= self.plan.classes.len() {
                        self.pass += 1;
                        self.class_idx = 0;
                        if self.pass >= self.repeat {
                            return self.finish();
                        }
                        continue;
                    }
                    self.method_idx = 0;
                    self.class_abort = None;
                    self.phase = Phase::OneTimeSetUp(0);
                }

                Phase::OneTimeSetUp(step) => {
                    let class = &self.plan.classes[self.class_idx];
                    let Some(&method_index) = class.one_time_set_ups.get(step) else {
                        self.phase = Phase::NextMethod;
                        continue;
                    };
                    let reference = MethodRef {
                        fixture: class.fixture,
                        method: method_index,
                    };
                    match self.invoke_sync(registry, reference) {
                        Ok(()) => {
                            self.discard_fixture_logs();
                            self.phase = Phase::OneTimeSetUp(step + 1);
                        }
                        Err(message) => {
                            self.discard_fixture_logs();
                            let message = format!("one-time setup failed: {message}");
                            warn!(class = self.class_idx, %message, "aborting class");
                            self.class_abort = Some(message.clone());
                            self.fail_unstarted_methods(tree, &message);
                            self.phase = Phase::OneTimeTearDown(0);
                        }
                    }
                    return TickOutcome::Working;
                }

                Phase::NextMethod => {
                    let class = &self.plan.classes[self.class_idx];
                    let Some(planned) = class.methods.get(self.method_idx).cloned() else {
                        self.phase = Phase::OneTimeTearDown(0);
                        continue;
                    };
                    if planned.ignored {
                        // No setup/teardown for ignored methods
                        self.method_idx += 1;
                        self.record_ignored(tree, &planned);
                        continue;
                    }
                    debug!(method = %planned.full_name, pass = self.pass, "starting method");
                    self.failure = None;
                    self.emit(RunEvent::MethodStarted {
                        full_name: planned.full_name,
                        pass: self.pass,
                    });
                    self.phase = Phase::SetUp(0);
                }

                Phase::SetUp(step) => {
                    let class = &self.plan.classes[self.class_idx];
                    let Some(&method_index) = class.set_ups.get(step) else {
                        self.phase = Phase::StartBody;
                        continue;
                    };
                    let reference = MethodRef {
                        fixture: class.fixture,
                        method: method_index,
                    };
                    let planned = self.current_method();
                    match self.invoke_sync(registry, reference) {
                        Ok(()) => {
                            let violation = self.collect_logs(tree, planned.node);
                            match violation {
                                None => self.phase = Phase::SetUp(step + 1),
                                Some(message) => self.abort_to_teardown_from_setup(message),
                            }
                        }
                        Err(message) => {
                            let _ = self.collect_logs(tree, planned.node);
                            self.abort_to_teardown_from_setup(format!("setup failed: {message}"));
                        }
                    }
                    return TickOutcome::Working;
                }

                Phase::StartBody => {
                    let planned = self.current_method();
                    match Self::body_kind(registry, planned.reference) {
                        BodyKind::Missing => {
                            self.failure = Some("method body missing from registry".to_string());
                            self.phase = Phase::TearDown(0);
                            continue;
                        }
                        BodyKind::Sync => {
                            if let Err(message) = self.invoke_sync(registry, planned.reference) {
                                self.failure = Some(message);
                            }
                            let violation = self.collect_logs(tree, planned.node);
                            if self.failure.is_none() {
                                self.failure = violation;
                            }
                            self.phase = Phase::TearDown(0);
                            return TickOutcome::Working;
                        }
                        BodyKind::Coroutine => {
                            match Self::create_coroutine(registry, planned.reference) {
                                Ok(coroutine) => {
                                    self.body = Some(ActiveBody {
                                        coroutine,
                                        wait: Wait::Ready,
                                        timeout_left: planned.timeout_seconds,
                                    });
                                    self.phase = Phase::Body;
                                    // First resume happens on this same tick
                                }
                                Err(message) => {
                                    self.failure = Some(message);
                                    self.phase = Phase::TearDown(0);
                                    continue;
                                }
                            }
                        }
                    }
                }

                Phase::Body => {
                    return self.tick_body(tree, clock);
                }

                Phase::TearDown(step) => {
                    let class = &self.plan.classes[self.class_idx];
                    let Some(&method_index) = class.tear_downs.get(step) else {
                        self.finalize_method(tree);
                        self.phase = Phase::NextMethod;
                        continue;
                    };
                    let reference = MethodRef {
                        fixture: class.fixture,
                        method: method_index,
                    };
                    let planned = self.current_method();
                    let result = self.invoke_sync(registry, reference);
                    let violation = self.collect_logs(tree, planned.node);
                    if self.failure.is_none() {
                        self.failure = match result {
                            Err(message) => Some(format!("teardown failed: {message}")),
                            Ok(()) => violation,
                        };
                    }
                    self.phase = Phase::TearDown(step + 1);
                    return TickOutcome::Working;
                }

                Phase::OneTimeTearDown(step) => {
                    let class = &self.plan.classes[self.class_idx];
                    let Some(&method_index) = class.one_time_tear_downs.get(step) else {
                        self.class_idx += 1;
                        self.phase = Phase::NextClass;
                        continue;
                    };
                    let reference = MethodRef {
                        fixture: class.fixture,
                        method: method_index,
                    };
                    if let Err(message) = self.invoke_sync(registry, reference) {
                        // Cleanup failures never mask test outcomes
                        error!(class = self.class_idx, %message, "one-time teardown failed");
                    }
                    self.discard_fixture_logs();
                    self.phase = Phase::OneTimeTearDown(step + 1);
                    return TickOutcome::Working;
                }
            }
        }
    }

    /// Drive ticks (advancing the clock) until the run finishes.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame budget is exhausted first, which
    /// means a test is waiting on a condition that never becomes true.
    pub fn run_to_completion(
        &mut self,
        registry: &mut TestRegistry,
        tree: &mut NodeTree,
        clock: &mut FrameClock,
        max_frames: u64,
    ) -> EnsayarResult<()> {
        let budget_end = clock.frame() + max_frames;
        loop {
            clock.tick();
            if self.tick(registry, tree, clock) == TickOutcome::Finished {
                return Ok(());
            }
            if clock.frame() >= budget_end {
                return Err(EnsayarError::invalid_state(format!(
                    "run did not finish within {max_frames} frames"
                )));
            }
        }
    }

    // ------------------------------------------------------------------
    // Body phase
    // ------------------------------------------------------------------

    fn tick_body(&mut self, tree: &mut NodeTree, clock: &FrameClock) -> TickOutcome {
        let planned = self.current_method();
        let Some(active) = self.body.as_mut() else {
            self.phase = Phase::TearDown(0);
            return TickOutcome::Working;
        };

        // Countdown runs over the body's whole active time, waits included
        active.timeout_left -= clock.seconds_per_frame();
        if active.timeout_left <= 0.0 {
            // Abort at the tick boundary; the coroutine never resumes again
            self.body = None;
            self.failure = Some(
                EnsayarError::Timeout {
                    seconds: planned.timeout_seconds,
                }
                .to_string(),
            );
            self.phase = Phase::TearDown(0);
            return TickOutcome::Working;
        }

        // Wait gating: a pending suspension consumes the tick
        match &mut active.wait {
            Wait::Seconds(remaining) => {
                *remaining -= clock.seconds_per_frame();
                if *remaining > 1e-9 {
                    return TickOutcome::Working;
                }
                active.wait = Wait::Ready;
            }
            Wait::Until(predicate) => {
                if !predicate(&self.cx) {
                    return TickOutcome::Working;
                }
                active.wait = Wait::Ready;
            }
            Wait::Ready => {}
        }

        // Resume exactly one step
        let resumed = catch_unwind(AssertUnwindSafe(|| active.coroutine.step(&mut self.cx)));

        let next_wait = match resumed {
            Err(payload) => {
                self.failure = Some(format!(
                    "Unhandled panic: {}",
                    panic_message(payload.as_ref())
                ));
                None
            }
            Ok(Err(e)) => {
                self.failure = Some(e.to_string());
                None
            }
            Ok(Ok(outcome)) => match outcome {
                StepOutcome::Done => None,
                StepOutcome::WaitFrame => Some(Wait::Ready),
                StepOutcome::WaitSeconds(seconds) => Some(Wait::Seconds(seconds)),
                StepOutcome::WaitUntil(predicate) => Some(Wait::Until(predicate)),
            },
        };

        let violation = self.collect_logs(tree, planned.node);
        if self.failure.is_none() {
            self.failure = violation;
        }

        match (&self.failure, next_wait) {
            (None, Some(wait)) => {
                if let Some(active) = self.body.as_mut() {
                    active.wait = wait;
                }
            }
            _ => {
                self.body = None;
                self.phase = Phase::TearDown(0);
            }
        }
        TickOutcome::Working
    }

    // ------------------------------------------------------------------
    // Outcome recording
    // ------------------------------------------------------------------

    fn finalize_method(&mut self, tree: &mut NodeTree) {
        let planned = self.current_method();
        match self.failure.take() {
            None => {
                tree.record_pass(planned.node);
                tree.set_leaf_state(planned.node, NodeState::Passed);
                self.summary.passed += 1;
                self.emit_state_updates(tree);
                self.emit(RunEvent::MethodFinished {
                    full_name: planned.full_name,
                    state: NodeState::Passed,
                    message: None,
                });
            }
            Some(message) => {
                tree.record_fail(planned.node);
                tree.push_log(planned.node, LogRecord::new(LogLevel::Error, &message, ""));
                tree.set_leaf_state(planned.node, NodeState::Failed);
                self.summary.failed += 1;
                self.emit_state_updates(tree);
                self.emit(RunEvent::MethodFinished {
                    full_name: planned.full_name,
                    state: NodeState::Failed,
                    message: Some(message),
                });
            }
        }
        self.method_idx += 1;

        // A broken fixture must not silently skip tests as Passed
        if let Some(message) = self.class_abort.clone() {
            self.fail_unstarted_methods(tree, &message);
        }
    }

    fn record_ignored(&mut self, tree: &mut NodeTree, planned: &PlannedMethod) {
        let reason = planned
            .ignore_reason
            .clone()
            .unwrap_or_else(|| "ignored".to_string());
        tree.push_log(
            planned.node,
            LogRecord::new(LogLevel::Info, format!("ignored: {reason}"), ""),
        );
        tree.set_leaf_state(planned.node, NodeState::Ignored);
        self.summary.ignored += 1;
        self.emit_state_updates(tree);
        self.emit(RunEvent::MethodFinished {
            full_name: planned.full_name.clone(),
            state: NodeState::Ignored,
            message: Some(reason),
        });
    }

    /// Mark every not-yet-started method of the current class Failed for
    /// this pass. Ignored methods stay Ignored: they never needed the
    /// fixture.
    fn fail_unstarted_methods(&mut self, tree: &mut NodeTree, message: &str) {
        loop {
            let class = &self.plan.classes[self.class_idx];
            let Some(planned) = class.methods.get(self.method_idx).cloned() else {
                break;
            };
            self.method_idx += 1;
            if planned.ignored {
                self.record_ignored(tree, &planned);
                continue;
            }
            tree.record_fail(planned.node);
            tree.push_log(planned.node, LogRecord::new(LogLevel::Error, message, ""));
            tree.set_leaf_state(planned.node, NodeState::Failed);
            self.summary.failed += 1;
            self.emit_state_updates(tree);
            self.emit(RunEvent::MethodFinished {
                full_name: planned.full_name,
                state: NodeState::Failed,
                message: Some(message.to_string()),
            });
        }
    }

    fn abort_to_teardown_from_setup(&mut self, message: String) {
        self.failure = Some(message.clone());
        // Setup failures poison the remaining methods of the class
        self.class_abort = Some(message);
        self.phase = Phase::TearDown(0);
    }

    fn finish(&mut self) -> TickOutcome {
        self.finished = true;
        let summary = self.summary;
        self.emit(RunEvent::RunFinished { summary });
        TickOutcome::Finished
    }

    // ------------------------------------------------------------------
    // Invocation plumbing
    // ------------------------------------------------------------------

    fn current_method(&self) -> PlannedMethod {
        self.plan.classes[self.class_idx].methods[self.method_idx].clone()
    }

    fn body_kind(registry: &TestRegistry, reference: MethodRef) -> BodyKind {
        match registry
            .fixture(reference.fixture)
            .and_then(|f| f.methods.get(reference.method))
            .map(|m| &m.body)
        {
            None => BodyKind::Missing,
            Some(MethodBody::Sync(_)) => BodyKind::Sync,
            Some(MethodBody::Coroutine(_)) => BodyKind::Coroutine,
        }
    }

    /// Invoke a synchronous body, catching panics at the boundary
    fn invoke_sync(
        &mut self,
        registry: &mut TestRegistry,
        reference: MethodRef,
    ) -> Result<(), String> {
        let Some(method) = registry.method_mut(reference) else {
            return Err("method missing from registry".to_string());
        };
        match &mut method.body {
            MethodBody::Sync(body) => {
                match catch_unwind(AssertUnwindSafe(|| body(&mut self.cx))) {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(payload) => Err(format!(
                        "Unhandled panic: {}",
                        panic_message(payload.as_ref())
                    )),
                }
            }
            MethodBody::Coroutine(_) => {
                Err("fixture method registered with a coroutine body".to_string())
            }
        }
    }

    fn create_coroutine(
        registry: &mut TestRegistry,
        reference: MethodRef,
    ) -> Result<Box<dyn TestCoroutine>, String> {
        let Some(method) = registry.method_mut(reference) else {
            return Err("method missing from registry".to_string());
        };
        match &mut method.body {
            MethodBody::Coroutine(factory) => catch_unwind(AssertUnwindSafe(factory)).map_err(
                |payload| {
                    format!(
                        "Unhandled panic in coroutine factory: {}",
                        panic_message(payload.as_ref())
                    )
                },
            ),
            MethodBody::Sync(_) => Err("sync body asked for a coroutine".to_string()),
        }
    }

    /// Drain captured logs into the leaf's buffer; returns a failure
    /// message when an unpermitted error-level line was seen
    fn collect_logs(&mut self, tree: &mut NodeTree, node: NodeId) -> Option<String> {
        let mut violation = None;
        for record in self.cx.drain_logs() {
            if record.level == LogLevel::Error && violation.is_none() {
                let permitted = lock(&self.permitted)
                    .is_permitted(&record.message, &record.stacktrace);
                if !permitted {
                    violation = Some(
                        EnsayarError::LogError {
                            message: record.message.clone(),
                        }
                        .to_string(),
                    );
                }
            }
            tree.push_log(node, record);
        }
        violation
    }

    /// One-time fixtures have no leaf to attach logs to
    fn discard_fixture_logs(&mut self) {
        for record in self.cx.drain_logs() {
            debug!(level = ?record.level, message = %record.message, "fixture log");
        }
    }

    fn emit_state_updates(&mut self, tree: &mut NodeTree) {
        let mut seen: Vec<NodeId> = Vec::new();
        for id in tree.drain_state_events() {
            if seen.contains(&id) {
                continue;
            }
            seen.push(id);
            self.emit(RunEvent::StateUpdated {
                full_name: tree.full_name(id),
            });
        }
    }

    fn emit(&mut self, event: RunEvent) {
        for observer in &mut self.observers {
            observer.on_event(&event);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum BodyKind {
    Missing,
    Sync,
    Coroutine,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

fn lock(shared: &SharedPermittedErrors) -> std::sync::MutexGuard<'_, crate::permitted::PermittedErrors> {
    match shared.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
