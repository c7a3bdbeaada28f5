//! Cooperative step model for frame-synchronized test bodies.
//!
//! A test body is a resumable sequence of suspension points, not a
//! language coroutine: the scheduler resumes exactly one pending step per
//! host frame tick, and control returns to the frame loop after every
//! step. A step either finishes the body, asks to wait (one frame, a
//! fixed duration, or until a predicate holds), or fails with an error.

use crate::permitted::SharedPermittedErrors;
use crate::result::{EnsayarError, EnsayarResult};
use serde::{Deserialize, Serialize};

/// Severity of a log line captured during a test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// Informational output
    Info,
    /// Warning output
    Warning,
    /// Error output; fails the running test unless permitted
    Error,
}

/// One captured log line with its stacktrace, in emission order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Severity
    pub level: LogLevel,
    /// Log message
    pub message: String,
    /// Stacktrace text, empty when none was captured
    pub stacktrace: String,
}

impl LogRecord {
    /// Create a log record
    #[must_use]
    pub fn new(level: LogLevel, message: impl Into<String>, stacktrace: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            stacktrace: stacktrace.into(),
        }
    }
}

/// Predicate polled once per tick by a `WaitUntil` suspension
pub type WaitPredicate = Box<dyn FnMut(&TestContext) -> bool + Send>;

/// What a resumed step asks the scheduler to do next
pub enum StepOutcome {
    /// Body reached natural completion
    Done,
    /// Resume on the next frame tick
    WaitFrame,
    /// Resume after the given number of frame-scaled seconds
    WaitSeconds(f64),
    /// Resume once the predicate returns true (polled each tick)
    WaitUntil(WaitPredicate),
}

impl std::fmt::Debug for StepOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Done => write!(f, "Done"),
            Self::WaitFrame => write!(f, "WaitFrame"),
            Self::WaitSeconds(s) => write!(f, "WaitSeconds({s})"),
            Self::WaitUntil(_) => write!(f, "WaitUntil(..)"),
        }
    }
}

/// A resumable test body advanced one step per frame tick
pub trait TestCoroutine: Send {
    /// Run the next step.
    ///
    /// # Errors
    ///
    /// Any error terminates the body; the scheduler classifies it.
    fn step(&mut self, cx: &mut TestContext) -> EnsayarResult<StepOutcome>;
}

/// Context handed to every step: frame clock view plus the log capture
/// buffer and the permitted-error registry for scoped expectations.
pub struct TestContext {
    frame: u64,
    elapsed_seconds: f64,
    logs: Vec<LogRecord>,
    permitted: SharedPermittedErrors,
}

impl std::fmt::Debug for TestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestContext")
            .field("frame", &self.frame)
            .field("elapsed_seconds", &self.elapsed_seconds)
            .field("pending_logs", &self.logs.len())
            .finish()
    }
}

impl TestContext {
    /// Create a context backed by the given permitted-error registry
    #[must_use]
    pub fn new(permitted: SharedPermittedErrors) -> Self {
        Self {
            frame: 0,
            elapsed_seconds: 0.0,
            logs: Vec::new(),
            permitted,
        }
    }

    /// Current host frame number
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Seconds elapsed on the frame clock
    #[must_use]
    pub const fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }

    /// Shared permitted-error registry, for scoped add/remove from bodies
    #[must_use]
    pub fn permitted_errors(&self) -> SharedPermittedErrors {
        self.permitted.clone()
    }

    /// Emit an informational log line
    pub fn log_info(&mut self, message: impl Into<String>) {
        self.logs.push(LogRecord::new(LogLevel::Info, message, ""));
    }

    /// Emit a warning log line
    pub fn log_warning(&mut self, message: impl Into<String>) {
        self.logs
            .push(LogRecord::new(LogLevel::Warning, message, ""));
    }

    /// Emit an error log line; fails the running test unless permitted
    pub fn log_error(&mut self, message: impl Into<String>) {
        self.logs.push(LogRecord::new(LogLevel::Error, message, ""));
    }

    /// Emit an error log line with a stacktrace
    pub fn log_error_with_stack(
        &mut self,
        message: impl Into<String>,
        stacktrace: impl Into<String>,
    ) {
        self.logs
            .push(LogRecord::new(LogLevel::Error, message, stacktrace));
    }

    pub(crate) fn sync_clock(&mut self, frame: u64, elapsed_seconds: f64) {
        self.frame = frame;
        self.elapsed_seconds = elapsed_seconds;
    }

    pub(crate) fn drain_logs(&mut self) -> Vec<LogRecord> {
        std::mem::take(&mut self.logs)
    }
}

/// Fail the body with an assertion unless the condition holds
pub fn check(condition: bool, message: &str) -> EnsayarResult<()> {
    if condition {
        Ok(())
    } else {
        Err(EnsayarError::assertion(message))
    }
}

/// Type of one queued step closure
pub type StepFn = Box<dyn FnMut(&mut TestContext) -> EnsayarResult<StepOutcome> + Send>;

/// Builder for multi-step frame-cooperative bodies.
///
/// # Example
///
/// ```
/// use ensayar::{check, Steps};
///
/// let body = Steps::new()
///     .run(|cx| {
///         cx.log_info("opening menu");
///         Ok(())
///     })
///     .wait_seconds(0.5)
///     .run(|_cx| check(2 + 2 == 4, "menu should be open"));
/// assert_eq!(body.len(), 3);
/// ```
#[derive(Default)]
pub struct Steps {
    steps: Vec<StepFn>,
    cursor: usize,
}

impl std::fmt::Debug for Steps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Steps")
            .field("steps", &self.steps.len())
            .field("cursor", &self.cursor)
            .finish()
    }
}

impl Steps {
    /// Create an empty sequence
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step with an explicit outcome
    #[must_use]
    pub fn step(
        mut self,
        f: impl FnMut(&mut TestContext) -> EnsayarResult<StepOutcome> + Send + 'static,
    ) -> Self {
        self.steps.push(Box::new(f));
        self
    }

    /// Append a step that completes synchronously and resumes next frame
    #[must_use]
    pub fn run(
        mut self,
        mut f: impl FnMut(&mut TestContext) -> EnsayarResult<()> + Send + 'static,
    ) -> Self {
        self.steps
            .push(Box::new(move |cx| f(cx).map(|()| StepOutcome::WaitFrame)));
        self
    }

    /// Append a suspension of one extra frame
    #[must_use]
    pub fn wait_frame(self) -> Self {
        self.step(|_| Ok(StepOutcome::WaitFrame))
    }

    /// Append a suspension of the given frame-scaled duration
    #[must_use]
    pub fn wait_seconds(self, seconds: f64) -> Self {
        self.step(move |_| Ok(StepOutcome::WaitSeconds(seconds)))
    }

    /// Append a suspension until the predicate holds
    #[must_use]
    pub fn wait_until(self, predicate: impl FnMut(&TestContext) -> bool + Send + 'static) -> Self {
        let mut slot = Some(Box::new(predicate) as WaitPredicate);
        self.step(move |_| match slot.take() {
            Some(pred) => Ok(StepOutcome::WaitUntil(pred)),
            // Steps never revisit a cursor position, so this arm is inert
            None => Ok(StepOutcome::WaitFrame),
        })
    }

    /// Number of queued steps
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the sequence has no steps
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl TestCoroutine for Steps {
    fn step(&mut self, cx: &mut TestContext) -> EnsayarResult<StepOutcome> {
        let Some(step) = self.steps.get_mut(self.cursor) else {
            return Ok(StepOutcome::Done);
        };
        let outcome = step(cx)?;
        self.cursor += 1;
        // A trailing frame-wait is natural completion; no extra tick needed
        if self.cursor == self.steps.len() && matches!(outcome, StepOutcome::WaitFrame) {
            return Ok(StepOutcome::Done);
        }
        Ok(outcome)
    }
}

/// Adapter running a plain closure as a single-step body
pub struct SyncBody {
    body: Option<Box<dyn FnMut(&mut TestContext) -> EnsayarResult<()> + Send>>,
}

impl std::fmt::Debug for SyncBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncBody")
            .field("consumed", &self.body.is_none())
            .finish()
    }
}

impl SyncBody {
    /// Wrap a synchronous test body
    #[must_use]
    pub fn new(body: impl FnMut(&mut TestContext) -> EnsayarResult<()> + Send + 'static) -> Self {
        Self {
            body: Some(Box::new(body)),
        }
    }
}

impl TestCoroutine for SyncBody {
    fn step(&mut self, cx: &mut TestContext) -> EnsayarResult<StepOutcome> {
        match self.body.take() {
            Some(mut body) => body(cx).map(|()| StepOutcome::Done),
            None => Ok(StepOutcome::Done),
        }
    }
}
