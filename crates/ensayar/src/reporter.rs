//! Reporter: collects run events into a serializable report.

use crate::events::{RunEvent, RunObserver, RunSummary};
use crate::node::NodeState;
use serde::{Deserialize, Serialize};

/// Terminal outcome of one method run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodOutcome {
    /// Dotted node path
    pub full_name: String,
    /// Terminal state
    pub state: NodeState,
    /// Failure or ignore message
    pub message: Option<String>,
}

/// Serializable report of a whole run session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    /// Per-method outcomes in execution order
    pub outcomes: Vec<MethodOutcome>,
    /// Aggregated counts
    pub summary: RunSummary,
}

impl RunReport {
    /// Outcomes that failed
    #[must_use]
    pub fn failures(&self) -> Vec<&MethodOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.state == NodeState::Failed)
            .collect()
    }
}

/// Run observer that accumulates a [`RunReport`]
#[derive(Debug, Default)]
pub struct Reporter {
    report: RunReport,
}

impl Reporter {
    /// Create an empty reporter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The accumulated report
    #[must_use]
    pub const fn report(&self) -> &RunReport {
        &self.report
    }

    /// Consume the reporter, yielding its report
    #[must_use]
    pub fn into_report(self) -> RunReport {
        self.report
    }

    /// Plain-text summary with per-failure detail
    #[must_use]
    pub fn render_text(&self) -> String {
        let summary = &self.report.summary;
        let mut out = format!(
            "{} run, {} passed, {} failed, {} ignored ({} frames)\n",
            summary.total(),
            summary.passed,
            summary.failed,
            summary.ignored,
            summary.frames
        );
        for failure in self.report.failures() {
            out.push_str(&format!(
                "  FAILED {}: {}\n",
                failure.full_name,
                failure.message.as_deref().unwrap_or("no message")
            ));
        }
        out
    }
}

impl RunObserver for Reporter {
    fn on_event(&mut self, event: &RunEvent) {
        match event {
            RunEvent::MethodFinished {
                full_name,
                state,
                message,
            } => {
                self.report.outcomes.push(MethodOutcome {
                    full_name: full_name.clone(),
                    state: *state,
                    message: message.clone(),
                });
            }
            RunEvent::RunFinished { summary } => {
                self.report.summary = *summary;
            }
            RunEvent::RunStarted { .. }
            | RunEvent::MethodStarted { .. }
            | RunEvent::StateUpdated { .. } => {}
        }
    }
}
