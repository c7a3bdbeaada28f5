//! Run event surface consumed by UI and reporting collaborators.

use crate::node::NodeState;
use serde::{Deserialize, Serialize};

/// Aggregated counts for one run session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Method runs that passed
    pub passed: usize,
    /// Method runs that failed
    pub failed: usize,
    /// Method runs skipped by an ignore marker
    pub ignored: usize,
    /// Frame ticks consumed by the whole run
    pub frames: u64,
}

impl RunSummary {
    /// Total method runs
    #[must_use]
    pub const fn total(&self) -> usize {
        self.passed + self.failed + self.ignored
    }

    /// Whether nothing failed
    #[must_use]
    pub const fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Notifications emitted while a run session progresses
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// A run session started
    RunStarted {
        /// Planned method count per pass
        total_methods: usize,
        /// Number of repeat passes
        passes: u32,
    },
    /// A method is about to run
    MethodStarted {
        /// Dotted node path
        full_name: String,
        /// Zero-based repeat pass
        pass: u32,
    },
    /// A method reached a terminal state
    MethodFinished {
        /// Dotted node path
        full_name: String,
        /// Terminal state
        state: NodeState,
        /// Failure or ignore message, when any
        message: Option<String>,
    },
    /// A node's aggregated state was invalidated
    StateUpdated {
        /// Dotted node path
        full_name: String,
    },
    /// The run session finished
    RunFinished {
        /// Aggregated counts
        summary: RunSummary,
    },
}

/// Observer of run events
pub trait RunObserver: Send {
    /// Handle one event
    fn on_event(&mut self, event: &RunEvent);
}

impl<F: FnMut(&RunEvent) + Send> RunObserver for F {
    fn on_event(&mut self, event: &RunEvent) {
        self(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_totals() {
        let summary = RunSummary {
            passed: 3,
            failed: 1,
            ignored: 2,
            frames: 42,
        };
        assert_eq!(summary.total(), 6);
        assert!(!summary.all_passed());
    }

    #[test]
    fn test_closure_observer() {
        let mut seen = Vec::new();
        {
            let mut observer = |event: &RunEvent| {
                if let RunEvent::MethodStarted { full_name, .. } = event {
                    seen.push(full_name.clone());
                }
            };
            observer.on_event(&RunEvent::MethodStarted {
                full_name: "Root.a".into(),
                pass: 0,
            });
        }
        assert_eq!(seen, vec!["Root.a"]);
    }
}
