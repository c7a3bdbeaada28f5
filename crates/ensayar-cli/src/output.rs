//! Output formatting and progress reporting

use console::{style, Term};
use ensayar::{NodeState, RunEvent, RunObserver};
use indicatif::{ProgressBar, ProgressStyle};

/// Streams run progress to the terminal as events arrive.
///
/// Implements [`RunObserver`], so it plugs straight into the scheduler
/// alongside the JSON reporter.
#[derive(Debug)]
pub struct ProgressPrinter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    use_color: bool,
    quiet: bool,
    passes: u32,
}

impl ProgressPrinter {
    /// Create a progress printer writing to stderr
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
            passes: 1,
        }
    }

    fn start(&mut self, total_methods: usize, passes: u32) {
        self.passes = passes;
        if self.quiet {
            return;
        }
        let total = (total_methods as u64) * u64::from(passes);
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        self.progress_bar = Some(pb);
    }

    fn method_started(&self, full_name: &str, pass: u32) {
        if let Some(pb) = &self.progress_bar {
            let label = if self.passes > 1 {
                format!("{full_name} (pass {})", pass + 1)
            } else {
                full_name.to_string()
            };
            pb.set_message(label);
        }
    }

    fn method_finished(&self, full_name: &str, state: NodeState, message: Option<&str>) {
        if let Some(pb) = &self.progress_bar {
            pb.inc(1);
        }
        if self.quiet {
            return;
        }
        let prefix = match (state, self.use_color) {
            (NodeState::Passed, true) => style("PASS").green().bold().to_string(),
            (NodeState::Passed, false) => "PASS".to_string(),
            (NodeState::Failed, true) => style("FAIL").red().bold().to_string(),
            (NodeState::Failed, false) => "FAIL".to_string(),
            (NodeState::Ignored, true) => style("SKIP").yellow().to_string(),
            (NodeState::Ignored, false) => "SKIP".to_string(),
            (NodeState::Undefined, _) => "????".to_string(),
        };
        let line = match message {
            Some(message) if state != NodeState::Passed => {
                format!("{prefix} {full_name}: {message}")
            }
            _ => format!("{prefix} {full_name}"),
        };
        let _ = self.term.write_line(&line);
    }

    fn finished(&mut self, summary_line: &str) {
        if let Some(pb) = self.progress_bar.take() {
            pb.finish_and_clear();
        }
        if !self.quiet {
            let _ = self.term.write_line(summary_line);
        }
    }
}

impl RunObserver for ProgressPrinter {
    fn on_event(&mut self, event: &RunEvent) {
        match event {
            RunEvent::RunStarted {
                total_methods,
                passes,
            } => self.start(*total_methods, *passes),
            RunEvent::MethodStarted { full_name, pass } => self.method_started(full_name, *pass),
            RunEvent::MethodFinished {
                full_name,
                state,
                message,
            } => self.method_finished(full_name, *state, message.as_deref()),
            RunEvent::StateUpdated { .. } => {}
            RunEvent::RunFinished { summary } => {
                let line = format!(
                    "{} run, {} passed, {} failed, {} ignored ({} frames)",
                    summary.total(),
                    summary.passed,
                    summary.failed,
                    summary.ignored,
                    summary.frames
                );
                self.finished(&line);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensayar::RunSummary;

    #[test]
    fn test_quiet_printer_consumes_events() {
        let mut printer = ProgressPrinter::new(false, true);
        printer.on_event(&RunEvent::RunStarted {
            total_methods: 2,
            passes: 1,
        });
        printer.on_event(&RunEvent::MethodStarted {
            full_name: "UiTests.Game.T.a".to_string(),
            pass: 0,
        });
        printer.on_event(&RunEvent::MethodFinished {
            full_name: "UiTests.Game.T.a".to_string(),
            state: NodeState::Passed,
            message: None,
        });
        printer.on_event(&RunEvent::RunFinished {
            summary: RunSummary {
                passed: 1,
                failed: 0,
                ignored: 0,
                frames: 4,
            },
        });
        assert!(printer.progress_bar.is_none());
    }
}
