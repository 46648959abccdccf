// crates/dsp-tck-suite/src/runtime/report.rs
// ============================================================================
// Module: Execution Reporting
// Description: Listener contract, outcomes and the run summary.
// Purpose: Report scenario progress without coupling the runtime to output.
// Dependencies: tracing
// ============================================================================

//! ## Overview
//! The runtime reports every group and scenario to its listeners and returns
//! an [`ExecutionSummary`]. [`ConsoleReporter`] writes one line per event;
//! [`NoopExecutionListener`] discards them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::io::Write;
use std::sync::Mutex;
use std::sync::PoisonError;

use tracing::warn;

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Result of one scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioOutcome {
    /// Scenario passed.
    Succeeded,
    /// Scenario failed with a message.
    Failed(String),
}

/// Failed scenario entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioFailure {
    /// Display name of the scenario.
    pub display_name: String,
    /// Failure message.
    pub message: String,
}

/// Counts and failures of a run.
///
/// # Invariants
/// - `tests_found == succeeded + failed`.
/// - `failures.len() == failed`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionSummary {
    /// Scenarios selected for execution.
    pub tests_found: usize,
    /// Scenarios that passed.
    pub succeeded: usize,
    /// Scenarios that failed.
    pub failed: usize,
    /// Failed scenarios in execution order.
    pub failures: Vec<ScenarioFailure>,
}

impl ExecutionSummary {
    /// Records the outcome of a scenario.
    pub fn record(&mut self, display_name: &str, outcome: &ScenarioOutcome) {
        self.tests_found += 1;
        match outcome {
            ScenarioOutcome::Succeeded => self.succeeded += 1,
            ScenarioOutcome::Failed(message) => {
                self.failed += 1;
                self.failures.push(ScenarioFailure {
                    display_name: display_name.to_string(),
                    message: message.clone(),
                });
            }
        }
    }

    /// Returns true when no scenario failed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.failed == 0
    }
}

// ============================================================================
// SECTION: Listeners
// ============================================================================

/// Receives execution progress.
pub trait ExecutionListener: Send + Sync {
    /// Called before the scenarios of a group run.
    fn group_started(&self, name: &str);
    /// Called after each scenario.
    fn scenario_finished(&self, display_name: &str, outcome: &ScenarioOutcome);
    /// Called once the run is complete.
    fn execution_finished(&self, summary: &ExecutionSummary);
}

/// Listener discarding every event.
pub struct NoopExecutionListener;

impl ExecutionListener for NoopExecutionListener {
    fn group_started(&self, _name: &str) {}

    fn scenario_finished(&self, _display_name: &str, _outcome: &ScenarioOutcome) {}

    fn execution_finished(&self, _summary: &ExecutionSummary) {}
}

/// Listener writing progress lines.
pub struct ConsoleReporter {
    /// Output sink.
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleReporter {
    /// Creates a reporter writing to `writer`.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self { writer: Mutex::new(writer) }
    }

    /// Creates a reporter writing to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    /// Writes one line; write failures are logged.
    fn line(&self, message: &str) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = writeln!(writer, "{message}").and_then(|()| writer.flush()) {
            warn!(error = %err, "failed to write report line");
        }
    }
}

impl ExecutionListener for ConsoleReporter {
    fn group_started(&self, name: &str) {
        self.line(name);
    }

    fn scenario_finished(&self, display_name: &str, outcome: &ScenarioOutcome) {
        match outcome {
            ScenarioOutcome::Succeeded => self.line(&format!("  [PASS] {display_name}")),
            ScenarioOutcome::Failed(message) => {
                self.line(&format!("  [FAIL] {display_name}: {message}"));
            }
        }
    }

    fn execution_finished(&self, summary: &ExecutionSummary) {
        self.line(&format!(
            "Tests found: {}, succeeded: {}, failed: {}",
            summary.tests_found, summary.succeeded, summary.failed
        ));
        for failure in &summary.failures {
            self.line(&format!("  {}: {}", failure.display_name, failure.message));
        }
    }
}
