// crates/dsp-tck-suite/src/runtime/tests.rs
// ============================================================================
// Module: TCK Runtime Tests
// Description: Unit tests for launcher resolution, filtering and reporting.
// Purpose: Validate run summaries without a connector under test.
// Dependencies: dsp-tck-core
// ============================================================================

//! ## Overview
//! Runs small scenario groups against a test launcher with the callback
//! server bound to an ephemeral local port.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::io;
use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use dsp_tck_core::LauncherError;
use dsp_tck_core::MessageSerializer;
use dsp_tck_core::SystemConfiguration;
use dsp_tck_core::SystemLauncher;
use dsp_tck_core::properties::TCK_HOST;
use dsp_tck_core::properties::TCK_LAUNCHER;
use dsp_tck_core::properties::TCK_PORT;

use super::ConsoleReporter;
use super::ExecutionListener;
use super::ExecutionSummary;
use super::ScenarioOutcome;
use super::TckRuntime;
use crate::scenario::Scenario;
use crate::scenario::ScenarioContext;
use crate::scenario::ScenarioGroup;
use crate::scenario::VerificationError;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Launcher that starts without services.
struct TestLauncher;

impl SystemLauncher for TestLauncher {
    fn start(&mut self, _configuration: &SystemConfiguration) -> Result<(), LauncherError> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Launcher that refuses to start.
struct BrokenLauncher;

impl SystemLauncher for BrokenLauncher {
    fn start(&mut self, _configuration: &SystemConfiguration) -> Result<(), LauncherError> {
        Err(LauncherError::Service("no connector".to_string()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Passing scenario body.
const fn pass(_: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    Ok(())
}

/// Failing scenario body.
fn fail(_: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    Err(VerificationError::Assertion("expected failure".to_string()))
}

/// Group setup that succeeds.
const fn no_setup(_: &MessageSerializer) -> Result<(), VerificationError> {
    Ok(())
}

/// Group setup that fails.
fn broken_setup(_: &MessageSerializer) -> Result<(), VerificationError> {
    Err(VerificationError::Setup("schema missing".to_string()))
}

/// Group with one passing and one failing scenario.
fn group() -> ScenarioGroup {
    ScenarioGroup {
        name: "TEST_01: Runtime scenarios",
        setup: no_setup,
        scenarios: vec![
            Scenario::new("TEST:01-01", "TEST:01-01: passes", pass),
            Scenario::new("TEST:01-02", "FILTER", fail),
        ],
    }
}

/// Runtime bound to an ephemeral port.
fn runtime() -> TckRuntime {
    TckRuntime::new().property(TCK_HOST, "127.0.0.1").property(TCK_PORT, "0")
}

/// Listener counting events.
#[derive(Default)]
struct CountingListener {
    /// Groups started.
    groups: AtomicUsize,
    /// Scenarios finished.
    scenarios: AtomicUsize,
    /// Runs finished.
    finished: AtomicUsize,
}

impl ExecutionListener for CountingListener {
    fn group_started(&self, _name: &str) {
        self.groups.fetch_add(1, Ordering::SeqCst);
    }

    fn scenario_finished(&self, _display_name: &str, _outcome: &ScenarioOutcome) {
        self.scenarios.fetch_add(1, Ordering::SeqCst);
    }

    fn execution_finished(&self, _summary: &ExecutionSummary) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

/// Writer sharing its buffer with the test.
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Launcher Resolution
// ============================================================================

#[test]
fn registered_launcher_overrides_property() {
    let summary = runtime()
        .property(TCK_LAUNCHER, "any.other.LauncherClass")
        .launcher("TestLauncher", || Box::new(TestLauncher))
        .add_suite(vec![group()])
        .execute()
        .unwrap();

    assert_eq!(summary.tests_found, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures[0].display_name, "FILTER");
    assert_eq!(summary.failures[0].message, "expected failure");
}

#[test]
fn missing_launcher_fails_every_scenario() {
    let summary = runtime().add_suite(vec![group()]).execute().unwrap();

    assert_eq!(summary.failed, 2);
    assert!(summary.failures.iter().all(|failure| failure.message.contains(TCK_LAUNCHER)));
}

#[test]
fn unknown_launcher_is_named_in_failures() {
    let summary = runtime()
        .property(TCK_LAUNCHER, "an.unexistent.Launcher")
        .add_suite(vec![group()])
        .execute()
        .unwrap();

    assert_eq!(summary.failed, 2);
    let message = &summary.failures[0].message;
    assert!(message.to_lowercase().contains("unable to create launcher"));
    assert!(message.contains("an.unexistent.Launcher"));
}

#[test]
fn launcher_start_failure_fails_every_scenario() {
    let summary = runtime()
        .launcher("BrokenLauncher", || Box::new(BrokenLauncher))
        .add_suite(vec![group()])
        .execute()
        .unwrap();

    assert_eq!(summary.failed, 2);
    assert!(summary.failures[1].message.contains("no connector"));
}

#[test]
fn dsp_launcher_is_known_by_both_names() {
    let runtime = TckRuntime::new();

    assert!(runtime.resolve_launcher().is_err());
    let short = TckRuntime::new().property(TCK_LAUNCHER, "DspSystemLauncher");
    let qualified = TckRuntime::new()
        .property(TCK_LAUNCHER, "org.eclipse.dataspacetck.dsp.system.DspSystemLauncher");
    assert!(short.resolve_launcher().is_ok());
    assert!(qualified.resolve_launcher().is_ok());
}

// ============================================================================
// SECTION: Selection and Reporting
// ============================================================================

#[test]
fn filter_limits_found_scenarios() {
    let summary = runtime()
        .launcher("TestLauncher", || Box::new(TestLauncher))
        .add_suite(vec![group()])
        .display_name_matching(|name| name.contains("passes"))
        .execute()
        .unwrap();

    assert_eq!(summary.tests_found, 1);
    assert_eq!(summary.succeeded, 1);
    assert!(summary.is_success());
}

#[test]
fn failed_group_setup_fails_its_scenarios() {
    let mut broken = group();
    broken.setup = broken_setup;

    let summary = runtime()
        .launcher("TestLauncher", || Box::new(TestLauncher))
        .add_suite(vec![broken])
        .execute()
        .unwrap();

    assert_eq!(summary.failed, 2);
    assert!(summary.failures[0].message.contains("schema missing"));
}

#[test]
fn listeners_see_groups_scenarios_and_summary() {
    let listener = Arc::new(CountingListener::default());

    runtime()
        .launcher("TestLauncher", || Box::new(TestLauncher))
        .listener(Arc::clone(&listener) as Arc<dyn ExecutionListener>)
        .add_suite(vec![group(), group()])
        .execute()
        .unwrap();

    assert_eq!(listener.groups.load(Ordering::SeqCst), 2);
    assert_eq!(listener.scenarios.load(Ordering::SeqCst), 4);
    assert_eq!(listener.finished.load(Ordering::SeqCst), 1);
}

#[test]
fn console_reporter_writes_results_and_summary() {
    let buffer = SharedBuffer::default();
    let reporter = ConsoleReporter::new(Box::new(buffer.clone()));
    let mut summary = ExecutionSummary::default();
    let failed = ScenarioOutcome::Failed("boom".to_string());
    summary.record("CN:01-01: ok", &ScenarioOutcome::Succeeded);
    summary.record("CN:01-02: broken", &failed);

    reporter.group_started("CN_01: Contract request provider scenarios");
    reporter.scenario_finished("CN:01-01: ok", &ScenarioOutcome::Succeeded);
    reporter.scenario_finished("CN:01-02: broken", &failed);
    reporter.execution_finished(&summary);

    let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    assert!(output.starts_with("CN_01: Contract request provider scenarios\n"));
    assert!(output.contains("  [PASS] CN:01-01: ok\n"));
    assert!(output.contains("  [FAIL] CN:01-02: broken: boom\n"));
    assert!(output.contains("Tests found: 2, succeeded: 1, failed: 1"));
}
