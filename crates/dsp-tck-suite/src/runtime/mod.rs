// crates/dsp-tck-suite/src/runtime/mod.rs
// ============================================================================
// Module: TCK Runtime
// Description: Builder and executor for scenario groups.
// Purpose: Start shared services, resolve the launcher and run scenarios.
// Dependencies: dsp-tck-core, dsp-tck-system, tracing
// ============================================================================

//! ## Overview
//! [`TckRuntime`] starts the callback server and the message serializer,
//! resolves the system launcher named by `dataspacetck.launcher` (or the one
//! registered through [`TckRuntime::launcher`]) and runs every selected
//! scenario in group order.
//!
//! Invariants:
//! - A launcher that cannot be resolved or started fails every selected
//!   scenario with the same message; the run itself still completes.
//! - Callback handlers are cleared after every scenario.
//! - The launcher is closed once all groups ran.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use dsp_tck_core::CallbackServer;
use dsp_tck_core::MessageError;
use dsp_tck_core::MessageSerializer;
use dsp_tck_core::PropertyError;
use dsp_tck_core::ServerError;
use dsp_tck_core::SystemConfiguration;
use dsp_tck_core::SystemLauncher;
use dsp_tck_core::TckProperties;
use dsp_tck_core::logging;
use dsp_tck_core::properties::TCK_DEBUG;
use dsp_tck_core::properties::TCK_LAUNCHER;
use dsp_tck_system::DspSystemLauncher;
use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::scenario::ScenarioContext;
use crate::scenario::ScenarioGroup;

mod report;

pub use report::ConsoleReporter;
pub use report::ExecutionListener;
pub use report::ExecutionSummary;
pub use report::NoopExecutionListener;
pub use report::ScenarioFailure;
pub use report::ScenarioOutcome;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Short name of the DSP launcher.
pub const DSP_LAUNCHER: &str = "DspSystemLauncher";

/// Qualified name of the DSP launcher accepted for compatibility.
pub const DSP_LAUNCHER_QUALIFIED: &str = "org.eclipse.dataspacetck.dsp.system.DspSystemLauncher";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors preventing a run from starting.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Run properties are invalid.
    #[error(transparent)]
    Property(#[from] PropertyError),
    /// Callback server could not start.
    #[error(transparent)]
    Server(#[from] ServerError),
    /// Message serializer could not be created.
    #[error(transparent)]
    Message(#[from] MessageError),
}

// ============================================================================
// SECTION: Runtime
// ============================================================================

/// Creates a system launcher.
pub type LauncherFactory = Box<dyn Fn() -> Box<dyn SystemLauncher> + Send + Sync>;

/// Selects scenarios by display name.
pub type DisplayNameFilter = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Runs scenario groups against a system launcher.
pub struct TckRuntime {
    /// Run properties.
    properties: TckProperties,
    /// Groups in execution order.
    groups: Vec<ScenarioGroup>,
    /// Progress listeners.
    listeners: Vec<Arc<dyn ExecutionListener>>,
    /// Known launchers by name.
    factories: BTreeMap<String, LauncherFactory>,
    /// Launcher selected through [`Self::launcher`].
    selected: Option<String>,
    /// Scenario selection.
    filter: Option<DisplayNameFilter>,
}

impl Default for TckRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl TckRuntime {
    /// Creates a runtime knowing the DSP launcher under its short and
    /// qualified names.
    #[must_use]
    pub fn new() -> Self {
        let mut factories: BTreeMap<String, LauncherFactory> = BTreeMap::new();
        factories.insert(DSP_LAUNCHER.to_string(), Box::new(dsp_launcher));
        factories.insert(DSP_LAUNCHER_QUALIFIED.to_string(), Box::new(dsp_launcher));
        Self {
            properties: TckProperties::new(),
            groups: Vec::new(),
            listeners: Vec::new(),
            factories,
            selected: None,
            filter: None,
        }
    }

    /// Sets one property.
    #[must_use]
    pub fn property(mut self, key: &str, value: &str) -> Self {
        self.properties.insert(key, value);
        self
    }

    /// Merges a property set; its values replace existing ones.
    #[must_use]
    pub fn properties(mut self, properties: &TckProperties) -> Self {
        self.properties.extend(properties);
        self
    }

    /// Adds scenario groups.
    #[must_use]
    pub fn add_suite(mut self, groups: impl IntoIterator<Item = ScenarioGroup>) -> Self {
        self.groups.extend(groups);
        self
    }

    /// Adds a progress listener.
    #[must_use]
    pub fn listener(mut self, listener: Arc<dyn ExecutionListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Registers a launcher and selects it, overriding `dataspacetck.launcher`.
    #[must_use]
    pub fn launcher<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn() -> Box<dyn SystemLauncher> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
        self.selected = Some(name.to_string());
        self
    }

    /// Runs only scenarios whose display name satisfies `filter`.
    #[must_use]
    pub fn display_name_matching<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Runs every selected scenario.
    ///
    /// # Errors
    /// Returns [`RuntimeError`] when properties are invalid or the callback
    /// server or serializer cannot start. Scenario failures are reported in
    /// the summary instead.
    pub fn execute(self) -> Result<ExecutionSummary, RuntimeError> {
        logging::init(self.properties.bool_or(TCK_DEBUG, false)?);
        let server = CallbackServer::start(&self.properties)?;
        let serializer = Arc::new(MessageSerializer::from_properties(&self.properties)?);
        let endpoint = server.endpoint();
        let mut launcher = self.resolve_launcher().and_then(|mut launcher| {
            let configuration = SystemConfiguration {
                properties: self.properties.clone(),
                endpoint: Arc::clone(&endpoint),
                serializer: Arc::clone(&serializer),
            };
            launcher
                .start(&configuration)
                .map_err(|err| format!("Launcher failed to start: {err}"))?;
            Ok(launcher)
        });
        if let Err(message) = &launcher {
            warn!(error = %message, "system launcher unavailable");
        }

        let mut summary = ExecutionSummary::default();
        for group in &self.groups {
            let scenarios: Vec<_> = group
                .scenarios
                .iter()
                .filter(|scenario| {
                    self.filter.as_ref().is_none_or(|filter| filter(scenario.display_name))
                })
                .collect();
            if scenarios.is_empty() {
                continue;
            }
            info!(group = %group.name, scenarios = scenarios.len(), "running group");
            self.listeners.iter().for_each(|listener| listener.group_started(group.name));
            let setup = match &launcher {
                Ok(_) => {
                    (group.setup)(&serializer).map_err(|err| format!("Group setup failed: {err}"))
                }
                Err(message) => Err(message.clone()),
            };
            for scenario in scenarios {
                let outcome = match (&launcher, &setup) {
                    (Ok(launcher), Ok(())) => {
                        debug!(scenario = %scenario.id, "running scenario");
                        let context = ScenarioContext::new(
                            scenario,
                            &self.properties,
                            &**launcher,
                            &serializer,
                        );
                        let result = (scenario.run)(&context);
                        endpoint.clear_handlers();
                        match result {
                            Ok(()) => ScenarioOutcome::Succeeded,
                            Err(err) => ScenarioOutcome::Failed(err.to_string()),
                        }
                    }
                    (Err(message), _) | (_, Err(message)) => {
                        ScenarioOutcome::Failed(message.clone())
                    }
                };
                if let ScenarioOutcome::Failed(message) = &outcome {
                    warn!(scenario = %scenario.id, error = %message, "scenario failed");
                }
                summary.record(scenario.display_name, &outcome);
                for listener in &self.listeners {
                    listener.scenario_finished(scenario.display_name, &outcome);
                }
            }
        }

        if let Ok(launcher) = &mut launcher {
            launcher.close();
        }
        drop(server);
        info!(
            found = summary.tests_found,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "execution finished"
        );
        self.listeners.iter().for_each(|listener| listener.execution_finished(&summary));
        Ok(summary)
    }

    /// Creates the selected launcher, or the one named by the properties.
    fn resolve_launcher(&self) -> Result<Box<dyn SystemLauncher>, String> {
        let name = match (&self.selected, self.properties.string(TCK_LAUNCHER)) {
            (Some(name), _) => name.as_str(),
            (None, Some(name)) => name,
            (None, None) => {
                return Err(format!("No system launcher configured: set {TCK_LAUNCHER}"));
            }
        };
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| format!("Unable to create launcher {name}"))
    }
}

/// Creates the DSP launcher.
fn dsp_launcher() -> Box<dyn SystemLauncher> {
    Box::new(DspSystemLauncher::new())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
