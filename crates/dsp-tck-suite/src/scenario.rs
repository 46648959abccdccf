// crates/dsp-tck-suite/src/scenario.rs
// ============================================================================
// Module: Scenario Model
// Description: Scenarios, scenario groups, and the context they run with.
// Purpose: Describe verification scenarios as plain data the runtime executes.
// Dependencies: dsp-tck-api, dsp-tck-core, dsp-tck-system, thiserror
// ============================================================================

//! ## Overview
//! A [`Scenario`] is an id, a display name, and a function run against a
//! [`ScenarioContext`]. Scenarios are bundled into [`ScenarioGroup`]s whose
//! setup registers the message validators the group relies on.
//! Invariants:
//! - The scenario id doubles as the scope of every launcher service it uses.
//! - Per-scenario settings are read from `<KEY>_DATASETID`, `<KEY>_OFFERID`,
//!   `<KEY>_AGREEMENTID` and `<KEY>_FORMAT`, where `<KEY>` is the id with
//!   `:` and `-` replaced by `_`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use dsp_tck_api::MockError;
use dsp_tck_api::random_uuid;
use dsp_tck_core::LauncherError;
use dsp_tck_core::MessageSerializer;
use dsp_tck_core::PropertyError;
use dsp_tck_core::SchemaValidator;
use dsp_tck_core::SystemLauncher;
use dsp_tck_core::TckProperties;
use dsp_tck_core::ValidationError;
use dsp_tck_system::ClientError;
use dsp_tck_system::DspSystemLauncher;
use dsp_tck_system::PipelineError;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Suffix of the per-scenario dataset id key.
pub const DATASET_ID_SUFFIX: &str = "_DATASETID";
/// Suffix of the per-scenario offer id key.
pub const OFFER_ID_SUFFIX: &str = "_OFFERID";
/// Suffix of the per-scenario agreement id key.
pub const AGREEMENT_ID_SUFFIX: &str = "_AGREEMENTID";
/// Suffix of the per-scenario transfer format key.
pub const FORMAT_SUFFIX: &str = "_FORMAT";
/// Transfer format used unless configured.
pub const DEFAULT_FORMAT: &str = "HTTP-PULL";
/// Prefix of generated dataset ids.
const DATASET_PREFIX: &str = "ACN";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Reasons a scenario fails.
#[derive(Debug, Error)]
pub enum VerificationError {
    /// A check on the connector under test did not hold.
    #[error("{0}")]
    Assertion(String),
    /// The scenario could not be set up.
    #[error("{0}")]
    Setup(String),
    /// A launcher service was unavailable.
    #[error(transparent)]
    Launcher(#[from] LauncherError),
    /// A negotiation or transfer pipeline failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    /// A client call failed.
    #[error(transparent)]
    Client(#[from] ClientError),
    /// A scripted connector did not behave as queued.
    #[error(transparent)]
    Mock(#[from] MockError),
    /// A validator could not be built.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A property was malformed.
    #[error(transparent)]
    Property(#[from] PropertyError),
}

/// Fails with [`VerificationError::Assertion`] unless `condition` holds.
///
/// # Errors
/// Returns the assertion error carrying `message`.
pub fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<(), VerificationError> {
    if condition { Ok(()) } else { Err(VerificationError::Assertion(message())) }
}

// ============================================================================
// SECTION: Scenarios
// ============================================================================

/// Body of a scenario.
pub type ScenarioFn = fn(&ScenarioContext<'_>) -> Result<(), VerificationError>;

/// Setup run once before the scenarios of a group.
pub type GroupSetup = fn(&MessageSerializer) -> Result<(), VerificationError>;

/// One verification scenario.
#[derive(Clone, Copy)]
pub struct Scenario {
    /// Short id such as `CN:01-01`.
    pub id: &'static str,
    /// Full display name, prefixed by the id.
    pub display_name: &'static str,
    /// Scenario body.
    pub run: ScenarioFn,
}

impl Scenario {
    /// Creates a scenario.
    #[must_use]
    pub const fn new(id: &'static str, display_name: &'static str, run: ScenarioFn) -> Self {
        Self { id, display_name, run }
    }
}

/// Named set of scenarios sharing a setup.
#[derive(Clone)]
pub struct ScenarioGroup {
    /// Group display name such as `CN_01: Contract request provider scenarios`.
    pub name: &'static str,
    /// Setup run before the first scenario.
    pub setup: GroupSetup,
    /// Scenarios in execution order.
    pub scenarios: Vec<Scenario>,
}

// ============================================================================
// SECTION: Context
// ============================================================================

/// Services available to a running scenario.
pub struct ScenarioContext<'a> {
    /// Scenario being run.
    scenario: &'a Scenario,
    /// Effective run properties.
    properties: &'a TckProperties,
    /// Started launcher.
    launcher: &'a dyn SystemLauncher,
    /// Shared message serializer.
    serializer: &'a Arc<MessageSerializer>,
}

impl<'a> ScenarioContext<'a> {
    /// Creates a context.
    #[must_use]
    pub const fn new(
        scenario: &'a Scenario,
        properties: &'a TckProperties,
        launcher: &'a dyn SystemLauncher,
        serializer: &'a Arc<MessageSerializer>,
    ) -> Self {
        Self { scenario, properties, launcher, serializer }
    }

    /// Returns the scope of launcher services, the scenario id.
    #[must_use]
    pub const fn scope(&self) -> &'static str {
        self.scenario.id
    }

    /// Returns the run properties.
    #[must_use]
    pub const fn properties(&self) -> &TckProperties {
        self.properties
    }

    /// Returns the shared message serializer.
    #[must_use]
    pub const fn serializer(&self) -> &Arc<MessageSerializer> {
        self.serializer
    }

    /// Returns the launcher as the DSP launcher.
    ///
    /// # Errors
    /// Returns [`VerificationError::Setup`] when another launcher runs.
    pub fn dsp_launcher(&self) -> Result<&'a DspSystemLauncher, VerificationError> {
        self.launcher
            .as_any()
            .downcast_ref::<DspSystemLauncher>()
            .ok_or_else(|| {
                VerificationError::Setup("scenario requires the DspSystemLauncher".to_string())
            })
    }

    /// Returns the dataset id, defaulting to `ACN` and the id digits.
    #[must_use]
    pub fn dataset_id(&self) -> String {
        let key = format!("{}{DATASET_ID_SUFFIX}", config_key(self.scenario.id));
        self.properties.string_or(&key, &default_dataset_id(self.scenario.id))
    }

    /// Returns the offer id, defaulting to the offer id of [`Self::dataset_id`].
    #[must_use]
    pub fn offer_id(&self) -> String {
        let key = format!("{}{OFFER_ID_SUFFIX}", config_key(self.scenario.id));
        self.properties.string_or(&key, &offer_id_from_dataset_id(&self.dataset_id()))
    }

    /// Returns the dataset id of catalog scenarios, defaulting to a random
    /// UUID.
    #[must_use]
    pub fn catalog_dataset_id(&self) -> String {
        let key = format!("{}{DATASET_ID_SUFFIX}", config_key(self.scenario.id));
        self.properties.string(&key).map_or_else(random_uuid, str::to_string)
    }

    /// Returns the agreement id of transfer scenarios, defaulting to a
    /// random UUID.
    #[must_use]
    pub fn agreement_id(&self) -> String {
        let key = format!("{}{AGREEMENT_ID_SUFFIX}", config_key(self.scenario.id));
        self.properties.string(&key).map_or_else(random_uuid, str::to_string)
    }

    /// Returns the transfer format, defaulting to [`DEFAULT_FORMAT`].
    #[must_use]
    pub fn transfer_format(&self) -> String {
        let key = format!("{}{FORMAT_SUFFIX}", config_key(self.scenario.id));
        self.properties.string_or(&key, DEFAULT_FORMAT)
    }
}

// ============================================================================
// SECTION: Settings Helpers
// ============================================================================

/// Returns the property key prefix of a scenario id.
#[must_use]
pub fn config_key(id: &str) -> String {
    id.replace([':', '-'], "_")
}

/// Returns the default dataset id of a scenario.
#[must_use]
pub fn default_dataset_id(id: &str) -> String {
    let digits: String = id.chars().filter(char::is_ascii_digit).collect();
    format!("{DATASET_PREFIX}{digits}")
}

/// Returns the offer id the TCK derives from a dataset id.
#[must_use]
pub fn offer_id_from_dataset_id(dataset_id: &str) -> String {
    format!("CD123:{dataset_id}:456")
}

/// Registers a bundled schema validator for each `(type, schema)` pair.
///
/// # Errors
/// Returns [`VerificationError::Validation`] when a schema is unknown.
pub fn register_validators(
    serializer: &MessageSerializer,
    validators: &[(&str, &str)],
) -> Result<(), VerificationError> {
    for (message_type, schema) in validators {
        let validator = SchemaValidator::for_schema(schema)?;
        serializer.register_validator(message_type, Arc::new(validator));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
