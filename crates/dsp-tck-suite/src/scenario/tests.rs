// crates/dsp-tck-suite/src/scenario/tests.rs
// ============================================================================
// Module: Scenario Model Tests
// Description: Unit tests for scenario settings and context helpers.
// Purpose: Validate config keys, id defaults and launcher downcasting.
// Dependencies: dsp-tck-core, dsp-tck-system
// ============================================================================

//! ## Overview
//! Settings are resolved from in-memory properties; the launcher is never
//! started.

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
use std::sync::Arc;

use dsp_tck_core::LauncherError;
use dsp_tck_core::MessageSerializer;
use dsp_tck_core::SystemConfiguration;
use dsp_tck_core::SystemLauncher;
use dsp_tck_core::TckProperties;
use dsp_tck_system::DspSystemLauncher;

use super::Scenario;
use super::ScenarioContext;
use super::VerificationError;
use super::config_key;
use super::default_dataset_id;
use super::ensure;
use super::offer_id_from_dataset_id;
use super::register_validators;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Scenario body that does nothing.
const fn noop(_: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    Ok(())
}

/// Creates a serializer without validators.
fn serializer() -> Arc<MessageSerializer> {
    Arc::new(MessageSerializer::new().unwrap())
}

/// Launcher that is not the DSP launcher.
struct OtherLauncher;

impl SystemLauncher for OtherLauncher {
    fn start(&mut self, _configuration: &SystemConfiguration) -> Result<(), LauncherError> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// SECTION: Settings
// ============================================================================

#[test]
fn config_key_replaces_separators() {
    assert_eq!(config_key("CN:01-01"), "CN_01_01");
    assert_eq!(config_key("CN_C:02-06"), "CN_C_02_06");
}

#[test]
fn defaults_derive_from_scenario_id() {
    assert_eq!(default_dataset_id("CN:01-03"), "ACN0103");
    assert_eq!(offer_id_from_dataset_id("ACN0103"), "CD123:ACN0103:456");
}

#[test]
fn context_reads_configured_ids() {
    let scenario = Scenario::new("CN:01-02", "CN:01-02: test", noop);
    let mut properties = TckProperties::new();
    properties.insert("CN_01_02_DATASETID", "DATA");
    properties.insert("CN_01_02_OFFERID", "OFFER");
    let launcher = DspSystemLauncher::new();
    let serializer = serializer();
    let context = ScenarioContext::new(&scenario, &properties, &launcher, &serializer);

    assert_eq!(context.scope(), "CN:01-02");
    assert_eq!(context.dataset_id(), "DATA");
    assert_eq!(context.offer_id(), "OFFER");
    assert_eq!(context.catalog_dataset_id(), "DATA");
}

#[test]
fn context_defaults_offer_to_configured_dataset() {
    let scenario = Scenario::new("CN:01-04", "CN:01-04: test", noop);
    let mut properties = TckProperties::new();
    properties.insert("CN_01_04_DATASETID", "DATA");
    let launcher = DspSystemLauncher::new();
    let serializer = serializer();
    let context = ScenarioContext::new(&scenario, &properties, &launcher, &serializer);

    assert_eq!(context.offer_id(), "CD123:DATA:456");
}

#[test]
fn catalog_dataset_defaults_to_fresh_uuid() {
    let scenario = Scenario::new("CAT:01-01", "CAT:01-01: test", noop);
    let properties = TckProperties::new();
    let launcher = DspSystemLauncher::new();
    let serializer = serializer();
    let context = ScenarioContext::new(&scenario, &properties, &launcher, &serializer);

    let first = context.catalog_dataset_id();
    let second = context.catalog_dataset_id();

    assert_eq!(first.len(), 36);
    assert_ne!(first, second);
}

#[test]
fn transfer_settings_read_configuration_or_defaults() {
    let scenario = Scenario::new("TP:01-02", "TP:01-02: test", noop);
    let mut properties = TckProperties::new();
    properties.insert("TP_01_02_AGREEMENTID", "AGREEMENT");
    let launcher = DspSystemLauncher::new();
    let serializer = serializer();
    let context = ScenarioContext::new(&scenario, &properties, &launcher, &serializer);

    assert_eq!(context.agreement_id(), "AGREEMENT");
    assert_eq!(context.transfer_format(), "HTTP-PULL");

    properties.insert("TP_01_02_FORMAT", "HTTP-PUSH");
    let context = ScenarioContext::new(&scenario, &properties, &launcher, &serializer);
    assert_eq!(context.transfer_format(), "HTTP-PUSH");
}

#[test]
fn agreement_defaults_to_fresh_uuid() {
    let scenario = Scenario::new("TP_C:01-01", "TP_C:01-01: test", noop);
    let properties = TckProperties::new();
    let launcher = DspSystemLauncher::new();
    let serializer = serializer();
    let context = ScenarioContext::new(&scenario, &properties, &launcher, &serializer);

    assert_eq!(context.agreement_id().len(), 36);
    assert_ne!(context.agreement_id(), context.agreement_id());
}

// ============================================================================
// SECTION: Context Services
// ============================================================================

#[test]
fn dsp_launcher_rejects_other_launchers() {
    let scenario = Scenario::new("MET:01-01", "MET:01-01: test", noop);
    let properties = TckProperties::new();
    let launcher = OtherLauncher;
    let serializer = serializer();
    let context = ScenarioContext::new(&scenario, &properties, &launcher, &serializer);

    assert!(matches!(context.dsp_launcher(), Err(VerificationError::Setup(_))));
}

#[test]
fn ensure_reports_message_only_on_failure() {
    ensure(true, || "unused".to_string()).unwrap();
    let error = ensure(false, || "catalog is empty".to_string()).unwrap_err();

    assert_eq!(error.to_string(), "catalog is empty");
}

#[test]
fn unknown_schema_fails_registration() {
    let serializer = MessageSerializer::new().unwrap();

    let validators = [("Catalog", "/catalog/missing-schema.json")];

    let error = register_validators(&serializer, &validators).unwrap_err();

    assert!(matches!(error, VerificationError::Validation(_)));
}
