// crates/dsp-tck-suite/src/metadata.rs
// ============================================================================
// Module: Metadata Scenarios
// Description: MET_01 scenario fetching protocol version metadata.
// Purpose: Verify the connector under test advertises protocol 2025-1.
// Dependencies: dsp-tck-core, dsp-tck-system, serde_json
// ============================================================================

//! ## Overview
//! The metadata document is plain JSON; it must list a `protocolVersions`
//! entry for `2025-1` that names a `path`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use dsp_tck_core::JsonObject;
use dsp_tck_core::MessageSerializer;
use serde_json::Value;

use crate::scenario::Scenario;
use crate::scenario::ScenarioContext;
use crate::scenario::ScenarioGroup;
use crate::scenario::VerificationError;
use crate::scenario::ensure;

// ============================================================================
// SECTION: Group
// ============================================================================

/// Protocol version the connector under test must support.
pub const REQUIRED_VERSION: &str = "2025-1";

/// Returns the MET_01 group.
#[must_use]
pub fn metadata_group() -> ScenarioGroup {
    ScenarioGroup {
        name: "MET_01: Metadata request scenarios",
        setup: no_setup,
        scenarios: vec![Scenario::new(
            "MET:01-01",
            "MET:01-01: Verify metadata request",
            met_01_01,
        )],
    }
}

/// Metadata scenarios validate no messages.
const fn no_setup(_serializer: &MessageSerializer) -> Result<(), VerificationError> {
    Ok(())
}

// ============================================================================
// SECTION: Scenarios
// ============================================================================

/// The metadata lists the required protocol version.
fn met_01_01(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let metadata = context.dsp_launcher()?.metadata_client(context.scope())?.get_metadata()?;
    check_versions(&metadata)
}

/// Checks the `protocolVersions` entries of `metadata`.
fn check_versions(metadata: &JsonObject) -> Result<(), VerificationError> {
    let versions = metadata
        .get("protocolVersions")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            VerificationError::Assertion("metadata has no protocolVersions array".to_string())
        })?;
    ensure(
        versions.iter().any(|entry| {
            entry.get("version").and_then(Value::as_str) == Some(REQUIRED_VERSION)
                && entry.get("path").is_some_and(|path| !path.is_null())
        }),
        || format!("metadata does not list protocol version {REQUIRED_VERSION} with a path"),
    )
}

// ============================================================================
// SECTION: Tests
// ============================================================================
