// crates/dsp-tck-core/src/properties/tests.rs
// ============================================================================
// Module: TCK Properties Tests
// Description: Unit tests for property flattening and typed getters.
// Purpose: Validate TOML flattening, overrides, and conversion errors.
// Dependencies: dsp-tck-core
// ============================================================================

//! ## Overview
//! Validates that nested TOML tables flatten to dotted keys and that typed
//! getters report malformed values instead of panicking.

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

use super::PropertyError;
use super::TckProperties;

// ============================================================================
// SECTION: Flattening Tests
// ============================================================================

#[test]
fn nested_tables_flatten_to_dotted_keys() {
    let properties = TckProperties::from_toml_str(
        r#"
CN_01_01_DATASETID = "ACN0101"

[dataspacetck]
debug = true
port = 8083

[dataspacetck.dsp]
connector.http.url = "http://localhost:8282/"
"#,
    )
    .expect("parse");
    assert_eq!(properties.string("CN_01_01_DATASETID"), Some("ACN0101"));
    assert_eq!(properties.string("dataspacetck.debug"), Some("true"));
    assert_eq!(properties.string("dataspacetck.port"), Some("8083"));
    assert_eq!(
        properties.string("dataspacetck.dsp.connector.http.url"),
        Some("http://localhost:8282/")
    );
}

#[test]
fn quoted_dotted_keys_are_kept_verbatim() {
    let properties =
        TckProperties::from_toml_str("\"dataspacetck.launcher\" = \"DspSystemLauncher\"\n")
            .expect("parse");
    assert_eq!(properties.string("dataspacetck.launcher"), Some("DspSystemLauncher"));
}

#[test]
fn arrays_are_rejected() {
    let err = TckProperties::from_toml_str("values = [1, 2]\n").expect_err("array rejected");
    assert!(matches!(err, PropertyError::UnsupportedValue { .. }));
}

#[test]
fn invalid_toml_is_a_parse_error() {
    let err = TckProperties::from_toml_str("= broken").expect_err("parse failure");
    assert!(matches!(err, PropertyError::Parse(_)));
}

// ============================================================================
// SECTION: Getter Tests
// ============================================================================

#[test]
fn overrides_replace_existing_values() {
    let mut properties = TckProperties::from_toml_str("key = \"one\"\n").expect("parse");
    properties.apply_override("key = two").expect("override");
    assert_eq!(properties.string("key"), Some("two"));
    assert!(matches!(properties.apply_override("novalue"), Err(PropertyError::InvalidOverride(_))));
    assert!(matches!(properties.apply_override("=value"), Err(PropertyError::InvalidOverride(_))));
}

#[test]
fn typed_getters_fall_back_to_defaults() {
    let properties = TckProperties::new();
    assert!(!properties.bool_or("flag", false).expect("bool"));
    assert_eq!(properties.parse_or::<u64>("wait", 15).expect("u64"), 15);
    assert_eq!(properties.string_or("missing", "fallback"), "fallback");
}

#[test]
fn typed_getters_reject_malformed_values() {
    let properties: TckProperties = [("flag", "maybe"), ("wait", "soon")].into_iter().collect();
    assert!(matches!(properties.bool_or("flag", false), Err(PropertyError::InvalidValue { .. })));
    assert!(matches!(
        properties.parse_or::<u64>("wait", 1),
        Err(PropertyError::InvalidValue { .. })
    ));
}

#[test]
fn require_reports_missing_key() {
    let properties: TckProperties = [("blank", "  ")].into_iter().collect();
    let err = properties.require("blank").expect_err("blank is missing");
    assert_eq!(err.to_string(), "Required configuration not set: blank");
    assert!(properties.require("absent").is_err());
}

#[test]
fn prefix_iteration_stops_at_prefix_boundary() {
    let properties: TckProperties = [
        ("dataspacetck.dsp.jsonld.context.a.path", "a.json"),
        ("dataspacetck.dsp.jsonld.context.a.uri", "urn:a"),
        ("dataspacetck.dsp.local.connector", "true"),
        ("other", "x"),
    ]
    .into_iter()
    .collect();
    let keys: Vec<&str> =
        properties.with_prefix("dataspacetck.dsp.jsonld.context.").map(|(key, _)| key).collect();
    assert_eq!(keys, vec![
        "dataspacetck.dsp.jsonld.context.a.path",
        "dataspacetck.dsp.jsonld.context.a.uri"
    ]);
}
