// crates/dsp-tck-api/src/access/tests.rs
// ============================================================================
// Module: JSON-LD Accessor Tests
// Description: Unit tests for compact and expanded property accessors.
// Purpose: Validate values are extracted and malformed input is named.
// Dependencies: dsp-tck-api, serde_json
// ============================================================================

//! ## Overview
//! Covers every accessor against well-formed and malformed JSON-LD shapes.

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

use dsp_tck_core::JsonObject;
use serde_json::Value;
use serde_json::json;

use super::AccessError;
use super::compact_string_property;
use super::create_dsp_context;
use super::identity_property;
use super::map_property;
use super::string_id_property;
use super::string_property;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn object(value: Value) -> JsonObject {
    value.as_object().cloned().unwrap()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn map_property_reads_first_entry() {
    let map = object(json!({"offer": [{"@id": "o1"}, {"@id": "o2"}]}));
    let offer = map_property("offer", &map, false).unwrap().unwrap();
    assert_eq!(offer["@id"], "o1");
}

#[test]
fn map_property_errors_name_the_property() {
    let map = object(json!({"empty": [], "scalar": ["x"]}));
    assert_eq!(map_property("missing", &map, true).unwrap(), None);
    assert_eq!(
        map_property("missing", &map, false).unwrap_err().to_string(),
        "Property 'missing' was not found"
    );
    assert_eq!(map_property("empty", &map, false).unwrap_err(), AccessError::Empty("empty".into()));
    assert_eq!(
        map_property("scalar", &map, false).unwrap_err().to_string(),
        "Property 'scalar' is not a Map"
    );
}

#[test]
fn expanded_values_and_ids_are_unwrapped() {
    let map = object(json!({
        "code": [{"@value": "401"}],
        "count": [{"@value": 3}],
        "pid": [{"@id": "urn:pid"}],
    }));
    assert_eq!(string_property("code", &map).unwrap(), "401");
    assert_eq!(string_property("count", &map).unwrap(), "3");
    assert_eq!(string_id_property("pid", &map).unwrap(), "urn:pid");
    assert_eq!(
        string_property("pid", &map).unwrap_err().to_string(),
        "No @value attribute for property: pid"
    );
    assert_eq!(string_property("absent", &map).unwrap_err().to_string(), "No value for: absent");
}

#[test]
fn compact_values_are_rejected_by_expanded_accessors() {
    let map = object(json!({"providerPid": "p1"}));
    assert_eq!(compact_string_property("providerPid", &map).unwrap(), "p1");
    assert_eq!(
        string_id_property("providerPid", &map).unwrap_err().to_string(),
        "Property 'providerPid' was not in expanded @value form"
    );
}

#[test]
fn identity_property_reads_node_id() {
    let map = object(json!({"target": {"@id": "ACN0101"}, "flat": "ACN0101", "blank": {}}));
    assert_eq!(identity_property("target", &map).unwrap(), "ACN0101");
    assert_eq!(
        identity_property("flat", &map).unwrap_err().to_string(),
        "Property 'flat' was not in expanded @id form"
    );
    assert_eq!(
        identity_property("blank", &map).unwrap_err(),
        AccessError::NoIdValue("blank".into())
    );
}

#[test]
fn dsp_context_is_a_single_entry_array() {
    assert_eq!(create_dsp_context(), json!(["https://w3id.org/dspace/2025/1/context.jsonld"]));
}
