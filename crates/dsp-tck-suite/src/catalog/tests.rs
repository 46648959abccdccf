// crates/dsp-tck-suite/src/catalog/tests.rs
// ============================================================================
// Module: Catalog Scenario Tests
// Description: Unit tests for catalog document checks.
// Purpose: Validate dataset lookup and error detection on expanded documents.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Documents are written in expanded JSON-LD form, as returned by the
//! catalog client.

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
use dsp_tck_core::MessageSerializer;
use serde_json::Value;
use serde_json::json;

use super::datasets;
use super::has_id;
use super::is_catalog_error;
use super::register_catalog_validators;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Converts a JSON literal into an object.
fn object(value: Value) -> JsonObject {
    match value {
        Value::Object(object) => object,
        other => panic!("expected an object, got {other}"),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn datasets_are_found_by_id() {
    let catalog = object(json!({
        "http://www.w3.org/ns/dcat#dataset": [{ "@id": "one" }, { "@id": "two" }]
    }));

    let entries = datasets(&catalog).unwrap();

    assert_eq!(entries.len(), 2);
    assert!(entries.iter().any(|entry| has_id(entry, "two")));
    assert!(!entries.iter().any(|entry| has_id(entry, "three")));
}

#[test]
fn catalog_without_datasets_fails() {
    let error = datasets(&object(json!({ "@id": "catalog" }))).unwrap_err();

    assert!(error.to_string().contains("dcat#dataset"));
}

#[test]
fn catalog_error_requires_single_error_type() {
    let error = object(json!({ "@type": ["https://w3id.org/dspace/2025/1/CatalogError"] }));
    let mixed = object(json!({
        "@type": [
            "https://w3id.org/dspace/2025/1/CatalogError",
            "https://w3id.org/dspace/2025/1/Other"
        ]
    }));
    let compact = object(json!({ "@type": "CatalogError" }));

    assert!(is_catalog_error(&error));
    assert!(!is_catalog_error(&mixed));
    assert!(!is_catalog_error(&compact));
}

#[test]
fn bundled_catalog_schemas_register() {
    let serializer = MessageSerializer::new().unwrap();

    register_catalog_validators(&serializer).unwrap();
}
