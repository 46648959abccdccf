// crates/dsp-tck-core/src/message/tests.rs
// ============================================================================
// Module: Message Serializer Tests
// Description: Unit tests for validation gating and context registration.
// Purpose: Validate processing order and error reporting.
// Dependencies: dsp-tck-core, serde_json, tempfile
// ============================================================================

//! ## Overview
//! Validates that messages are checked by `@type` before expansion, that
//! untyped messages pass through, and that custom contexts are registered
//! from properties.

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

use std::sync::Arc;

use serde_json::Value;
use serde_json::json;

use super::MessageError;
use super::MessageSerializer;
use crate::jsonld::JsonObject;
use crate::properties::TckProperties;
use crate::validation::SchemaValidator;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn object(value: Value) -> JsonObject {
    match value {
        Value::Object(object) => object,
        other => panic!("expected object, got {other}"),
    }
}

fn serializer_with_negotiation_validator() -> MessageSerializer {
    let serializer = MessageSerializer::new().unwrap();
    let validator =
        SchemaValidator::for_schema("/negotiation/contract-negotiation-schema.json").unwrap();
    serializer.register_validator("ContractNegotiation", Arc::new(validator));
    serializer
}

// ============================================================================
// SECTION: Validation Tests
// ============================================================================

#[test]
fn valid_messages_are_expanded() {
    let serializer = serializer_with_negotiation_validator();
    let expanded = serializer
        .process_json_ld(&object(json!({
            "@context": ["https://w3id.org/dspace/2025/1/context.jsonld"],
            "@id": "m1",
            "@type": "ContractNegotiation",
            "providerPid": "p",
            "consumerPid": "c",
            "state": "AGREED"
        })))
        .unwrap();
    assert_eq!(
        expanded["https://w3id.org/dspace/2025/1/state"],
        json!([{ "@id": "https://w3id.org/dspace/2025/1/AGREED" }])
    );
}

#[test]
fn invalid_messages_report_every_violation() {
    let serializer = serializer_with_negotiation_validator();
    let message = object(json!({
        "@context": ["https://w3id.org/dspace/2025/1/context.jsonld"],
        "@type": "ContractNegotiation",
        "state": "UNKNOWN"
    }));
    let err = serializer.process_json_ld(&message).expect_err("invalid");
    let MessageError::Invalid(errors) = &err else { panic!("unexpected error {err}") };
    assert!(!errors.is_empty());
    assert!(err.to_string().starts_with("Invalid message: ["));
    assert!(serializer.serialize(&message).is_err());
}

#[test]
fn untyped_messages_skip_validation() {
    let serializer = serializer_with_negotiation_validator();
    let plain = object(json!({ "providerId": "TCK_PARTICIPANT", "offerId": "o" }));
    assert!(serializer.serialize(&plain).is_ok());
}

#[test]
fn empty_expansion_is_an_error() {
    let serializer = MessageSerializer::new().unwrap();
    let document = object(json!({
        "@context": ["https://w3id.org/dspace/2025/1/context.jsonld"]
    }));
    let err = serializer.process_json_ld(&document).expect_err("empty");
    assert_eq!(err.to_string(), "Invalid Json document, expecting a non-empty array");
}

#[test]
fn non_object_bodies_are_rejected() {
    assert!(matches!(MessageSerializer::process_json(b"[1]"), Err(MessageError::NotAnObject)));
    assert!(matches!(MessageSerializer::process_json(b"{"), Err(MessageError::Json(_))));
}

// ============================================================================
// SECTION: Context Registration Tests
// ============================================================================

#[test]
fn custom_contexts_are_loaded_from_properties() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.jsonld");
    std::fs::write(&path, r#"{ "@context": { "ex": "http://example.org/", "size": "ex:size" } }"#)
        .unwrap();
    let properties: TckProperties = [
        ("dataspacetck.dsp.jsonld.context.custom.path", path.display().to_string()),
        ("dataspacetck.dsp.jsonld.context.custom.uri", "urn:custom".to_string()),
        ("dataspacetck.dsp.jsonld.context.partial.uri", "urn:partial".to_string()),
    ]
    .into_iter()
    .collect();
    let serializer = MessageSerializer::from_properties(&properties).unwrap();
    let document =
        object(json!({ "@context": ["urn:custom"], "@type": "ex:Thing", "size": 3 }));
    let expanded = serializer.process_json_ld(&document).unwrap();
    assert_eq!(expanded["http://example.org/size"], json!([{ "@value": 3 }]));
}

#[test]
fn unreadable_context_files_fail() {
    let properties: TckProperties = [
        ("dataspacetck.dsp.jsonld.context.bad.path", "/nonexistent/context.jsonld"),
        ("dataspacetck.dsp.jsonld.context.bad.uri", "urn:bad"),
    ]
    .into_iter()
    .collect();
    assert!(matches!(
        MessageSerializer::from_properties(&properties),
        Err(MessageError::Context { .. })
    ));
}
