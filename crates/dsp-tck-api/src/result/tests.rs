// crates/dsp-tck-api/src/result/tests.rs
// ============================================================================
// Module: Protocol Result Tests
// Description: Unit tests for failure mapping in the fallible handler.
// Purpose: Validate status codes and failure bodies.
// Dependencies: dsp-tck-api, serde_json
// ============================================================================

//! ## Overview
//! Checks the status code of every error category and the handler output for
//! success, empty success, and failure.

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

use dsp_tck_core::ProtocolHandler;
use dsp_tck_core::RequestHeaders;
use serde_json::Value;
use serde_json::json;

use super::DspFailure;
use super::ErrorType;
use super::FallibleDspHandler;
use crate::state::StateError;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn error_types_map_to_status_codes() {
    let codes: Vec<u16> = [
        ErrorType::NotFound,
        ErrorType::Unauthorized,
        ErrorType::BadRequest,
        ErrorType::GeneralError,
        ErrorType::Conflict,
    ]
    .into_iter()
    .map(ErrorType::status)
    .collect();
    assert_eq!(codes, vec![404, 401, 400, 500, 409]);
}

#[test]
fn success_serializes_payload() {
    let handler = FallibleDspHandler::new(|body: &[u8]| {
        Ok(Some(json!({"size": body.len()}).as_object().cloned().unwrap()))
    });
    let response = handler.apply(&RequestHeaders::new(), b"abc");
    assert_eq!(response.code, 200);
    let body: Value = serde_json::from_str(&response.body.unwrap()).unwrap();
    assert_eq!(body, json!({"size": 3}));
}

#[test]
fn empty_success_has_no_body() {
    let handler = FallibleDspHandler::new(|_: &[u8]| Ok(None));
    let response = handler.apply(&RequestHeaders::new(), b"");
    assert_eq!(response.code, 200);
    assert!(response.body.is_none());
}

#[test]
fn failure_maps_status_and_body() {
    let handler =
        FallibleDspHandler::new(|_: &[u8]| Err(DspFailure::not_found("Negotiation not found: x")));
    let response = handler.apply(&RequestHeaders::new(), b"{}");
    assert_eq!(response.code, 404);
    let body: Value = serde_json::from_str(&response.body.unwrap()).unwrap();
    assert_eq!(body, json!({"code": "404", "reason": ["Negotiation not found: x"]}));
}

#[test]
fn state_errors_are_bad_requests() {
    let failure = DspFailure::from(StateError::CorrelationIdNotSet);
    assert_eq!(failure.error_type, ErrorType::BadRequest);
    assert_eq!(failure.to_string(), "Correlation id not set");
}
