// crates/dsp-tck-api/tests/messages.rs
// ============================================================================
// Module: Message Builder Tests
// Description: Schema and expansion checks for every message builder.
// Purpose: Ensure outgoing messages validate and expand to readable terms.
// Dependencies: dsp-tck-api, dsp-tck-core, serde_json
// ============================================================================
//! ## Overview
//! Validates builder output against the bundled DSP schemas and reads the
//! expanded form through the JSON-LD accessors.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::collections::BTreeMap;
use std::sync::Arc;

use dsp_tck_api::Catalog;
use dsp_tck_api::DataAddress;
use dsp_tck_api::access::string_id_property;
use dsp_tck_api::access::string_property;
use dsp_tck_api::constants::DCAT_PROPERTY_DATASET_EXPANDED;
use dsp_tck_api::constants::DSPACE_CATALOG_ERROR;
use dsp_tck_api::constants::DSPACE_NAMESPACE;
use dsp_tck_api::constants::DSPACE_PROPERTY_CALLBACK_ADDRESS_EXPANDED;
use dsp_tck_api::constants::DSPACE_PROPERTY_CONSUMER_PID_EXPANDED;
use dsp_tck_api::constants::DSPACE_PROPERTY_EVENT_TYPE_EXPANDED;
use dsp_tck_api::constants::DSPACE_PROPERTY_PROVIDER_PID_EXPANDED;
use dsp_tck_api::constants::DSPACE_PROPERTY_STATE_EXPANDED;
use dsp_tck_api::constants::ID;
use dsp_tck_api::constants::TYPE;
use dsp_tck_api::messages::catalog;
use dsp_tck_api::messages::negotiation;
use dsp_tck_api::messages::transfer;
use dsp_tck_core::JsonObject;
use dsp_tck_core::MessageSerializer;
use dsp_tck_core::SchemaValidator;
use dsp_tck_core::validation::schema_paths;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Message types and the schema each validates against.
const VALIDATORS: &[(&str, &str)] = &[
    ("ContractRequestMessage", "/negotiation/contract-request-message-schema.json"),
    ("ContractOfferMessage", "/negotiation/contract-offer-message-schema.json"),
    ("ContractAgreementMessage", "/negotiation/contract-agreement-message-schema.json"),
    (
        "ContractAgreementVerificationMessage",
        "/negotiation/contract-agreement-verification-message-schema.json",
    ),
    (
        "ContractNegotiationEventMessage",
        "/negotiation/contract-negotiation-event-message-schema.json",
    ),
    (
        "ContractNegotiationTerminationMessage",
        "/negotiation/contract-negotiation-termination-message-schema.json",
    ),
    ("ContractNegotiation", "/negotiation/contract-negotiation-schema.json"),
    ("CatalogRequestMessage", "/catalog/catalog-request-message-schema.json"),
    ("DatasetRequestMessage", "/catalog/dataset-request-message-schema.json"),
    ("Catalog", "/catalog/catalog-schema.json"),
    ("Dataset", "/catalog/dataset-schema.json"),
    ("CatalogError", "/catalog/catalog-error-schema.json"),
    ("TransferRequestMessage", "/transfer/transfer-request-message-schema.json"),
    ("TransferStartMessage", "/transfer/transfer-start-message-schema.json"),
    ("TransferCompletionMessage", "/transfer/transfer-completion-message-schema.json"),
    ("TransferSuspensionMessage", "/transfer/transfer-suspension-message-schema.json"),
    ("TransferTerminationMessage", "/transfer/transfer-termination-message-schema.json"),
    ("TransferProcess", "/transfer/transfer-process-schema.json"),
];

/// Builds a serializer validating every message type above.
fn serializer() -> MessageSerializer {
    let serializer = MessageSerializer::new().unwrap();
    for (message_type, path) in VALIDATORS {
        let validator = SchemaValidator::for_schema(path).unwrap();
        serializer.register_validator(message_type, Arc::new(validator));
    }
    serializer
}

/// Fails the test with the violations when `message` is invalid.
fn assert_valid(serializer: &MessageSerializer, message: &JsonObject) {
    if let Err(error) = serializer.validate(message) {
        panic!("{} failed validation: {error}", message[TYPE]);
    }
}

// ============================================================================
// SECTION: Negotiation Messages
// ============================================================================

#[test]
fn every_validated_type_has_a_bundled_schema() {
    let bundled: Vec<&str> = schema_paths().collect();
    for (_, path) in VALIDATORS {
        assert!(bundled.contains(path), "missing schema {path}");
    }
}

#[test]
fn negotiation_messages_validate() {
    let serializer = serializer();
    let messages = [
        negotiation::create_contract_request(
            "c1",
            None,
            "CD123:ACN0101:456",
            "ACN0101",
            Some("http://localhost:8083"),
        ),
        negotiation::create_contract_request(
            "c1",
            Some("p1"),
            "CD123:ACN0101:456",
            "ACN0101",
            None,
        ),
        negotiation::create_counter_offer(
            "p1",
            "c1",
            "CD123:ACN0101:456",
            "PROVIDER",
            "TCK_PARTICIPANT",
            "ACN0101",
        ),
        negotiation::create_offer(
            "p1",
            "c1",
            "CD123:ACN0101:456",
            "TCK_PARTICIPANT",
            "CONSUMER",
            "ACN0101",
        ),
        negotiation::create_agreement(
            "p1",
            "c1",
            "a1",
            "TCK_PARTICIPANT",
            "CONSUMER",
            "ACN0101",
            "http://localhost:8083",
        ),
        negotiation::create_verification("p1", "c1"),
        negotiation::create_accepted_event("p1", "c1"),
        negotiation::create_finalized_event("p1", "c1"),
        negotiation::create_termination("p1", "c1", "1", &[]),
        negotiation::create_termination("p1", "c1", "1", &["no longer needed"]),
        negotiation::create_negotiation_response("p1", "c1", "REQUESTED"),
    ];
    for message in &messages {
        assert_valid(&serializer, message);
    }
}

#[test]
fn invalid_negotiation_state_is_rejected() {
    let serializer = serializer();
    let response = negotiation::create_negotiation_response("p1", "c1", "INITIALIZED");
    let error = serializer.validate(&response).unwrap_err();
    assert!(error.to_string().starts_with("Invalid message: ["));
}

#[test]
fn negotiation_response_expands_state_and_ids() {
    let serializer = serializer();
    let response = negotiation::create_negotiation_response("p1", "c1", "OFFERED");
    let expanded = serializer.process_json_ld(&response).unwrap();
    assert_eq!(string_id_property(DSPACE_PROPERTY_PROVIDER_PID_EXPANDED, &expanded).unwrap(), "p1");
    assert_eq!(string_id_property(DSPACE_PROPERTY_CONSUMER_PID_EXPANDED, &expanded).unwrap(), "c1");
    assert_eq!(
        string_id_property(DSPACE_PROPERTY_STATE_EXPANDED, &expanded).unwrap(),
        format!("{DSPACE_NAMESPACE}OFFERED")
    );
}

#[test]
fn events_expand_event_type_in_dspace_namespace() {
    let serializer = serializer();
    let event = negotiation::create_finalized_event("p1", "c1");
    let expanded = serializer.process_json_ld(&event).unwrap();
    assert_eq!(
        string_id_property(DSPACE_PROPERTY_EVENT_TYPE_EXPANDED, &expanded).unwrap(),
        format!("{DSPACE_NAMESPACE}FINALIZED")
    );
}

#[test]
fn contract_request_expands_callback_address() {
    let serializer = serializer();
    let request = negotiation::create_contract_request(
        "c1",
        None,
        "o1",
        "d1",
        Some("http://localhost:8083"),
    );
    let expanded = serializer.process_json_ld(&request).unwrap();
    assert_eq!(
        string_property(DSPACE_PROPERTY_CALLBACK_ADDRESS_EXPANDED, &expanded).unwrap(),
        "http://localhost:8083"
    );
}

// ============================================================================
// SECTION: Catalog Messages
// ============================================================================

#[test]
fn catalog_messages_validate() {
    let serializer = serializer();
    let mut provider_catalog = Catalog::new("TCK_PARTICIPANT");
    provider_catalog.add_dataset(catalog::create_dataset("ds-1"));
    let dataset = catalog::create_dataset("ds-2");
    let messages = [
        catalog::create_catalog_request(),
        catalog::create_dataset_request("ds-1"),
        catalog::create_catalog_response(&provider_catalog),
        catalog::create_dataset_response(&dataset),
        catalog::create_catalog_error_response("401"),
    ];
    for message in &messages {
        assert_valid(&serializer, message);
    }
}

#[test]
fn catalog_response_lists_dataset_ids_when_expanded() {
    let serializer = serializer();
    let mut provider_catalog = Catalog::new("TCK_PARTICIPANT");
    provider_catalog.add_dataset(catalog::create_dataset("ds-1"));
    let expanded =
        serializer.process_json_ld(&catalog::create_catalog_response(&provider_catalog)).unwrap();
    let datasets = expanded[DCAT_PROPERTY_DATASET_EXPANDED].as_array().unwrap();
    assert!(datasets.iter().any(|dataset| dataset[ID] == "ds-1"));
}

#[test]
fn catalog_error_expands_type() {
    let serializer = serializer();
    let response = catalog::create_catalog_error_response("401");
    let expanded = serializer.process_json_ld(&response).unwrap();
    assert_eq!(expanded[TYPE], json!([DSPACE_CATALOG_ERROR]));
}

// ============================================================================
// SECTION: Transfer Messages
// ============================================================================

#[test]
fn transfer_messages_validate() {
    let serializer = serializer();
    let address = DataAddress {
        endpoint_type: transfer::HTTP_ENDPOINT_TYPE.to_string(),
        endpoint: transfer::SAMPLE_ENDPOINT.to_string(),
        endpoint_properties: BTreeMap::from([("authorization".to_string(), "token".to_string())]),
    };
    let messages = [
        transfer::create_transfer_request(
            "c1",
            "a1",
            "HttpData-PULL",
            None,
            "http://localhost:8083",
        ),
        transfer::create_transfer_request(
            "c1",
            "a1",
            "HttpData-PUSH",
            Some(&address),
            "http://localhost:8083",
        ),
        transfer::create_transfer_response("p1", "c1", "REQUESTED"),
        transfer::create_start_request("p1", "c1", None),
        transfer::create_start_request("p1", "c1", Some(transfer::from_data_address(&address))),
        transfer::create_completion("p1", "c1"),
        transfer::create_suspension("p1", "c1", "1", &["paused"]),
        transfer::create_termination("p1", "c1", "1", &[]),
    ];
    for message in &messages {
        assert_valid(&serializer, message);
    }
}

#[test]
fn sample_data_address_uses_http_endpoint() {
    let address = transfer::data_address();
    assert_eq!(address[TYPE], Value::String("DataAddress".to_string()));
    assert_eq!(address["endpoint"], Value::String(transfer::SAMPLE_ENDPOINT.to_string()));
}
