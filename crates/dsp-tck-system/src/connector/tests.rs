// crates/dsp-tck-system/src/connector/tests.rs
// ============================================================================
// Module: TCK Connector Tests
// Description: Unit tests for the reference connector managers.
// Purpose: Validate message handling, idempotency, and listener callbacks.
// Dependencies: dsp-tck-api, dsp-tck-core, serde_json
// ============================================================================

//! ## Overview
//! Drives the managers with expanded messages produced by the message
//! builders, the same way endpoint handlers do.

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
use std::sync::Mutex;

use dsp_tck_api::CatalogManager;
use dsp_tck_api::Connector;
use dsp_tck_api::ConsumerNegotiationManager;
use dsp_tck_api::ConsumerTransferProcessManager;
use dsp_tck_api::ContractNegotiation;
use dsp_tck_api::NegotiationError;
use dsp_tck_api::NegotiationListener;
use dsp_tck_api::NegotiationManager;
use dsp_tck_api::NegotiationState;
use dsp_tck_api::ParticipantRole;
use dsp_tck_api::ProviderNegotiationManager;
use dsp_tck_api::ProviderTransferProcessManager;
use dsp_tck_api::TransferError;
use dsp_tck_api::TransferProcessManager;
use dsp_tck_api::TransferState;
use dsp_tck_api::constants::DSPACE_PROPERTY_PROVIDER_PID;
use dsp_tck_api::constants::DSPACE_PROPERTY_STATE;
use dsp_tck_api::messages::catalog::create_dataset;
use dsp_tck_api::messages::negotiation;
use dsp_tck_api::messages::transfer;
use dsp_tck_core::JsonObject;
use dsp_tck_core::MessageSerializer;
use serde_json::Value;

use super::PROTOCOL_VERSION;
use super::TckCatalogManager;
use super::TckConnector;
use super::TckConsumerNegotiationManager;
use super::TckProviderNegotiationManager;
use super::TckTransferProcessManager;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Expands a compact message the way endpoint handlers do.
fn expand(message: &JsonObject) -> JsonObject {
    MessageSerializer::new().unwrap().process_json_ld(message).unwrap()
}

/// Listener recording callback names in order.
#[derive(Default)]
struct Recorder {
    /// Recorded callback names.
    events: Mutex<Vec<&'static str>>,
}

impl Recorder {
    /// Returns the recorded callback names.
    fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }

    /// Records one callback.
    fn record(&self, event: &'static str) {
        self.events.lock().unwrap().push(event);
    }
}

impl NegotiationListener for Recorder {
    fn negotiation_created(&self, _negotiation: &Arc<ContractNegotiation>) {
        self.record("created");
    }

    fn contract_requested(&self, _negotiation: &Arc<ContractNegotiation>) {
        self.record("requested");
    }

    fn offered(&self, _negotiation: &Arc<ContractNegotiation>) {
        self.record("offered");
    }

    fn accepted(&self, _negotiation: &Arc<ContractNegotiation>) {
        self.record("accepted");
    }

    fn agreed(&self, _negotiation: &Arc<ContractNegotiation>) {
        self.record("agreed");
    }

    fn verified(&self, _negotiation: &Arc<ContractNegotiation>) {
        self.record("verified");
    }

    fn finalized(&self, _negotiation: &Arc<ContractNegotiation>) {
        self.record("finalized");
    }

    fn terminated(&self, _negotiation: &Arc<ContractNegotiation>) {
        self.record("terminated");
    }
}

/// Sends an initial contract request to `manager` and returns its response.
fn request(manager: &TckProviderNegotiationManager, consumer_pid: &str) -> JsonObject {
    let message = negotiation::create_contract_request(
        consumer_pid,
        None,
        "CD123:ACN0101:456",
        "ACN0101",
        Some("http://localhost:8083/"),
    );
    manager.handle_contract_request(&expand(&message), "CONSUMER").unwrap()
}

/// Reads a compact string property.
fn text<'a>(message: &'a JsonObject, key: &str) -> &'a str {
    message.get(key).and_then(Value::as_str).unwrap()
}

// ============================================================================
// SECTION: Provider Negotiation Tests
// ============================================================================

#[test]
fn contract_request_creates_requested_negotiation() {
    let manager = TckProviderNegotiationManager::new();
    let recorder = Arc::new(Recorder::default());
    manager.register_listener(Arc::clone(&recorder) as Arc<dyn NegotiationListener>);

    let response = request(&manager, "consumer-1");

    assert_eq!(text(&response, DSPACE_PROPERTY_STATE), "REQUESTED");
    let negotiation = manager.find_by_correlation_id("consumer-1").unwrap();
    assert_eq!(negotiation.role(), ParticipantRole::Provider);
    assert_eq!(negotiation.dataset_id(), "ACN0101");
    assert_eq!(negotiation.offer_id(), "CD123:ACN0101:456");
    assert_eq!(negotiation.counter_party_id(), Some("CONSUMER"));
    assert_eq!(negotiation.callback_address(), Some("http://localhost:8083"));
    assert_eq!(negotiation.offers().len(), 1);
    assert_eq!(text(&response, DSPACE_PROPERTY_PROVIDER_PID), negotiation.id());
    assert_eq!(recorder.events(), vec!["requested"]);
}

#[test]
fn repeated_contract_request_returns_existing_negotiation() {
    let manager = TckProviderNegotiationManager::new();
    let first = request(&manager, "consumer-1");
    let second = request(&manager, "consumer-1");
    assert_eq!(first, second);
    assert_eq!(manager.negotiations().len(), 1);
}

#[test]
fn counter_offer_moves_offered_negotiation_back_to_requested() {
    let manager = TckProviderNegotiationManager::new();
    request(&manager, "consumer-1");
    let negotiation = manager.find_by_correlation_id("consumer-1").unwrap();
    manager.offered(negotiation.id()).unwrap();

    let counter = negotiation::create_contract_request(
        "consumer-1",
        Some(negotiation.id()),
        "CD123:ACN0101:789",
        "ACN0101",
        None,
    );
    manager.handle_contract_request(&expand(&counter), "CONSUMER").unwrap();

    assert_eq!(negotiation.state(), NegotiationState::Requested);
    assert_eq!(negotiation.offers().len(), 2);
}

#[test]
fn counter_offer_for_unknown_negotiation_is_not_found() {
    let manager = TckProviderNegotiationManager::new();
    let counter =
        negotiation::create_contract_request("consumer-1", Some("missing"), "o1", "d1", None);
    let error = manager.handle_contract_request(&expand(&counter), "CONSUMER").unwrap_err();
    assert_eq!(error, NegotiationError::NotFound("missing".to_string()));
}

#[test]
fn provider_negotiation_reaches_finalized() {
    let manager = TckProviderNegotiationManager::new();
    request(&manager, "consumer-1");
    let negotiation = manager.find_by_correlation_id("consumer-1").unwrap();
    let pid = negotiation.id().to_string();

    manager.offered(&pid).unwrap();
    let accepted = negotiation::create_accepted_event(&pid, "consumer-1");
    manager.handle_accepted(&expand(&accepted)).unwrap();
    manager.agreed(&pid).unwrap();
    let verification = negotiation::create_verification(&pid, "consumer-1");
    manager.handle_verified(&expand(&verification)).unwrap();
    manager.finalized(&pid).unwrap();

    assert_eq!(negotiation.state(), NegotiationState::Finalized);
}

#[test]
fn illegal_event_leaves_state_unchanged() {
    let manager = TckProviderNegotiationManager::new();
    request(&manager, "consumer-1");
    let negotiation = manager.find_by_correlation_id("consumer-1").unwrap();
    let verification = negotiation::create_verification(negotiation.id(), "consumer-1");
    assert!(manager.handle_verified(&expand(&verification)).is_err());
    assert_eq!(negotiation.state(), NegotiationState::Requested);
}

#[test]
fn termination_returns_terminated_response() {
    let manager = TckProviderNegotiationManager::new();
    let recorder = Arc::new(Recorder::default());
    manager.register_listener(Arc::clone(&recorder) as Arc<dyn NegotiationListener>);
    request(&manager, "consumer-1");
    let negotiation = manager.find_by_correlation_id("consumer-1").unwrap();

    let termination = negotiation::create_termination(negotiation.id(), "consumer-1", "1", &[]);
    let response = manager.handle_termination(&expand(&termination)).unwrap();

    assert_eq!(text(&response, DSPACE_PROPERTY_STATE), "TERMINATED");
    assert_eq!(text(&response, DSPACE_PROPERTY_PROVIDER_PID), negotiation.id());
    assert_eq!(recorder.events(), vec!["requested", "terminated"]);
}

#[test]
fn deregistered_listener_is_not_notified() {
    let manager = TckProviderNegotiationManager::new();
    let recorder = Arc::new(Recorder::default());
    let id = manager.register_listener(Arc::clone(&recorder) as Arc<dyn NegotiationListener>);
    manager.deregister_listener(id);
    request(&manager, "consumer-1");
    assert!(recorder.events().is_empty());
}

// ============================================================================
// SECTION: Consumer Negotiation Tests
// ============================================================================

#[test]
fn consumer_negotiation_follows_provider_messages() {
    let manager = TckConsumerNegotiationManager::new();
    let recorder = Arc::new(Recorder::default());
    manager.register_listener(Arc::clone(&recorder) as Arc<dyn NegotiationListener>);

    let negotiation = manager.create_negotiation("ACN0101", "CD123:ACN0101:456", None).unwrap();
    let cid = negotiation.id().to_string();
    manager.contract_requested(&cid, "provider-1").unwrap();
    let offer = negotiation::create_offer(
        "provider-1",
        &cid,
        "CD123:ACN0101:456",
        "PROVIDER",
        "TCK",
        "ACN0101",
    );
    manager.handle_offer(&expand(&offer)).unwrap();
    manager.accepted(&cid).unwrap();
    let agreement = negotiation::create_agreement(
        "provider-1",
        &cid,
        "agreement-1",
        "PROVIDER",
        "TCK",
        "ACN0101",
        "http://localhost:8083",
    );
    manager.handle_agreement(&expand(&agreement)).unwrap();
    manager.verified(&cid).unwrap();
    let finalized = negotiation::create_finalized_event("provider-1", &cid);
    manager.handle_finalized(&expand(&finalized)).unwrap();

    assert_eq!(negotiation.state(), NegotiationState::Finalized);
    assert_eq!(negotiation.provider_pid(), "provider-1");
    assert!(negotiation.agreement().is_some());
    assert_eq!(
        recorder.events(),
        vec!["created", "requested", "offered", "accepted", "agreed", "verified", "finalized"]
    );
}

#[test]
fn contract_requested_only_advances_from_initialized() {
    let manager = TckConsumerNegotiationManager::new();
    let recorder = Arc::new(Recorder::default());
    manager.register_listener(Arc::clone(&recorder) as Arc<dyn NegotiationListener>);
    let negotiation = manager.create_negotiation("ACN0101", "o1", None).unwrap();

    manager.contract_requested(negotiation.id(), "provider-1").unwrap();
    manager.contract_requested(negotiation.id(), "provider-1").unwrap();

    assert_eq!(negotiation.state(), NegotiationState::Requested);
    assert_eq!(recorder.events(), vec!["created", "requested"]);
}

#[test]
fn unsolicited_offer_sets_correlation_id() {
    let manager = TckConsumerNegotiationManager::new();
    let negotiation = manager.create_negotiation("ACN0101", "o1", None).unwrap();
    let offer = negotiation::create_offer(
        "provider-9",
        negotiation.id(),
        "o1",
        "PROVIDER",
        "TCK",
        "ACN0101",
    );
    manager.handle_offer(&expand(&offer)).unwrap();
    assert_eq!(negotiation.correlation_id().as_deref(), Some("provider-9"));
    assert_eq!(negotiation.state(), NegotiationState::Offered);
}

#[test]
fn unknown_consumer_negotiation_is_not_found() {
    let manager = TckConsumerNegotiationManager::new();
    assert_eq!(
        manager.contract_requested("missing", "provider-1").unwrap_err(),
        NegotiationError::NotFound("missing".to_string())
    );
}

// ============================================================================
// SECTION: Transfer Tests
// ============================================================================

#[test]
fn transfer_request_is_idempotent_by_consumer_pid() {
    let manager = TckTransferProcessManager::new(ParticipantRole::Provider);
    let message = transfer::create_transfer_request(
        "c1",
        "a1",
        "HttpData-PULL",
        None,
        "http://localhost:8083",
    );
    let expanded = expand(&message);

    let first = manager.handle_transfer_request(&expanded, "CONSUMER").unwrap();
    let second = manager.handle_transfer_request(&expanded, "CONSUMER").unwrap();

    assert_eq!(first, second);
    assert_eq!(text(&first, DSPACE_PROPERTY_STATE), "REQUESTED");
    let process = manager.find_by_correlation_id("c1").unwrap();
    assert_eq!(process.agreement_id(), "a1");
    assert_eq!(process.format(), "HttpData-PULL");
    assert_eq!(process.callback_address(), Some("http://localhost:8083"));
}

#[test]
fn consumer_transfer_starts_with_data_address() {
    let manager = TckTransferProcessManager::new(ParticipantRole::Consumer);
    let process = manager.create_transfer_process("a1", "HttpData-PULL", None);
    manager.transfer_requested(process.id(), "p1").unwrap();

    let start = transfer::create_start_request("p1", process.id(), Some(transfer::data_address()));
    let response = manager.handle_start(&expand(&start), &|address| address.is_some()).unwrap();

    assert_eq!(text(&response, DSPACE_PROPERTY_STATE), "STARTED");
    let address = process.data_address().unwrap();
    assert_eq!(address.endpoint, transfer::SAMPLE_ENDPOINT);
    assert_eq!(address.endpoint_type, transfer::HTTP_ENDPOINT_TYPE);
}

#[test]
fn rejected_data_address_keeps_process_requested() {
    let manager = TckTransferProcessManager::new(ParticipantRole::Consumer);
    let process = manager.create_transfer_process("a1", "HttpData-PULL", None);
    manager.transfer_requested(process.id(), "p1").unwrap();

    let start = transfer::create_start_request("p1", process.id(), None);
    let error = manager.handle_start(&expand(&start), &|address| address.is_some()).unwrap_err();

    assert_eq!(error, TransferError::DataAddressRejected);
    assert_eq!(process.state(), TransferState::Requested);
}

#[test]
fn provider_transfer_completes_after_start() {
    let manager = TckTransferProcessManager::new(ParticipantRole::Provider);
    let message = transfer::create_transfer_request(
        "c1",
        "a1",
        "HttpData-PULL",
        None,
        "http://localhost:8083",
    );
    manager.handle_transfer_request(&expand(&message), "CONSUMER").unwrap();
    let process = manager.find_by_correlation_id("c1").unwrap();

    manager.started(process.id()).unwrap();
    let completion = transfer::create_completion(process.id(), "c1");
    let response = manager.handle_completion(&expand(&completion)).unwrap();

    assert_eq!(text(&response, DSPACE_PROPERTY_STATE), "COMPLETED");
    let suspension = transfer::create_suspension(process.id(), "c1", "1", &[]);
    assert!(manager.handle_suspension(&expand(&suspension)).is_err());
}

// ============================================================================
// SECTION: Catalog and Metadata Tests
// ============================================================================

#[test]
fn catalog_manager_serves_added_datasets() {
    let manager = TckCatalogManager::new();
    manager.add_dataset(create_dataset("ds-1"));
    assert!(manager.dataset("ds-1").is_some());
    assert!(manager.dataset("ds-2").is_none());
    assert_eq!(manager.catalog().datasets().len(), 1);
}

#[test]
fn connector_managers_are_shared_and_metadata_lists_version() {
    let connector = TckConnector::new();
    let negotiation =
        connector.consumer_negotiation_manager().create_negotiation("d1", "o1", None).unwrap();
    assert!(connector.consumer_negotiation_manager().find_by_id(negotiation.id()).is_ok());
    assert!(connector.provider_negotiation_manager().negotiations().is_empty());

    let metadata = connector.metadata();
    assert_eq!(metadata["protocolVersions"][0]["version"], PROTOCOL_VERSION);
}
