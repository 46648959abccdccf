// crates/dsp-tck-suite/src/actions/tests.rs
// ============================================================================
// Module: Scripted Action Tests
// Description: Unit tests for negotiation and transfer mock actions.
// Purpose: Validate target paths, local state changes and reply checks.
// Dependencies: dsp-tck-api, dsp-tck-core
// ============================================================================

//! ## Overview
//! Actions post to a callback server bound to an ephemeral local port whose
//! handlers capture the received bodies.

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

use dsp_tck_api::ContractNegotiation;
use dsp_tck_api::NegotiationState;
use dsp_tck_api::ParticipantRole;
use dsp_tck_api::TransferProcess;
use dsp_tck_api::TransferState;
use dsp_tck_api::messages::negotiation;
use dsp_tck_api::messages::transfer;
use dsp_tck_core::CallbackServer;
use dsp_tck_core::MessageSerializer;
use dsp_tck_core::TckProperties;
use dsp_tck_core::properties::TCK_HOST;
use dsp_tck_core::properties::TCK_PORT;

use super::ConsumerActions;
use super::ConsumerTransferActions;
use super::ProviderActions;
use super::ProviderTransferActions;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Starts a callback server on an ephemeral port.
fn server() -> CallbackServer {
    let mut properties = TckProperties::new();
    properties.insert(TCK_HOST, "127.0.0.1");
    properties.insert(TCK_PORT, "0");
    CallbackServer::start(&properties).unwrap()
}

/// Registers a handler on `path` that records bodies and answers `reply`.
fn capture(
    server: &CallbackServer,
    path: &str,
    reply: Result<Option<String>, String>,
) -> Arc<Mutex<Vec<String>>> {
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    server
        .endpoint()
        .register_handler(path, move |body| {
            sink.lock().unwrap().push(String::from_utf8_lossy(body).to_string());
            reply.clone()
        })
        .unwrap();
    received
}

/// Creates a serializer without validators.
fn serializer() -> Arc<MessageSerializer> {
    Arc::new(MessageSerializer::new().unwrap())
}

/// Creates a requested provider negotiation calling back to `address`.
fn provider_negotiation(address: &str) -> Arc<ContractNegotiation> {
    Arc::new(
        ContractNegotiation::builder()
            .role(ParticipantRole::Provider)
            .state(NegotiationState::Requested)
            .correlation_id("consumer-1")
            .offer_id("CD123:ACN0101:456")
            .dataset_id("ACN0101")
            .callback_address(address)
            .build()
            .unwrap(),
    )
}

/// Creates an initialized consumer negotiation.
fn consumer_negotiation() -> Arc<ContractNegotiation> {
    Arc::new(
        ContractNegotiation::builder()
            .offer_id("CD123:ACN0101:456")
            .dataset_id("ACN0101")
            .build()
            .unwrap(),
    )
}

/// Creates a requested provider transfer calling back to `address`.
fn provider_transfer(address: &str) -> Arc<TransferProcess> {
    Arc::new(
        TransferProcess::builder()
            .role(ParticipantRole::Provider)
            .state(TransferState::Requested)
            .correlation_id("consumer-1")
            .agreement_id("ATP0101")
            .format("HTTP-PULL")
            .callback_address(address)
            .build(),
    )
}

/// Creates an initialized consumer transfer.
fn consumer_transfer() -> Arc<TransferProcess> {
    Arc::new(
        TransferProcess::builder()
            .role(ParticipantRole::Consumer)
            .agreement_id("ATP0101")
            .format("HTTP-PULL")
            .build(),
    )
}

// ============================================================================
// SECTION: Provider Actions
// ============================================================================

#[test]
fn offer_is_posted_to_consumer_callback() {
    let server = server();
    let received = capture(&server, "/negotiations/consumer-1/offers", Ok(None));
    let negotiation = provider_negotiation(server.endpoint().address());
    let actions = ProviderActions::new(serializer(), "PROVIDER").unwrap();

    actions.post_offer()(&negotiation).unwrap();

    assert_eq!(negotiation.state(), NegotiationState::Offered);
    let bodies = received.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    assert!(bodies[0].contains("ContractOfferMessage"));
    assert!(bodies[0].contains(negotiation.id()));
}

#[test]
fn rejected_termination_fails_the_action() {
    let server = server();
    capture(&server, "/negotiations/consumer-1/termination", Err("rejected".to_string()));
    let negotiation = provider_negotiation(server.endpoint().address());
    let actions = ProviderActions::new(serializer(), "PROVIDER").unwrap();

    let error = actions.post_terminate()(&negotiation).unwrap_err();

    assert!(error.to_string().contains("failed with code 400"));
    assert_eq!(negotiation.state(), NegotiationState::Terminated);
}

#[test]
fn provider_action_requires_callback_address() {
    let negotiation = Arc::new(
        ContractNegotiation::builder()
            .role(ParticipantRole::Provider)
            .state(NegotiationState::Requested)
            .correlation_id("consumer-1")
            .build()
            .unwrap(),
    );
    let actions = ProviderActions::new(serializer(), "PROVIDER").unwrap();

    let error = actions.post_agreed()(&negotiation).unwrap_err();

    assert!(error.to_string().contains("no callback address"));
    assert_eq!(negotiation.state(), NegotiationState::Requested);
}

// ============================================================================
// SECTION: Consumer Actions
// ============================================================================

#[test]
fn request_records_provider_pid() {
    let server = server();
    let response =
        negotiation::create_negotiation_response("provider-1", "consumer-1", "REQUESTED");
    let body = MessageSerializer::serialize_plain_json(&response).unwrap();
    let received = capture(&server, "/negotiations/request", Ok(Some(body)));
    let negotiation = consumer_negotiation();
    let actions = ConsumerActions::new(serializer(), "CONSUMER").unwrap();

    actions.post_request()(server.endpoint().address(), &negotiation).unwrap();

    assert_eq!(negotiation.correlation_id().as_deref(), Some("provider-1"));
    assert_eq!(negotiation.state(), NegotiationState::Requested);
    assert!(received.lock().unwrap()[0].contains("ContractRequestMessage"));
}

#[test]
fn termination_requires_provider_pid() {
    let server = server();
    let negotiation = consumer_negotiation();
    let actions = ConsumerActions::new(serializer(), "CONSUMER").unwrap();

    let error =
        actions.post_terminated()(server.endpoint().address(), &negotiation).unwrap_err();

    assert!(error.to_string().contains("no correlation id"));
    assert_eq!(negotiation.state(), NegotiationState::Initialized);
}

// ============================================================================
// SECTION: Transfer Actions
// ============================================================================

#[test]
fn transfer_start_is_posted_to_consumer_callback() {
    let server = server();
    let received = capture(&server, "/transfers/consumer-1/start", Ok(None));
    let process = provider_transfer(server.endpoint().address());
    let actions = ProviderTransferActions::new(serializer()).unwrap();

    actions.post_start()(&process).unwrap();

    assert_eq!(process.state(), TransferState::Started);
    let bodies = received.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    assert!(bodies[0].contains("TransferStartMessage"));
    assert!(bodies[0].contains(process.id()));
}

#[test]
fn provider_sequence_stops_at_first_rejection() {
    let server = server();
    capture(&server, "/transfers/consumer-1/start", Err("rejected".to_string()));
    let completions = capture(&server, "/transfers/consumer-1/completion", Ok(None));
    let process = provider_transfer(server.endpoint().address());
    let actions = ProviderTransferActions::new(serializer()).unwrap();

    let sequence =
        ProviderTransferActions::sequence(vec![actions.post_start(), actions.post_complete()]);
    let error = sequence(&process).unwrap_err();

    assert!(error.to_string().contains("failed with code 400"));
    assert_eq!(process.state(), TransferState::Started);
    assert!(completions.lock().unwrap().is_empty());
}

#[test]
fn transfer_action_requires_callback_address() {
    let process = Arc::new(
        TransferProcess::builder()
            .role(ParticipantRole::Provider)
            .state(TransferState::Requested)
            .correlation_id("consumer-1")
            .build(),
    );
    let actions = ProviderTransferActions::new(serializer()).unwrap();

    let error = actions.post_terminate()(&process).unwrap_err();

    assert!(error.to_string().contains("no callback address"));
    assert_eq!(process.state(), TransferState::Requested);
}

#[test]
fn transfer_request_records_provider_pid() {
    let server = server();
    let response = transfer::create_transfer_response("provider-1", "consumer-1", "REQUESTED");
    let body = MessageSerializer::serialize_plain_json(&response).unwrap();
    let received = capture(&server, "/transfers/request", Ok(Some(body)));
    let process = consumer_transfer();
    let actions = ConsumerTransferActions::new(serializer()).unwrap();

    actions.post_transfer_request()(server.endpoint().address(), &process).unwrap();

    assert_eq!(process.correlation_id().as_deref(), Some("provider-1"));
    assert_eq!(process.state(), TransferState::Requested);
    let bodies = received.lock().unwrap();
    assert!(bodies[0].contains("TransferRequestMessage"));
    assert!(bodies[0].contains("ATP0101"));
}

#[test]
fn consumer_suspension_is_posted_to_provider_pid() {
    let server = server();
    let received = capture(&server, "/transfers/provider-1/suspension", Ok(None));
    let process = Arc::new(
        TransferProcess::builder()
            .role(ParticipantRole::Consumer)
            .state(TransferState::Started)
            .correlation_id("provider-1")
            .build(),
    );
    let actions = ConsumerTransferActions::new(serializer()).unwrap();

    actions.post_suspend()(server.endpoint().address(), &process).unwrap();

    assert_eq!(process.state(), TransferState::Suspended);
    assert!(received.lock().unwrap()[0].contains("TransferSuspensionMessage"));
}

#[test]
fn transfer_termination_requires_provider_pid() {
    let server = server();
    let process = consumer_transfer();
    let actions = ConsumerTransferActions::new(serializer()).unwrap();

    let error = actions.post_terminate()(server.endpoint().address(), &process).unwrap_err();

    assert!(error.to_string().contains("no correlation id"));
    assert_eq!(process.state(), TransferState::Initialized);
}
