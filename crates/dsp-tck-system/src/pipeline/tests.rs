// crates/dsp-tck-system/src/pipeline/tests.rs
// ============================================================================
// Module: Pipeline Tests
// Description: Unit tests for staged negotiation and transfer pipelines.
// Purpose: Validate state checks, waits, handler cleanup and a local exchange.
// Dependencies: dsp-tck-api, dsp-tck-core
// ============================================================================

//! ## Overview
//! Exchanges run against in-process connectors; messages the connector
//! under test sends back are dispatched straight into the callback endpoint.

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
use std::thread;
use std::time::Duration;

use dsp_tck_api::Connector;
use dsp_tck_api::ConsumerTransferProcessMock;
use dsp_tck_api::ContractNegotiation;
use dsp_tck_api::DataAddress;
use dsp_tck_api::NegotiationError;
use dsp_tck_api::NegotiationMock;
use dsp_tck_api::NegotiationState;
use dsp_tck_api::ProviderNegotiationMock;
use dsp_tck_api::ProviderTransferProcessMock;
use dsp_tck_api::TransferProcess;
use dsp_tck_api::TransferProcessMock;
use dsp_tck_api::TransferState;
use dsp_tck_api::access::string_id_property;
use dsp_tck_api::constants::DSPACE_PROPERTY_PROVIDER_PID_EXPANDED;
use dsp_tck_api::constants::TCK_PARTICIPANT_ID;
use dsp_tck_api::messages::negotiation;
use dsp_tck_api::messages::transfer;
use dsp_tck_core::CallbackEndpoint;
use dsp_tck_core::MessageSerializer;
use dsp_tck_core::RequestHeaders;

use super::ConsumerTransferProcessPipeline;
use super::PipelineCore;
use super::PipelineError;
use super::ProviderNegotiationPipeline;
use super::ProviderTransferProcessPipeline;
use super::check_state;
use crate::client::LocalConsumerTransferProcessClient;
use crate::client::LocalProviderNegotiationClient;
use crate::client::LocalProviderTransferProcessClient;
use crate::connector::TckConnector;
use crate::mock::ActionExecutor;
use crate::mock::LocalConsumerTransferProcessMock;
use crate::mock::LocalProviderNegotiationMock;
use crate::mock::LocalProviderTransferProcessMock;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Short wait keeping timeout tests fast.
const SHORT_WAIT: Duration = Duration::from_millis(300);

/// Creates an endpoint and a serializer.
fn services() -> (Arc<CallbackEndpoint>, Arc<MessageSerializer>) {
    let endpoint = Arc::new(CallbackEndpoint::new("http://localhost:8083"));
    (endpoint, Arc::new(MessageSerializer::new().unwrap()))
}

// ============================================================================
// SECTION: State Checks
// ============================================================================

#[test]
fn check_state_compares_namespaced_state() {
    let (_, serializer) = services();
    let response = negotiation::create_negotiation_response("p1", "c1", "OFFERED");
    let expanded = serializer.process_json_ld(&response).unwrap();

    check_state(&expanded, NegotiationState::Offered).unwrap();
    let error = check_state(&expanded, NegotiationState::Agreed).unwrap_err();

    assert!(matches!(
        error,
        PipelineError::UnexpectedState { ref expected, ref actual }
            if expected.ends_with("AGREED") && actual.ends_with("OFFERED")
    ));
}

// ============================================================================
// SECTION: Waits and Handlers
// ============================================================================

#[test]
fn wait_times_out_without_expected_message() {
    let (endpoint, serializer) = services();
    let mut core: PipelineCore<ContractNegotiation> =
        PipelineCore::new(Arc::clone(&endpoint), serializer, SHORT_WAIT);
    core.expect("/negotiations/[^/]+/offers", |_| Ok::<_, NegotiationError>(None));
    core.then_wait_for_state(NegotiationState::Offered);

    let error = core.execute().unwrap_err();

    assert!(matches!(error, PipelineError::Timeout(ref what) if what.contains("OFFERED")));
    assert!(!endpoint.handles_path("/negotiations/c1/offers"));
}

#[test]
fn stage_without_negotiation_fails() {
    let (endpoint, serializer) = services();
    let mut core: PipelineCore<ContractNegotiation> =
        PipelineCore::new(endpoint, serializer, SHORT_WAIT);
    let slot = core.process.clone();
    core.stage(move || slot.require().map(|_| ()));

    let error = core.execute().unwrap_err();
    assert!(matches!(error, PipelineError::NoProcess("contract negotiation")));
    assert_eq!(error.to_string(), "No contract negotiation recorded");
}

#[test]
fn stage_without_transfer_process_names_the_kind() {
    let (endpoint, serializer) = services();
    let mut core: PipelineCore<TransferProcess> =
        PipelineCore::new(endpoint, serializer, SHORT_WAIT);
    let slot = core.process.clone();
    core.stage(move || slot.require().map(|_| ()));

    assert_eq!(core.execute().unwrap_err().to_string(), "No transfer process recorded");
}

#[test]
fn expect_handler_fires_once() {
    let (endpoint, serializer) = services();
    let mut core: PipelineCore<ContractNegotiation> =
        PipelineCore::new(Arc::clone(&endpoint), Arc::clone(&serializer), SHORT_WAIT);
    core.expect("/negotiations/[^/]+/events", |_| Ok::<_, NegotiationError>(None));
    let dispatcher = Arc::clone(&endpoint);
    core.stage(move || {
        let event = negotiation::create_finalized_event("p1", "c1");
        let body = serializer.serialize(&event).unwrap();
        let path = "/negotiations/c1/events";
        let first = dispatcher.dispatch(path, &RequestHeaders::new(), body.as_bytes());
        let second = dispatcher.dispatch(path, &RequestHeaders::new(), body.as_bytes());
        assert_eq!(first.code, 200);
        assert_eq!(second.code, 404);
        Ok(())
    });

    core.execute().unwrap();
}

// ============================================================================
// SECTION: Local Exchange
// ============================================================================

#[test]
fn provider_pipeline_receives_offer_from_local_provider() {
    let (endpoint, serializer) = services();
    let provider = Arc::new(TckConnector::new());
    let consumer = Arc::new(TckConnector::new());
    let executor = Arc::new(ActionExecutor::new(2).unwrap());
    let mock = LocalProviderNegotiationMock::new(
        provider.provider_negotiation_manager(),
        Arc::clone(&executor),
    );

    let provider_manager = provider.provider_negotiation_manager();
    let dispatcher = Arc::clone(&endpoint);
    let action_serializer = Arc::clone(&serializer);
    mock.record_contract_requested_action(Box::new(move |requested| {
        thread::sleep(Duration::from_millis(200));
        provider_manager.offered(requested.id())?;
        let consumer_pid = requested.correlation_id().unwrap_or_default();
        let offer = negotiation::create_offer(
            requested.id(),
            &consumer_pid,
            requested.offer_id(),
            "PROVIDER",
            TCK_PARTICIPANT_ID,
            requested.dataset_id(),
        );
        let body = action_serializer.serialize(&offer)?;
        let path = format!("/negotiations/{consumer_pid}/offers");
        let response = dispatcher.dispatch(&path, &RequestHeaders::new(), body.as_bytes());
        if response.code == 200 {
            Ok(())
        } else {
            Err(format!("offer rejected: {}", response.code).into())
        }
    }));

    let client = Arc::new(LocalProviderNegotiationClient::new(
        Arc::clone(&provider) as Arc<dyn Connector>,
        Arc::clone(&serializer),
    ));
    let consumer_manager = consumer.consumer_negotiation_manager();
    let handler_manager = consumer.consumer_negotiation_manager();
    let wait = Duration::from_secs(5);
    let pipeline = ProviderNegotiationPipeline::new(
        client,
        consumer_manager,
        endpoint,
        serializer,
        "PROVIDER",
        wait,
    );
    pipeline
        .send_request_message("ACN0101", "CD123:ACN0101:456")
        .expect_offer_message(move |offer| handler_manager.handle_offer(offer))
        .then_wait_for_state(NegotiationState::Offered)
        .then_verify_provider_state(NegotiationState::Offered)
        .execute()
        .unwrap();

    executor.shutdown();
    mock.verify().unwrap();
}

// ============================================================================
// SECTION: Local Transfers
// ============================================================================

#[test]
fn provider_transfer_pipeline_follows_start_and_termination() {
    let (endpoint, serializer) = services();
    let provider = Arc::new(TckConnector::new());
    let consumer = Arc::new(TckConnector::new());
    let executor = Arc::new(ActionExecutor::new(2).unwrap());
    let mock = LocalProviderTransferProcessMock::new(
        provider.provider_transfer_manager(),
        Arc::clone(&executor),
    );

    let dispatcher = Arc::clone(&endpoint);
    let action_serializer = Arc::clone(&serializer);
    mock.record_transfer_requested_action(Box::new(move |requested| {
        thread::sleep(Duration::from_millis(200));
        requested.transition(TransferState::Started)?;
        let consumer_pid = requested.consumer_pid();
        let start = transfer::create_start_request(&requested.provider_pid(), &consumer_pid, None);
        let body = action_serializer.serialize(&start)?;
        let path = format!("/transfers/{consumer_pid}/start");
        let response = dispatcher.dispatch(&path, &RequestHeaders::new(), body.as_bytes());
        if response.code == 200 {
            Ok(())
        } else {
            Err(format!("start rejected: {}", response.code).into())
        }
    }));

    let client = Arc::new(LocalProviderTransferProcessClient::new(
        Arc::clone(&provider) as Arc<dyn Connector>,
        Arc::clone(&serializer),
    ));
    let handler_manager = consumer.consumer_transfer_manager();
    let pipeline = ProviderTransferProcessPipeline::new(
        client,
        consumer.consumer_transfer_manager(),
        endpoint,
        serializer,
        "PROVIDER",
        Duration::from_secs(5),
    );
    pipeline
        .expect_start_message(move |start| {
            handler_manager.handle_start(start, &|_: Option<&DataAddress>| true)
        })
        .send_transfer_request("agreement-1", "HTTP-PULL", None)
        .then_wait_for_state(TransferState::Started)
        .then_verify_provider_state(TransferState::Started)
        .send_started(true)
        .then_verify_provider_state(TransferState::Started)
        .send_termination(false)
        .then_wait_for_state(TransferState::Terminated)
        .then_verify_provider_state(TransferState::Terminated)
        .execute()
        .unwrap();

    executor.shutdown();
    mock.verify().unwrap();
}

#[test]
fn consumer_transfer_pipeline_tracks_requested_process() {
    let (endpoint, serializer) = services();
    let consumer = Arc::new(TckConnector::new());
    let provider = Arc::new(TckConnector::new());
    let executor = Arc::new(ActionExecutor::new(2).unwrap());
    let mock = LocalConsumerTransferProcessMock::new(
        consumer.consumer_transfer_manager(),
        Arc::clone(&executor),
        endpoint.address(),
    );

    let dispatcher = Arc::clone(&endpoint);
    let action_serializer = Arc::clone(&serializer);
    mock.record_initialized_action(Box::new(move |address, initialized| {
        let request = transfer::create_transfer_request(
            initialized.id(),
            initialized.agreement_id(),
            initialized.format(),
            None,
            address,
        );
        let body = action_serializer.serialize(&request)?;
        let headers = RequestHeaders::new();
        let response = dispatcher.dispatch("/transfers/request", &headers, body.as_bytes());
        let reply = response.body.ok_or("transfer request rejected")?;
        let expanded = action_serializer.process_json_ld_bytes(reply.as_bytes())?;
        let provider_pid = string_id_property(DSPACE_PROPERTY_PROVIDER_PID_EXPANDED, &expanded)?;
        initialized.set_correlation_id(&provider_pid);
        initialized.transition(TransferState::Requested)?;
        Ok(())
    }));

    let client = Arc::new(LocalConsumerTransferProcessClient::new(
        Arc::clone(&consumer) as Arc<dyn Connector>,
        Arc::clone(&serializer),
    ));
    let handler_manager = provider.provider_transfer_manager();
    let pipeline = ConsumerTransferProcessPipeline::new(
        client,
        provider.provider_transfer_manager(),
        endpoint,
        serializer,
        "CONSUMER",
        Duration::from_secs(5),
    );
    pipeline
        .expect_transfer_request(move |request, counter_party| {
            handler_manager.handle_transfer_request(request, counter_party)
        })
        .initiate_transfer_request("agreement-1", "HTTP-PULL")
        .then_wait_for_state(TransferState::Requested)
        .then_verify_consumer_state(TransferState::Requested)
        .send_started(Some(transfer::data_address()), false)
        .then_wait_for_state(TransferState::Started)
        .then_verify_consumer_state(TransferState::Started)
        .send_completion(false)
        .then_verify_consumer_state(TransferState::Completed)
        .execute()
        .unwrap();

    executor.shutdown();
    mock.verify().unwrap();
}
