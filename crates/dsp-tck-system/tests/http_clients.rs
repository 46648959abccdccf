// crates/dsp-tck-system/tests/http_clients.rs
// ============================================================================
// Module: HTTP Client Tests
// Description: Exercises the HTTP clients against a stub connector.
// Purpose: Verify request paths, headers, bodies, and status handling.
// Dependencies: dsp-tck-api, dsp-tck-core, dsp-tck-system, tiny_http
// ============================================================================
//! ## Overview
//! A `tiny_http` server on an ephemeral port answers each request with a
//! canned reply and records what it received.

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

use std::io;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;

use dsp_tck_api::access::string_id_property;
use dsp_tck_api::constants::DSPACE_NAMESPACE;
use dsp_tck_api::constants::DSPACE_PROPERTY_STATE_EXPANDED;
use dsp_tck_api::messages::negotiation;
use dsp_tck_api::messages::transfer;
use dsp_tck_core::MessageSerializer;
use dsp_tck_system::client::ClientError;
use dsp_tck_system::client::ConsumerNegotiationClient;
use dsp_tck_system::client::ConsumerTransferProcessClient;
use dsp_tck_system::client::HttpConsumerNegotiationClient;
use dsp_tck_system::client::HttpConsumerTransferProcessClient;
use dsp_tck_system::client::HttpExecutor;
use dsp_tck_system::client::HttpMetadataClient;
use dsp_tck_system::client::HttpProviderNegotiationClient;
use dsp_tck_system::client::HttpProviderTransferProcessClient;
use dsp_tck_system::client::MetadataClient;
use dsp_tck_system::client::ProviderNegotiationClient;
use dsp_tck_system::client::ProviderTransferProcessClient;
use dsp_tck_system::client::TransferProcessClient;
use tiny_http::Response;
use tiny_http::Server;

// ============================================================================
// SECTION: Stub Server
// ============================================================================

/// A request as seen by the stub server.
struct Recorded {
    /// HTTP method.
    method: String,
    /// Request path and query.
    url: String,
    /// `Authorization` header value.
    authorization: Option<String>,
    /// Request body.
    body: String,
}

/// Serves one canned `(status, body)` reply per request, then stops.
fn stub(replies: Vec<(u16, String)>) -> (String, mpsc::Receiver<Recorded>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let port = server.server_addr().to_ip().unwrap().port();
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        for (status, reply) in replies {
            let mut request = server.recv().unwrap();
            let mut body = String::new();
            io::Read::read_to_string(request.as_reader(), &mut body).unwrap();
            let authorization = request
                .headers()
                .iter()
                .find(|header| header.field.equiv("Authorization"))
                .map(|header| header.value.as_str().to_string());
            sender
                .send(Recorded {
                    method: request.method().to_string(),
                    url: request.url().to_string(),
                    authorization,
                    body,
                })
                .unwrap();
            request.respond(Response::from_string(reply).with_status_code(status)).unwrap();
        }
    });
    (format!("http://127.0.0.1:{port}"), receiver)
}

/// Creates an executor sending `Bearer token`.
fn executor() -> HttpExecutor {
    let serializer = Arc::new(MessageSerializer::new().unwrap());
    HttpExecutor::new(serializer, Some("Bearer token".to_string())).unwrap()
}

// ============================================================================
// SECTION: Provider Client
// ============================================================================

#[test]
fn contract_request_posts_below_base_url() {
    let response =
        negotiation::create_negotiation_response("provider-1", "consumer-1", "REQUESTED");
    let (base, received) = stub(vec![(201, serde_json::to_string(&response).unwrap())]);
    let client = HttpProviderNegotiationClient::new(&format!("{base}/dsp"), executor()).unwrap();

    let request =
        negotiation::create_contract_request("consumer-1", None, "o1", "d1", Some("http://tck"));
    let negotiation = client.contract_request(&request, "CONSUMER", false).unwrap().unwrap();

    let state = string_id_property(DSPACE_PROPERTY_STATE_EXPANDED, &negotiation).unwrap();
    assert_eq!(state, format!("{DSPACE_NAMESPACE}REQUESTED"));
    let recorded = received.recv().unwrap();
    assert_eq!(recorded.method, "POST");
    assert_eq!(recorded.url, "/dsp/negotiations/request");
    assert_eq!(recorded.authorization.as_deref(), Some("Bearer token"));
    assert!(recorded.body.contains("ContractRequestMessage"));
}

#[test]
fn unexpected_failure_status_is_reported() {
    let (base, received) = stub(vec![(400, String::new())]);
    let client = HttpProviderNegotiationClient::new(&base, executor()).unwrap();

    let verification = negotiation::create_verification("provider-1", "consumer-1");
    let error = client.verify(&verification, false).unwrap_err();

    assert!(matches!(error, ClientError::Verification(_)));
    assert_eq!(error.to_string(), "Request verify failed with code 400: provider-1");
    assert_eq!(received.recv().unwrap().url, "/negotiations/provider-1/agreement/verification");
}

#[test]
fn expected_failure_status_is_accepted() {
    let (base, received) = stub(vec![(400, String::new())]);
    let client = HttpProviderNegotiationClient::new(&base, executor()).unwrap();

    let termination = negotiation::create_termination("provider-1", "consumer-1", "1", &[]);
    client.terminate("provider-1", &termination, true).unwrap();

    assert_eq!(received.recv().unwrap().url, "/negotiations/provider-1/termination");
}

// ============================================================================
// SECTION: Consumer Client
// ============================================================================

#[test]
fn initiate_request_posts_plain_json() {
    let (base, received) = stub(vec![(200, String::new())]);
    let client = HttpConsumerNegotiationClient::new(
        format!("{base}/initiate"),
        "http://tck:8083",
        executor(),
    );

    client.initiate_request("ACN0101", "CD123:ACN0101:456").unwrap();

    let recorded = received.recv().unwrap();
    assert_eq!(recorded.url, "/initiate");
    let body: serde_json::Value = serde_json::from_str(&recorded.body).unwrap();
    assert_eq!(body["providerId"], "TCK_PARTICIPANT");
    assert_eq!(body["offerId"], "CD123:ACN0101:456");
    assert_eq!(body["datasetId"], "ACN0101");
    assert_eq!(body["connectorAddress"], "http://tck:8083");
}

#[test]
fn offers_are_posted_to_the_callback_address() {
    let (base, received) = stub(vec![(200, String::new())]);
    let client =
        HttpConsumerNegotiationClient::new(format!("{base}/initiate"), "http://tck", executor());

    let offer =
        negotiation::create_offer("provider-1", "consumer-1", "o1", "TCK", "CONSUMER", "d1");
    client.contract_offer("consumer-1", &offer, &format!("{base}/callback/"), false).unwrap();

    let recorded = received.recv().unwrap();
    assert_eq!(recorded.url, "/callback/negotiations/consumer-1/offers");
    assert!(recorded.body.contains("ContractOfferMessage"));
}

// ============================================================================
// SECTION: Transfer Clients
// ============================================================================

#[test]
fn transfer_request_posts_below_base_url() {
    let response = transfer::create_transfer_response("provider-1", "consumer-1", "REQUESTED");
    let (base, received) = stub(vec![(201, serde_json::to_string(&response).unwrap())]);
    let client =
        HttpProviderTransferProcessClient::new(&format!("{base}/dsp"), executor()).unwrap();

    let request =
        transfer::create_transfer_request("consumer-1", "ATP0101", "HTTP-PULL", None, "http://tck");
    let process = client.transfer_request(&request, "CONSUMER", false).unwrap().unwrap();

    let state = string_id_property(DSPACE_PROPERTY_STATE_EXPANDED, &process).unwrap();
    assert_eq!(state, format!("{DSPACE_NAMESPACE}REQUESTED"));
    let recorded = received.recv().unwrap();
    assert_eq!(recorded.method, "POST");
    assert_eq!(recorded.url, "/dsp/transfers/request");
    assert!(recorded.body.contains("TransferRequestMessage"));
}

#[test]
fn rejected_transfer_suspension_is_accepted_when_expected() {
    let (base, received) = stub(vec![(400, String::new()), (200, String::new())]);
    let client = HttpProviderTransferProcessClient::new(&base, executor()).unwrap();

    let suspension = transfer::create_suspension("provider-1", "consumer-1", "1", &[]);
    client.suspend_transfer("provider-1", &suspension, "", true).unwrap();
    let error = client.suspend_transfer("provider-1", &suspension, "", true).unwrap_err();

    assert_eq!(error.to_string(), "Invalid suspension did not fail: provider-1");
    assert_eq!(received.recv().unwrap().url, "/transfers/provider-1/suspension");
}

#[test]
fn initiate_transfer_posts_plain_json() {
    let (base, received) = stub(vec![(200, String::new())]);
    let client = HttpConsumerTransferProcessClient::new(
        format!("{base}/transfers/requests"),
        "http://tck:8083",
        executor(),
    );

    client.initiate_transfer_request("ATP0101", "HTTP-PULL").unwrap();

    let recorded = received.recv().unwrap();
    assert_eq!(recorded.url, "/transfers/requests");
    let body: serde_json::Value = serde_json::from_str(&recorded.body).unwrap();
    assert_eq!(body["providerId"], "TCK_PARTICIPANT");
    assert_eq!(body["agreementId"], "ATP0101");
    assert_eq!(body["format"], "HTTP-PULL");
    assert_eq!(body["connectorAddress"], "http://tck:8083");
}

#[test]
fn transfer_start_is_posted_to_the_callback_address() {
    let (base, received) = stub(vec![(200, String::new())]);
    let client = HttpConsumerTransferProcessClient::new(base.clone(), "http://tck", executor());

    let start = transfer::create_start_request("provider-1", "consumer-1", None);
    client.start_transfer("consumer-1", &start, &format!("{base}/callback/"), false).unwrap();

    let recorded = received.recv().unwrap();
    assert_eq!(recorded.url, "/callback/transfers/consumer-1/start");
    assert!(recorded.body.contains("TransferStartMessage"));
}

// ============================================================================
// SECTION: Metadata Client
// ============================================================================

#[test]
fn metadata_is_fetched_as_plain_json() {
    let document = r#"{"protocolVersions":[{"version":"2025-1","path":"/dsp"}]}"#;
    let (base, received) = stub(vec![(200, document.to_string())]);
    let client = HttpMetadataClient::new(&base, executor());

    let metadata = client.get_metadata().unwrap();

    assert_eq!(metadata["protocolVersions"][0]["version"], "2025-1");
    let recorded = received.recv().unwrap();
    assert_eq!(recorded.method, "GET");
    assert_eq!(recorded.url, "/.well-known/dspace-version");
}
