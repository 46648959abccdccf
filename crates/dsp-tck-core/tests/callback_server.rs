// crates/dsp-tck-core/tests/callback_server.rs
// ============================================================================
// Module: Callback Server Tests
// Description: End-to-end tests for the HTTP callback server.
// Purpose: Verify requests reach registered handlers over real sockets.
// Dependencies: dsp-tck-core, reqwest
// ============================================================================
//! ## Overview
//! Starts the callback server on an ephemeral port and exercises handler
//! routing, status mapping, and header forwarding over HTTP.

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

use std::sync::Arc;
use std::sync::Mutex;

use dsp_tck_core::CallbackServer;
use dsp_tck_core::HandlerResponse;
use dsp_tck_core::ProtocolHandler;
use dsp_tck_core::RequestHeaders;
use dsp_tck_core::TckProperties;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn ephemeral_properties() -> TckProperties {
    [("dataspacetck.host", "127.0.0.1"), ("dataspacetck.port", "0")].into_iter().collect()
}

/// Handler recording the authorization header it receives.
struct RecordingHandler {
    seen: Arc<Mutex<Vec<String>>>,
}

impl ProtocolHandler for RecordingHandler {
    fn apply(&self, headers: &RequestHeaders, _body: &[u8]) -> HandlerResponse {
        if let Some(values) = headers.get("authorization") {
            self.seen.lock().unwrap().extend(values.iter().cloned());
        }
        HandlerResponse::new(201, Some("{}".to_string()))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn ephemeral_port_derives_callback_address() {
    let server = CallbackServer::start(&ephemeral_properties()).unwrap();
    let port = server.local_addr().port();
    assert_ne!(port, 0);
    assert_eq!(server.endpoint().address(), format!("http://localhost:{port}"));
}

#[test]
fn requests_are_routed_to_handlers() {
    let server = CallbackServer::start(&ephemeral_properties()).unwrap();
    let endpoint = server.endpoint();
    endpoint
        .register_handler("/negotiations/[^/]+/events", |body: &[u8]| {
            Ok(Some(format!("{{\"received\":{}}}", body.len())))
        })
        .unwrap();
    let base = format!("http://127.0.0.1:{}", server.local_addr().port());
    let client = reqwest::blocking::Client::new();

    let ok = client.post(format!("{base}/negotiations/abc/events/")).body("12345").send().unwrap();
    assert_eq!(ok.status().as_u16(), 200);
    assert_eq!(ok.text().unwrap(), "{\"received\":5}");

    let missing = client.post(format!("{base}/negotiations/abc/offers")).send().unwrap();
    assert_eq!(missing.status().as_u16(), 404);
}

#[test]
fn protocol_handlers_receive_headers() {
    let server = CallbackServer::start(&ephemeral_properties()).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    server
        .endpoint()
        .register_protocol_handler("/catalog/request", Arc::new(RecordingHandler {
            seen: Arc::clone(&seen),
        }))
        .unwrap();
    let url = format!("http://127.0.0.1:{}/catalog/request", server.local_addr().port());
    let response = reqwest::blocking::Client::new()
        .post(url)
        .header("Authorization", "secret")
        .send()
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    assert_eq!(seen.lock().unwrap().as_slice(), ["secret".to_string()]);
}

#[test]
fn invalid_port_is_a_config_error() {
    let properties: TckProperties = [("dataspacetck.port", "not-a-port")].into_iter().collect();
    assert!(CallbackServer::start(&properties).is_err());
}
