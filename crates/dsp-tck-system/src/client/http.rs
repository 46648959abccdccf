// crates/dsp-tck-system/src/client/http.rs
// ============================================================================
// Module: HTTP Executor
// Description: Blocking HTTP helpers shared by every HTTP client.
// Purpose: Send JSON bodies, attach authorization, and check status codes.
// Dependencies: dsp-tck-core, reqwest, tracing, url
// ============================================================================

//! ## Overview
//! [`HttpExecutor`] wraps one blocking `reqwest` client. JSON-LD bodies are
//! validated by the shared [`MessageSerializer`] before they are sent.
//! Invariants:
//! - Redirects are not followed.
//! - The authorization header, when configured, is sent on every request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use dsp_tck_core::JsonObject;
use dsp_tck_core::MessageSerializer;
use reqwest::blocking::Client;
use reqwest::blocking::RequestBuilder;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use tracing::debug;
use url::Url;

use super::ClientError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Content type of every request body.
const JSON_CONTENT_TYPE: &str = "application/json";

// ============================================================================
// SECTION: Reply
// ============================================================================

/// Status and body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl HttpReply {
    /// Returns true for 2xx status codes.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, 200..=299)
    }

    /// Checks the status against the error expectation of `operation`.
    ///
    /// # Errors
    /// Returns [`ClientError::Verification`] when an expected error did not
    /// occur or an unexpected one did.
    pub fn check(&self, operation: &str, id: &str, expect_error: bool) -> Result<(), ClientError> {
        if expect_error && self.is_success() {
            return Err(ClientError::Verification(format!(
                "Invalid {operation} did not fail: {id}"
            )));
        }
        if !expect_error && !self.is_success() {
            return Err(ClientError::Verification(format!(
                "Request {operation} failed with code {}: {id}",
                self.status
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Executor
// ============================================================================

/// Blocking HTTP executor with optional authorization.
#[derive(Clone)]
pub struct HttpExecutor {
    /// Underlying client.
    client: Client,
    /// Value of the `Authorization` header.
    authorization: Option<String>,
    /// Serializer validating outgoing JSON-LD.
    serializer: Arc<MessageSerializer>,
}

impl HttpExecutor {
    /// Builds an executor.
    ///
    /// # Errors
    /// Returns [`ClientError::Http`] when the client cannot be constructed.
    pub fn new(
        serializer: Arc<MessageSerializer>,
        authorization: Option<String>,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| ClientError::Http { url: String::new(), message: err.to_string() })?;
        Ok(Self { client, authorization, serializer })
    }

    /// Returns the shared serializer.
    #[must_use]
    pub fn serializer(&self) -> &MessageSerializer {
        &self.serializer
    }

    /// Validates and posts a compact JSON-LD message.
    ///
    /// # Errors
    /// Returns [`ClientError`] when validation or the exchange fails.
    pub fn post_json_ld(&self, url: &str, message: &JsonObject) -> Result<HttpReply, ClientError> {
        let body = self.serializer.serialize(message)?;
        self.post(url, body)
    }

    /// Posts a plain JSON object.
    ///
    /// # Errors
    /// Returns [`ClientError`] when the exchange fails.
    pub fn post_plain_json(
        &self,
        url: &str,
        message: &JsonObject,
    ) -> Result<HttpReply, ClientError> {
        let body = MessageSerializer::serialize_plain_json(message)?;
        self.post(url, body)
    }

    /// Sends a GET request.
    ///
    /// # Errors
    /// Returns [`ClientError::Http`] when the exchange fails.
    pub fn get(&self, url: &str) -> Result<HttpReply, ClientError> {
        debug!(url = %url, "GET");
        self.send(url, self.client.get(url))
    }

    /// Posts a JSON body.
    fn post(&self, url: &str, body: String) -> Result<HttpReply, ClientError> {
        debug!(url = %url, "POST");
        self.send(url, self.client.post(url).header(CONTENT_TYPE, JSON_CONTENT_TYPE).body(body))
    }

    /// Attaches authorization and executes a request.
    fn send(&self, url: &str, request: RequestBuilder) -> Result<HttpReply, ClientError> {
        let request = match &self.authorization {
            Some(value) => request.header(AUTHORIZATION, value.as_str()),
            None => request,
        };
        let http_error = |err: reqwest::Error| ClientError::Http {
            url: url.to_string(),
            message: err.to_string(),
        };
        let response = request.send().map_err(http_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(http_error)?.to_vec();
        debug!(url = %url, status, "received response");
        Ok(HttpReply { status, body })
    }
}

// ============================================================================
// SECTION: URL Helpers
// ============================================================================

/// Parses a base URL and ensures it ends with `/` so relative paths join
/// below it.
pub(crate) fn base_url(raw: &str) -> Result<Url, ClientError> {
    let normalized = if raw.ends_with('/') { raw.to_string() } else { format!("{raw}/") };
    Url::parse(&normalized).map_err(|err| ClientError::InvalidUrl {
        url: raw.to_string(),
        message: err.to_string(),
    })
}

/// Joins a relative path below a base URL.
pub(crate) fn join(base: &Url, path: &str) -> Result<String, ClientError> {
    base.join(path)
        .map(String::from)
        .map_err(|err| ClientError::InvalidUrl {
            url: format!("{base}{path}"),
            message: err.to_string(),
        })
}
