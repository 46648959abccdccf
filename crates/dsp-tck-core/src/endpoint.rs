// crates/dsp-tck-core/src/endpoint.rs
// ============================================================================
// Module: Callback Endpoint
// Description: Path-routed registry of protocol handlers.
// Purpose: Receive messages sent by the connector under test to the TCK.
// Dependencies: regex, thiserror, tracing
// ============================================================================

//! ## Overview
//! [`CallbackEndpoint`] maps request paths to [`ProtocolHandler`]s. Paths are
//! registered as regular expressions (`/negotiations/[^/]+/termination`) and
//! matched against the full request path, so a scenario can expect a message
//! for a negotiation whose id it does not yet know.
//! Invariants:
//! - Registered paths always start with `/` and never end with `/`.
//! - Request paths have trailing `/` stripped before matching.
//! - A pattern matches only when it covers the whole path.
//! - Handlers run outside the registry lock, so a handler may deregister itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use regex::Regex;
use thiserror::Error;
use tracing::debug;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Request headers keyed by lower-case name.
pub type RequestHeaders = BTreeMap<String, Vec<String>>;

/// Response produced by a protocol handler.
///
/// # Invariants
/// - `code` is an HTTP status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerResponse {
    /// HTTP status code.
    pub code: u16,
    /// Optional response body.
    pub body: Option<String>,
    /// Response headers.
    pub headers: BTreeMap<String, String>,
}

impl HandlerResponse {
    /// Creates a response with a status code and optional body.
    #[must_use]
    pub const fn new(code: u16, body: Option<String>) -> Self {
        Self {
            code,
            body,
            headers: BTreeMap::new(),
        }
    }

    /// Creates an empty 200 response.
    #[must_use]
    pub const fn ok() -> Self {
        Self::new(200, None)
    }

    /// Creates an empty 404 response.
    #[must_use]
    pub const fn not_found() -> Self {
        Self::new(404, None)
    }
}

/// Handles protocol requests routed to a callback path.
pub trait ProtocolHandler: Send + Sync {
    /// Processes a request body and produces a response.
    fn apply(&self, headers: &RequestHeaders, body: &[u8]) -> HandlerResponse;
}

/// Endpoint registration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EndpointError {
    /// Path is not a valid regular expression.
    #[error("invalid handler path {path}: {message}")]
    InvalidPath {
        /// Normalised path.
        path: String,
        /// Regex compiler message.
        message: String,
    },
    /// Registry lock was poisoned.
    #[error("callback endpoint lock poisoned")]
    LockPoisoned,
}

// ============================================================================
// SECTION: Delegating Handler
// ============================================================================

/// Wraps a function as a handler: `Ok` maps to 200, `Err` to 400.
pub struct DelegatingHandler<F> {
    /// Wrapped function.
    function: F,
}

impl<F> DelegatingHandler<F>
where
    F: Fn(&[u8]) -> Result<Option<String>, String> + Send + Sync,
{
    /// Creates a delegating handler around `function`.
    pub const fn new(function: F) -> Self {
        Self {
            function,
        }
    }
}

impl<F> ProtocolHandler for DelegatingHandler<F>
where
    F: Fn(&[u8]) -> Result<Option<String>, String> + Send + Sync,
{
    fn apply(&self, _headers: &RequestHeaders, body: &[u8]) -> HandlerResponse {
        match (self.function)(body) {
            Ok(response) => HandlerResponse::new(200, response),
            Err(message) => {
                debug!(error = %message, "callback handler rejected request");
                HandlerResponse::new(400, Some(message))
            }
        }
    }
}

// ============================================================================
// SECTION: Callback Endpoint
// ============================================================================

/// Registered handler entry.
struct RegisteredHandler {
    /// Normalised path used for registration.
    path: String,
    /// Anchored pattern compiled from the path.
    pattern: Regex,
    /// Handler invoked on match.
    handler: Arc<dyn ProtocolHandler>,
}

/// Callback endpoint receiving messages from the connector under test.
///
/// # Invariants
/// - At most one handler is registered per normalised path.
/// - Lookup returns the earliest registered matching handler.
pub struct CallbackEndpoint {
    /// Externally reachable base address, without trailing `/`.
    address: String,
    /// Registered handlers in registration order.
    handlers: RwLock<Vec<RegisteredHandler>>,
}

impl CallbackEndpoint {
    /// Creates an endpoint advertised at `address`.
    #[must_use]
    pub fn new(address: &str) -> Self {
        Self {
            address: address.trim_end_matches('/').to_string(),
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Returns the address the connector under test should call.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Registers a function handler for a path pattern.
    ///
    /// # Errors
    /// Returns [`EndpointError`] when the path is not a valid pattern.
    pub fn register_handler<F>(&self, path: &str, function: F) -> Result<(), EndpointError>
    where
        F: Fn(&[u8]) -> Result<Option<String>, String> + Send + Sync + 'static,
    {
        self.register_protocol_handler(path, Arc::new(DelegatingHandler::new(function)))
    }

    /// Registers a protocol handler for a path pattern, replacing any handler
    /// registered for the same path.
    ///
    /// # Errors
    /// Returns [`EndpointError`] when the path is not a valid pattern.
    pub fn register_protocol_handler(
        &self,
        path: &str,
        handler: Arc<dyn ProtocolHandler>,
    ) -> Result<(), EndpointError> {
        let path = normalize_path(path);
        let pattern = Regex::new(&format!("^(?:{path})$")).map_err(|err| {
            EndpointError::InvalidPath {
                path: path.clone(),
                message: err.to_string(),
            }
        })?;
        let mut handlers = self.handlers.write().map_err(|_| EndpointError::LockPoisoned)?;
        handlers.retain(|entry| entry.path != path);
        debug!(path = %path, "registered callback handler");
        handlers.push(RegisteredHandler {
            path,
            pattern,
            handler,
        });
        drop(handlers);
        Ok(())
    }

    /// Removes the handler registered for a path pattern.
    pub fn deregister_handler(&self, path: &str) {
        let path = normalize_path(path);
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        handlers.retain(|entry| entry.path != path);
    }

    /// Removes every registered handler.
    pub fn clear_handlers(&self) {
        self.handlers.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Returns true when a handler matches the request path.
    #[must_use]
    pub fn handles_path(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    /// Dispatches a request to the matching handler; 404 when none matches.
    #[must_use]
    pub fn dispatch(&self, path: &str, headers: &RequestHeaders, body: &[u8]) -> HandlerResponse {
        match self.lookup(path) {
            Some(handler) => handler.apply(headers, body),
            None => {
                debug!(path = %path, "no callback handler registered");
                HandlerResponse::not_found()
            }
        }
    }

    /// Finds the handler for a request path.
    fn lookup(&self, path: &str) -> Option<Arc<dyn ProtocolHandler>> {
        let stripped = path.strip_suffix('/').unwrap_or(path);
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        handlers
            .iter()
            .find(|entry| entry.pattern.is_match(stripped))
            .map(|entry| Arc::clone(&entry.handler))
    }
}

/// Adds a leading `/` and strips a trailing `/`.
fn normalize_path(path: &str) -> String {
    let path = path.strip_suffix('/').unwrap_or(path);
    if path.starts_with('/') { path.to_string() } else { format!("/{path}") }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
