// crates/dsp-tck-api/src/result.rs
// ============================================================================
// Module: Protocol Results
// Description: Typed protocol failures and a handler mapping them to HTTP.
// Purpose: Let message handlers fail with a protocol status instead of 400.
// Dependencies: dsp-tck-core, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! [`DspFailure`] pairs an [`ErrorType`] with a message. [`FallibleDspHandler`]
//! runs a handler function and maps its outcome onto an HTTP response.
//! Invariants:
//! - Success always answers 200.
//! - A body that cannot be serialized answers 500.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use dsp_tck_core::HandlerResponse;
use dsp_tck_core::JsonObject;
use dsp_tck_core::MessageError;
use dsp_tck_core::MessageSerializer;
use dsp_tck_core::ProtocolHandler;
use dsp_tck_core::RequestHeaders;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::access::AccessError;
use crate::state::StateError;

// ============================================================================
// SECTION: Failures
// ============================================================================

/// Protocol failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// Referenced process or resource does not exist.
    NotFound,
    /// Caller is not authorized.
    Unauthorized,
    /// Message is malformed or not acceptable in the current state.
    BadRequest,
    /// Unexpected failure.
    GeneralError,
    /// Message conflicts with existing state.
    Conflict,
}

impl ErrorType {
    /// Returns the HTTP status code of the category.
    #[must_use]
    pub const fn status(self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::Unauthorized => 401,
            Self::BadRequest => 400,
            Self::GeneralError => 500,
            Self::Conflict => 409,
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotFound => "NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::BadRequest => "BAD_REQUEST",
            Self::GeneralError => "GENERAL_ERROR",
            Self::Conflict => "CONFLICT",
        })
    }
}

/// Failure of a protocol operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DspFailure {
    /// Failure category.
    pub error_type: ErrorType,
    /// Human-readable description.
    pub message: String,
}

impl DspFailure {
    /// Creates a failure.
    #[must_use]
    pub fn new(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self { error_type, message: message.into() }
    }

    /// Creates a [`ErrorType::BadRequest`] failure.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorType::BadRequest, message)
    }

    /// Creates a [`ErrorType::NotFound`] failure.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorType::NotFound, message)
    }

    /// Renders the failure as `{ "code": <status>, "reason": [<message>] }`.
    #[must_use]
    pub fn to_body(&self) -> JsonObject {
        let mut body = JsonObject::new();
        body.insert("code".to_string(), Value::String(self.error_type.status().to_string()));
        body.insert(
            "reason".to_string(),
            Value::Array(vec![Value::String(self.message.clone())]),
        );
        body
    }
}

impl From<StateError> for DspFailure {
    fn from(error: StateError) -> Self {
        Self::bad_request(error.to_string())
    }
}

impl From<AccessError> for DspFailure {
    fn from(error: AccessError) -> Self {
        Self::bad_request(error.to_string())
    }
}

impl From<MessageError> for DspFailure {
    fn from(error: MessageError) -> Self {
        Self::bad_request(error.to_string())
    }
}

// ============================================================================
// SECTION: Handler
// ============================================================================

/// Handler whose function reports protocol failures.
pub struct FallibleDspHandler<F> {
    /// Wrapped function.
    function: F,
}

impl<F> FallibleDspHandler<F>
where
    F: Fn(&[u8]) -> Result<Option<JsonObject>, DspFailure> + Send + Sync,
{
    /// Creates a handler around `function`.
    pub const fn new(function: F) -> Self {
        Self { function }
    }
}

impl<F> ProtocolHandler for FallibleDspHandler<F>
where
    F: Fn(&[u8]) -> Result<Option<JsonObject>, DspFailure> + Send + Sync,
{
    fn apply(&self, _headers: &RequestHeaders, body: &[u8]) -> HandlerResponse {
        let (code, payload) = match (self.function)(body) {
            Ok(payload) => (200, payload),
            Err(failure) => {
                debug!(
                    error_type = %failure.error_type,
                    error = %failure.message,
                    "handler failed"
                );
                (failure.error_type.status(), Some(failure.to_body()))
            }
        };
        match payload.as_ref().map(MessageSerializer::serialize_plain_json).transpose() {
            Ok(body) => HandlerResponse::new(code, body),
            Err(error) => HandlerResponse::new(500, Some(error.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
