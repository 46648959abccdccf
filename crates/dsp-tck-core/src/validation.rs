// crates/dsp-tck-core/src/validation.rs
// ============================================================================
// Module: Message Validation
// Description: JSON schema validation of compact protocol messages.
// Purpose: Reject malformed messages before they are processed or sent.
// Dependencies: jsonschema, serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`SchemaValidator`] compiles one of the bundled Dataspace Protocol message
//! schemas and reports every violation of a compact message. Schemas are
//! addressed by their path below `https://w3id.org/dspace/2025/1`, for example
//! `/negotiation/contract-request-message-schema.json`.
//! Invariants:
//! - Schemas are embedded; nothing is fetched at runtime.
//! - Validation never fails early: all violations are reported.

// ============================================================================
// SECTION: Imports
// ============================================================================

use jsonschema::Draft;
use jsonschema::Validator;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Schema Catalog
// ============================================================================

/// Base IRI the bundled schemas are published under.
pub const DSP_SCHEMA_BASE: &str = "https://w3id.org/dspace/2025/1";

/// Bundled schemas keyed by path below [`DSP_SCHEMA_BASE`].
const SCHEMAS: &[(&str, &str)] = &[
    (
        "/negotiation/contract-request-message-schema.json",
        include_str!("../resources/schemas/negotiation/contract-request-message-schema.json"),
    ),
    (
        "/negotiation/contract-offer-message-schema.json",
        include_str!("../resources/schemas/negotiation/contract-offer-message-schema.json"),
    ),
    (
        "/negotiation/contract-agreement-message-schema.json",
        include_str!("../resources/schemas/negotiation/contract-agreement-message-schema.json"),
    ),
    (
        "/negotiation/contract-agreement-verification-message-schema.json",
        include_str!(
            "../resources/schemas/negotiation/contract-agreement-verification-message-schema.json"
        ),
    ),
    (
        "/negotiation/contract-negotiation-event-message-schema.json",
        include_str!(
            "../resources/schemas/negotiation/contract-negotiation-event-message-schema.json"
        ),
    ),
    (
        "/negotiation/contract-negotiation-termination-message-schema.json",
        include_str!(
            "../resources/schemas/negotiation/contract-negotiation-termination-message-schema.json"
        ),
    ),
    (
        "/negotiation/contract-negotiation-schema.json",
        include_str!("../resources/schemas/negotiation/contract-negotiation-schema.json"),
    ),
    (
        "/negotiation/contract-negotiation-error-schema.json",
        include_str!("../resources/schemas/negotiation/contract-negotiation-error-schema.json"),
    ),
    (
        "/catalog/catalog-request-message-schema.json",
        include_str!("../resources/schemas/catalog/catalog-request-message-schema.json"),
    ),
    (
        "/catalog/dataset-request-message-schema.json",
        include_str!("../resources/schemas/catalog/dataset-request-message-schema.json"),
    ),
    (
        "/catalog/catalog-schema.json",
        include_str!("../resources/schemas/catalog/catalog-schema.json"),
    ),
    (
        "/catalog/dataset-schema.json",
        include_str!("../resources/schemas/catalog/dataset-schema.json"),
    ),
    (
        "/catalog/catalog-error-schema.json",
        include_str!("../resources/schemas/catalog/catalog-error-schema.json"),
    ),
    (
        "/transfer/transfer-request-message-schema.json",
        include_str!("../resources/schemas/transfer/transfer-request-message-schema.json"),
    ),
    (
        "/transfer/transfer-start-message-schema.json",
        include_str!("../resources/schemas/transfer/transfer-start-message-schema.json"),
    ),
    (
        "/transfer/transfer-completion-message-schema.json",
        include_str!("../resources/schemas/transfer/transfer-completion-message-schema.json"),
    ),
    (
        "/transfer/transfer-suspension-message-schema.json",
        include_str!("../resources/schemas/transfer/transfer-suspension-message-schema.json"),
    ),
    (
        "/transfer/transfer-termination-message-schema.json",
        include_str!("../resources/schemas/transfer/transfer-termination-message-schema.json"),
    ),
    (
        "/transfer/transfer-process-schema.json",
        include_str!("../resources/schemas/transfer/transfer-process-schema.json"),
    ),
];

/// Returns the paths of every bundled schema.
pub fn schema_paths() -> impl Iterator<Item = &'static str> {
    SCHEMAS.iter().map(|(path, _)| *path)
}

// ============================================================================
// SECTION: Validators
// ============================================================================

/// Validation setup errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No bundled schema exists for the path.
    #[error("unknown message schema: {0}")]
    UnknownSchema(String),
    /// Schema document failed to parse or compile.
    #[error("invalid message schema {path}: {message}")]
    InvalidSchema {
        /// Schema path.
        path: String,
        /// Compiler message.
        message: String,
    },
}

/// Validates a compact message, returning every violation found.
pub trait MessageValidator: Send + Sync {
    /// Returns violation messages; empty when the message is valid.
    fn validate(&self, message: &Value) -> Vec<String>;
}

/// Validator backed by a compiled JSON schema.
pub struct SchemaValidator {
    /// Compiled draft 2019-09 validator.
    validator: Validator,
}

impl SchemaValidator {
    /// Compiles the bundled schema at `path`.
    ///
    /// # Errors
    /// Returns [`ValidationError`] when the path is unknown or the schema
    /// fails to compile.
    pub fn for_schema(path: &str) -> Result<Self, ValidationError> {
        let text = SCHEMAS
            .iter()
            .find(|(candidate, _)| *candidate == path)
            .map(|(_, text)| *text)
            .ok_or_else(|| ValidationError::UnknownSchema(path.to_string()))?;
        let schema: Value =
            serde_json::from_str(text).map_err(|err| ValidationError::InvalidSchema {
                path: path.to_string(),
                message: err.to_string(),
            })?;
        Self::from_schema(path, &schema)
    }

    /// Compiles an arbitrary schema document.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidSchema`] when compilation fails.
    pub fn from_schema(path: &str, schema: &Value) -> Result<Self, ValidationError> {
        let validator = jsonschema::options()
            .with_draft(Draft::Draft201909)
            .build(schema)
            .map_err(|err| ValidationError::InvalidSchema {
                path: path.to_string(),
                message: err.to_string(),
            })?;
        Ok(Self {
            validator,
        })
    }
}

impl MessageValidator for SchemaValidator {
    fn validate(&self, message: &Value) -> Vec<String> {
        self.validator.iter_errors(message).map(|err| err.to_string()).collect()
    }
}
