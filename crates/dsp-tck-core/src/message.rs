// crates/dsp-tck-core/src/message.rs
// ============================================================================
// Module: Message Serializer
// Description: Validation, expansion, and serialization of protocol messages.
// Purpose: Give every client and handler one gate for JSON-LD traffic.
// Dependencies: serde_json, thiserror, tracing, crate::jsonld, crate::validation
// ============================================================================

//! ## Overview
//! [`MessageSerializer`] owns the registered JSON-LD context documents and the
//! validators keyed by compact message `@type`. Incoming messages are validated
//! in compact form and then expanded; outgoing messages are validated and
//! written as compact JSON.
//! Invariants:
//! - The DSP context and ODRL profile context are always registered.
//! - A message whose `@type` has no validator, or that has no `@type`, is not
//!   validated.
//! - Expansion of a message yields exactly one node or an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::jsonld::ContextLoader;
use crate::jsonld::JsonLdError;
use crate::jsonld::JsonObject;
use crate::jsonld::expand;
use crate::properties::TckProperties;
use crate::validation::MessageValidator;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// IRI of the Dataspace Protocol 2025-1 context.
pub const DSP_CONTEXT_IRI: &str = "https://w3id.org/dspace/2025/1/context.jsonld";
/// IRI of the Dataspace Protocol ODRL profile context.
pub const ODRL_PROFILE_CONTEXT_IRI: &str = "https://w3id.org/dspace/2025/1/odrl-profile.jsonld";
/// Property prefix for custom context registrations.
pub const CONTEXT_PROPERTY_PREFIX: &str = "dataspacetck.dsp.jsonld.context.";

/// Bundled DSP context document.
const DSP_CONTEXT_DOCUMENT: &str = include_str!("../resources/context/dspace-context.jsonld");
/// Bundled ODRL profile context document.
const ODRL_PROFILE_DOCUMENT: &str = include_str!("../resources/context/odrl-profile.jsonld");

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Message processing errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MessageError {
    /// Message failed schema validation.
    #[error("Invalid message: [{}]", .0.join(", "))]
    Invalid(Vec<String>),
    /// Message is not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(String),
    /// Expansion failed.
    #[error(transparent)]
    JsonLd(#[from] JsonLdError),
    /// Expansion produced no node.
    #[error("Invalid Json document, expecting a non-empty array")]
    EmptyDocument,
    /// Expanded node is not an object.
    #[error("expanded message is not a JSON object")]
    NotAnObject,
    /// Context document could not be registered.
    #[error("invalid context {uri}: {message}")]
    Context {
        /// Context IRI.
        uri: String,
        /// Failure description.
        message: String,
    },
}

// ============================================================================
// SECTION: Context Registry
// ============================================================================

/// Context documents keyed by IRI.
#[derive(Default)]
struct ContextRegistry {
    /// Registered documents.
    documents: RwLock<BTreeMap<String, Value>>,
}

impl ContextLoader for ContextRegistry {
    fn load(&self, iri: &str) -> Option<Value> {
        self.documents.read().unwrap_or_else(PoisonError::into_inner).get(iri).cloned()
    }
}

// ============================================================================
// SECTION: Message Serializer
// ============================================================================

/// Validates, expands, and serializes protocol messages.
///
/// # Invariants
/// - Validators are looked up by the compact `@type` string.
/// - Registered contexts are immutable once added.
pub struct MessageSerializer {
    /// Context documents available to the expander.
    contexts: ContextRegistry,
    /// Validators keyed by compact message type.
    validators: RwLock<BTreeMap<String, Arc<dyn MessageValidator>>>,
}

impl MessageSerializer {
    /// Creates a serializer with the bundled contexts registered.
    ///
    /// # Errors
    /// Returns [`MessageError::Context`] when a bundled context is malformed.
    pub fn new() -> Result<Self, MessageError> {
        let serializer = Self {
            contexts: ContextRegistry::default(),
            validators: RwLock::new(BTreeMap::new()),
        };
        serializer.register_context_text(DSP_CONTEXT_IRI, DSP_CONTEXT_DOCUMENT)?;
        serializer.register_context_text(ODRL_PROFILE_CONTEXT_IRI, ODRL_PROFILE_DOCUMENT)?;
        Ok(serializer)
    }

    /// Creates a serializer and registers the custom contexts configured via
    /// `dataspacetck.dsp.jsonld.context.<name>.path` and `.uri` pairs.
    ///
    /// # Errors
    /// Returns [`MessageError::Context`] when a configured file is unreadable
    /// or not JSON.
    pub fn from_properties(properties: &TckProperties) -> Result<Self, MessageError> {
        let serializer = Self::new()?;
        let names: BTreeSet<&str> = properties
            .with_prefix(CONTEXT_PROPERTY_PREFIX)
            .filter_map(|(key, _)| key.strip_prefix(CONTEXT_PROPERTY_PREFIX)?.split('.').next())
            .collect();
        for name in names {
            let path = properties.string(&format!("{CONTEXT_PROPERTY_PREFIX}{name}.path"));
            let uri = properties.string(&format!("{CONTEXT_PROPERTY_PREFIX}{name}.uri"));
            let (Some(path), Some(uri)) = (path, uri) else {
                debug!(context = name, "ignoring incomplete context registration");
                continue;
            };
            serializer.register_context_file(uri, Path::new(path))?;
        }
        Ok(serializer)
    }

    /// Registers a context document read from a file.
    ///
    /// # Errors
    /// Returns [`MessageError::Context`] when the file is unreadable or not JSON.
    pub fn register_context_file(&self, uri: &str, path: &Path) -> Result<(), MessageError> {
        let text = fs::read_to_string(path).map_err(|err| MessageError::Context {
            uri: uri.to_string(),
            message: format!("{}: {err}", path.display()),
        })?;
        self.register_context_text(uri, &text)
    }

    /// Registers a context document from its JSON text.
    ///
    /// # Errors
    /// Returns [`MessageError::Context`] when the text is not JSON.
    pub fn register_context_text(&self, uri: &str, text: &str) -> Result<(), MessageError> {
        let document: Value = serde_json::from_str(text).map_err(|err| MessageError::Context {
            uri: uri.to_string(),
            message: err.to_string(),
        })?;
        self.contexts
            .documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(uri.to_string(), document);
        Ok(())
    }

    /// Registers a validator for a compact message type.
    pub fn register_validator(&self, message_type: &str, validator: Arc<dyn MessageValidator>) {
        self.validators
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(message_type.to_string(), validator);
    }

    /// Validates a compact message against the validator for its `@type`.
    ///
    /// # Errors
    /// Returns [`MessageError::Invalid`] listing every violation.
    pub fn validate(&self, message: &JsonObject) -> Result<(), MessageError> {
        let Some(message_type) = message.get("@type").and_then(Value::as_str) else {
            return Ok(());
        };
        let validator = self
            .validators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(message_type)
            .cloned();
        let Some(validator) = validator else {
            return Ok(());
        };
        let errors = validator.validate(&Value::Object(message.clone()));
        if errors.is_empty() { Ok(()) } else { Err(MessageError::Invalid(errors)) }
    }

    /// Validates and expands a compact message.
    ///
    /// # Errors
    /// Returns [`MessageError`] when validation or expansion fails.
    pub fn process_json_ld(&self, message: &JsonObject) -> Result<JsonObject, MessageError> {
        self.validate(message)?;
        let mut nodes = expand(&Value::Object(message.clone()), &self.contexts)?;
        if nodes.is_empty() {
            return Err(MessageError::EmptyDocument);
        }
        match nodes.swap_remove(0) {
            Value::Object(node) => Ok(node),
            _ => Err(MessageError::NotAnObject),
        }
    }

    /// Parses, validates, and expands a raw message body.
    ///
    /// # Errors
    /// Returns [`MessageError`] when the body is not a JSON object or fails
    /// processing.
    pub fn process_json_ld_bytes(&self, body: &[u8]) -> Result<JsonObject, MessageError> {
        let message = Self::process_json(body)?;
        self.process_json_ld(&message)
    }

    /// Parses a plain JSON object body.
    ///
    /// # Errors
    /// Returns [`MessageError`] when the body is not a JSON object.
    pub fn process_json(body: &[u8]) -> Result<JsonObject, MessageError> {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(object)) => Ok(object),
            Ok(_) => Err(MessageError::NotAnObject),
            Err(err) => Err(MessageError::Json(err.to_string())),
        }
    }

    /// Validates and writes a compact message.
    ///
    /// # Errors
    /// Returns [`MessageError::Invalid`] when validation fails.
    pub fn serialize(&self, message: &JsonObject) -> Result<String, MessageError> {
        self.validate(message)?;
        Self::serialize_plain_json(message)
    }

    /// Writes a JSON object without validation.
    ///
    /// # Errors
    /// Returns [`MessageError::Json`] when serialization fails.
    pub fn serialize_plain_json(message: &JsonObject) -> Result<String, MessageError> {
        serde_json::to_string(message).map_err(|err| MessageError::Json(err.to_string()))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
