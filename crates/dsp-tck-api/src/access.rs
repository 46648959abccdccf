// crates/dsp-tck-api/src/access.rs
// ============================================================================
// Module: JSON-LD Accessors
// Description: Typed reads of compact and expanded JSON-LD properties.
// Purpose: Extract ids and values from protocol messages with precise errors.
// Dependencies: dsp-tck-core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Expanded JSON-LD wraps every property value in an array of node or value
//! objects. These helpers unwrap the first entry and report which property
//! was missing or malformed.
//! Invariants:
//! - Only the first array entry is read.
//! - Non-string scalar values are rendered with their JSON text.

// ============================================================================
// SECTION: Imports
// ============================================================================

use dsp_tck_core::JsonObject;
use serde_json::Value;
use thiserror::Error;

use crate::constants::DSPACE_CONTEXT;
use crate::constants::ID;
use crate::constants::VALUE;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures reading a JSON-LD property.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// Property is absent.
    #[error("Property '{0}' was not found")]
    NotFound(String),
    /// Property is an empty array.
    #[error("Property '{0}' was empty")]
    Empty(String),
    /// First array entry is not an object.
    #[error("Property '{0}' is not a Map")]
    NotAMap(String),
    /// Property is absent or null.
    #[error("No value for: {0}")]
    NoValue(String),
    /// Value object lacks the requested keyword.
    #[error("No {attribute} attribute for property: {key}")]
    MissingAttribute {
        /// Keyword that was looked up.
        attribute: String,
        /// Property name.
        key: String,
    },
    /// Property is not an array of value objects.
    #[error("Property '{0}' was not in expanded @value form")]
    NotValueForm(String),
    /// Node object lacks `@id`.
    #[error("No @id value for property: {0}")]
    NoIdValue(String),
    /// Property is not a node object.
    #[error("Property '{0}' was not in expanded @id form")]
    NotIdForm(String),
    /// Compact property is not a string.
    #[error("Property '{0}' is not a string")]
    NotAString(String),
}

// ============================================================================
// SECTION: Accessors
// ============================================================================

/// Returns the first object of the array stored under `key`.
///
/// # Errors
/// Returns [`AccessError`] when the property is missing (and not optional),
/// empty, or not an array of objects.
pub fn map_property<'a>(
    key: &str,
    map: &'a JsonObject,
    optional: bool,
) -> Result<Option<&'a JsonObject>, AccessError> {
    let Some(value) = map.get(key).filter(|value| !value.is_null()) else {
        return if optional { Ok(None) } else { Err(AccessError::NotFound(key.to_string())) };
    };
    let Value::Array(entries) = value else {
        return Err(AccessError::NotAMap(key.to_string()));
    };
    let first = entries.first().ok_or_else(|| AccessError::Empty(key.to_string()))?;
    first.as_object().map(Some).ok_or_else(|| AccessError::NotAMap(key.to_string()))
}

/// Returns the first object of the array stored under `key`.
///
/// # Errors
/// Returns [`AccessError`] when the property is missing, empty, or not an
/// array of objects.
pub fn required_map_property<'a>(
    key: &str,
    map: &'a JsonObject,
) -> Result<&'a JsonObject, AccessError> {
    map_property(key, map, false)?.ok_or_else(|| AccessError::NotFound(key.to_string()))
}

/// Returns a compact string property.
///
/// # Errors
/// Returns [`AccessError`] when the property is missing or not a string.
pub fn compact_string_property(key: &str, map: &JsonObject) -> Result<String, AccessError> {
    match map.get(key) {
        None | Some(Value::Null) => Err(AccessError::NoValue(key.to_string())),
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(AccessError::NotAString(key.to_string())),
    }
}

/// Returns the `@value` of an expanded property.
///
/// # Errors
/// Returns [`AccessError`] when the property is not in expanded value form.
pub fn string_property(key: &str, map: &JsonObject) -> Result<String, AccessError> {
    keyword_property(key, VALUE, map)
}

/// Returns the `@id` of an expanded property.
///
/// # Errors
/// Returns [`AccessError`] when the property is not in expanded node form.
pub fn string_id_property(key: &str, map: &JsonObject) -> Result<String, AccessError> {
    keyword_property(key, ID, map)
}

/// Returns `keyword` of the first entry of an expanded property.
///
/// # Errors
/// Returns [`AccessError`] when the property, its first entry, or the
/// keyword is missing.
pub fn keyword_property(key: &str, keyword: &str, map: &JsonObject) -> Result<String, AccessError> {
    let value = match map.get(key) {
        None | Some(Value::Null) => return Err(AccessError::NoValue(key.to_string())),
        Some(value) => value,
    };
    let Value::Array(entries) = value else {
        return Err(AccessError::NotValueForm(key.to_string()));
    };
    let first = entries.first().ok_or_else(|| AccessError::Empty(key.to_string()))?;
    let Value::Object(container) = first else {
        return Err(AccessError::NotValueForm(key.to_string()));
    };
    match container.get(keyword) {
        None | Some(Value::Null) => Err(AccessError::MissingAttribute {
            attribute: keyword.to_string(),
            key: key.to_string(),
        }),
        Some(value) => Ok(render(value)),
    }
}

/// Returns the `@id` of a property holding a single node object.
///
/// # Errors
/// Returns [`AccessError`] when the property is missing or not a node.
pub fn identity_property(key: &str, map: &JsonObject) -> Result<String, AccessError> {
    match map.get(key) {
        None | Some(Value::Null) => Err(AccessError::NoValue(key.to_string())),
        Some(Value::Object(node)) => match node.get(ID) {
            None | Some(Value::Null) => Err(AccessError::NoIdValue(key.to_string())),
            Some(id) => Ok(render(id)),
        },
        Some(_) => Err(AccessError::NotIdForm(key.to_string())),
    }
}

/// Returns the compact `@context` value for DSP messages.
#[must_use]
pub fn create_dsp_context() -> Value {
    Value::Array(vec![Value::String(DSPACE_CONTEXT.to_string())])
}

/// Renders a scalar without JSON quoting for strings.
fn render(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
