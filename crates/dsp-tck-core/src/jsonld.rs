// crates/dsp-tck-core/src/jsonld.rs
// ============================================================================
// Module: JSON-LD Expansion
// Description: Context processing and document expansion for DSP messages.
// Purpose: Turn compact protocol messages into their expanded JSON-LD form.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! Implements the part of the JSON-LD 1.1 expansion algorithm that Dataspace
//! Protocol messages use: remote contexts resolved from a local
//! [`ContextLoader`], inline contexts, `@vocab`, prefixes and compact IRIs,
//! and term definitions with `@id`, `@type` coercion and `@container`.
//! Invariants:
//! - Expanded node properties are always arrays.
//! - Expanded `@type` on a node is always an array of IRIs.
//! - Keys that do not expand to an absolute IRI or keyword are dropped.
//! - Contexts are never fetched over the network.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Types
// ============================================================================

/// A JSON object.
pub type JsonObject = Map<String, Value>;

/// Maximum nesting of remote context references.
const MAX_CONTEXT_DEPTH: usize = 8;

/// Resolves context IRIs to context documents.
pub trait ContextLoader: Send + Sync {
    /// Returns the document registered for `iri`.
    fn load(&self, iri: &str) -> Option<Value>;
}

/// JSON-LD processing errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JsonLdError {
    /// Context IRI is not registered with the loader.
    #[error("unknown JSON-LD context: {0}")]
    UnknownContext(String),
    /// Context document is malformed.
    #[error("invalid JSON-LD context: {0}")]
    InvalidContext(String),
    /// Term definitions refer to each other in a cycle.
    #[error("cyclic term definition: {0}")]
    CyclicTermDefinition(String),
    /// Remote contexts nest too deeply.
    #[error("JSON-LD context nesting exceeds {MAX_CONTEXT_DEPTH} levels")]
    ContextOverflow,
}

/// A processed term definition.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TermDefinition {
    /// Expanded IRI or keyword the term maps to.
    id: String,
    /// Type coercion: `@id`, `@vocab`, or a datatype IRI.
    type_mapping: Option<String>,
    /// Container mapping such as `@set` or `@list`.
    container: Option<String>,
}

/// Active context used during expansion.
#[derive(Debug, Clone, Default)]
struct ActiveContext {
    /// Vocabulary mapping.
    vocab: Option<String>,
    /// Term definitions by term.
    terms: BTreeMap<String, TermDefinition>,
}

// ============================================================================
// SECTION: Expansion
// ============================================================================

/// Expands a compact JSON-LD document.
///
/// # Errors
/// Returns [`JsonLdError`] when a context cannot be resolved or processed.
pub fn expand(document: &Value, loader: &dyn ContextLoader) -> Result<Vec<Value>, JsonLdError> {
    let expanded = expand_element(&ActiveContext::default(), None, document, loader)?;
    let nodes = match expanded {
        None => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(Value::Object(object)) => {
            if object.len() == 1
                && let Some(Value::Array(graph)) = object.get("@graph")
            {
                graph.clone()
            } else {
                vec![Value::Object(object)]
            }
        }
        Some(other) => vec![other],
    };
    Ok(nodes)
}

/// Expands one element under an optional active property.
fn expand_element(
    active: &ActiveContext,
    active_property: Option<&str>,
    element: &Value,
    loader: &dyn ContextLoader,
) -> Result<Option<Value>, JsonLdError> {
    match element {
        Value::Null => Ok(None),
        Value::Array(items) => {
            let mut expanded = Vec::new();
            for item in items {
                match expand_element(active, active_property, item, loader)? {
                    Some(Value::Array(nested)) => expanded.extend(nested),
                    Some(value) => expanded.push(value),
                    None => {}
                }
            }
            Ok(Some(Value::Array(expanded)))
        }
        Value::Object(object) => expand_object(active, active_property, object, loader),
        scalar => match active_property {
            None | Some("@graph") => Ok(None),
            Some(property) => Ok(Some(expand_value(active, property, scalar))),
        },
    }
}

/// Expands a JSON object into a node or value object.
fn expand_object(
    active: &ActiveContext,
    active_property: Option<&str>,
    object: &JsonObject,
    loader: &dyn ContextLoader,
) -> Result<Option<Value>, JsonLdError> {
    let scoped;
    let active = if let Some(local) = object.get("@context") {
        scoped = process_context(active, local, loader, 0)?;
        &scoped
    } else {
        active
    };

    let mut result = JsonObject::new();
    for (key, value) in object {
        if key == "@context" {
            continue;
        }
        let property = expand_iri(active, key, true);
        if property.starts_with('@') {
            expand_keyword(active, active_property, &property, value, &mut result, loader)?;
            continue;
        }
        if !property.contains(':') || value.is_null() {
            continue;
        }
        let Some(expanded) = expand_element(active, Some(key), value, loader)? else {
            continue;
        };
        let mut items = match expanded {
            Value::Array(items) => items,
            other => vec![other],
        };
        let is_list = active
            .terms
            .get(key)
            .and_then(|term| term.container.as_deref())
            .is_some_and(|container| container == "@list");
        if is_list {
            items = vec![Value::Object(single_entry("@list", Value::Array(items)))];
        }
        match result.get_mut(&property) {
            Some(Value::Array(existing)) => existing.extend(items),
            _ => {
                result.insert(property, Value::Array(items));
            }
        }
    }

    if result.contains_key("@value") {
        if result.get("@value").is_some_and(Value::is_null) {
            return Ok(None);
        }
        if let Some(Value::Array(types)) = result.get("@type")
            && types.len() == 1
            && let Some(datatype) = types.first().cloned()
        {
            result.insert("@type".to_string(), datatype);
        }
        return Ok(Some(Value::Object(result)));
    }

    if matches!(active_property, None | Some("@graph"))
        && (result.is_empty()
            || result.contains_key("@list")
            || (result.len() == 1 && result.contains_key("@id")))
    {
        return Ok(None);
    }
    Ok(Some(Value::Object(result)))
}

/// Expands a keyword entry into `result`.
fn expand_keyword(
    active: &ActiveContext,
    active_property: Option<&str>,
    keyword: &str,
    value: &Value,
    result: &mut JsonObject,
    loader: &dyn ContextLoader,
) -> Result<(), JsonLdError> {
    match keyword {
        "@id" => {
            if let Some(id) = value.as_str().map(|id| expand_iri(active, id, false)) {
                result.insert("@id".to_string(), Value::String(id));
            }
        }
        "@type" => {
            let types: Vec<Value> = match value {
                Value::String(name) => vec![Value::String(name.clone())],
                Value::Array(names) => names.clone(),
                _ => Vec::new(),
            };
            let expanded: Vec<Value> = types
                .iter()
                .filter_map(Value::as_str)
                .map(|name| expand_iri(active, name, true))
                .map(Value::String)
                .collect();
            result.insert("@type".to_string(), Value::Array(expanded));
        }
        "@value" | "@language" | "@index" | "@direction" => {
            result.insert(keyword.to_string(), value.clone());
        }
        "@list" | "@set" | "@graph" => {
            let items = match expand_element(active, active_property, value, loader)? {
                Some(Value::Array(items)) => items,
                Some(other) => vec![other],
                None => Vec::new(),
            };
            result.insert(keyword.to_string(), Value::Array(items));
        }
        _ => {}
    }
    Ok(())
}

/// Expands a scalar using the type coercion of its property term.
fn expand_value(active: &ActiveContext, property: &str, value: &Value) -> Value {
    let type_mapping = active.terms.get(property).and_then(|term| term.type_mapping.as_deref());
    if let Value::String(text) = value {
        match type_mapping {
            Some("@id") => {
                let id = expand_iri(active, text, false);
                return Value::Object(single_entry("@id", Value::String(id)));
            }
            Some("@vocab") => {
                let id = expand_iri(active, text, true);
                return Value::Object(single_entry("@id", Value::String(id)));
            }
            _ => {}
        }
    }
    let mut object = single_entry("@value", value.clone());
    if let Some(datatype) = type_mapping.filter(|mapping| !mapping.starts_with('@')) {
        object.insert("@type".to_string(), Value::String(datatype.to_string()));
    }
    Value::Object(object)
}

/// Builds an object with one entry.
fn single_entry(key: &str, value: Value) -> JsonObject {
    let mut object = JsonObject::new();
    object.insert(key.to_string(), value);
    object
}

// ============================================================================
// SECTION: IRI Expansion
// ============================================================================

/// Expands a term, compact IRI, or IRI. Unresolvable values are returned
/// unchanged and dropped by callers that require an absolute IRI.
fn expand_iri(active: &ActiveContext, value: &str, vocab: bool) -> String {
    if value.starts_with('@') {
        return value.to_string();
    }
    if vocab && let Some(term) = active.terms.get(value) {
        return term.id.clone();
    }
    if let Some((prefix, suffix)) = value.split_once(':') {
        if prefix == "_" || suffix.starts_with("//") {
            return value.to_string();
        }
        if let Some(term) = active.terms.get(prefix) {
            return format!("{}{suffix}", term.id);
        }
        return value.to_string();
    }
    if vocab && let Some(base) = &active.vocab {
        return format!("{base}{value}");
    }
    value.to_string()
}

// ============================================================================
// SECTION: Context Processing
// ============================================================================

/// Applies a local context to the active context.
fn process_context(
    active: &ActiveContext,
    local: &Value,
    loader: &dyn ContextLoader,
    depth: usize,
) -> Result<ActiveContext, JsonLdError> {
    if depth > MAX_CONTEXT_DEPTH {
        return Err(JsonLdError::ContextOverflow);
    }
    match local {
        Value::Null => Ok(ActiveContext::default()),
        Value::String(iri) => {
            let document =
                loader.load(iri).ok_or_else(|| JsonLdError::UnknownContext(iri.clone()))?;
            let nested = document.get("@context").ok_or_else(|| {
                JsonLdError::InvalidContext(format!("{iri} has no @context entry"))
            })?;
            process_context(active, nested, loader, depth + 1)
        }
        Value::Array(items) => {
            let mut result = active.clone();
            for item in items {
                result = process_context(&result, item, loader, depth)?;
            }
            Ok(result)
        }
        Value::Object(definitions) => {
            let mut result = active.clone();
            if let Some(vocab) = definitions.get("@vocab") {
                result.vocab = match vocab {
                    Value::Null => None,
                    Value::String(iri) => Some(expand_iri(&result, iri, true)),
                    _ => return Err(JsonLdError::InvalidContext("@vocab must be a string".into())),
                };
            }
            let mut defined = BTreeMap::new();
            for term in definitions.keys() {
                if !term.starts_with('@') {
                    create_term(&mut result, definitions, term, &mut defined)?;
                }
            }
            Ok(result)
        }
        _ => Err(JsonLdError::InvalidContext("context must be an object, array, or IRI".into())),
    }
}

/// Creates a term definition, first defining any terms it depends on.
fn create_term(
    active: &mut ActiveContext,
    local: &JsonObject,
    term: &str,
    defined: &mut BTreeMap<String, bool>,
) -> Result<(), JsonLdError> {
    match defined.get(term) {
        Some(true) => return Ok(()),
        Some(false) => return Err(JsonLdError::CyclicTermDefinition(term.to_string())),
        None => {}
    }
    defined.insert(term.to_string(), false);
    let Some(value) = local.get(term) else {
        defined.insert(term.to_string(), true);
        return Ok(());
    };
    let (raw_id, raw_type, container) = match value {
        Value::Null => {
            active.terms.remove(term);
            defined.insert(term.to_string(), true);
            return Ok(());
        }
        Value::String(id) => (Some(id.as_str()), None, None),
        Value::Object(definition) => (
            definition.get("@id").and_then(Value::as_str),
            definition.get("@type").and_then(Value::as_str),
            container_mapping(definition.get("@container")),
        ),
        _ => return Err(JsonLdError::InvalidContext(format!("invalid definition for {term}"))),
    };

    let id = match raw_id {
        Some(raw) => expand_definition_iri(active, local, raw, defined)?,
        None if term.contains(':') => expand_definition_iri(active, local, term, defined)?,
        None => match &active.vocab {
            Some(vocab) => format!("{vocab}{term}"),
            None => {
                return Err(JsonLdError::InvalidContext(format!(
                    "term {term} has no @id and no @vocab is set"
                )));
            }
        },
    };
    let type_mapping = match raw_type {
        Some(mapping) if mapping.starts_with('@') => Some(mapping.to_string()),
        Some(mapping) => Some(expand_definition_iri(active, local, mapping, defined)?),
        None => None,
    };
    active.terms.insert(term.to_string(), TermDefinition {
        id,
        type_mapping,
        container,
    });
    defined.insert(term.to_string(), true);
    Ok(())
}

/// Expands an IRI inside a context, defining referenced local terms first.
fn expand_definition_iri(
    active: &mut ActiveContext,
    local: &JsonObject,
    value: &str,
    defined: &mut BTreeMap<String, bool>,
) -> Result<String, JsonLdError> {
    if value.starts_with('@') {
        return Ok(value.to_string());
    }
    if let Some((prefix, suffix)) = value.split_once(':') {
        if prefix == "_" || suffix.starts_with("//") {
            return Ok(value.to_string());
        }
        if local.contains_key(prefix) {
            create_term(active, local, prefix, defined)?;
        }
        return Ok(active
            .terms
            .get(prefix)
            .map_or_else(|| value.to_string(), |term| format!("{}{suffix}", term.id)));
    }
    if local.contains_key(value) {
        create_term(active, local, value, defined)?;
    }
    if let Some(term) = active.terms.get(value) {
        return Ok(term.id.clone());
    }
    Ok(active.vocab.as_ref().map_or_else(|| value.to_string(), |vocab| format!("{vocab}{value}")))
}

/// Reads a container mapping given as a string or array.
fn container_mapping(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(container) => Some(container.clone()),
        Value::Array(containers) => containers.iter().find_map(Value::as_str).map(str::to_string),
        _ => None,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
