// crates/dsp-tck-api/src/messages/mod.rs
// ============================================================================
// Module: Message Builders
// Description: Builders for compact DSP protocol messages.
// Purpose: Produce the messages the TCK sends and the responses it returns.
// Dependencies: serde_json, crate::identifiers
// ============================================================================

//! ## Overview
//! Every builder starts from a base message carrying a fresh `@id` and the
//! message `@type`. Top-level messages also carry the DSP `@context`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use dsp_tck_core::JsonObject;
use serde_json::Value;

use crate::access::create_dsp_context;
use crate::constants::CONTEXT;
use crate::constants::ID;
use crate::constants::TYPE;
use crate::identifiers::random_uuid;

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod catalog;
pub mod negotiation;
pub mod transfer;

// ============================================================================
// SECTION: Base Messages
// ============================================================================

/// Creates `{ "@id": <uuid>, "@type": <message_type> }`.
#[must_use]
pub fn create_base_message(message_type: &str) -> JsonObject {
    let mut message = JsonObject::new();
    message.insert(ID.to_string(), Value::String(random_uuid()));
    message.insert(TYPE.to_string(), Value::String(message_type.to_string()));
    message
}

/// Creates a base message that also carries the DSP context.
#[must_use]
pub fn create_context_message(message_type: &str) -> JsonObject {
    let mut message = create_base_message(message_type);
    message.insert(CONTEXT.to_string(), create_dsp_context());
    message
}

/// Creates a nested object carrying only `@type`.
fn typed_object(object_type: &str) -> JsonObject {
    let mut object = JsonObject::new();
    put(&mut object, TYPE, object_type);
    object
}

/// Inserts a string property.
fn put(message: &mut JsonObject, key: &str, value: &str) {
    message.insert(key.to_string(), Value::String(value.to_string()));
}

/// Renders termination reasons as `[{ "message": reason }]`.
fn reason_list(reasons: &[&str]) -> Value {
    Value::Array(
        reasons
            .iter()
            .map(|reason| {
                let mut entry = JsonObject::new();
                put(&mut entry, "message", reason);
                Value::Object(entry)
            })
            .collect(),
    )
}
