// crates/dsp-tck-api/src/messages/transfer.rs
// ============================================================================
// Module: Transfer Messages
// Description: Builders for transfer process messages and data addresses.
// Purpose: Create transfer requests, state messages, and responses.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Data addresses are written in compact form with their endpoint properties
//! as a list of `{ name, value }` pairs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use dsp_tck_core::JsonObject;
use serde_json::Value;

use super::create_context_message;
use super::put;
use super::reason_list;
use super::typed_object;
use crate::constants::DSPACE_PROPERTY_AGREEMENT_ID;
use crate::constants::DSPACE_PROPERTY_CALLBACK_ADDRESS;
use crate::constants::DSPACE_PROPERTY_CODE;
use crate::constants::DSPACE_PROPERTY_CONSUMER_PID;
use crate::constants::DSPACE_PROPERTY_DATA_ADDRESS;
use crate::constants::DSPACE_PROPERTY_ENDPOINT;
use crate::constants::DSPACE_PROPERTY_ENDPOINT_PROPERTIES;
use crate::constants::DSPACE_PROPERTY_ENDPOINT_TYPE;
use crate::constants::DSPACE_PROPERTY_FORMAT;
use crate::constants::DSPACE_PROPERTY_NAME;
use crate::constants::DSPACE_PROPERTY_PROVIDER_PID;
use crate::constants::DSPACE_PROPERTY_REASON;
use crate::constants::DSPACE_PROPERTY_STATE;
use crate::constants::DSPACE_PROPERTY_VALUE;
use crate::transfer::DataAddress;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Endpoint of the sample data address.
pub const SAMPLE_ENDPOINT: &str = "http://example.com";
/// Endpoint type of the sample data address.
pub const HTTP_ENDPOINT_TYPE: &str = "https://w3id.org/idsa/v4.1/HTTP";

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Creates a `TransferRequestMessage`.
#[must_use]
pub fn create_transfer_request(
    consumer_pid: &str,
    agreement_id: &str,
    format: &str,
    data_address: Option<&DataAddress>,
    callback_address: &str,
) -> JsonObject {
    let mut message = create_context_message("TransferRequestMessage");
    put(&mut message, DSPACE_PROPERTY_CONSUMER_PID, consumer_pid);
    if let Some(data_address) = data_address {
        message.insert(
            DSPACE_PROPERTY_DATA_ADDRESS.to_string(),
            Value::Object(from_data_address(data_address)),
        );
    }
    put(&mut message, DSPACE_PROPERTY_AGREEMENT_ID, agreement_id);
    put(&mut message, DSPACE_PROPERTY_FORMAT, format);
    put(&mut message, DSPACE_PROPERTY_CALLBACK_ADDRESS, callback_address);
    message
}

/// Creates a `TransferProcess` response.
#[must_use]
pub fn create_transfer_response(provider_pid: &str, consumer_pid: &str, state: &str) -> JsonObject {
    let mut message = create_context_message("TransferProcess");
    put(&mut message, DSPACE_PROPERTY_PROVIDER_PID, provider_pid);
    put(&mut message, DSPACE_PROPERTY_CONSUMER_PID, consumer_pid);
    put(&mut message, DSPACE_PROPERTY_STATE, state);
    message
}

/// Creates a `TransferStartMessage`.
#[must_use]
pub fn create_start_request(
    provider_pid: &str,
    consumer_pid: &str,
    data_address: Option<JsonObject>,
) -> JsonObject {
    let mut message = create_context_message("TransferStartMessage");
    put(&mut message, DSPACE_PROPERTY_PROVIDER_PID, provider_pid);
    put(&mut message, DSPACE_PROPERTY_CONSUMER_PID, consumer_pid);
    if let Some(data_address) = data_address {
        message.insert(DSPACE_PROPERTY_DATA_ADDRESS.to_string(), Value::Object(data_address));
    }
    message
}

/// Creates a `TransferCompletionMessage`.
#[must_use]
pub fn create_completion(provider_pid: &str, consumer_pid: &str) -> JsonObject {
    pid_message("TransferCompletionMessage", provider_pid, consumer_pid)
}

/// Creates a `TransferSuspensionMessage`.
#[must_use]
pub fn create_suspension(
    provider_pid: &str,
    consumer_pid: &str,
    code: &str,
    reasons: &[&str],
) -> JsonObject {
    coded_message("TransferSuspensionMessage", provider_pid, consumer_pid, code, reasons)
}

/// Creates a `TransferTerminationMessage`.
#[must_use]
pub fn create_termination(
    provider_pid: &str,
    consumer_pid: &str,
    code: &str,
    reasons: &[&str],
) -> JsonObject {
    coded_message("TransferTerminationMessage", provider_pid, consumer_pid, code, reasons)
}

/// Returns the sample HTTP data address.
#[must_use]
pub fn data_address() -> JsonObject {
    let mut address = typed_object("DataAddress");
    put(&mut address, DSPACE_PROPERTY_ENDPOINT, SAMPLE_ENDPOINT);
    put(&mut address, DSPACE_PROPERTY_ENDPOINT_TYPE, HTTP_ENDPOINT_TYPE);
    address
}

/// Converts a [`DataAddress`] to its compact message form.
#[must_use]
pub fn from_data_address(data_address: &DataAddress) -> JsonObject {
    let mut address = typed_object("DataAddress");
    put(&mut address, DSPACE_PROPERTY_ENDPOINT_TYPE, &data_address.endpoint_type);
    put(&mut address, DSPACE_PROPERTY_ENDPOINT, &data_address.endpoint);
    if !data_address.endpoint_properties.is_empty() {
        let properties = data_address
            .endpoint_properties
            .iter()
            .map(|(name, value)| {
                let mut property = typed_object("EndpointProperty");
                put(&mut property, DSPACE_PROPERTY_NAME, name);
                put(&mut property, DSPACE_PROPERTY_VALUE, value);
                Value::Object(property)
            })
            .collect();
        address.insert(DSPACE_PROPERTY_ENDPOINT_PROPERTIES.to_string(), Value::Array(properties));
    }
    address
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Creates a message carrying only the two process ids.
fn pid_message(message_type: &str, provider_pid: &str, consumer_pid: &str) -> JsonObject {
    let mut message = create_context_message(message_type);
    put(&mut message, DSPACE_PROPERTY_PROVIDER_PID, provider_pid);
    put(&mut message, DSPACE_PROPERTY_CONSUMER_PID, consumer_pid);
    message
}

/// Creates a message with process ids, a code, and optional reasons.
fn coded_message(
    message_type: &str,
    provider_pid: &str,
    consumer_pid: &str,
    code: &str,
    reasons: &[&str],
) -> JsonObject {
    let mut message = pid_message(message_type, provider_pid, consumer_pid);
    put(&mut message, DSPACE_PROPERTY_CODE, code);
    if !reasons.is_empty() {
        message.insert(DSPACE_PROPERTY_REASON.to_string(), reason_list(reasons));
    }
    message
}
