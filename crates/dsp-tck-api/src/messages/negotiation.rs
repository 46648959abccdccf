// crates/dsp-tck-api/src/messages/negotiation.rs
// ============================================================================
// Module: Negotiation Messages
// Description: Builders for contract negotiation messages.
// Purpose: Create requests, offers, agreements, events, and terminations.
// Dependencies: serde_json, time
// ============================================================================

//! ## Overview
//! Offers always carry a single `use` permission without constraints, which
//! is the policy every negotiation scenario agrees on.

// ============================================================================
// SECTION: Imports
// ============================================================================

use dsp_tck_core::JsonObject;
use serde_json::Value;
use serde_json::json;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::create_context_message;
use super::put;
use super::reason_list;
use crate::constants::DSPACE_PROPERTY_AGREEMENT;
use crate::constants::DSPACE_PROPERTY_CALLBACK_ADDRESS;
use crate::constants::DSPACE_PROPERTY_CODE;
use crate::constants::DSPACE_PROPERTY_CONSUMER_PID;
use crate::constants::DSPACE_PROPERTY_EVENT_TYPE;
use crate::constants::DSPACE_PROPERTY_OFFER;
use crate::constants::DSPACE_PROPERTY_PROVIDER_PID;
use crate::constants::DSPACE_PROPERTY_REASON;
use crate::constants::DSPACE_PROPERTY_STATE;
use crate::constants::DSPACE_PROPERTY_TIMESTAMP;
use crate::constants::ID;
use crate::constants::ODRL_AGREEMENT_TYPE;
use crate::constants::ODRL_OFFER_TYPE;
use crate::constants::ODRL_PROPERTY_ACTION;
use crate::constants::ODRL_PROPERTY_ASSIGNEE;
use crate::constants::ODRL_PROPERTY_ASSIGNER;
use crate::constants::ODRL_PROPERTY_CONSTRAINTS;
use crate::constants::ODRL_PROPERTY_PERMISSION;
use crate::constants::ODRL_PROPERTY_TARGET;
use crate::constants::ODRL_USE;
use crate::constants::TYPE;

// ============================================================================
// SECTION: Event Types
// ============================================================================

/// Event sent by the consumer when it accepts the last offer.
pub const ACCEPTED_EVENT: &str = "ACCEPTED";
/// Event sent by the provider when it finalizes the agreement.
pub const FINALIZED_EVENT: &str = "FINALIZED";

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Creates a `ContractRequestMessage`.
#[must_use]
pub fn create_contract_request(
    consumer_pid: &str,
    provider_pid: Option<&str>,
    offer_id: &str,
    target_id: &str,
    callback_address: Option<&str>,
) -> JsonObject {
    let mut message = create_context_message("ContractRequestMessage");
    put(&mut message, DSPACE_PROPERTY_CONSUMER_PID, consumer_pid);
    if let Some(provider_pid) = provider_pid {
        put(&mut message, DSPACE_PROPERTY_PROVIDER_PID, provider_pid);
    }
    let mut offer = JsonObject::new();
    put(&mut offer, ID, offer_id);
    put(&mut offer, ODRL_PROPERTY_TARGET, target_id);
    put(&mut offer, TYPE, ODRL_OFFER_TYPE);
    offer.insert(ODRL_PROPERTY_PERMISSION.to_string(), use_permissions());
    message.insert(DSPACE_PROPERTY_OFFER.to_string(), Value::Object(offer));
    if let Some(callback_address) = callback_address {
        put(&mut message, DSPACE_PROPERTY_CALLBACK_ADDRESS, callback_address);
    }
    message
}

/// Creates a counter-offer `ContractRequestMessage` for an existing negotiation.
#[must_use]
pub fn create_counter_offer(
    provider_pid: &str,
    consumer_pid: &str,
    offer_id: &str,
    assigner: &str,
    assignee: &str,
    target_id: &str,
) -> JsonObject {
    let mut message = create_context_message("ContractRequestMessage");
    put(&mut message, DSPACE_PROPERTY_PROVIDER_PID, provider_pid);
    put(&mut message, DSPACE_PROPERTY_CONSUMER_PID, consumer_pid);
    message.insert(
        DSPACE_PROPERTY_OFFER.to_string(),
        offer_policy(offer_id, assigner, assignee, target_id),
    );
    message
}

/// Creates a `ContractOfferMessage`.
#[must_use]
pub fn create_offer(
    provider_pid: &str,
    consumer_pid: &str,
    offer_id: &str,
    assigner: &str,
    assignee: &str,
    target_id: &str,
) -> JsonObject {
    let mut message = create_context_message("ContractOfferMessage");
    put(&mut message, DSPACE_PROPERTY_PROVIDER_PID, provider_pid);
    put(&mut message, DSPACE_PROPERTY_CONSUMER_PID, consumer_pid);
    message.insert(
        DSPACE_PROPERTY_OFFER.to_string(),
        offer_policy(offer_id, assigner, assignee, target_id),
    );
    message
}

/// Creates a `ContractAgreementMessage` stamped with the current UTC time.
#[must_use]
pub fn create_agreement(
    provider_pid: &str,
    consumer_pid: &str,
    agreement_id: &str,
    assigner: &str,
    assignee: &str,
    target_id: &str,
    callback_address: &str,
) -> JsonObject {
    let mut message = create_context_message("ContractAgreementMessage");
    put(&mut message, DSPACE_PROPERTY_PROVIDER_PID, provider_pid);
    put(&mut message, DSPACE_PROPERTY_CONSUMER_PID, consumer_pid);
    let timestamp = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
    let mut agreement = JsonObject::new();
    put(&mut agreement, TYPE, ODRL_AGREEMENT_TYPE);
    put(&mut agreement, ID, agreement_id);
    put(&mut agreement, ODRL_PROPERTY_TARGET, target_id);
    agreement.insert(ODRL_PROPERTY_PERMISSION.to_string(), use_permissions());
    put(&mut agreement, DSPACE_PROPERTY_TIMESTAMP, &timestamp);
    put(&mut agreement, ODRL_PROPERTY_ASSIGNEE, assignee);
    put(&mut agreement, ODRL_PROPERTY_ASSIGNER, assigner);
    message.insert(DSPACE_PROPERTY_AGREEMENT.to_string(), Value::Object(agreement));
    put(&mut message, DSPACE_PROPERTY_CALLBACK_ADDRESS, callback_address);
    message
}

/// Creates a `ContractAgreementVerificationMessage`.
#[must_use]
pub fn create_verification(provider_pid: &str, consumer_pid: &str) -> JsonObject {
    let mut message = create_context_message("ContractAgreementVerificationMessage");
    put(&mut message, DSPACE_PROPERTY_PROVIDER_PID, provider_pid);
    put(&mut message, DSPACE_PROPERTY_CONSUMER_PID, consumer_pid);
    message
}

/// Creates a `ContractNegotiationEventMessage`.
#[must_use]
pub fn create_event(provider_pid: &str, consumer_pid: &str, event_type: &str) -> JsonObject {
    let mut message = create_context_message("ContractNegotiationEventMessage");
    put(&mut message, DSPACE_PROPERTY_PROVIDER_PID, provider_pid);
    put(&mut message, DSPACE_PROPERTY_CONSUMER_PID, consumer_pid);
    put(&mut message, DSPACE_PROPERTY_EVENT_TYPE, event_type);
    message
}

/// Creates an `ACCEPTED` negotiation event.
#[must_use]
pub fn create_accepted_event(provider_pid: &str, consumer_pid: &str) -> JsonObject {
    create_event(provider_pid, consumer_pid, ACCEPTED_EVENT)
}

/// Creates a `FINALIZED` negotiation event.
#[must_use]
pub fn create_finalized_event(provider_pid: &str, consumer_pid: &str) -> JsonObject {
    create_event(provider_pid, consumer_pid, FINALIZED_EVENT)
}

/// Creates a `ContractNegotiationTerminationMessage`; reasons are omitted
/// when empty.
#[must_use]
pub fn create_termination(
    provider_pid: &str,
    consumer_pid: &str,
    code: &str,
    reasons: &[&str],
) -> JsonObject {
    let mut message = create_context_message("ContractNegotiationTerminationMessage");
    put(&mut message, DSPACE_PROPERTY_PROVIDER_PID, provider_pid);
    put(&mut message, DSPACE_PROPERTY_CONSUMER_PID, consumer_pid);
    put(&mut message, DSPACE_PROPERTY_CODE, code);
    if !reasons.is_empty() {
        message.insert(DSPACE_PROPERTY_REASON.to_string(), reason_list(reasons));
    }
    message
}

/// Creates a `ContractNegotiation` response.
#[must_use]
pub fn create_negotiation_response(
    provider_pid: &str,
    consumer_pid: &str,
    state: &str,
) -> JsonObject {
    let mut message = create_context_message("ContractNegotiation");
    put(&mut message, DSPACE_PROPERTY_PROVIDER_PID, provider_pid);
    put(&mut message, DSPACE_PROPERTY_CONSUMER_PID, consumer_pid);
    put(&mut message, DSPACE_PROPERTY_STATE, state);
    message
}

// ============================================================================
// SECTION: Policies
// ============================================================================

/// Returns `[{ "action": "use", "constraints": [] }]`.
fn use_permissions() -> Value {
    json!([{ ODRL_PROPERTY_ACTION: ODRL_USE, ODRL_PROPERTY_CONSTRAINTS: [] }])
}

/// Builds an offer policy with assigner and assignee.
fn offer_policy(offer_id: &str, assigner: &str, assignee: &str, target_id: &str) -> Value {
    let mut offer = JsonObject::new();
    put(&mut offer, TYPE, ODRL_OFFER_TYPE);
    put(&mut offer, ID, offer_id);
    offer.insert(ODRL_PROPERTY_PERMISSION.to_string(), use_permissions());
    put(&mut offer, ODRL_PROPERTY_TARGET, target_id);
    put(&mut offer, ODRL_PROPERTY_ASSIGNEE, assignee);
    put(&mut offer, ODRL_PROPERTY_ASSIGNER, assigner);
    Value::Object(offer)
}
