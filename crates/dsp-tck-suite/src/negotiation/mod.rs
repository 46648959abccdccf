// crates/dsp-tck-suite/src/negotiation/mod.rs
// ============================================================================
// Module: Contract Negotiation Scenarios
// Description: Scenario groups verifying contract negotiation.
// Purpose: Check a provider under test (CN) and a consumer under test (CN_C).
// Dependencies: dsp-tck-api, dsp-tck-core, dsp-tck-system
// ============================================================================

//! ## Overview
//! Every negotiation scenario queues the replies a local connector under
//! test would send, then runs a pipeline describing the exchange from the
//! TCK side and finally verifies that every queued reply was sent. Against a
//! remote connector the queued replies are discarded and the real connector
//! answers instead.

// ============================================================================
// SECTION: Imports
// ============================================================================

use dsp_tck_core::MessageSerializer;

use crate::scenario::VerificationError;
use crate::scenario::register_validators;

pub mod consumer;
pub mod provider;

// ============================================================================
// SECTION: Validators
// ============================================================================

/// Message types validated during negotiation scenarios.
pub const NEGOTIATION_VALIDATORS: [(&str, &str); 8] = [
    ("ContractRequestMessage", "/negotiation/contract-request-message-schema.json"),
    ("ContractOfferMessage", "/negotiation/contract-offer-message-schema.json"),
    ("ContractAgreementMessage", "/negotiation/contract-agreement-message-schema.json"),
    (
        "ContractAgreementVerificationMessage",
        "/negotiation/contract-agreement-verification-message-schema.json",
    ),
    (
        "ContractNegotiationEventMessage",
        "/negotiation/contract-negotiation-event-message-schema.json",
    ),
    (
        "ContractNegotiationTerminationMessage",
        "/negotiation/contract-negotiation-termination-message-schema.json",
    ),
    ("ContractNegotiation", "/negotiation/contract-negotiation-schema.json"),
    ("ContractNegotiationError", "/negotiation/contract-negotiation-error-schema.json"),
];

/// Registers the negotiation message validators.
///
/// # Errors
/// Returns [`VerificationError::Validation`] when a schema is missing.
pub fn register_negotiation_validators(
    serializer: &MessageSerializer,
) -> Result<(), VerificationError> {
    register_validators(serializer, &NEGOTIATION_VALIDATORS)
}
