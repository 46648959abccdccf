// crates/dsp-tck-suite/src/transfer/mod.rs
// ============================================================================
// Module: Transfer Process Scenarios
// Description: Scenario groups verifying transfer processes.
// Purpose: Check a provider under test (TP) and a consumer under test (TP_C).
// Dependencies: dsp-tck-api, dsp-tck-core, dsp-tck-system
// ============================================================================

//! ## Overview
//! Transfer scenarios follow the negotiation scenarios: queue the messages a
//! local connector under test would send, run a pipeline describing the
//! exchange from the TCK side, then verify every queued message was sent.
//! Each scenario transfers under the agreement `<KEY>_AGREEMENTID` in the
//! format `<KEY>_FORMAT`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use dsp_tck_api::DataAddress;
use dsp_tck_core::MessageSerializer;

use crate::scenario::VerificationError;
use crate::scenario::register_validators;

pub mod consumer;
pub mod provider;

// ============================================================================
// SECTION: Validators
// ============================================================================

/// Message types validated during transfer scenarios.
pub const TRANSFER_VALIDATORS: [(&str, &str); 3] = [
    ("TransferRequestMessage", "/transfer/transfer-request-message-schema.json"),
    ("TransferStartMessage", "/transfer/transfer-start-message-schema.json"),
    ("TransferProcess", "/transfer/transfer-process-schema.json"),
];

/// Registers the transfer message validators.
///
/// # Errors
/// Returns [`VerificationError::Validation`] when a schema is missing.
pub fn register_transfer_validators(
    serializer: &MessageSerializer,
) -> Result<(), VerificationError> {
    register_validators(serializer, &TRANSFER_VALIDATORS)
}

/// Accepts start messages with or without a data address.
fn any_data_address(_: Option<&DataAddress>) -> bool {
    true
}
