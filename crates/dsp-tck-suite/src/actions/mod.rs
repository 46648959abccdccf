// crates/dsp-tck-suite/src/actions/mod.rs
// ============================================================================
// Module: Scripted Actions
// Description: Messages a local connector under test sends back to the TCK.
// Purpose: Build the mock actions scenarios queue for local runs.
// Dependencies: dsp-tck-api, dsp-tck-core, dsp-tck-system, tracing
// ============================================================================

//! ## Overview
//! When the TCK runs against its own local connector, the connector under
//! test has no protocol logic; scenarios queue these actions on its mocks
//! instead. Each action moves the local negotiation or transfer process to
//! the state its message announces, then posts the message to the TCK
//! callback endpoint over HTTP and checks the reply.
//! Invariants:
//! - The local state changes before the message is posted.
//! - A non-2xx reply fails the action, which fails mock verification.

// ============================================================================
// SECTION: Imports
// ============================================================================

use dsp_tck_api::ContractNegotiation;
use dsp_tck_api::mock::ActionError;
use dsp_tck_core::JsonObject;
use dsp_tck_system::client::HttpExecutor;
use dsp_tck_system::client::HttpReply;
use tracing::debug;

mod consumer;
mod provider;
mod transfer;

pub use consumer::ConsumerActions;
pub use provider::ProviderActions;
pub use transfer::ConsumerTransferActions;
pub use transfer::ProviderTransferActions;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Posts `message` to `url` and requires a 2xx reply. `id` names the local
/// process in logs and errors.
fn post(
    http: &HttpExecutor,
    url: &str,
    operation: &str,
    id: &str,
    message: &JsonObject,
) -> Result<HttpReply, ActionError> {
    debug!(url = %url, operation, process = %id, "posting scripted message");
    let reply = http.post_json_ld(url, message)?;
    reply.check(operation, id, false)?;
    Ok(reply)
}

/// Returns the counter-party process id of `negotiation`.
fn correlation_id(negotiation: &ContractNegotiation) -> Result<String, ActionError> {
    negotiation
        .correlation_id()
        .ok_or_else(|| format!("negotiation {} has no correlation id", negotiation.id()).into())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
