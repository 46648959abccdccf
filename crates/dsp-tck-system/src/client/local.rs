// crates/dsp-tck-system/src/client/local.rs
// ============================================================================
// Module: Local Execution
// Description: Error expectation handling shared by every local client.
// Purpose: Apply `expect_error` to messages handed to in-process managers.
// Dependencies: dsp-tck-core, tracing
// ============================================================================

//! ## Overview
//! Local clients expand each outgoing message and hand it to a manager of
//! the in-process connector. An expected error is met only when the manager
//! rejects the message because of the process state; unknown processes and
//! malformed messages always fail the call.

// ============================================================================
// SECTION: Imports
// ============================================================================

use dsp_tck_core::JsonObject;
use dsp_tck_core::MessageSerializer;
use tracing::debug;

use super::ClientError;

// ============================================================================
// SECTION: Execution
// ============================================================================

/// Expands `payload` and runs `work` on it under the error expectation of
/// `operation`. Returns `None` when an expected state error occurred; any
/// other error is returned as is.
pub(super) fn execute<T>(
    serializer: &MessageSerializer,
    operation: &str,
    payload: &JsonObject,
    expect_error: bool,
    work: impl FnOnce(&JsonObject) -> Result<T, ClientError>,
) -> Result<Option<T>, ClientError> {
    let outcome = serializer
        .process_json_ld(payload)
        .map_err(ClientError::from)
        .and_then(|expanded| work(&expanded));
    match outcome {
        Ok(_) if expect_error => {
            Err(ClientError::Verification(format!("Expected to throw an error on {operation}")))
        }
        Ok(value) => Ok(Some(value)),
        Err(error) if expect_error && error.is_state_error() => {
            debug!(operation = %operation, error = %error, "expected state error occurred");
            Ok(None)
        }
        Err(error) => Err(error),
    }
}
