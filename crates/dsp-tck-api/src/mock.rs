// crates/dsp-tck-api/src/mock.rs
// ============================================================================
// Module: Counter-Party Mocks
// Description: Contracts for scripted counter-party behaviour.
// Purpose: Let scenarios queue actions a simulated connector runs on events.
// Dependencies: thiserror, crate::negotiation, crate::transfer
// ============================================================================

//! ## Overview
//! When the TCK runs against its own local connector, a mock plays the part
//! of the connector under test: scenarios queue actions per negotiation
//! negotiation or transfer process event, and the mock runs the next queued
//! action each time the event fires. Against a remote connector the mocks are no-ops.
//! Invariants:
//! - Each queued action runs at most once, in queue order per event.
//! - `verify` fails while any queue still holds actions.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

use crate::negotiation::ContractNegotiation;
use crate::transfer::TransferProcess;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Error returned by a failing action.
pub type ActionError = Box<dyn StdError + Send + Sync>;

/// Action run by a provider mock with the provider negotiation.
pub type ProviderAction =
    Box<dyn FnOnce(&Arc<ContractNegotiation>) -> Result<(), ActionError> + Send>;

/// Action run by a consumer mock with the TCK callback address and the
/// consumer negotiation.
pub type ConsumerAction =
    Box<dyn FnOnce(&str, &Arc<ContractNegotiation>) -> Result<(), ActionError> + Send>;

/// Action run by a provider transfer mock with the provider process.
pub type ProviderTransferAction =
    Box<dyn FnOnce(&Arc<TransferProcess>) -> Result<(), ActionError> + Send>;

/// Action run by a consumer transfer mock with the TCK callback address and
/// the consumer process.
pub type ConsumerTransferAction =
    Box<dyn FnOnce(&str, &Arc<TransferProcess>) -> Result<(), ActionError> + Send>;

/// Mock verification errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MockError {
    /// Queued actions never ran.
    #[error("Request actions not executed.\n Actions: {0}")]
    ActionsNotExecuted(String),
    /// An action ran and failed.
    #[error("Mock action failed: {0}")]
    ActionFailed(String),
}

// ============================================================================
// SECTION: Mock Contracts
// ============================================================================

/// Operations shared by negotiation mocks.
pub trait NegotiationMock: Send + Sync {
    /// Checks that every queued action ran and none failed, then detaches
    /// the mock from its manager.
    ///
    /// # Errors
    /// Returns [`MockError`] for pending or failed actions.
    fn verify(&self) -> Result<(), MockError>;

    /// Returns true when no action is pending.
    fn completed(&self) -> bool;

    /// Drops every pending action.
    fn reset(&self);
}

/// Mock of a provider connector.
pub trait ProviderNegotiationMock: NegotiationMock {
    /// Queues an action for the next received contract request, including
    /// counter-offers.
    fn record_contract_requested_action(&self, action: ProviderAction);

    /// Queues an action for the next time the consumer accepts, which is when
    /// a provider sends its agreement.
    fn record_agreed_action(&self, action: ProviderAction);

    /// Queues an action for the next agreement verification.
    fn record_verified_action(&self, action: ProviderAction);
}

/// Mock of a consumer connector.
pub trait ConsumerNegotiationMock: NegotiationMock {
    /// Queues an action for the next negotiation the consumer creates.
    fn record_initialized_action(&self, action: ConsumerAction);

    /// Queues an action for the next offer the consumer receives.
    fn record_offered_action(&self, action: ConsumerAction);

    /// Queues an action for the next agreement the consumer receives.
    fn record_agreed_action(&self, action: ConsumerAction);
}

/// Operations shared by transfer process mocks.
pub trait TransferProcessMock: Send + Sync {
    /// Checks that every queued action ran and none failed, then detaches
    /// the mock from its manager.
    ///
    /// # Errors
    /// Returns [`MockError`] for pending or failed actions.
    fn verify(&self) -> Result<(), MockError>;

    /// Returns true when no action is pending.
    fn completed(&self) -> bool;

    /// Drops every pending action.
    fn reset(&self);
}

/// Mock of a provider connector taking part in transfers.
pub trait ProviderTransferProcessMock: TransferProcessMock {
    /// Queues an action for the next received transfer request.
    fn record_transfer_requested_action(&self, action: ProviderTransferAction);
}

/// Mock of a consumer connector taking part in transfers.
pub trait ConsumerTransferProcessMock: TransferProcessMock {
    /// Queues an action for the next transfer process the consumer creates.
    fn record_initialized_action(&self, action: ConsumerTransferAction);

    /// Queues an action for the next time the provider starts a transfer.
    fn record_started_action(&self, action: ConsumerTransferAction);
}
