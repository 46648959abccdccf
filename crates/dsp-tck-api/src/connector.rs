// crates/dsp-tck-api/src/connector.rs
// ============================================================================
// Module: Connector Interfaces
// Description: Manager, listener, and connector contracts of a DSP connector.
// Purpose: Decouple pipelines and clients from the local connector implementation.
// Dependencies: dsp-tck-core, thiserror, crate::negotiation, crate::transfer
// ============================================================================

//! ## Overview
//! A [`Connector`] bundles the managers a Dataspace Protocol participant
//! needs: provider and consumer negotiation managers, provider and consumer
//! transfer process managers, and a catalog manager. Managers own their
//! processes, apply incoming messages to them, and notify registered
//! listeners after each state change.
//! Invariants:
//! - Listeners are notified outside any manager lock; a listener may
//!   deregister itself or call back into the manager.
//! - Handler operations take expanded JSON-LD messages.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use dsp_tck_core::JsonObject;
use thiserror::Error;

use crate::access::AccessError;
use crate::catalog::Catalog;
use crate::catalog::Dataset;
use crate::negotiation::ContractNegotiation;
use crate::result::DspFailure;
use crate::result::ErrorType;
use crate::state::StateError;
use crate::transfer::DataAddress;
use crate::transfer::TransferProcess;

// ============================================================================
// SECTION: Listener Registration
// ============================================================================

/// Handle returned when a listener is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Wraps a raw listener id.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Negotiation manager errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NegotiationError {
    /// No negotiation has the given id.
    #[error("Contract negotiation not found for id: {0}")]
    NotFound(String),
    /// The message is not legal in the negotiation's state.
    #[error(transparent)]
    State(#[from] StateError),
    /// The message lacks a required property.
    #[error(transparent)]
    Access(#[from] AccessError),
}

impl From<NegotiationError> for DspFailure {
    fn from(error: NegotiationError) -> Self {
        match error {
            NegotiationError::NotFound(_) => Self::new(ErrorType::NotFound, error.to_string()),
            NegotiationError::State(error) => error.into(),
            NegotiationError::Access(error) => error.into(),
        }
    }
}

/// Transfer process manager errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// No transfer process has the given id.
    #[error("Transfer process not found for id: {0}")]
    NotFound(String),
    /// The start message carried a data address the caller rejected.
    #[error("Data address predicate failed")]
    DataAddressRejected,
    /// The message is not legal in the process state.
    #[error(transparent)]
    State(#[from] StateError),
    /// The message lacks a required property.
    #[error(transparent)]
    Access(#[from] AccessError),
}

impl From<TransferError> for DspFailure {
    fn from(error: TransferError) -> Self {
        match error {
            TransferError::NotFound(_) => Self::new(ErrorType::NotFound, error.to_string()),
            other => Self::bad_request(other.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Negotiation Managers
// ============================================================================

/// Receives negotiation lifecycle notifications. Every callback defaults to a
/// no-op.
pub trait NegotiationListener: Send + Sync {
    /// A consumer negotiation was created.
    fn negotiation_created(&self, _negotiation: &Arc<ContractNegotiation>) {}

    /// A contract request (initial or counter-offer) was received.
    fn contract_requested(&self, _negotiation: &Arc<ContractNegotiation>) {}

    /// An offer was sent or received.
    fn offered(&self, _negotiation: &Arc<ContractNegotiation>) {}

    /// The consumer accepted the last offer.
    fn accepted(&self, _negotiation: &Arc<ContractNegotiation>) {}

    /// An agreement was sent or received.
    fn agreed(&self, _negotiation: &Arc<ContractNegotiation>) {}

    /// The consumer verified the agreement.
    fn verified(&self, _negotiation: &Arc<ContractNegotiation>) {}

    /// The provider finalized the negotiation.
    fn finalized(&self, _negotiation: &Arc<ContractNegotiation>) {}

    /// Either side terminated the negotiation.
    fn terminated(&self, _negotiation: &Arc<ContractNegotiation>) {}
}

/// Operations shared by both negotiation roles.
pub trait NegotiationManager: Send + Sync {
    /// Returns the negotiation with the local process id `id`.
    ///
    /// # Errors
    /// Returns [`NegotiationError::NotFound`] for unknown ids.
    fn find_by_id(&self, id: &str) -> Result<Arc<ContractNegotiation>, NegotiationError>;

    /// Returns the negotiation whose counter-party process id is `id`.
    fn find_by_correlation_id(&self, id: &str) -> Option<Arc<ContractNegotiation>>;

    /// Returns all negotiations.
    fn negotiations(&self) -> Vec<Arc<ContractNegotiation>>;

    /// Registers a listener.
    fn register_listener(&self, listener: Arc<dyn NegotiationListener>) -> ListenerId;

    /// Removes a listener; unknown ids are ignored.
    fn deregister_listener(&self, id: ListenerId);

    /// Applies a termination message and returns the negotiation response.
    ///
    /// # Errors
    /// Returns [`NegotiationError`] when the negotiation is unknown or
    /// already final.
    fn handle_termination(&self, message: &JsonObject) -> Result<JsonObject, NegotiationError>;

    /// Records a termination sent by this side.
    ///
    /// # Errors
    /// Returns [`NegotiationError`] when the transition is not legal.
    fn terminated(&self, id: &str) -> Result<(), NegotiationError>;
}

/// Negotiation manager of a provider.
pub trait ProviderNegotiationManager: NegotiationManager {
    /// Applies a contract request: a new negotiation when it carries no
    /// provider process id, otherwise a counter-offer.
    ///
    /// # Errors
    /// Returns [`NegotiationError`] when the message is incomplete or the
    /// counter-offer is not legal.
    fn handle_contract_request(
        &self,
        message: &JsonObject,
        counter_party_id: &str,
    ) -> Result<JsonObject, NegotiationError>;

    /// Applies an `ACCEPTED` event.
    ///
    /// # Errors
    /// Returns [`NegotiationError`] when the transition is not legal.
    fn handle_accepted(&self, message: &JsonObject) -> Result<(), NegotiationError>;

    /// Applies an agreement verification.
    ///
    /// # Errors
    /// Returns [`NegotiationError`] when the transition is not legal.
    fn handle_verified(&self, message: &JsonObject) -> Result<(), NegotiationError>;

    /// Records an offer sent by this side.
    ///
    /// # Errors
    /// Returns [`NegotiationError`] when the transition is not legal.
    fn offered(&self, id: &str) -> Result<(), NegotiationError>;

    /// Records an agreement sent by this side.
    ///
    /// # Errors
    /// Returns [`NegotiationError`] when the transition is not legal.
    fn agreed(&self, id: &str) -> Result<(), NegotiationError>;

    /// Records a finalized event sent by this side.
    ///
    /// # Errors
    /// Returns [`NegotiationError`] when the transition is not legal.
    fn finalized(&self, id: &str) -> Result<(), NegotiationError>;
}

/// Negotiation manager of a consumer.
pub trait ConsumerNegotiationManager: NegotiationManager {
    /// Creates a negotiation in `INITIALIZED`.
    ///
    /// # Errors
    /// Returns [`NegotiationError`] when the negotiation cannot be built.
    fn create_negotiation(
        &self,
        dataset_id: &str,
        offer_id: &str,
        callback_address: Option<&str>,
    ) -> Result<Arc<ContractNegotiation>, NegotiationError>;

    /// Records the provider process id returned for the initial request.
    /// Moves to `REQUESTED` only from `INITIALIZED`.
    ///
    /// # Errors
    /// Returns [`NegotiationError::NotFound`] for unknown ids.
    fn contract_requested(
        &self,
        consumer_pid: &str,
        provider_pid: &str,
    ) -> Result<(), NegotiationError>;

    /// Applies an offer from the provider.
    ///
    /// # Errors
    /// Returns [`NegotiationError`] when the transition is not legal.
    fn handle_offer(&self, message: &JsonObject) -> Result<(), NegotiationError>;

    /// Applies an agreement from the provider.
    ///
    /// # Errors
    /// Returns [`NegotiationError`] when the transition is not legal.
    fn handle_agreement(&self, message: &JsonObject) -> Result<(), NegotiationError>;

    /// Applies a `FINALIZED` event.
    ///
    /// # Errors
    /// Returns [`NegotiationError`] when the transition is not legal.
    fn handle_finalized(&self, message: &JsonObject) -> Result<(), NegotiationError>;

    /// Records an `ACCEPTED` event sent by this side.
    ///
    /// # Errors
    /// Returns [`NegotiationError`] when the transition is not legal.
    fn accepted(&self, id: &str) -> Result<(), NegotiationError>;

    /// Records a verification sent by this side.
    ///
    /// # Errors
    /// Returns [`NegotiationError`] when the transition is not legal.
    fn verified(&self, id: &str) -> Result<(), NegotiationError>;
}

// ============================================================================
// SECTION: Transfer Process Managers
// ============================================================================

/// Receives transfer process notifications. Every callback defaults to a
/// no-op.
pub trait TransferProcessListener: Send + Sync {
    /// A consumer transfer process was created.
    fn transfer_initialized(&self, _process: &Arc<TransferProcess>) {}

    /// A transfer request was sent or received.
    fn requested(&self, _process: &Arc<TransferProcess>) {}

    /// The transfer started.
    fn started(&self, _process: &Arc<TransferProcess>) {}

    /// The transfer completed.
    fn completed(&self, _process: &Arc<TransferProcess>) {}

    /// The transfer was suspended.
    fn suspended(&self, _process: &Arc<TransferProcess>) {}

    /// The transfer was terminated.
    fn terminated(&self, _process: &Arc<TransferProcess>) {}
}

/// Check applied to the data address carried by a start message.
pub type DataAddressPredicate<'a> = &'a dyn Fn(Option<&DataAddress>) -> bool;

/// Operations shared by both transfer roles.
pub trait TransferProcessManager: Send + Sync {
    /// Returns the process with the local id `id`.
    ///
    /// # Errors
    /// Returns [`TransferError::NotFound`] for unknown ids.
    fn find_by_id(&self, id: &str) -> Result<Arc<TransferProcess>, TransferError>;

    /// Returns the process whose counter-party process id is `id`.
    fn find_by_correlation_id(&self, id: &str) -> Option<Arc<TransferProcess>>;

    /// Registers a listener.
    fn register_listener(&self, listener: Arc<dyn TransferProcessListener>) -> ListenerId;

    /// Removes a listener; unknown ids are ignored.
    fn deregister_listener(&self, id: ListenerId);

    /// Records a start sent by this side.
    ///
    /// # Errors
    /// Returns [`TransferError`] when the transition is not legal.
    fn started(&self, id: &str) -> Result<(), TransferError>;

    /// Records a completion sent by this side.
    ///
    /// # Errors
    /// Returns [`TransferError`] when the transition is not legal.
    fn completed(&self, id: &str) -> Result<(), TransferError>;

    /// Records a suspension sent by this side.
    ///
    /// # Errors
    /// Returns [`TransferError`] when the transition is not legal.
    fn suspended(&self, id: &str) -> Result<(), TransferError>;

    /// Records a termination sent by this side.
    ///
    /// # Errors
    /// Returns [`TransferError`] when the transition is not legal.
    fn terminated(&self, id: &str) -> Result<(), TransferError>;

    /// Applies a start message whose data address satisfies `predicate`.
    ///
    /// # Errors
    /// Returns [`TransferError::DataAddressRejected`] when the predicate
    /// fails, or another [`TransferError`] when the transition is not legal.
    fn handle_start(
        &self,
        message: &JsonObject,
        predicate: DataAddressPredicate<'_>,
    ) -> Result<JsonObject, TransferError>;

    /// Applies a completion message.
    ///
    /// # Errors
    /// Returns [`TransferError`] when the transition is not legal.
    fn handle_completion(&self, message: &JsonObject) -> Result<JsonObject, TransferError>;

    /// Applies a suspension message.
    ///
    /// # Errors
    /// Returns [`TransferError`] when the transition is not legal.
    fn handle_suspension(&self, message: &JsonObject) -> Result<JsonObject, TransferError>;

    /// Applies a termination message.
    ///
    /// # Errors
    /// Returns [`TransferError`] when the transition is not legal.
    fn handle_termination(&self, message: &JsonObject) -> Result<JsonObject, TransferError>;
}

/// Transfer process manager of a provider.
pub trait ProviderTransferProcessManager: TransferProcessManager {
    /// Applies a transfer request; repeated requests for the same consumer
    /// process return the existing process.
    ///
    /// # Errors
    /// Returns [`TransferError`] when the message is incomplete.
    fn handle_transfer_request(
        &self,
        message: &JsonObject,
        counter_party_id: &str,
    ) -> Result<JsonObject, TransferError>;
}

/// Transfer process manager of a consumer.
pub trait ConsumerTransferProcessManager: TransferProcessManager {
    /// Creates a transfer process in `INITIALIZED`.
    fn create_transfer_process(
        &self,
        agreement_id: &str,
        format: &str,
        data_address: Option<DataAddress>,
    ) -> Arc<TransferProcess>;

    /// Records the provider process id and moves to `REQUESTED`.
    ///
    /// # Errors
    /// Returns [`TransferError`] when the process is unknown or the
    /// transition is not legal.
    fn transfer_requested(
        &self,
        consumer_pid: &str,
        provider_pid: &str,
    ) -> Result<(), TransferError>;
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Datasets a connector offers.
pub trait CatalogManager: Send + Sync {
    /// Adds or replaces a dataset.
    fn add_dataset(&self, dataset: Dataset);

    /// Returns a snapshot of the catalog.
    fn catalog(&self) -> Catalog;

    /// Returns the dataset with `dataset_id`.
    fn dataset(&self, dataset_id: &str) -> Option<Dataset>;
}

// ============================================================================
// SECTION: Connector
// ============================================================================

/// A Dataspace Protocol participant.
pub trait Connector: Send + Sync {
    /// Returns the provider negotiation manager.
    fn provider_negotiation_manager(&self) -> Arc<dyn ProviderNegotiationManager>;

    /// Returns the consumer negotiation manager.
    fn consumer_negotiation_manager(&self) -> Arc<dyn ConsumerNegotiationManager>;

    /// Returns the provider transfer process manager.
    fn provider_transfer_manager(&self) -> Arc<dyn ProviderTransferProcessManager>;

    /// Returns the consumer transfer process manager.
    fn consumer_transfer_manager(&self) -> Arc<dyn ConsumerTransferProcessManager>;

    /// Returns the catalog manager.
    fn catalog_manager(&self) -> Arc<dyn CatalogManager>;

    /// Returns the protocol version metadata document.
    fn metadata(&self) -> JsonObject;
}
