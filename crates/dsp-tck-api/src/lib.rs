// crates/dsp-tck-api/src/lib.rs
// ============================================================================
// Module: DSP TCK API Library
// Description: Dataspace Protocol model shared by the system and the suite.
// Purpose: Provide state machines, message builders, and connector contracts.
// Dependencies: dsp-tck-core, rand, serde_json, thiserror, time, tracing
// ============================================================================

//! ## Overview
//! The API crate models the Dataspace Protocol from the TCK's point of view:
//! contract negotiation and transfer process state machines, builders for
//! every compact message the TCK sends, accessors for expanded messages it
//! receives, and the connector, manager, and mock contracts that pipelines
//! and scenarios program against.
//! Invariants:
//! - State machines reject illegal transitions without mutating state.
//! - Builders emit compact JSON-LD that validates against the DSP schemas.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod access;
pub mod catalog;
pub mod connector;
pub mod constants;
pub mod identifiers;
pub mod messages;
pub mod mock;
pub mod negotiation;
pub mod result;
pub mod state;
pub mod transfer;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use access::AccessError;
pub use catalog::Catalog;
pub use catalog::Dataset;
pub use connector::CatalogManager;
pub use connector::Connector;
pub use connector::ConsumerNegotiationManager;
pub use connector::ConsumerTransferProcessManager;
pub use connector::ListenerId;
pub use connector::NegotiationError;
pub use connector::NegotiationListener;
pub use connector::NegotiationManager;
pub use connector::ProviderNegotiationManager;
pub use connector::ProviderTransferProcessManager;
pub use connector::TransferError;
pub use connector::TransferProcessListener;
pub use connector::TransferProcessManager;
pub use identifiers::random_uuid;
pub use mock::ConsumerNegotiationMock;
pub use mock::ConsumerTransferProcessMock;
pub use mock::MockError;
pub use mock::NegotiationMock;
pub use mock::ProviderNegotiationMock;
pub use mock::ProviderTransferProcessMock;
pub use mock::TransferProcessMock;
pub use negotiation::ContractNegotiation;
pub use negotiation::NegotiationState;
pub use result::DspFailure;
pub use result::ErrorType;
pub use result::FallibleDspHandler;
pub use state::ParticipantRole;
pub use state::StateError;
pub use transfer::DataAddress;
pub use transfer::TransferProcess;
pub use transfer::TransferState;
