// crates/dsp-tck-system/src/client/mod.rs
// ============================================================================
// Module: Connector Clients
// Description: Clients the TCK uses to call the connector under test.
// Purpose: Send protocol messages over HTTP, or to a local connector.
// Dependencies: dsp-tck-api, dsp-tck-core, reqwest, thiserror, url
// ============================================================================

//! ## Overview
//! Each client trait has an HTTP implementation, used against a remote
//! connector under test, and a local implementation that feeds messages
//! straight into an in-process [`crate::connector::TckConnector`]. Clients
//! cover contract negotiation, transfer processes, the catalog and version
//! metadata.
//! Invariants:
//! - Outgoing messages are validated before they leave the TCK.
//! - Returned documents are expanded JSON-LD, except metadata which is plain JSON.
//! - An operation called with `expect_error` fails when no error occurs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use dsp_tck_api::AccessError;
use dsp_tck_api::NegotiationError;
use dsp_tck_api::TransferError;
use dsp_tck_core::JsonObject;
use dsp_tck_core::MessageError;
use thiserror::Error;

mod catalog;
mod http;
mod local;
mod negotiation;
mod transfer;

pub use catalog::HttpCatalogClient;
pub use catalog::HttpMetadataClient;
pub use catalog::LocalCatalogClient;
pub use catalog::LocalMetadataClient;
pub use http::HttpExecutor;
pub use http::HttpReply;
pub use negotiation::HttpConsumerNegotiationClient;
pub use negotiation::HttpProviderNegotiationClient;
pub use negotiation::LocalConsumerNegotiationClient;
pub use negotiation::LocalProviderNegotiationClient;
pub use transfer::HttpConsumerTransferProcessClient;
pub use transfer::HttpProviderTransferProcessClient;
pub use transfer::LocalConsumerTransferProcessClient;
pub use transfer::LocalProviderTransferProcessClient;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A URL could not be parsed or joined.
    #[error("invalid url {url}: {message}")]
    InvalidUrl {
        /// Offending URL.
        url: String,
        /// Parser message.
        message: String,
    },
    /// The HTTP exchange failed below the protocol level.
    #[error("http request to {url} failed: {message}")]
    Http {
        /// Request URL.
        url: String,
        /// Transport error text.
        message: String,
    },
    /// The connector under test answered in a way the protocol forbids.
    #[error("{0}")]
    Verification(String),
    /// A message could not be validated, expanded, or written.
    #[error(transparent)]
    Message(#[from] MessageError),
    /// A message lacks a required property.
    #[error(transparent)]
    Access(#[from] AccessError),
    /// The local connector rejected a negotiation message.
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),
    /// The local connector rejected a transfer message.
    #[error(transparent)]
    Transfer(#[from] TransferError),
}

impl ClientError {
    /// Returns true when a local manager rejected a message because it is not
    /// legal in the process state.
    #[must_use]
    pub const fn is_state_error(&self) -> bool {
        matches!(
            self,
            Self::Negotiation(NegotiationError::State(_)) | Self::Transfer(TransferError::State(_))
        )
    }
}

// ============================================================================
// SECTION: Negotiation Clients
// ============================================================================

/// Calls a connector under test that plays the provider.
pub trait ProviderNegotiationClient: Send + Sync {
    /// Sends an initial contract request and returns the expanded
    /// negotiation, or `None` when the expected error occurred.
    ///
    /// # Errors
    /// Returns [`ClientError`] when the exchange fails or the error
    /// expectation is not met.
    fn contract_request(
        &self,
        message: &JsonObject,
        counter_party_id: &str,
        expect_error: bool,
    ) -> Result<Option<JsonObject>, ClientError>;

    /// Sends a counter-offer for an existing negotiation.
    ///
    /// # Errors
    /// Returns [`ClientError`] when the exchange fails or the error
    /// expectation is not met.
    fn counter_offer_request(
        &self,
        message: &JsonObject,
        counter_party_id: &str,
        expect_error: bool,
    ) -> Result<(), ClientError>;

    /// Sends an `ACCEPTED` event.
    ///
    /// # Errors
    /// Returns [`ClientError`] when the provider rejects the event.
    fn accept(&self, event: &JsonObject) -> Result<(), ClientError>;

    /// Sends an agreement verification.
    ///
    /// # Errors
    /// Returns [`ClientError`] when the exchange fails or the error
    /// expectation is not met.
    fn verify(&self, message: &JsonObject, expect_error: bool) -> Result<(), ClientError>;

    /// Sends a termination for the provider negotiation `provider_pid`.
    ///
    /// # Errors
    /// Returns [`ClientError`] when the exchange fails or the error
    /// expectation is not met.
    fn terminate(
        &self,
        provider_pid: &str,
        message: &JsonObject,
        expect_error: bool,
    ) -> Result<(), ClientError>;

    /// Fetches the expanded provider negotiation.
    ///
    /// # Errors
    /// Returns [`ClientError`] when the negotiation cannot be fetched.
    fn get_negotiation(&self, provider_pid: &str) -> Result<JsonObject, ClientError>;
}

/// Calls a connector under test that plays the consumer.
pub trait ConsumerNegotiationClient: Send + Sync {
    /// Asks the consumer to start a negotiation with the TCK.
    ///
    /// # Errors
    /// Returns [`ClientError`] when the consumer rejects the request.
    fn initiate_request(&self, dataset_id: &str, offer_id: &str) -> Result<(), ClientError>;

    /// Sends an offer to the consumer callback address.
    ///
    /// # Errors
    /// Returns [`ClientError`] when the exchange fails or the error
    /// expectation is not met.
    fn contract_offer(
        &self,
        consumer_pid: &str,
        message: &JsonObject,
        callback_address: &str,
        expect_error: bool,
    ) -> Result<(), ClientError>;

    /// Sends an agreement to the consumer callback address.
    ///
    /// # Errors
    /// Returns [`ClientError`] when the exchange fails or the error
    /// expectation is not met.
    fn contract_agreement(
        &self,
        consumer_pid: &str,
        message: &JsonObject,
        callback_address: &str,
        expect_error: bool,
    ) -> Result<(), ClientError>;

    /// Sends a `FINALIZED` event to the consumer callback address.
    ///
    /// # Errors
    /// Returns [`ClientError`] when the exchange fails or the error
    /// expectation is not met.
    fn finalize(
        &self,
        consumer_pid: &str,
        event: &JsonObject,
        callback_address: &str,
        expect_error: bool,
    ) -> Result<(), ClientError>;

    /// Sends a termination to the consumer callback address.
    ///
    /// # Errors
    /// Returns [`ClientError`] when the exchange fails or the error
    /// expectation is not met.
    fn terminate(
        &self,
        consumer_pid: &str,
        message: &JsonObject,
        callback_address: &str,
        expect_error: bool,
    ) -> Result<(), ClientError>;

    /// Fetches the expanded consumer negotiation.
    ///
    /// # Errors
    /// Returns [`ClientError`] when the negotiation cannot be fetched.
    fn get_negotiation(
        &self,
        consumer_pid: &str,
        callback_address: &str,
    ) -> Result<JsonObject, ClientError>;
}

// ============================================================================
// SECTION: Transfer Process Clients
// ============================================================================

/// Transfer messages either side may send. `counter_party_pid` is the
/// process id of the connector under test; `callback_address` is where a
/// consumer under test receives messages and is ignored for providers.
pub trait TransferProcessClient: Send + Sync {
    /// Sends a start message.
    ///
    /// # Errors
    /// Returns [`ClientError`] when the exchange fails or the error
    /// expectation is not met.
    fn start_transfer(
        &self,
        counter_party_pid: &str,
        message: &JsonObject,
        callback_address: &str,
        expect_error: bool,
    ) -> Result<(), ClientError>;

    /// Sends a completion message.
    ///
    /// # Errors
    /// Returns [`ClientError`] when the exchange fails or the error
    /// expectation is not met.
    fn complete_transfer(
        &self,
        counter_party_pid: &str,
        message: &JsonObject,
        callback_address: &str,
        expect_error: bool,
    ) -> Result<(), ClientError>;

    /// Sends a suspension message.
    ///
    /// # Errors
    /// Returns [`ClientError`] when the exchange fails or the error
    /// expectation is not met.
    fn suspend_transfer(
        &self,
        counter_party_pid: &str,
        message: &JsonObject,
        callback_address: &str,
        expect_error: bool,
    ) -> Result<(), ClientError>;

    /// Sends a termination message.
    ///
    /// # Errors
    /// Returns [`ClientError`] when the exchange fails or the error
    /// expectation is not met.
    fn terminate_transfer(
        &self,
        counter_party_pid: &str,
        message: &JsonObject,
        callback_address: &str,
        expect_error: bool,
    ) -> Result<(), ClientError>;

    /// Fetches the expanded transfer process.
    ///
    /// # Errors
    /// Returns [`ClientError`] when the process cannot be fetched.
    fn get_transfer_process(
        &self,
        counter_party_pid: &str,
        callback_address: &str,
    ) -> Result<JsonObject, ClientError>;
}

/// Calls a connector under test that provides data.
pub trait ProviderTransferProcessClient: TransferProcessClient {
    /// Sends a transfer request and returns the expanded transfer process,
    /// or `None` when the expected error occurred.
    ///
    /// # Errors
    /// Returns [`ClientError`] when the exchange fails or the error
    /// expectation is not met.
    fn transfer_request(
        &self,
        message: &JsonObject,
        counter_party_id: &str,
        expect_error: bool,
    ) -> Result<Option<JsonObject>, ClientError>;
}

/// Calls a connector under test that consumes data.
pub trait ConsumerTransferProcessClient: TransferProcessClient {
    /// Asks the consumer to request a transfer from the TCK.
    ///
    /// # Errors
    /// Returns [`ClientError`] when the consumer rejects the request.
    fn initiate_transfer_request(
        &self,
        agreement_id: &str,
        format: &str,
    ) -> Result<(), ClientError>;
}

// ============================================================================
// SECTION: Catalog and Metadata Clients
// ============================================================================

/// Queries the catalog of the connector under test.
pub trait CatalogClient: Send + Sync {
    /// Sends a catalog request and returns the expanded catalog.
    ///
    /// # Errors
    /// Returns [`ClientError`] when the request fails.
    fn get_catalog(&self, message: &JsonObject) -> Result<JsonObject, ClientError>;

    /// Fetches one dataset; with `expect_error` the expanded error document
    /// is returned instead.
    ///
    /// # Errors
    /// Returns [`ClientError`] when the exchange fails or the error
    /// expectation is not met.
    fn get_dataset(&self, dataset_id: &str, expect_error: bool) -> Result<JsonObject, ClientError>;
}

/// Fetches the protocol version metadata of the connector under test.
pub trait MetadataClient: Send + Sync {
    /// Returns the plain JSON version document.
    ///
    /// # Errors
    /// Returns [`ClientError`] when the request fails.
    fn get_metadata(&self) -> Result<JsonObject, ClientError>;
}

// ============================================================================
// SECTION: Tests
// ============================================================================
