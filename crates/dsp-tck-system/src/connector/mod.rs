// crates/dsp-tck-system/src/connector/mod.rs
// ============================================================================
// Module: TCK Connector
// Description: In-process reference connector used by pipelines and mocks.
// Purpose: Track the TCK side of negotiations and transfers, and serve the catalog.
// Dependencies: dsp-tck-api, dsp-tck-core, serde_json, tracing
// ============================================================================

//! ## Overview
//! [`TckConnector`] bundles the managers of one participant. The launcher
//! creates one consumer connector and one provider connector per scenario
//! scope; in local mode a second pair plays the connector under test.
//! Invariants:
//! - Each connector owns its processes; nothing is shared across scopes.
//! - Listener callbacks run on the caller thread after the state change.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use dsp_tck_api::CatalogManager;
use dsp_tck_api::Connector;
use dsp_tck_api::ConsumerNegotiationManager;
use dsp_tck_api::ConsumerTransferProcessManager;
use dsp_tck_api::ListenerId;
use dsp_tck_api::ParticipantRole;
use dsp_tck_api::ProviderNegotiationManager;
use dsp_tck_api::ProviderTransferProcessManager;
use dsp_tck_core::JsonObject;
use serde_json::json;

mod catalog;
mod negotiation;
mod transfer;

pub use catalog::TckCatalogManager;
pub use negotiation::TckConsumerNegotiationManager;
pub use negotiation::TckProviderNegotiationManager;
pub use transfer::TckTransferProcessManager;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Protocol version advertised by the TCK connector.
pub const PROTOCOL_VERSION: &str = "2025-1";
/// Path advertised for [`PROTOCOL_VERSION`].
pub const PROTOCOL_PATH: &str = "http://example.com/dsp/2025-1";

// ============================================================================
// SECTION: Listener Registry
// ============================================================================

/// Registered listeners with stable ids.
///
/// # Invariants
/// - Notification iterates a snapshot, so a listener may deregister itself.
pub(crate) struct ListenerRegistry<L: ?Sized> {
    /// Next id to hand out.
    next_id: AtomicU64,
    /// Listeners in registration order.
    listeners: RwLock<Vec<(ListenerId, Arc<L>)>>,
}

impl<L: ?Sized> ListenerRegistry<L> {
    /// Creates an empty registry.
    pub(crate) const fn new() -> Self {
        Self { next_id: AtomicU64::new(1), listeners: RwLock::new(Vec::new()) }
    }

    /// Adds a listener and returns its id.
    pub(crate) fn register(&self, listener: Arc<L>) -> ListenerId {
        let id = ListenerId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().unwrap_or_else(PoisonError::into_inner).push((id, listener));
        id
    }

    /// Removes a listener; unknown ids are ignored.
    pub(crate) fn deregister(&self, id: ListenerId) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(registered, _)| *registered != id);
    }

    /// Calls `notify` for every listener registered at call time.
    pub(crate) fn notify(&self, notify: impl Fn(&L)) {
        let snapshot: Vec<Arc<L>> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in snapshot {
            notify(&*listener);
        }
    }
}

// ============================================================================
// SECTION: Connector
// ============================================================================

/// Reference connector holding every manager of one participant.
pub struct TckConnector {
    /// Provider side negotiations.
    provider_negotiations: Arc<TckProviderNegotiationManager>,
    /// Consumer side negotiations.
    consumer_negotiations: Arc<TckConsumerNegotiationManager>,
    /// Provider side transfers.
    provider_transfers: Arc<TckTransferProcessManager>,
    /// Consumer side transfers.
    consumer_transfers: Arc<TckTransferProcessManager>,
    /// Catalog served by this participant.
    catalog: Arc<TckCatalogManager>,
}

impl TckConnector {
    /// Creates a connector with empty managers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            provider_negotiations: Arc::new(TckProviderNegotiationManager::new()),
            consumer_negotiations: Arc::new(TckConsumerNegotiationManager::new()),
            provider_transfers: Arc::new(TckTransferProcessManager::new(ParticipantRole::Provider)),
            consumer_transfers: Arc::new(TckTransferProcessManager::new(ParticipantRole::Consumer)),
            catalog: Arc::new(TckCatalogManager::new()),
        }
    }
}

impl Default for TckConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for TckConnector {
    fn provider_negotiation_manager(&self) -> Arc<dyn ProviderNegotiationManager> {
        Arc::clone(&self.provider_negotiations) as Arc<dyn ProviderNegotiationManager>
    }

    fn consumer_negotiation_manager(&self) -> Arc<dyn ConsumerNegotiationManager> {
        Arc::clone(&self.consumer_negotiations) as Arc<dyn ConsumerNegotiationManager>
    }

    fn provider_transfer_manager(&self) -> Arc<dyn ProviderTransferProcessManager> {
        Arc::clone(&self.provider_transfers) as Arc<dyn ProviderTransferProcessManager>
    }

    fn consumer_transfer_manager(&self) -> Arc<dyn ConsumerTransferProcessManager> {
        Arc::clone(&self.consumer_transfers) as Arc<dyn ConsumerTransferProcessManager>
    }

    fn catalog_manager(&self) -> Arc<dyn CatalogManager> {
        Arc::clone(&self.catalog) as Arc<dyn CatalogManager>
    }

    fn metadata(&self) -> JsonObject {
        let metadata = json!({
            "protocolVersions": [{ "version": PROTOCOL_VERSION, "path": PROTOCOL_PATH }]
        });
        metadata.as_object().cloned().unwrap_or_default()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
