// crates/dsp-tck-system/src/connector/negotiation.rs
// ============================================================================
// Module: TCK Negotiation Managers
// Description: Provider and consumer contract negotiation managers.
// Purpose: Apply negotiation messages to local negotiations and notify listeners.
// Dependencies: dsp-tck-api, dsp-tck-core, serde_json, tracing
// ============================================================================

//! ## Overview
//! Both managers keep their negotiations in a map keyed by local process id
//! and share the lookup, listener, and termination logic in
//! [`NegotiationStore`]. Handler operations take expanded messages and
//! return compact `ContractNegotiation` responses where the protocol expects
//! one.
//! Invariants:
//! - A negotiation is visible in the store before its first listener fires.
//! - A failed transition leaves the negotiation and its listeners untouched.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use dsp_tck_api::ConsumerNegotiationManager;
use dsp_tck_api::ContractNegotiation;
use dsp_tck_api::ListenerId;
use dsp_tck_api::NegotiationError;
use dsp_tck_api::NegotiationListener;
use dsp_tck_api::NegotiationManager;
use dsp_tck_api::NegotiationState;
use dsp_tck_api::ParticipantRole;
use dsp_tck_api::ProviderNegotiationManager;
use dsp_tck_api::access::AccessError;
use dsp_tck_api::access::required_map_property;
use dsp_tck_api::access::string_id_property;
use dsp_tck_api::access::string_property;
use dsp_tck_api::constants::DSPACE_PROPERTY_AGREEMENT_EXPANDED;
use dsp_tck_api::constants::DSPACE_PROPERTY_CALLBACK_ADDRESS_EXPANDED;
use dsp_tck_api::constants::DSPACE_PROPERTY_CONSUMER_PID_EXPANDED;
use dsp_tck_api::constants::DSPACE_PROPERTY_OFFER_EXPANDED;
use dsp_tck_api::constants::DSPACE_PROPERTY_PROVIDER_PID_EXPANDED;
use dsp_tck_api::constants::ID;
use dsp_tck_api::constants::ODRL_PROPERTY_TARGET_EXPANDED;
use dsp_tck_api::messages::negotiation::create_negotiation_response;
use dsp_tck_core::JsonObject;
use serde_json::Value;
use tracing::debug;

use super::ListenerRegistry;

// ============================================================================
// SECTION: Shared Store
// ============================================================================

/// Negotiations and listeners of one manager.
struct NegotiationStore {
    /// Side whose process id keys the store.
    role: ParticipantRole,
    /// Negotiations keyed by local process id.
    negotiations: RwLock<BTreeMap<String, Arc<ContractNegotiation>>>,
    /// Registered listeners.
    listeners: ListenerRegistry<dyn NegotiationListener>,
}

impl NegotiationStore {
    /// Creates an empty store for `role`.
    const fn new(role: ParticipantRole) -> Self {
        Self {
            role,
            negotiations: RwLock::new(BTreeMap::new()),
            listeners: ListenerRegistry::new(),
        }
    }

    /// Adds a negotiation.
    fn insert(&self, negotiation: &Arc<ContractNegotiation>) {
        self.negotiations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(negotiation.id().to_string(), Arc::clone(negotiation));
    }

    /// Looks up a negotiation by local id.
    fn find_by_id(&self, id: &str) -> Result<Arc<ContractNegotiation>, NegotiationError> {
        self.negotiations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| NegotiationError::NotFound(id.to_string()))
    }

    /// Looks up a negotiation by counter-party process id.
    fn find_by_correlation_id(&self, id: &str) -> Option<Arc<ContractNegotiation>> {
        self.negotiations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|negotiation| negotiation.correlation_id().as_deref() == Some(id))
            .cloned()
    }

    /// Returns every negotiation.
    fn all(&self) -> Vec<Arc<ContractNegotiation>> {
        let negotiations = self.negotiations.read().unwrap_or_else(PoisonError::into_inner);
        negotiations.values().cloned().collect()
    }

    /// Reads the local process id from an expanded message.
    fn local_id(&self, message: &JsonObject) -> Result<String, AccessError> {
        match self.role {
            ParticipantRole::Provider => {
                string_id_property(DSPACE_PROPERTY_PROVIDER_PID_EXPANDED, message)
            }
            ParticipantRole::Consumer => {
                string_id_property(DSPACE_PROPERTY_CONSUMER_PID_EXPANDED, message)
            }
        }
    }

    /// Transitions a negotiation, then notifies listeners through `notify`.
    fn transition(
        &self,
        id: &str,
        state: NegotiationState,
        notify: impl Fn(&dyn NegotiationListener, &Arc<ContractNegotiation>),
    ) -> Result<Arc<ContractNegotiation>, NegotiationError> {
        let negotiation = self.find_by_id(id)?;
        negotiation.transition(state)?;
        self.listeners.notify(|listener| notify(listener, &negotiation));
        Ok(negotiation)
    }

    /// Applies a termination message.
    fn handle_termination(&self, message: &JsonObject) -> Result<JsonObject, NegotiationError> {
        let id = self.local_id(message)?;
        debug!(negotiation = %id, "received termination message");
        let negotiation =
            self.transition(&id, NegotiationState::Terminated, |listener, negotiation| {
                listener.terminated(negotiation);
            })?;
        Ok(response(&negotiation))
    }
}

/// Builds the compact `ContractNegotiation` response for a negotiation.
fn response(negotiation: &ContractNegotiation) -> JsonObject {
    create_negotiation_response(
        &negotiation.provider_pid(),
        &negotiation.consumer_pid(),
        negotiation.state().as_str(),
    )
}

/// Implements [`NegotiationManager`] by delegating to a `store` field.
macro_rules! delegate_negotiation_manager {
    ($manager:ty) => {
        impl NegotiationManager for $manager {
            fn find_by_id(&self, id: &str) -> Result<Arc<ContractNegotiation>, NegotiationError> {
                self.store.find_by_id(id)
            }

            fn find_by_correlation_id(&self, id: &str) -> Option<Arc<ContractNegotiation>> {
                self.store.find_by_correlation_id(id)
            }

            fn negotiations(&self) -> Vec<Arc<ContractNegotiation>> {
                self.store.all()
            }

            fn register_listener(&self, listener: Arc<dyn NegotiationListener>) -> ListenerId {
                self.store.listeners.register(listener)
            }

            fn deregister_listener(&self, id: ListenerId) {
                self.store.listeners.deregister(id);
            }

            fn handle_termination(
                &self,
                message: &JsonObject,
            ) -> Result<JsonObject, NegotiationError> {
                self.store.handle_termination(message)
            }

            fn terminated(&self, id: &str) -> Result<(), NegotiationError> {
                self.store
                    .transition(id, NegotiationState::Terminated, |listener, negotiation| {
                        listener.terminated(negotiation);
                    })
                    .map(|_| ())
            }
        }
    };
}

// ============================================================================
// SECTION: Provider Manager
// ============================================================================

/// Negotiations where this connector is the provider.
pub struct TckProviderNegotiationManager {
    /// Provider negotiations.
    store: NegotiationStore,
}

impl TckProviderNegotiationManager {
    /// Creates an empty manager.
    #[must_use]
    pub const fn new() -> Self {
        Self { store: NegotiationStore::new(ParticipantRole::Provider) }
    }

    /// Applies a counter-offer to an existing negotiation.
    fn handle_counter_offer(
        &self,
        provider_pid: &str,
        message: &JsonObject,
    ) -> Result<JsonObject, NegotiationError> {
        let negotiation = self.store.find_by_id(provider_pid)?;
        let offer = required_map_property(DSPACE_PROPERTY_OFFER_EXPANDED, message)?.clone();
        negotiation.store_offer(offer, NegotiationState::Requested)?;
        self.store.listeners.notify(|listener| listener.contract_requested(&negotiation));
        Ok(response(&negotiation))
    }
}

impl Default for TckProviderNegotiationManager {
    fn default() -> Self {
        Self::new()
    }
}

delegate_negotiation_manager!(TckProviderNegotiationManager);

impl ProviderNegotiationManager for TckProviderNegotiationManager {
    fn handle_contract_request(
        &self,
        message: &JsonObject,
        counter_party_id: &str,
    ) -> Result<JsonObject, NegotiationError> {
        let consumer_pid = string_id_property(DSPACE_PROPERTY_CONSUMER_PID_EXPANDED, message)?;
        if message.contains_key(DSPACE_PROPERTY_PROVIDER_PID_EXPANDED) {
            let provider_pid = string_id_property(DSPACE_PROPERTY_PROVIDER_PID_EXPANDED, message)?;
            debug!(
                provider_pid = %provider_pid,
                consumer_pid = %consumer_pid,
                "received counter-offer"
            );
            return self.handle_counter_offer(&provider_pid, message);
        }
        debug!(consumer_pid = %consumer_pid, "received contract request");
        if let Some(existing) = self.store.find_by_correlation_id(&consumer_pid) {
            return Ok(response(&existing));
        }
        let offer = required_map_property(DSPACE_PROPERTY_OFFER_EXPANDED, message)?.clone();
        let offer_id = offer
            .get(ID)
            .and_then(Value::as_str)
            .ok_or_else(|| AccessError::NoIdValue(DSPACE_PROPERTY_OFFER_EXPANDED.to_string()))?
            .to_string();
        let dataset_id = string_id_property(ODRL_PROPERTY_TARGET_EXPANDED, &offer)?;
        let mut builder = ContractNegotiation::builder()
            .role(ParticipantRole::Provider)
            .correlation_id(consumer_pid)
            .offer_id(offer_id)
            .dataset_id(dataset_id)
            .counter_party_id(counter_party_id);
        if let Ok(callback_address) =
            string_property(DSPACE_PROPERTY_CALLBACK_ADDRESS_EXPANDED, message)
        {
            builder = builder.callback_address(callback_address);
        }
        let negotiation = Arc::new(builder.build()?);
        self.store.insert(&negotiation);
        negotiation.store_offer(offer, NegotiationState::Requested)?;
        self.store.listeners.notify(|listener| listener.contract_requested(&negotiation));
        Ok(response(&negotiation))
    }

    fn handle_accepted(&self, message: &JsonObject) -> Result<(), NegotiationError> {
        let id = self.store.local_id(message)?;
        debug!(negotiation = %id, "received accepted event");
        self.store
            .transition(&id, NegotiationState::Accepted, |listener, negotiation| {
                listener.accepted(negotiation);
            })
            .map(|_| ())
    }

    fn handle_verified(&self, message: &JsonObject) -> Result<(), NegotiationError> {
        let id = self.store.local_id(message)?;
        debug!(negotiation = %id, "received agreement verification");
        self.store
            .transition(&id, NegotiationState::Verified, |listener, negotiation| {
                listener.verified(negotiation);
            })
            .map(|_| ())
    }

    fn offered(&self, id: &str) -> Result<(), NegotiationError> {
        self.store
            .transition(id, NegotiationState::Offered, |listener, negotiation| {
                listener.offered(negotiation);
            })
            .map(|_| ())
    }

    fn agreed(&self, id: &str) -> Result<(), NegotiationError> {
        self.store
            .transition(id, NegotiationState::Agreed, |listener, negotiation| {
                listener.agreed(negotiation);
            })
            .map(|_| ())
    }

    fn finalized(&self, id: &str) -> Result<(), NegotiationError> {
        self.store
            .transition(id, NegotiationState::Finalized, |listener, negotiation| {
                listener.finalized(negotiation);
            })
            .map(|_| ())
    }
}

// ============================================================================
// SECTION: Consumer Manager
// ============================================================================

/// Negotiations where this connector is the consumer.
pub struct TckConsumerNegotiationManager {
    /// Consumer negotiations.
    store: NegotiationStore,
}

impl TckConsumerNegotiationManager {
    /// Creates an empty manager.
    #[must_use]
    pub const fn new() -> Self {
        Self { store: NegotiationStore::new(ParticipantRole::Consumer) }
    }
}

impl Default for TckConsumerNegotiationManager {
    fn default() -> Self {
        Self::new()
    }
}

delegate_negotiation_manager!(TckConsumerNegotiationManager);

impl ConsumerNegotiationManager for TckConsumerNegotiationManager {
    fn create_negotiation(
        &self,
        dataset_id: &str,
        offer_id: &str,
        callback_address: Option<&str>,
    ) -> Result<Arc<ContractNegotiation>, NegotiationError> {
        let mut builder = ContractNegotiation::builder()
            .role(ParticipantRole::Consumer)
            .dataset_id(dataset_id)
            .offer_id(offer_id);
        if let Some(callback_address) = callback_address {
            builder = builder.callback_address(callback_address);
        }
        let negotiation = Arc::new(builder.build()?);
        debug!(
            negotiation = %negotiation.id(),
            dataset = %dataset_id,
            "created consumer negotiation"
        );
        self.store.insert(&negotiation);
        self.store.listeners.notify(|listener| listener.negotiation_created(&negotiation));
        Ok(negotiation)
    }

    fn contract_requested(
        &self,
        consumer_pid: &str,
        provider_pid: &str,
    ) -> Result<(), NegotiationError> {
        let negotiation = self.store.find_by_id(consumer_pid)?;
        let advanced = negotiation.set_correlation_id_if(
            NegotiationState::Initialized,
            provider_pid,
            NegotiationState::Requested,
        )?;
        if advanced {
            self.store.listeners.notify(|listener| listener.contract_requested(&negotiation));
        }
        Ok(())
    }

    fn handle_offer(&self, message: &JsonObject) -> Result<(), NegotiationError> {
        let provider_pid = string_id_property(DSPACE_PROPERTY_PROVIDER_PID_EXPANDED, message)?;
        let id = self.store.local_id(message)?;
        debug!(negotiation = %id, provider_pid = %provider_pid, "received offer");
        let negotiation = self.store.find_by_id(&id)?;
        if negotiation.correlation_id().is_none() {
            negotiation.set_correlation_id_only(&provider_pid);
        }
        let offer = required_map_property(DSPACE_PROPERTY_OFFER_EXPANDED, message)?.clone();
        negotiation.store_offer(offer, NegotiationState::Offered)?;
        self.store.listeners.notify(|listener| listener.offered(&negotiation));
        Ok(())
    }

    fn handle_agreement(&self, message: &JsonObject) -> Result<(), NegotiationError> {
        let id = self.store.local_id(message)?;
        debug!(negotiation = %id, "received agreement");
        let negotiation = self.store.find_by_id(&id)?;
        let agreement = required_map_property(DSPACE_PROPERTY_AGREEMENT_EXPANDED, message)?.clone();
        negotiation.store_agreement(agreement)?;
        self.store.listeners.notify(|listener| listener.agreed(&negotiation));
        Ok(())
    }

    fn handle_finalized(&self, message: &JsonObject) -> Result<(), NegotiationError> {
        let id = self.store.local_id(message)?;
        debug!(negotiation = %id, "received finalized event");
        self.store
            .transition(&id, NegotiationState::Finalized, |listener, negotiation| {
                listener.finalized(negotiation);
            })
            .map(|_| ())
    }

    fn accepted(&self, id: &str) -> Result<(), NegotiationError> {
        self.store
            .transition(id, NegotiationState::Accepted, |listener, negotiation| {
                listener.accepted(negotiation);
            })
            .map(|_| ())
    }

    fn verified(&self, id: &str) -> Result<(), NegotiationError> {
        self.store
            .transition(id, NegotiationState::Verified, |listener, negotiation| {
                listener.verified(negotiation);
            })
            .map(|_| ())
    }
}
