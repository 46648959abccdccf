// crates/dsp-tck-api/src/negotiation.rs
// ============================================================================
// Module: Contract Negotiation State Machine
// Description: Contract negotiation states, transitions, and process data.
// Purpose: Track one side of a DSP contract negotiation.
// Dependencies: dsp-tck-core, tracing, crate::state, crate::identifiers
// ============================================================================

//! ## Overview
//! A [`ContractNegotiation`] is shared between the connector that owns it, the
//! mocks that react to its transitions, and the pipelines that drive it, so
//! it is always held in an [`Arc`] and mutated through interior locking.
//! Invariants:
//! - `id` is assigned at build time and never changes.
//! - Every state change passes [`check_transition`].
//! - Listeners observe the previous state after the new state is visible.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

use dsp_tck_core::JsonObject;
use tracing::debug;

use crate::identifiers::random_uuid;
use crate::state::ParticipantRole;
use crate::state::ProtocolState;
use crate::state::StateError;
use crate::state::check_transition;

// ============================================================================
// SECTION: States
// ============================================================================

/// Contract negotiation states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum NegotiationState {
    /// Created locally; no message exchanged yet.
    #[default]
    Initialized,
    /// Consumer requested a contract.
    Requested,
    /// Provider offered a contract.
    Offered,
    /// Consumer accepted the last offer.
    Accepted,
    /// Provider sent an agreement.
    Agreed,
    /// Consumer verified the agreement.
    Verified,
    /// Provider finalized the agreement.
    Finalized,
    /// Either side terminated the negotiation.
    Terminated,
}

impl NegotiationState {
    /// Every state in protocol order.
    pub const ALL: [Self; 8] = [
        Self::Initialized,
        Self::Requested,
        Self::Offered,
        Self::Accepted,
        Self::Agreed,
        Self::Verified,
        Self::Finalized,
        Self::Terminated,
    ];

    /// Returns the protocol name of the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initialized => "INITIALIZED",
            Self::Requested => "REQUESTED",
            Self::Offered => "OFFERED",
            Self::Accepted => "ACCEPTED",
            Self::Agreed => "AGREED",
            Self::Verified => "VERIFIED",
            Self::Finalized => "FINALIZED",
            Self::Terminated => "TERMINATED",
        }
    }

    /// Parses a protocol state name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.as_str() == name)
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ProtocolState for NegotiationState {
    fn transitions(self) -> &'static [Self] {
        match self {
            Self::Initialized => &[Self::Requested, Self::Offered, Self::Terminated],
            Self::Requested => &[Self::Offered, Self::Agreed, Self::Terminated],
            Self::Offered => &[Self::Requested, Self::Offered, Self::Accepted, Self::Terminated],
            Self::Accepted => &[Self::Agreed, Self::Terminated],
            Self::Agreed => &[Self::Verified, Self::Terminated],
            Self::Verified => &[Self::Finalized, Self::Terminated],
            Self::Finalized | Self::Terminated => &[],
        }
    }

    fn requires_correlation_id(self) -> bool {
        matches!(self, Self::Requested | Self::Offered)
    }
}

// ============================================================================
// SECTION: Contract Negotiation
// ============================================================================

/// Callback invoked with the previous state after a transition.
pub type NegotiationStateListener =
    Arc<dyn Fn(NegotiationState, &ContractNegotiation) + Send + Sync>;

/// Mutable negotiation data guarded by the state lock.
#[derive(Debug)]
struct NegotiationData {
    /// Current state.
    state: NegotiationState,
    /// Counter-party process id.
    correlation_id: Option<String>,
    /// Offers exchanged so far, oldest first.
    offers: Vec<JsonObject>,
    /// Agreement once received.
    agreement: Option<JsonObject>,
}

/// One side of a contract negotiation.
///
/// # Invariants
/// - `role` decides whether `id` is the consumer or provider process id.
/// - Offers are only appended, never removed.
pub struct ContractNegotiation {
    /// Local process id.
    id: String,
    /// Side that owns this negotiation.
    role: ParticipantRole,
    /// Offer the negotiation is about.
    offer_id: String,
    /// Dataset the offer targets.
    dataset_id: String,
    /// Participant on the other side.
    counter_party_id: Option<String>,
    /// Counter-party callback address without trailing `/`.
    callback_address: Option<String>,
    /// Guarded mutable data.
    data: RwLock<NegotiationData>,
    /// Transition listeners.
    listeners: Vec<NegotiationStateListener>,
}

impl fmt::Debug for ContractNegotiation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractNegotiation")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("state", &self.state())
            .field("correlation_id", &self.correlation_id())
            .finish_non_exhaustive()
    }
}

impl ContractNegotiation {
    /// Starts building a negotiation.
    #[must_use]
    pub fn builder() -> ContractNegotiationBuilder {
        ContractNegotiationBuilder::default()
    }

    /// Returns the local process id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the owning side.
    #[must_use]
    pub const fn role(&self) -> ParticipantRole {
        self.role
    }

    /// Returns the offer id.
    #[must_use]
    pub fn offer_id(&self) -> &str {
        &self.offer_id
    }

    /// Returns the dataset id.
    #[must_use]
    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    /// Returns the counter-party participant id.
    #[must_use]
    pub fn counter_party_id(&self) -> Option<&str> {
        self.counter_party_id.as_deref()
    }

    /// Returns the counter-party callback address.
    #[must_use]
    pub fn callback_address(&self) -> Option<&str> {
        self.callback_address.as_deref()
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> NegotiationState {
        self.read().state
    }

    /// Returns the counter-party process id once known.
    #[must_use]
    pub fn correlation_id(&self) -> Option<String> {
        self.read().correlation_id.clone()
    }

    /// Returns the consumer process id; empty while unknown.
    #[must_use]
    pub fn consumer_pid(&self) -> String {
        match self.role {
            ParticipantRole::Consumer => self.id.clone(),
            ParticipantRole::Provider => self.correlation_id().unwrap_or_default(),
        }
    }

    /// Returns the provider process id; empty while unknown.
    #[must_use]
    pub fn provider_pid(&self) -> String {
        match self.role {
            ParticipantRole::Provider => self.id.clone(),
            ParticipantRole::Consumer => self.correlation_id().unwrap_or_default(),
        }
    }

    /// Returns all offers, oldest first.
    #[must_use]
    pub fn offers(&self) -> Vec<JsonObject> {
        self.read().offers.clone()
    }

    /// Returns the most recent offer.
    #[must_use]
    pub fn last_offer(&self) -> Option<JsonObject> {
        self.read().offers.last().cloned()
    }

    /// Returns the agreement once received.
    #[must_use]
    pub fn agreement(&self) -> Option<JsonObject> {
        self.read().agreement.clone()
    }

    /// Transitions to `state`.
    ///
    /// # Errors
    /// Returns [`StateError`] when the transition is not legal.
    pub fn transition(&self, state: NegotiationState) -> Result<(), StateError> {
        self.transition_with(state, |_| {})
    }

    /// Transitions to `state`, then runs `work` and the listeners.
    ///
    /// # Errors
    /// Returns [`StateError`] when the transition is not legal; `work` does
    /// not run in that case.
    pub fn transition_with<F>(&self, state: NegotiationState, work: F) -> Result<(), StateError>
    where
        F: FnOnce(&Self),
    {
        let previous = self.update(state, |_| {}, false)?;
        self.after_transition(previous, work);
        Ok(())
    }

    /// Records the counter-party process id and transitions to `state`.
    ///
    /// # Errors
    /// Returns [`StateError`] when the transition is not legal; the
    /// correlation id is left unchanged in that case.
    pub fn set_correlation_id(
        &self,
        correlation_id: &str,
        state: NegotiationState,
    ) -> Result<(), StateError> {
        let previous = self.update(
            state,
            |data| data.correlation_id = Some(correlation_id.to_string()),
            true,
        )?;
        self.after_transition(previous, |_| {});
        Ok(())
    }

    /// Records the counter-party process id and transitions to `state` only
    /// while the negotiation is still in `expected`.
    ///
    /// In any other state a missing correlation id is recorded and `false` is
    /// returned, so a late response never rewinds a negotiation that a
    /// faster counter-party message already advanced.
    ///
    /// # Errors
    /// Returns [`StateError`] when the negotiation is in `expected` but the
    /// transition is not legal.
    pub fn set_correlation_id_if(
        &self,
        expected: NegotiationState,
        correlation_id: &str,
        state: NegotiationState,
    ) -> Result<bool, StateError> {
        let mut data = self.write();
        let current = data.state;
        if current != expected {
            if data.correlation_id.is_none() {
                data.correlation_id = Some(correlation_id.to_string());
            }
            return Ok(false);
        }
        check_transition(current, state, true)?;
        data.correlation_id = Some(correlation_id.to_string());
        data.state = state;
        drop(data);
        debug!(negotiation = %self.id, from = %current, to = %state, "negotiation transition");
        self.after_transition(current, |_| {});
        Ok(true)
    }

    /// Records the counter-party process id without a state change.
    pub fn set_correlation_id_only(&self, correlation_id: &str) {
        self.write().correlation_id = Some(correlation_id.to_string());
    }

    /// Transitions to `state` and appends an offer.
    ///
    /// # Errors
    /// Returns [`StateError`] when the transition is not legal; the offer is
    /// not stored in that case.
    pub fn store_offer(
        &self,
        offer: JsonObject,
        state: NegotiationState,
    ) -> Result<(), StateError> {
        let previous = self.update(state, |data| data.offers.push(offer), false)?;
        self.after_transition(previous, |_| {});
        Ok(())
    }

    /// Stores the agreement and transitions to [`NegotiationState::Agreed`].
    ///
    /// # Errors
    /// Returns [`StateError`] when the negotiation cannot become agreed.
    pub fn store_agreement(&self, agreement: JsonObject) -> Result<(), StateError> {
        let previous =
            self.update(NegotiationState::Agreed, |data| data.agreement = Some(agreement), false)?;
        self.after_transition(previous, |_| {});
        Ok(())
    }

    /// Checks the transition, then applies `mutate` and the new state under
    /// one write lock. Returns the state that was left.
    fn update<F>(
        &self,
        state: NegotiationState,
        mutate: F,
        sets_correlation: bool,
    ) -> Result<NegotiationState, StateError>
    where
        F: FnOnce(&mut NegotiationData),
    {
        let mut data = self.write();
        let current = data.state;
        check_transition(current, state, sets_correlation || data.correlation_id.is_some())?;
        mutate(&mut data);
        data.state = state;
        drop(data);
        debug!(negotiation = %self.id, from = %current, to = %state, "negotiation transition");
        Ok(current)
    }

    /// Runs post-transition work, then notifies listeners outside the lock.
    fn after_transition<F: FnOnce(&Self)>(&self, previous: NegotiationState, work: F) {
        work(self);
        for listener in &self.listeners {
            listener(previous, self);
        }
    }

    /// Acquires the data lock for reading.
    fn read(&self) -> RwLockReadGuard<'_, NegotiationData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquires the data lock for writing.
    fn write(&self) -> RwLockWriteGuard<'_, NegotiationData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builder for [`ContractNegotiation`].
#[derive(Default)]
pub struct ContractNegotiationBuilder {
    /// Counter-party process id.
    correlation_id: Option<String>,
    /// Offer id.
    offer_id: String,
    /// Dataset id.
    dataset_id: String,
    /// Counter-party participant id.
    counter_party_id: Option<String>,
    /// Counter-party callback address.
    callback_address: Option<String>,
    /// Initial state.
    state: NegotiationState,
    /// Owning side.
    role: ParticipantRole,
    /// Transition listeners.
    listeners: Vec<NegotiationStateListener>,
}

impl ContractNegotiationBuilder {
    /// Sets the counter-party process id.
    #[must_use]
    pub fn correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Sets the offer id.
    #[must_use]
    pub fn offer_id(mut self, offer_id: impl Into<String>) -> Self {
        self.offer_id = offer_id.into();
        self
    }

    /// Sets the dataset id.
    #[must_use]
    pub fn dataset_id(mut self, dataset_id: impl Into<String>) -> Self {
        self.dataset_id = dataset_id.into();
        self
    }

    /// Sets the counter-party participant id.
    #[must_use]
    pub fn counter_party_id(mut self, counter_party_id: impl Into<String>) -> Self {
        self.counter_party_id = Some(counter_party_id.into());
        self
    }

    /// Sets the counter-party callback address.
    #[must_use]
    pub fn callback_address(mut self, callback_address: impl Into<String>) -> Self {
        self.callback_address = Some(callback_address.into());
        self
    }

    /// Sets the initial state.
    #[must_use]
    pub const fn state(mut self, state: NegotiationState) -> Self {
        self.state = state;
        self
    }

    /// Sets the owning side.
    #[must_use]
    pub const fn role(mut self, role: ParticipantRole) -> Self {
        self.role = role;
        self
    }

    /// Adds a transition listener.
    #[must_use]
    pub fn listener(mut self, listener: NegotiationStateListener) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Builds the negotiation with a fresh process id.
    ///
    /// # Errors
    /// Returns [`StateError::CorrelationIdNotSet`] when the initial state
    /// requires a correlation id that was not supplied.
    pub fn build(self) -> Result<ContractNegotiation, StateError> {
        if self.state.requires_correlation_id() && self.correlation_id.is_none() {
            return Err(StateError::CorrelationIdNotSet);
        }
        let callback_address =
            self.callback_address.map(|address| address.trim_end_matches('/').to_string());
        Ok(ContractNegotiation {
            id: random_uuid(),
            role: self.role,
            offer_id: self.offer_id,
            dataset_id: self.dataset_id,
            counter_party_id: self.counter_party_id,
            callback_address,
            data: RwLock::new(NegotiationData {
                state: self.state,
                correlation_id: self.correlation_id,
                offers: Vec::new(),
                agreement: None,
            }),
            listeners: self.listeners,
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
