// crates/dsp-tck-api/src/negotiation/tests.rs
// ============================================================================
// Module: Contract Negotiation Tests
// Description: Unit tests for negotiation transitions and listeners.
// Purpose: Validate the transition table, correlation rules, and callbacks.
// Dependencies: dsp-tck-api, proptest
// ============================================================================

//! ## Overview
//! Exercises legal and illegal negotiation transitions, the correlation id
//! requirement, offer storage, and listener ordering.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use dsp_tck_core::JsonObject;
use proptest::prelude::*;
use serde_json::json;

use super::ContractNegotiation;
use super::NegotiationState;
use crate::state::ParticipantRole;
use crate::state::ProtocolState;
use crate::state::StateError;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn offer(id: &str) -> JsonObject {
    json!({"@id": id}).as_object().cloned().unwrap()
}

fn provider_negotiation() -> ContractNegotiation {
    ContractNegotiation::builder()
        .role(ParticipantRole::Provider)
        .correlation_id("consumer-1")
        .offer_id("CD123:ACN0101:456")
        .dataset_id("ACN0101")
        .build()
        .unwrap()
}

// ============================================================================
// SECTION: Transition Tests
// ============================================================================

#[test]
fn full_provider_flow_reaches_finalized() {
    let negotiation = provider_negotiation();
    for state in [
        NegotiationState::Requested,
        NegotiationState::Offered,
        NegotiationState::Accepted,
        NegotiationState::Agreed,
        NegotiationState::Verified,
        NegotiationState::Finalized,
    ] {
        negotiation.transition(state).unwrap();
        assert_eq!(negotiation.state(), state);
    }
    assert!(negotiation.state().is_final());
}

#[test]
fn illegal_transition_lists_allowed_states() {
    let negotiation = provider_negotiation();
    let error = negotiation.transition(NegotiationState::Verified).unwrap_err();
    assert_eq!(
        error.to_string(),
        "Illegal state transition from INITIALIZED to VERIFIED. To state must be one of \
         REQUESTED, OFFERED, TERMINATED."
    );
    assert_eq!(negotiation.state(), NegotiationState::Initialized);
}

#[test]
fn final_states_reject_transitions() {
    let negotiation = provider_negotiation();
    negotiation.transition(NegotiationState::Terminated).unwrap();
    let error = negotiation.transition(NegotiationState::Requested).unwrap_err();
    assert_eq!(error, StateError::FinalState("TERMINATED".to_string()));
    assert_eq!(error.to_string(), "TERMINATED is a final state");
}

#[test]
fn requested_requires_correlation_id() {
    let negotiation = ContractNegotiation::builder().build().unwrap();
    assert_eq!(
        negotiation.transition(NegotiationState::Requested).unwrap_err(),
        StateError::CorrelationIdNotSet
    );
    negotiation.set_correlation_id("provider-1", NegotiationState::Requested).unwrap();
    assert_eq!(negotiation.provider_pid(), "provider-1");
    assert_eq!(negotiation.consumer_pid(), negotiation.id());
}

#[test]
fn build_rejects_initial_state_without_correlation_id() {
    let result = ContractNegotiation::builder().state(NegotiationState::Offered).build();
    assert_eq!(result.unwrap_err(), StateError::CorrelationIdNotSet);
}

#[test]
fn failed_set_correlation_id_leaves_id_unchanged() {
    let negotiation = ContractNegotiation::builder().build().unwrap();
    negotiation.transition(NegotiationState::Terminated).unwrap();
    assert!(negotiation.set_correlation_id("late", NegotiationState::Requested).is_err());
    assert_eq!(negotiation.correlation_id(), None);
    assert_eq!(negotiation.provider_pid(), "");
}

#[test]
fn conditional_correlation_only_advances_from_expected_state() {
    let negotiation = ContractNegotiation::builder().build().unwrap();
    let advanced = negotiation
        .set_correlation_id_if(
            NegotiationState::Initialized,
            "provider-1",
            NegotiationState::Requested,
        )
        .unwrap();
    assert!(advanced);
    assert_eq!(negotiation.state(), NegotiationState::Requested);

    let late = ContractNegotiation::builder().build().unwrap();
    late.set_correlation_id_only("provider-2");
    late.transition(NegotiationState::Offered).unwrap();
    let advanced = late
        .set_correlation_id_if(
            NegotiationState::Initialized,
            "provider-2",
            NegotiationState::Requested,
        )
        .unwrap();
    assert!(!advanced);
    assert_eq!(late.state(), NegotiationState::Offered);
    assert_eq!(late.provider_pid(), "provider-2");
}

#[test]
fn callback_address_trailing_slash_is_stripped() {
    let negotiation =
        ContractNegotiation::builder().callback_address("http://localhost:8083/").build().unwrap();
    assert_eq!(negotiation.callback_address(), Some("http://localhost:8083"));
}

// ============================================================================
// SECTION: Offer And Agreement Tests
// ============================================================================

#[test]
fn offers_are_appended_in_order() {
    let negotiation = provider_negotiation();
    negotiation.store_offer(offer("first"), NegotiationState::Requested).unwrap();
    negotiation.store_offer(offer("second"), NegotiationState::Offered).unwrap();
    assert_eq!(negotiation.offers().len(), 2);
    assert_eq!(negotiation.last_offer().unwrap()["@id"], "second");
}

#[test]
fn rejected_offer_is_not_stored() {
    let negotiation = provider_negotiation();
    assert!(negotiation.store_offer(offer("bad"), NegotiationState::Finalized).is_err());
    assert!(negotiation.last_offer().is_none());
}

#[test]
fn store_agreement_moves_to_agreed() {
    let negotiation = provider_negotiation();
    negotiation.transition(NegotiationState::Requested).unwrap();
    negotiation.store_agreement(offer("agreement")).unwrap();
    assert_eq!(negotiation.state(), NegotiationState::Agreed);
    assert_eq!(negotiation.agreement().unwrap()["@id"], "agreement");
}

// ============================================================================
// SECTION: Listener Tests
// ============================================================================

#[test]
fn listeners_receive_previous_state_after_work() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&events);
    let negotiation = ContractNegotiation::builder()
        .correlation_id("c")
        .listener(Arc::new(move |previous: NegotiationState, negotiation: &ContractNegotiation| {
            recorded.lock().unwrap().push(format!("{previous}->{}", negotiation.state()));
        }))
        .build()
        .unwrap();
    let work_events = Arc::clone(&events);
    negotiation
        .transition_with(NegotiationState::Requested, move |_| {
            work_events.lock().unwrap().push("work".to_string());
        })
        .unwrap();
    assert_eq!(events.lock().unwrap().as_slice(), ["work", "INITIALIZED->REQUESTED"]);
}

#[test]
fn listener_may_read_negotiation_without_deadlock() {
    let seen = Arc::new(Mutex::new(None));
    let recorded = Arc::clone(&seen);
    let negotiation = ContractNegotiation::builder()
        .correlation_id("c")
        .listener(Arc::new(move |_: NegotiationState, negotiation: &ContractNegotiation| {
            *recorded.lock().unwrap() = negotiation.last_offer();
        }))
        .build()
        .unwrap();
    negotiation.store_offer(offer("o"), NegotiationState::Offered).unwrap();
    assert!(seen.lock().unwrap().is_some());
}

// ============================================================================
// SECTION: Property Tests
// ============================================================================

proptest! {
    #[test]
    fn transitions_follow_the_table(from in 0usize..8, to in 0usize..8) {
        let from = NegotiationState::ALL[from];
        let to = NegotiationState::ALL[to];
        let negotiation = ContractNegotiation::builder()
            .correlation_id("c")
            .state(from)
            .build()
            .unwrap();
        let result = negotiation.transition(to);
        prop_assert_eq!(result.is_ok(), from.transitions().contains(&to));
        let expected = if result.is_ok() { to } else { from };
        prop_assert_eq!(negotiation.state(), expected);
    }

    #[test]
    fn state_names_round_trip(index in 0usize..8) {
        let state = NegotiationState::ALL[index];
        prop_assert_eq!(NegotiationState::parse(state.as_str()), Some(state));
    }
}
