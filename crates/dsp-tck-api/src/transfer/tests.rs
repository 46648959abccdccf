// crates/dsp-tck-api/src/transfer/tests.rs
// ============================================================================
// Module: Transfer Process Tests
// Description: Unit tests for transfer process transitions.
// Purpose: Validate the transfer transition table and correlation rules.
// Dependencies: dsp-tck-api, proptest
// ============================================================================

//! ## Overview
//! Checks each source state against the legal and illegal targets and the
//! correlation id requirement for requested and started processes.

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

use proptest::prelude::*;

use super::DataAddress;
use super::TransferProcess;
use super::TransferState;
use crate::identifiers::random_uuid;
use crate::state::ParticipantRole;
use crate::state::ProtocolState;
use crate::state::StateError;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn correlated(state: TransferState) -> TransferProcess {
    TransferProcess::builder()
        .agreement_id(random_uuid())
        .correlation_id(random_uuid())
        .state(state)
        .build()
}

fn assert_legal(from: TransferState, targets: &[TransferState]) {
    for &to in targets {
        let process = correlated(from);
        process.transition(to).unwrap();
        assert_eq!(process.state(), to);
    }
}

fn assert_illegal(from: TransferState, targets: &[TransferState]) {
    for &to in targets {
        assert!(correlated(from).transition(to).is_err(), "{from} -> {to} should fail");
    }
}

// ============================================================================
// SECTION: Transition Tests
// ============================================================================

#[test]
fn initialized_only_moves_to_requested() {
    assert_legal(TransferState::Initialized, &[TransferState::Requested]);
    assert_illegal(TransferState::Initialized, &[
        TransferState::Initialized,
        TransferState::Started,
        TransferState::Completed,
        TransferState::Suspended,
        TransferState::Terminated,
    ]);
}

#[test]
fn requested_without_correlation_id_fails() {
    let process = TransferProcess::builder().agreement_id(random_uuid()).build();
    assert_eq!(
        process.transition(TransferState::Requested).unwrap_err(),
        StateError::CorrelationIdNotSet
    );
    process.set_correlation_id("provider-1");
    process.transition(TransferState::Requested).unwrap();
}

#[test]
fn requested_and_suspended_move_to_started_or_terminated() {
    for from in [TransferState::Requested, TransferState::Suspended] {
        assert_legal(from, &[TransferState::Started, TransferState::Terminated]);
        assert_illegal(from, &[
            TransferState::Initialized,
            TransferState::Requested,
            TransferState::Completed,
        ]);
    }
}

#[test]
fn started_moves_to_suspended_terminated_or_completed() {
    assert_legal(TransferState::Started, &[
        TransferState::Suspended,
        TransferState::Terminated,
        TransferState::Completed,
    ]);
    assert_illegal(TransferState::Started, &[TransferState::Initialized, TransferState::Requested]);
}

#[test]
fn completed_and_terminated_are_final() {
    for from in [TransferState::Completed, TransferState::Terminated] {
        let error = correlated(from).transition(TransferState::Started).unwrap_err();
        assert_eq!(error.to_string(), format!("{from} is a final state"));
        assert_illegal(from, &TransferState::ALL);
    }
}

#[test]
fn pids_follow_role() {
    let process = TransferProcess::builder()
        .role(ParticipantRole::Provider)
        .correlation_id("consumer-7")
        .build();
    assert_eq!(process.provider_pid(), process.id());
    assert_eq!(process.consumer_pid(), "consumer-7");
}

#[test]
fn data_address_can_be_replaced() {
    let process = correlated(TransferState::Requested);
    let address = DataAddress {
        endpoint_type: "https://w3id.org/idsa/v4.1/HTTP".to_string(),
        endpoint: "http://example.com".to_string(),
        endpoint_properties: [("authorization".to_string(), "token".to_string())].into(),
    };
    process
        .transition_with(TransferState::Started, |p| p.set_data_address(Some(address.clone())))
        .unwrap();
    assert_eq!(process.data_address(), Some(address));
}

// ============================================================================
// SECTION: Property Tests
// ============================================================================

proptest! {
    #[test]
    fn transitions_follow_the_table(from in 0usize..6, to in 0usize..6) {
        let from = TransferState::ALL[from];
        let to = TransferState::ALL[to];
        let process = correlated(from);
        prop_assert_eq!(process.transition(to).is_ok(), from.transitions().contains(&to));
    }
}
