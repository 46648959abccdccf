// crates/dsp-tck-api/src/state.rs
// ============================================================================
// Module: Protocol State Rules
// Description: Shared transition checking for protocol state machines.
// Purpose: Enforce legal transitions and correlation requirements uniformly.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Contract negotiations and transfer processes are both state machines with a
//! fixed transition table, terminal states, and states that may only be
//! entered once the counter-party's process id (the correlation id) is known.
//! [`check_transition`] applies those rules for any [`ProtocolState`].
//! Invariants:
//! - Terminal states accept no transition.
//! - A transition is legal only when listed in the source state's table.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use thiserror::Error;

// ============================================================================
// SECTION: Roles
// ============================================================================

/// Side of the protocol a process belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParticipantRole {
    /// The process was created by the consumer.
    #[default]
    Consumer,
    /// The process was created by the provider.
    Provider,
}

// ============================================================================
// SECTION: State Rules
// ============================================================================

/// State machine errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Target state is not reachable from the current state.
    #[error("Illegal state transition from {from} to {to}. To state must be one of {allowed}.")]
    IllegalTransition {
        /// Current state.
        from: String,
        /// Requested state.
        to: String,
        /// Comma separated list of legal targets.
        allowed: String,
    },
    /// Current state is terminal.
    #[error("{0} is a final state")]
    FinalState(String),
    /// Target state requires a correlation id.
    #[error("Correlation id not set")]
    CorrelationIdNotSet,
}

/// A state of a protocol state machine.
pub trait ProtocolState: Copy + Eq + fmt::Display + 'static {
    /// States reachable from this state.
    fn transitions(self) -> &'static [Self];

    /// Returns true when entering this state requires a correlation id.
    fn requires_correlation_id(self) -> bool;

    /// Returns true when no transition leaves this state.
    fn is_final(self) -> bool {
        self.transitions().is_empty()
    }
}

/// Checks that `from` may transition to `to`.
///
/// # Errors
/// Returns [`StateError`] when the transition is illegal or the correlation
/// id is required but absent.
pub fn check_transition<S: ProtocolState>(
    from: S,
    to: S,
    has_correlation_id: bool,
) -> Result<(), StateError> {
    if from.is_final() {
        return Err(StateError::FinalState(from.to_string()));
    }
    let allowed = from.transitions();
    if !allowed.contains(&to) {
        return Err(StateError::IllegalTransition {
            from: from.to_string(),
            to: to.to_string(),
            allowed: allowed.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "),
        });
    }
    if to.requires_correlation_id() && !has_correlation_id {
        return Err(StateError::CorrelationIdNotSet);
    }
    Ok(())
}
