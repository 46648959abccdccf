// crates/dsp-tck-system/src/mock/mod.rs
// ============================================================================
// Module: Counter-Party Mocks
// Description: Scripted counter-party behaviour for the local connector.
// Purpose: Make a local connector act like a connector under test.
// Dependencies: dsp-tck-api, tracing
// ============================================================================

//! ## Overview
//! In local mode the connector under test is an in-process
//! [`crate::connector::TckConnector`]. Mocks listen to its negotiation or
//! transfer process managers and, each time an event fires, hand the next
//! queued action for that event to the [`ActionExecutor`]. In remote mode
//! no-op mocks accept and discard actions.
//! Invariants:
//! - Queued actions for one event run in the order they were recorded.
//! - An action failure is kept and reported by `verify`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::fmt::Display;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use dsp_tck_api::MockError;
use dsp_tck_api::mock::ActionError;
use tracing::debug;
use tracing::warn;

mod executor;
mod negotiation;
mod transfer;

pub use executor::ActionExecutor;
pub use executor::Job;
pub use negotiation::LocalConsumerNegotiationMock;
pub use negotiation::LocalProviderNegotiationMock;
pub use negotiation::NoOpConsumerNegotiationMock;
pub use negotiation::NoOpProviderNegotiationMock;
pub use transfer::LocalConsumerTransferProcessMock;
pub use transfer::LocalProviderTransferProcessMock;
pub use transfer::NoOpConsumerTransferProcessMock;
pub use transfer::NoOpProviderTransferProcessMock;

// ============================================================================
// SECTION: Action Queues
// ============================================================================

/// Per-event action queues plus the failures of actions already run. `K`
/// is the process state that triggers an action.
pub(crate) struct ActionQueues<K, A> {
    /// Pending actions keyed by the state that triggers them.
    queues: Mutex<BTreeMap<K, VecDeque<A>>>,
    /// Messages of failed actions.
    failures: Mutex<Vec<String>>,
}

impl<K, A> ActionQueues<K, A>
where
    K: Copy + Ord + Display + Send + Sync + 'static,
    A: Send + 'static,
{
    /// Creates empty queues.
    pub(crate) const fn new() -> Self {
        Self { queues: Mutex::new(BTreeMap::new()), failures: Mutex::new(Vec::new()) }
    }

    /// Appends an action to the queue of `state`.
    pub(crate) fn record(&self, state: K, action: A) {
        self.queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(state)
            .or_default()
            .push_back(action);
    }

    /// Takes the next action queued for `state`.
    fn next(&self, state: K) -> Option<A> {
        self.queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&state)
            .and_then(VecDeque::pop_front)
    }

    /// Submits the next action for `state`, if any, to `executor`. `id`
    /// names the process `target` in logs.
    pub(crate) fn run_next<T, F>(
        self: &Arc<Self>,
        state: K,
        executor: &ActionExecutor,
        id: &str,
        target: &Arc<T>,
        invoke: F,
    ) where
        T: Send + Sync + ?Sized + 'static,
        F: FnOnce(A, &Arc<T>) -> Result<(), ActionError> + Send + 'static,
    {
        let Some(action) = self.next(state) else {
            return;
        };
        debug!(process = %id, event = %state, "running mock action");
        let queues = Arc::clone(self);
        let target = Arc::clone(target);
        let id = id.to_string();
        let submitted = executor.submit(Box::new(move || {
            if let Err(error) = invoke(action, &target) {
                warn!(process = %id, event = %state, error = %error, "mock action failed");
                queues.record_failure(format!("{state}: {error}"));
            }
        }));
        if !submitted {
            self.record_failure(format!("{state}: executor is shut down"));
        }
    }

    /// Records a failed action.
    fn record_failure(&self, message: String) {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner).push(message);
    }

    /// Returns true when no action is pending.
    pub(crate) fn is_empty(&self) -> bool {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner).values().all(VecDeque::is_empty)
    }

    /// Drops every pending action.
    pub(crate) fn clear(&self) {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Fails on pending actions first, then on recorded failures.
    pub(crate) fn check(&self) -> Result<(), MockError> {
        let pending: Vec<String> = self
            .queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, queue)| !queue.is_empty())
            .map(|(state, _)| state.to_string())
            .collect();
        if !pending.is_empty() {
            return Err(MockError::ActionsNotExecuted(pending.join(", ")));
        }
        let failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        if failures.is_empty() { Ok(()) } else { Err(MockError::ActionFailed(failures.join("; "))) }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
