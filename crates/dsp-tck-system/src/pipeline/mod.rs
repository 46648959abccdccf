// crates/dsp-tck-system/src/pipeline/mod.rs
// ============================================================================
// Module: Protocol Pipelines
// Description: Staged scenario drivers for negotiations and transfers.
// Purpose: Describe a protocol exchange once and run it step by step.
// Dependencies: dsp-tck-api, dsp-tck-core, thiserror, tracing
// ============================================================================

//! ## Overview
//! A pipeline is built with chained calls that each append a stage, then run
//! with `execute`. `send_*` stages call the connector under test, `expect_*`
//! stages register a callback handler for a message the connector under test
//! will send, and `then_*` stages wait for or check a state.
//! Invariants:
//! - Stages run sequentially in the order they were added.
//! - Each `expect_*` adds one latch; `then_wait_for_state` consumes the
//!   oldest latch before polling.
//! - A pipeline tracks one process, a contract negotiation or a transfer
//!   process, through a [`ProcessSlot`].
//! - An expect handler fires once and then removes itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt::Display;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use dsp_tck_api::AccessError;
use dsp_tck_api::ContractNegotiation;
use dsp_tck_api::DspFailure;
use dsp_tck_api::FallibleDspHandler;
use dsp_tck_api::NegotiationError;
use dsp_tck_api::NegotiationState;
use dsp_tck_api::StateError;
use dsp_tck_api::TransferError;
use dsp_tck_api::TransferProcess;
use dsp_tck_api::TransferState;
use dsp_tck_api::state::ProtocolState;
use dsp_tck_api::access::string_id_property;
use dsp_tck_api::constants::DSPACE_NAMESPACE;
use dsp_tck_api::constants::DSPACE_PROPERTY_STATE_EXPANDED;
use dsp_tck_core::CallbackEndpoint;
use dsp_tck_core::EndpointError;
use dsp_tck_core::JsonObject;
use dsp_tck_core::MessageSerializer;
use thiserror::Error;
use tracing::debug;

use crate::client::ClientError;

mod consumer;
mod consumer_transfer;
mod provider;
mod provider_transfer;

pub use consumer::ConsumerNegotiationPipeline;
pub use consumer_transfer::ConsumerTransferProcessPipeline;
pub use provider::ProviderNegotiationPipeline;
pub use provider_transfer::ProviderTransferProcessPipeline;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Pause before sending, giving the connector under test time to settle.
pub const PAUSE: Duration = Duration::from_millis(200);
/// Interval between state polls.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Pipeline stage failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stage ran before the tracked process, or its counter-party id,
    /// was recorded.
    #[error("No {0} recorded")]
    NoProcess(&'static str),
    /// A wait ran out of time.
    #[error("Timeout waiting for {0}")]
    Timeout(String),
    /// A checked state differs from the expected one.
    #[error("Expected state {expected} but was {actual}")]
    UnexpectedState {
        /// Expected state IRI.
        expected: String,
        /// Reported state IRI.
        actual: String,
    },
    /// A client call failed.
    #[error(transparent)]
    Client(#[from] ClientError),
    /// A callback handler could not be registered.
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
    /// The TCK side rejected a negotiation message.
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),
    /// The TCK side rejected a transfer message.
    #[error(transparent)]
    Transfer(#[from] TransferError),
    /// The TCK side rejected a state change.
    #[error(transparent)]
    State(#[from] StateError),
    /// A response lacked a required property.
    #[error(transparent)]
    Access(#[from] AccessError),
}

// ============================================================================
// SECTION: Shared Pipeline State
// ============================================================================

/// One queued pipeline step.
type Stage = Box<dyn FnOnce() -> Result<(), PipelineError> + Send>;

/// A process a pipeline follows.
pub(crate) trait TrackedProcess: Send + Sync + 'static {
    /// State machine of the process.
    type State: ProtocolState + Send;
    /// Name of the process kind used in errors.
    const KIND: &'static str;

    /// Returns the current state.
    fn current_state(&self) -> Self::State;

    /// Returns the counter-party process id, once known.
    fn counter_party_pid(&self) -> Option<String>;
}

impl TrackedProcess for ContractNegotiation {
    type State = NegotiationState;
    const KIND: &'static str = "contract negotiation";

    fn current_state(&self) -> NegotiationState {
        self.state()
    }

    fn counter_party_pid(&self) -> Option<String> {
        self.correlation_id()
    }
}

impl TrackedProcess for TransferProcess {
    type State = TransferState;
    const KIND: &'static str = "transfer process";

    fn current_state(&self) -> TransferState {
        self.state()
    }

    fn counter_party_pid(&self) -> Option<String> {
        self.correlation_id()
    }
}

/// Process a pipeline tracks, filled by a stage or a listener.
pub(crate) struct ProcessSlot<P>(Arc<Mutex<Option<Arc<P>>>>);

/// Slot of a negotiation pipeline.
pub(crate) type NegotiationSlot = ProcessSlot<ContractNegotiation>;

impl<P> Clone for ProcessSlot<P> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<P> Default for ProcessSlot<P> {
    fn default() -> Self {
        Self(Arc::new(Mutex::new(None)))
    }
}

impl<P: TrackedProcess> ProcessSlot<P> {
    /// Records the tracked process.
    pub(crate) fn set(&self, process: Arc<P>) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(process);
    }

    /// Records `process` unless one is already tracked; returns true when
    /// it was recorded.
    pub(crate) fn fill(&self, process: &Arc<P>) -> bool {
        let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return false;
        }
        *slot = Some(Arc::clone(process));
        true
    }

    /// Returns the tracked process, if recorded.
    pub(crate) fn get(&self) -> Option<Arc<P>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Returns the tracked process.
    ///
    /// # Errors
    /// Returns [`PipelineError::NoProcess`] before one is recorded.
    pub(crate) fn require(&self) -> Result<Arc<P>, PipelineError> {
        self.get().ok_or(PipelineError::NoProcess(P::KIND))
    }
}

/// Stage list, latches and services shared by every pipeline kind.
pub(crate) struct PipelineCore<P> {
    /// Queued stages.
    stages: Vec<Stage>,
    /// Receivers released by expect handlers, oldest first.
    latches: Arc<Mutex<VecDeque<mpsc::Receiver<()>>>>,
    /// Paths this pipeline registered handlers for.
    paths: Vec<String>,
    /// TCK callback endpoint.
    pub(crate) endpoint: Arc<CallbackEndpoint>,
    /// Serializer expanding received messages.
    pub(crate) serializer: Arc<MessageSerializer>,
    /// Process the pipeline waits on.
    pub(crate) process: ProcessSlot<P>,
    /// Upper bound for every wait.
    wait: Duration,
}

impl<P: TrackedProcess> PipelineCore<P> {
    /// Creates an empty pipeline core.
    pub(crate) fn new(
        endpoint: Arc<CallbackEndpoint>,
        serializer: Arc<MessageSerializer>,
        wait: Duration,
    ) -> Self {
        Self {
            stages: Vec::new(),
            latches: Arc::new(Mutex::new(VecDeque::new())),
            paths: Vec::new(),
            endpoint,
            serializer,
            process: ProcessSlot::default(),
            wait,
        }
    }

    /// Appends a stage.
    pub(crate) fn stage(
        &mut self,
        stage: impl FnOnce() -> Result<(), PipelineError> + Send + 'static,
    ) {
        self.stages.push(Box::new(stage));
    }

    /// Appends a stage registering a one-shot handler at `path`. The
    /// handler expands the received body, runs `action` and releases a new
    /// latch; the action's compact response, if any, is returned to the
    /// sender.
    pub(crate) fn expect<F, E>(&mut self, path: &'static str, action: F)
    where
        F: Fn(&JsonObject) -> Result<Option<JsonObject>, E> + Send + Sync + 'static,
        E: Into<DspFailure>,
    {
        let (release, latch) = mpsc::channel();
        self.latches.lock().unwrap_or_else(PoisonError::into_inner).push_back(latch);
        self.paths.push(path.to_string());
        let endpoint = Arc::clone(&self.endpoint);
        let serializer = Arc::clone(&self.serializer);
        self.stage(move || {
            let handler_endpoint = Arc::clone(&endpoint);
            let handler = FallibleDspHandler::new(move |body: &[u8]| {
                let expanded = serializer.process_json_ld_bytes(body).map_err(DspFailure::from)?;
                let response = action(&expanded).map_err(|error| -> DspFailure { error.into() })?;
                handler_endpoint.deregister_handler(path);
                debug!(path = %path, "expected message received");
                if release.send(()).is_err() {
                    debug!(path = %path, "latch already dropped");
                }
                Ok(response)
            });
            endpoint.register_protocol_handler(path, Arc::new(handler))?;
            Ok(())
        });
    }

    /// Appends a stage registering a handler at `path` whose action always
    /// answers with a message.
    pub(crate) fn expect_reply<F, E>(&mut self, path: &'static str, action: F)
    where
        F: Fn(&JsonObject) -> Result<JsonObject, E> + Send + Sync + 'static,
        E: Into<DspFailure>,
    {
        self.expect(path, move |message| action(message).map(Some));
    }

    /// Appends a stage waiting for the oldest latch, then for the tracked
    /// process to reach `state`.
    pub(crate) fn then_wait_for_state(&mut self, state: P::State) {
        let latches = Arc::clone(&self.latches);
        let process = self.process.clone();
        let wait = self.wait;
        self.stage(move || {
            let description = format!("state to transition to {state}");
            let latch = latches.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
            if let Some(latch) = latch {
                latch.recv_timeout(wait).map_err(|_| PipelineError::Timeout(description.clone()))?;
            }
            poll_until(wait, &description, || {
                Ok(process.get().is_some_and(|current| current.current_state() == state))
            })?;
            debug!(state = %state, kind = P::KIND, "process reached state");
            Ok(())
        });
    }

    /// Appends a stage polling `condition` until it holds.
    pub(crate) fn then_wait_until<F>(&mut self, description: String, condition: F)
    where
        F: FnMut() -> Result<bool, PipelineError> + Send + 'static,
    {
        let wait = self.wait;
        self.stage(move || poll_until(wait, &description, condition));
    }

    /// Runs every stage, then removes handlers that never fired.
    ///
    /// # Errors
    /// Returns the first stage failure.
    pub(crate) fn execute(self) -> Result<(), PipelineError> {
        let Self { stages, paths, endpoint, .. } = self;
        let outcome = stages.into_iter().try_for_each(|stage| stage());
        for path in &paths {
            endpoint.deregister_handler(path);
        }
        outcome
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Sleeps for [`PAUSE`].
pub(crate) fn pause() {
    thread::sleep(PAUSE);
}

/// Polls `condition` every [`POLL_INTERVAL`] until it holds or `wait`
/// runs out.
///
/// # Errors
/// Returns [`PipelineError::Timeout`] naming `description`, or the first
/// error raised by `condition`.
fn poll_until(
    wait: Duration,
    description: &str,
    mut condition: impl FnMut() -> Result<bool, PipelineError>,
) -> Result<(), PipelineError> {
    let deadline = Instant::now() + wait;
    loop {
        if condition()? {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(PipelineError::Timeout(description.to_string()));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Compares the `state` of an expanded negotiation or transfer process with
/// `expected`.
///
/// # Errors
/// Returns [`PipelineError::UnexpectedState`] on mismatch.
pub(crate) fn check_state(
    process: &JsonObject,
    expected: impl Display,
) -> Result<(), PipelineError> {
    let actual = string_id_property(DSPACE_PROPERTY_STATE_EXPANDED, process)?;
    let expected = format!("{DSPACE_NAMESPACE}{expected}");
    if actual == expected {
        Ok(())
    } else {
        Err(PipelineError::UnexpectedState { expected, actual })
    }
}

/// Returns the counter-party process id of `process`.
///
/// # Errors
/// Returns [`PipelineError::NoProcess`] when the counter-party id has not
/// been recorded yet.
pub(crate) fn correlation_id<P: TrackedProcess>(process: &Arc<P>) -> Result<String, PipelineError> {
    process.counter_party_pid().ok_or(PipelineError::NoProcess(P::KIND))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
