// crates/dsp-tck-system/src/mock/transfer.rs
// ============================================================================
// Module: Transfer Process Mock Implementations
// Description: Local and no-op provider and consumer transfer process mocks.
// Purpose: Run queued actions when a local connector's transfers change state.
// Dependencies: dsp-tck-api
// ============================================================================

//! ## Overview
//! Transfer mocks follow the negotiation mocks: the listener is registered
//! on creation and removed in `verify`. The provider mock reacts to transfer
//! requests; the consumer mock reacts to process creation and to starts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use dsp_tck_api::ConsumerTransferProcessManager;
use dsp_tck_api::ConsumerTransferProcessMock;
use dsp_tck_api::ListenerId;
use dsp_tck_api::MockError;
use dsp_tck_api::ProviderTransferProcessManager;
use dsp_tck_api::ProviderTransferProcessMock;
use dsp_tck_api::TransferProcess;
use dsp_tck_api::TransferProcessListener;
use dsp_tck_api::TransferProcessMock;
use dsp_tck_api::TransferState;
use dsp_tck_api::mock::ConsumerTransferAction;
use dsp_tck_api::mock::ProviderTransferAction;

use super::ActionExecutor;
use super::ActionQueues;

// ============================================================================
// SECTION: Provider Mock
// ============================================================================

/// Scripts the provider transfer manager of a local connector under test.
pub struct LocalProviderTransferProcessMock {
    /// Manager the listener is registered with.
    manager: Arc<dyn ProviderTransferProcessManager>,
    /// Queued actions shared with the listener.
    queues: Arc<ActionQueues<TransferState, ProviderTransferAction>>,
    /// Registration of the listener.
    listener: ListenerId,
}

impl LocalProviderTransferProcessMock {
    /// Creates the mock and registers its listener with `manager`.
    #[must_use]
    pub fn new(
        manager: Arc<dyn ProviderTransferProcessManager>,
        executor: Arc<ActionExecutor>,
    ) -> Self {
        let queues = Arc::new(ActionQueues::new());
        let listener = manager.register_listener(Arc::new(ProviderTransferListener {
            queues: Arc::clone(&queues),
            executor,
        }));
        Self { manager, queues, listener }
    }
}

impl TransferProcessMock for LocalProviderTransferProcessMock {
    fn verify(&self) -> Result<(), MockError> {
        let outcome = self.queues.check();
        self.manager.deregister_listener(self.listener);
        outcome
    }

    fn completed(&self) -> bool {
        self.queues.is_empty()
    }

    fn reset(&self) {
        self.queues.clear();
    }
}

impl ProviderTransferProcessMock for LocalProviderTransferProcessMock {
    fn record_transfer_requested_action(&self, action: ProviderTransferAction) {
        self.queues.record(TransferState::Requested, action);
    }
}

/// Listener driving the provider transfer mock queues.
struct ProviderTransferListener {
    /// Queued actions.
    queues: Arc<ActionQueues<TransferState, ProviderTransferAction>>,
    /// Pool running the actions.
    executor: Arc<ActionExecutor>,
}

impl TransferProcessListener for ProviderTransferListener {
    fn requested(&self, process: &Arc<TransferProcess>) {
        let state = TransferState::Requested;
        self.queues.run_next(state, &self.executor, process.id(), process, |action, target| {
            action(target)
        });
    }
}

// ============================================================================
// SECTION: Consumer Mock
// ============================================================================

/// Scripts the consumer transfer manager of a local connector under test.
pub struct LocalConsumerTransferProcessMock {
    /// Manager the listener is registered with.
    manager: Arc<dyn ConsumerTransferProcessManager>,
    /// Queued actions shared with the listener.
    queues: Arc<ActionQueues<TransferState, ConsumerTransferAction>>,
    /// Registration of the listener.
    listener: ListenerId,
}

impl LocalConsumerTransferProcessMock {
    /// Creates the mock and registers its listener with `manager`. Actions
    /// receive `callback_address`, the address of the TCK endpoint.
    #[must_use]
    pub fn new(
        manager: Arc<dyn ConsumerTransferProcessManager>,
        executor: Arc<ActionExecutor>,
        callback_address: &str,
    ) -> Self {
        let queues = Arc::new(ActionQueues::new());
        let listener = manager.register_listener(Arc::new(ConsumerTransferListener {
            queues: Arc::clone(&queues),
            executor,
            callback_address: callback_address.to_string(),
        }));
        Self { manager, queues, listener }
    }
}

impl TransferProcessMock for LocalConsumerTransferProcessMock {
    fn verify(&self) -> Result<(), MockError> {
        let outcome = self.queues.check();
        self.manager.deregister_listener(self.listener);
        outcome
    }

    fn completed(&self) -> bool {
        self.queues.is_empty()
    }

    fn reset(&self) {
        self.queues.clear();
    }
}

impl ConsumerTransferProcessMock for LocalConsumerTransferProcessMock {
    fn record_initialized_action(&self, action: ConsumerTransferAction) {
        self.queues.record(TransferState::Initialized, action);
    }

    fn record_started_action(&self, action: ConsumerTransferAction) {
        self.queues.record(TransferState::Started, action);
    }
}

/// Listener driving the consumer transfer mock queues.
struct ConsumerTransferListener {
    /// Queued actions.
    queues: Arc<ActionQueues<TransferState, ConsumerTransferAction>>,
    /// Pool running the actions.
    executor: Arc<ActionExecutor>,
    /// TCK endpoint address passed to every action.
    callback_address: String,
}

impl ConsumerTransferListener {
    /// Runs the next action queued for `state`.
    fn run(&self, state: TransferState, process: &Arc<TransferProcess>) {
        let address = self.callback_address.clone();
        self.queues.run_next(state, &self.executor, process.id(), process, move |action, target| {
            action(&address, target)
        });
    }
}

impl TransferProcessListener for ConsumerTransferListener {
    fn transfer_initialized(&self, process: &Arc<TransferProcess>) {
        self.run(TransferState::Initialized, process);
    }

    fn started(&self, process: &Arc<TransferProcess>) {
        self.run(TransferState::Started, process);
    }
}

// ============================================================================
// SECTION: No-op Mocks
// ============================================================================

/// Provider transfer mock used against a remote connector.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpProviderTransferProcessMock;

impl TransferProcessMock for NoOpProviderTransferProcessMock {
    fn verify(&self) -> Result<(), MockError> {
        Ok(())
    }

    fn completed(&self) -> bool {
        true
    }

    fn reset(&self) {}
}

impl ProviderTransferProcessMock for NoOpProviderTransferProcessMock {
    fn record_transfer_requested_action(&self, _action: ProviderTransferAction) {}
}

/// Consumer transfer mock used against a remote connector.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpConsumerTransferProcessMock;

impl TransferProcessMock for NoOpConsumerTransferProcessMock {
    fn verify(&self) -> Result<(), MockError> {
        Ok(())
    }

    fn completed(&self) -> bool {
        true
    }

    fn reset(&self) {}
}

impl ConsumerTransferProcessMock for NoOpConsumerTransferProcessMock {
    fn record_initialized_action(&self, _action: ConsumerTransferAction) {}

    fn record_started_action(&self, _action: ConsumerTransferAction) {}
}
