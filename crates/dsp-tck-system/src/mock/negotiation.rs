// crates/dsp-tck-system/src/mock/negotiation.rs
// ============================================================================
// Module: Negotiation Mock Implementations
// Description: Local and no-op provider and consumer negotiation mocks.
// Purpose: Run queued actions when the local connector under test changes state.
// Dependencies: dsp-tck-api
// ============================================================================

//! ## Overview
//! A local mock registers a listener with the manager it scripts when it is
//! created and removes it in `verify`. The provider mock reacts to contract
//! requests, acceptances and verifications; the consumer mock reacts to
//! negotiation creation, offers and agreements.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use dsp_tck_api::ConsumerNegotiationManager;
use dsp_tck_api::ConsumerNegotiationMock;
use dsp_tck_api::ContractNegotiation;
use dsp_tck_api::ListenerId;
use dsp_tck_api::MockError;
use dsp_tck_api::NegotiationListener;
use dsp_tck_api::NegotiationMock;
use dsp_tck_api::NegotiationState;
use dsp_tck_api::ProviderNegotiationManager;
use dsp_tck_api::ProviderNegotiationMock;
use dsp_tck_api::mock::ConsumerAction;
use dsp_tck_api::mock::ProviderAction;

use super::ActionExecutor;
use super::ActionQueues;

// ============================================================================
// SECTION: Provider Mock
// ============================================================================

/// Scripts the provider manager of a local connector under test.
pub struct LocalProviderNegotiationMock {
    /// Manager the listener is registered with.
    manager: Arc<dyn ProviderNegotiationManager>,
    /// Queued actions shared with the listener.
    queues: Arc<ActionQueues<NegotiationState, ProviderAction>>,
    /// Registration of the listener.
    listener: ListenerId,
}

impl LocalProviderNegotiationMock {
    /// Creates the mock and registers its listener with `manager`.
    #[must_use]
    pub fn new(
        manager: Arc<dyn ProviderNegotiationManager>,
        executor: Arc<ActionExecutor>,
    ) -> Self {
        let queues = Arc::new(ActionQueues::new());
        let listener = manager.register_listener(Arc::new(ProviderMockListener {
            queues: Arc::clone(&queues),
            executor,
        }));
        Self { manager, queues, listener }
    }
}

impl NegotiationMock for LocalProviderNegotiationMock {
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

impl ProviderNegotiationMock for LocalProviderNegotiationMock {
    fn record_contract_requested_action(&self, action: ProviderAction) {
        self.queues.record(NegotiationState::Requested, action);
    }

    fn record_agreed_action(&self, action: ProviderAction) {
        self.queues.record(NegotiationState::Agreed, action);
    }

    fn record_verified_action(&self, action: ProviderAction) {
        self.queues.record(NegotiationState::Verified, action);
    }
}

/// Listener driving the provider mock queues.
struct ProviderMockListener {
    /// Queued actions.
    queues: Arc<ActionQueues<NegotiationState, ProviderAction>>,
    /// Pool running the actions.
    executor: Arc<ActionExecutor>,
}

impl ProviderMockListener {
    /// Runs the next action queued for `state`.
    fn run(&self, state: NegotiationState, negotiation: &Arc<ContractNegotiation>) {
        let id = negotiation.id();
        self.queues.run_next(state, &self.executor, id, negotiation, |action, target| {
            action(target)
        });
    }
}

impl NegotiationListener for ProviderMockListener {
    fn contract_requested(&self, negotiation: &Arc<ContractNegotiation>) {
        self.run(NegotiationState::Requested, negotiation);
    }

    fn accepted(&self, negotiation: &Arc<ContractNegotiation>) {
        self.run(NegotiationState::Agreed, negotiation);
    }

    fn verified(&self, negotiation: &Arc<ContractNegotiation>) {
        self.run(NegotiationState::Verified, negotiation);
    }
}

// ============================================================================
// SECTION: Consumer Mock
// ============================================================================

/// Scripts the consumer manager of a local connector under test.
pub struct LocalConsumerNegotiationMock {
    /// Manager the listener is registered with.
    manager: Arc<dyn ConsumerNegotiationManager>,
    /// Queued actions shared with the listener.
    queues: Arc<ActionQueues<NegotiationState, ConsumerAction>>,
    /// Registration of the listener.
    listener: ListenerId,
}

impl LocalConsumerNegotiationMock {
    /// Creates the mock and registers its listener with `manager`. Actions
    /// receive `callback_address`, the address of the TCK endpoint.
    #[must_use]
    pub fn new(
        manager: Arc<dyn ConsumerNegotiationManager>,
        executor: Arc<ActionExecutor>,
        callback_address: &str,
    ) -> Self {
        let queues = Arc::new(ActionQueues::new());
        let listener = manager.register_listener(Arc::new(ConsumerMockListener {
            queues: Arc::clone(&queues),
            executor,
            callback_address: callback_address.to_string(),
        }));
        Self { manager, queues, listener }
    }
}

impl NegotiationMock for LocalConsumerNegotiationMock {
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

impl ConsumerNegotiationMock for LocalConsumerNegotiationMock {
    fn record_initialized_action(&self, action: ConsumerAction) {
        self.queues.record(NegotiationState::Initialized, action);
    }

    fn record_offered_action(&self, action: ConsumerAction) {
        self.queues.record(NegotiationState::Offered, action);
    }

    fn record_agreed_action(&self, action: ConsumerAction) {
        self.queues.record(NegotiationState::Agreed, action);
    }
}

/// Listener driving the consumer mock queues.
struct ConsumerMockListener {
    /// Queued actions.
    queues: Arc<ActionQueues<NegotiationState, ConsumerAction>>,
    /// Pool running the actions.
    executor: Arc<ActionExecutor>,
    /// TCK endpoint address passed to every action.
    callback_address: String,
}

impl ConsumerMockListener {
    /// Runs the next action queued for `state`.
    fn run(&self, state: NegotiationState, negotiation: &Arc<ContractNegotiation>) {
        let address = self.callback_address.clone();
        let id = negotiation.id();
        self.queues.run_next(state, &self.executor, id, negotiation, move |action, target| {
            action(&address, target)
        });
    }
}

impl NegotiationListener for ConsumerMockListener {
    fn negotiation_created(&self, negotiation: &Arc<ContractNegotiation>) {
        self.run(NegotiationState::Initialized, negotiation);
    }

    fn offered(&self, negotiation: &Arc<ContractNegotiation>) {
        self.run(NegotiationState::Offered, negotiation);
    }

    fn agreed(&self, negotiation: &Arc<ContractNegotiation>) {
        self.run(NegotiationState::Agreed, negotiation);
    }
}

// ============================================================================
// SECTION: No-op Mocks
// ============================================================================

/// Provider mock used against a remote connector; actions are discarded.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpProviderNegotiationMock;

impl NegotiationMock for NoOpProviderNegotiationMock {
    fn verify(&self) -> Result<(), MockError> {
        Ok(())
    }

    fn completed(&self) -> bool {
        true
    }

    fn reset(&self) {}
}

impl ProviderNegotiationMock for NoOpProviderNegotiationMock {
    fn record_contract_requested_action(&self, _action: ProviderAction) {}

    fn record_agreed_action(&self, _action: ProviderAction) {}

    fn record_verified_action(&self, _action: ProviderAction) {}
}

/// Consumer mock used against a remote connector; actions are discarded.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpConsumerNegotiationMock;

impl NegotiationMock for NoOpConsumerNegotiationMock {
    fn verify(&self) -> Result<(), MockError> {
        Ok(())
    }

    fn completed(&self) -> bool {
        true
    }

    fn reset(&self) {}
}

impl ConsumerNegotiationMock for NoOpConsumerNegotiationMock {
    fn record_initialized_action(&self, _action: ConsumerAction) {}

    fn record_offered_action(&self, _action: ConsumerAction) {}

    fn record_agreed_action(&self, _action: ConsumerAction) {}
}
