// crates/dsp-tck-suite/src/transfer/consumer.rs
// ============================================================================
// Module: Consumer Transfer Scenarios
// Description: TP_C_01, TP_C_02 and TP_C_03 scenarios, the TCK acting as provider.
// Purpose: Verify a consumer under test through complete and invalid transfers.
// Dependencies: dsp-tck-api, dsp-tck-system
// ============================================================================

//! ## Overview
//! Every scenario signals the consumer under test to request a transfer and
//! answers the request through the provider transfer manager of the
//! scenario's provider connector. TP_C_01 lets the TCK drive the transfer,
//! TP_C_02 lets the consumer drive it once started, and TP_C_03 sends
//! messages the consumer must reject.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use dsp_tck_api::Connector;
use dsp_tck_api::ConsumerTransferProcessMock;
use dsp_tck_api::ProviderTransferProcessManager;
use dsp_tck_api::TransferState;
use dsp_tck_api::messages::transfer;
use dsp_tck_system::ConsumerTransferProcessPipeline;
use dsp_tck_system::DspSystemLauncher;

use super::register_transfer_validators;
use crate::actions::ConsumerTransferActions;
use crate::scenario::Scenario;
use crate::scenario::ScenarioContext;
use crate::scenario::ScenarioGroup;
use crate::scenario::VerificationError;

// ============================================================================
// SECTION: Groups
// ============================================================================

/// Returns the consumer transfer groups.
#[must_use]
pub fn consumer_groups() -> Vec<ScenarioGroup> {
    vec![consumer_01(), consumer_02(), consumer_03()]
}

/// Returns the TP_C_01 group.
fn consumer_01() -> ScenarioGroup {
    ScenarioGroup {
        name: "TP_C_01: Transfer request consumer scenarios",
        setup: register_transfer_validators,
        scenarios: vec![
            Scenario::new(
                "TP_C:01-01",
                "TP_C:01-01: Verify transfer request, provider started, provider terminated",
                tp_c_01_01,
            ),
            Scenario::new(
                "TP_C:01-02",
                "TP_C:01-02: Verify transfer request, provider started, provider completed",
                tp_c_01_02,
            ),
            Scenario::new(
                "TP_C:01-03",
                "TP_C:01-03: Verify transfer request, provider started, provider suspended, \
                 provider terminated",
                tp_c_01_03,
            ),
            Scenario::new(
                "TP_C:01-04",
                "TP_C:01-04: Verify transfer request, provider started, provider suspended, \
                 provider started, provider completed",
                tp_c_01_04,
            ),
            Scenario::new(
                "TP_C:01-05",
                "TP_C:01-05: Verify transfer request, provider terminated",
                tp_c_01_05,
            ),
        ],
    }
}

/// Returns the TP_C_02 group.
fn consumer_02() -> ScenarioGroup {
    ScenarioGroup {
        name: "TP_C_02: Transfer request consumer scenarios",
        setup: register_transfer_validators,
        scenarios: vec![
            Scenario::new(
                "TP_C:02-01",
                "TP_C:02-01: Verify transfer request, provider started, consumer terminated",
                tp_c_02_01,
            ),
            Scenario::new(
                "TP_C:02-02",
                "TP_C:02-02: Verify transfer request, provider started, consumer completed",
                tp_c_02_02,
            ),
            Scenario::new(
                "TP_C:02-03",
                "TP_C:02-03: Verify transfer request, provider started, consumer suspended, \
                 consumer terminated",
                tp_c_02_03,
            ),
            Scenario::new(
                "TP_C:02-05",
                "TP_C:02-05: Verify transfer request, consumer terminated",
                tp_c_02_05,
            ),
        ],
    }
}

/// Returns the TP_C_03 group.
fn consumer_03() -> ScenarioGroup {
    ScenarioGroup {
        name: "TP_C_03: Transfer request consumer negative scenarios",
        setup: register_transfer_validators,
        scenarios: vec![
            Scenario::new(
                "TP_C:03-01",
                "TP_C:03-01: Verify transfer request, provider completed",
                tp_c_03_01,
            ),
            Scenario::new(
                "TP_C:03-02",
                "TP_C:03-02: Verify transfer request, provider suspended",
                tp_c_03_02,
            ),
            Scenario::new(
                "TP_C:03-03",
                "TP_C:03-03: Verify transfer request, provider started, provider suspended, \
                 provider completed",
                tp_c_03_03,
            ),
            Scenario::new(
                "TP_C:03-04",
                "TP_C:03-04: Verify transfer request, provider started, provider terminated, \
                 provider started",
                tp_c_03_04,
            ),
            Scenario::new(
                "TP_C:03-05",
                "TP_C:03-05: Verify transfer request, provider started, provider terminated, \
                 provider suspended",
                tp_c_03_05,
            ),
            Scenario::new(
                "TP_C:03-06",
                "TP_C:03-06: Verify transfer request, provider started, provider terminated, \
                 provider completed",
                tp_c_03_06,
            ),
        ],
    }
}

// ============================================================================
// SECTION: Scenario Services
// ============================================================================

/// Services shared by consumer transfer scenarios.
struct ConsumerScenario<'a> {
    /// Launcher owning the scoped services.
    launcher: &'a DspSystemLauncher,
    /// Scope of the running scenario.
    scope: &'static str,
    /// Mock scripting a local consumer.
    mock: Arc<dyn ConsumerTransferProcessMock>,
    /// Messages of a local consumer.
    actions: ConsumerTransferActions,
    /// Provider transfer manager of the TCK.
    manager: Arc<dyn ProviderTransferProcessManager>,
    /// Agreement the transfer runs under.
    agreement_id: String,
    /// Requested transfer format.
    format: String,
}

impl<'a> ConsumerScenario<'a> {
    /// Resolves the services of `context`.
    fn new(context: &ScenarioContext<'a>) -> Result<Self, VerificationError> {
        let launcher = context.dsp_launcher()?;
        let scope = context.scope();
        Ok(Self {
            launcher,
            scope,
            mock: launcher.consumer_transfer_mock(scope)?,
            actions: ConsumerTransferActions::new(Arc::clone(context.serializer()))?,
            manager: launcher.provider_connector(scope)?.provider_transfer_manager(),
            agreement_id: context.agreement_id(),
            format: context.transfer_format(),
        })
    }

    /// Returns a handle on the TCK provider manager.
    fn manager(&self) -> Arc<dyn ProviderTransferProcessManager> {
        Arc::clone(&self.manager)
    }

    /// Queues the transfer request and returns a pipeline that answers it
    /// and waits for `REQUESTED`.
    fn requested(&self) -> Result<ConsumerTransferProcessPipeline, VerificationError> {
        self.mock.record_initialized_action(self.actions.post_transfer_request());
        self.answered()
    }

    /// Returns a pipeline answering the request the consumer sends.
    fn answered(&self) -> Result<ConsumerTransferProcessPipeline, VerificationError> {
        let manager = self.manager();
        Ok(self
            .launcher
            .consumer_transfer_pipeline(self.scope)?
            .expect_transfer_request(move |request, counter_party_id| {
                manager.handle_transfer_request(request, counter_party_id)
            })
            .initiate_transfer_request(&self.agreement_id, &self.format)
            .then_wait_for_state(TransferState::Requested))
    }

    /// Runs `pipeline`, then verifies the queued messages.
    fn run(&self, pipeline: ConsumerTransferProcessPipeline) -> Result<(), VerificationError> {
        pipeline.execute()?;
        self.mock.verify()?;
        Ok(())
    }
}

/// Starts the transfer with a data address and checks `STARTED`.
fn started(pipeline: ConsumerTransferProcessPipeline) -> ConsumerTransferProcessPipeline {
    pipeline
        .send_started(Some(transfer::data_address()), false)
        .then_wait_for_state(TransferState::Started)
        .then_verify_consumer_state(TransferState::Started)
}

/// Terminates the transfer and checks `TERMINATED`.
fn terminated(pipeline: ConsumerTransferProcessPipeline) -> ConsumerTransferProcessPipeline {
    pipeline
        .send_termination(false)
        .then_wait_for_state(TransferState::Terminated)
        .then_verify_consumer_state(TransferState::Terminated)
}

// ============================================================================
// SECTION: TP_C_01
// ============================================================================

/// Provider starts, then terminates.
fn tp_c_01_01(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ConsumerScenario::new(context)?;
    scenario.run(terminated(started(scenario.requested()?)))
}

/// Provider starts, then completes.
fn tp_c_01_02(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ConsumerScenario::new(context)?;
    let pipeline = started(scenario.requested()?)
        .send_completion(false)
        .then_wait_for_state(TransferState::Completed)
        .then_verify_consumer_state(TransferState::Completed);
    scenario.run(pipeline)
}

/// Provider starts, suspends, then terminates.
fn tp_c_01_03(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ConsumerScenario::new(context)?;
    let pipeline = started(scenario.requested()?)
        .send_suspension(false)
        .then_wait_for_state(TransferState::Suspended)
        .then_verify_consumer_state(TransferState::Suspended);
    scenario.run(terminated(pipeline))
}

/// Provider starts, suspends, resumes, then completes.
fn tp_c_01_04(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ConsumerScenario::new(context)?;
    let pipeline = started(scenario.requested()?)
        .send_suspension(false)
        .then_wait_for_state(TransferState::Suspended)
        .then_verify_consumer_state(TransferState::Suspended);
    let pipeline = started(pipeline)
        .send_completion(false)
        .then_wait_for_state(TransferState::Completed)
        .then_verify_consumer_state(TransferState::Completed);
    scenario.run(pipeline)
}

/// Provider terminates the requested transfer.
fn tp_c_01_05(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ConsumerScenario::new(context)?;
    scenario.run(terminated(scenario.requested()?))
}

// ============================================================================
// SECTION: TP_C_02
// ============================================================================

/// Provider starts, consumer terminates.
fn tp_c_02_01(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ConsumerScenario::new(context)?;
    scenario.mock.record_started_action(scenario.actions.post_terminate());
    let manager = scenario.manager();
    let pipeline = scenario
        .requested()?
        .expect_termination_message(move |termination| manager.handle_termination(termination))
        .send_started(Some(transfer::data_address()), false)
        .then_wait_for_state(TransferState::Terminated)
        .then_verify_consumer_state(TransferState::Terminated);
    scenario.run(pipeline)
}

/// Provider starts, consumer completes.
fn tp_c_02_02(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ConsumerScenario::new(context)?;
    scenario.mock.record_started_action(scenario.actions.post_complete());
    let manager = scenario.manager();
    let pipeline = scenario
        .requested()?
        .expect_completion_message(move |completion| manager.handle_completion(completion))
        .send_started(Some(transfer::data_address()), false)
        .then_wait_for_state(TransferState::Completed)
        .then_verify_consumer_state(TransferState::Completed);
    scenario.run(pipeline)
}

/// Provider starts, consumer suspends, then terminates.
fn tp_c_02_03(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ConsumerScenario::new(context)?;
    scenario.mock.record_started_action(ConsumerTransferActions::sequence(vec![
        scenario.actions.post_suspend(),
        scenario.actions.post_terminate(),
    ]));
    let suspension_manager = scenario.manager();
    let termination_manager = scenario.manager();
    let pipeline = scenario
        .requested()?
        .expect_suspension_message(move |suspension| {
            suspension_manager.handle_suspension(suspension)
        })
        .send_started(Some(transfer::data_address()), false)
        .then_wait_for_state(TransferState::Suspended)
        .expect_termination_message(move |termination| {
            termination_manager.handle_termination(termination)
        })
        .then_wait_for_state(TransferState::Terminated)
        .then_verify_consumer_state(TransferState::Terminated);
    scenario.run(pipeline)
}

/// Consumer terminates the requested transfer.
fn tp_c_02_05(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ConsumerScenario::new(context)?;
    scenario.mock.record_initialized_action(ConsumerTransferActions::sequence(vec![
        scenario.actions.post_transfer_request(),
        scenario.actions.post_terminate(),
    ]));
    let manager = scenario.manager();
    let pipeline = scenario
        .answered()?
        .expect_termination_message(move |termination| manager.handle_termination(termination))
        .then_wait_for_state(TransferState::Terminated)
        .then_verify_consumer_state(TransferState::Terminated);
    scenario.run(pipeline)
}

// ============================================================================
// SECTION: TP_C_03
// ============================================================================

/// Completing a requested transfer is rejected.
fn tp_c_03_01(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ConsumerScenario::new(context)?;
    let pipeline = scenario
        .requested()?
        .then_verify_consumer_state(TransferState::Requested)
        .send_completion(true)
        .then_wait_for_state(TransferState::Requested)
        .then_verify_consumer_state(TransferState::Requested);
    scenario.run(pipeline)
}

/// Suspending a requested transfer is rejected.
fn tp_c_03_02(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ConsumerScenario::new(context)?;
    let pipeline = scenario
        .requested()?
        .then_verify_consumer_state(TransferState::Requested)
        .send_suspension(true)
        .then_wait_for_state(TransferState::Requested)
        .then_verify_consumer_state(TransferState::Requested);
    scenario.run(pipeline)
}

/// Completing a suspended transfer is rejected.
fn tp_c_03_03(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ConsumerScenario::new(context)?;
    let pipeline = scenario.requested()?.then_verify_consumer_state(TransferState::Requested);
    let pipeline = started(pipeline)
        .send_suspension(false)
        .then_wait_for_state(TransferState::Suspended)
        .then_verify_consumer_state(TransferState::Suspended)
        .send_completion(true)
        .then_wait_for_state(TransferState::Suspended)
        .then_verify_consumer_state(TransferState::Suspended);
    scenario.run(pipeline)
}

/// Starting a terminated transfer is rejected.
fn tp_c_03_04(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ConsumerScenario::new(context)?;
    let pipeline = scenario.requested()?.then_verify_consumer_state(TransferState::Requested);
    let pipeline = terminated(started(pipeline))
        .send_started(None, true)
        .then_wait_for_state(TransferState::Terminated)
        .then_verify_consumer_state(TransferState::Terminated);
    scenario.run(pipeline)
}

/// Suspending a terminated transfer is rejected.
fn tp_c_03_05(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ConsumerScenario::new(context)?;
    let pipeline = scenario.requested()?.then_verify_consumer_state(TransferState::Requested);
    let pipeline = terminated(started(pipeline))
        .send_suspension(true)
        .then_wait_for_state(TransferState::Terminated)
        .then_verify_consumer_state(TransferState::Terminated);
    scenario.run(pipeline)
}

/// Completing a terminated transfer is rejected.
fn tp_c_03_06(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ConsumerScenario::new(context)?;
    let pipeline = scenario.requested()?.then_verify_consumer_state(TransferState::Requested);
    let pipeline = terminated(started(pipeline))
        .send_completion(true)
        .then_wait_for_state(TransferState::Terminated)
        .then_verify_consumer_state(TransferState::Terminated);
    scenario.run(pipeline)
}
