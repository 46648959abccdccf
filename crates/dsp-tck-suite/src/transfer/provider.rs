// crates/dsp-tck-suite/src/transfer/provider.rs
// ============================================================================
// Module: Provider Transfer Scenarios
// Description: TP_01, TP_02 and TP_03 scenarios, the TCK acting as consumer.
// Purpose: Verify a provider under test through complete and invalid transfers.
// Dependencies: dsp-tck-api, dsp-tck-system
// ============================================================================

//! ## Overview
//! The TCK consumer requests a transfer from the provider under test. TP_01
//! lets the provider drive the transfer, TP_02 lets the TCK drive it once
//! started, and TP_03 sends messages the provider must reject. Messages the
//! provider sends back are applied to the consumer transfer manager of the
//! scenario's consumer connector.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use dsp_tck_api::Connector;
use dsp_tck_api::ConsumerTransferProcessManager;
use dsp_tck_api::ProviderTransferProcessMock;
use dsp_tck_api::TransferState;
use dsp_tck_api::mock::ProviderTransferAction;
use dsp_tck_system::DspSystemLauncher;
use dsp_tck_system::ProviderTransferProcessPipeline;

use super::any_data_address;
use super::register_transfer_validators;
use crate::actions::ProviderTransferActions;
use crate::scenario::Scenario;
use crate::scenario::ScenarioContext;
use crate::scenario::ScenarioGroup;
use crate::scenario::VerificationError;

// ============================================================================
// SECTION: Groups
// ============================================================================

/// Returns the provider transfer groups.
#[must_use]
pub fn provider_groups() -> Vec<ScenarioGroup> {
    vec![provider_01(), provider_02(), provider_03()]
}

/// Returns the TP_01 group.
fn provider_01() -> ScenarioGroup {
    ScenarioGroup {
        name: "TP_01: Transfer request provider scenarios",
        setup: register_transfer_validators,
        scenarios: vec![
            Scenario::new(
                "TP:01-01",
                "TP:01-01: Verify transfer request, provider started, provider terminated",
                tp_01_01,
            ),
            Scenario::new(
                "TP:01-02",
                "TP:01-02: Verify transfer request, provider started, provider completed",
                tp_01_02,
            ),
            Scenario::new(
                "TP:01-03",
                "TP:01-03: Verify transfer request, provider started, provider suspended, \
                 provider terminated",
                tp_01_03,
            ),
            Scenario::new(
                "TP:01-04",
                "TP:01-04: Verify transfer request, provider started, provider suspended, \
                 provider started, provider completed",
                tp_01_04,
            ),
            Scenario::new(
                "TP:01-05",
                "TP:01-05: Verify transfer request, provider terminated",
                tp_01_05,
            ),
        ],
    }
}

/// Returns the TP_02 group.
fn provider_02() -> ScenarioGroup {
    ScenarioGroup {
        name: "TP_02: Transfer request provider scenarios",
        setup: register_transfer_validators,
        scenarios: vec![
            Scenario::new(
                "TP:02-01",
                "TP:02-01: Verify transfer request, provider started, consumer terminated",
                tp_02_01,
            ),
            Scenario::new(
                "TP:02-02",
                "TP:02-02: Verify transfer request, provider started, consumer completed",
                tp_02_02,
            ),
            Scenario::new(
                "TP:02-03",
                "TP:02-03: Verify transfer request, provider started, consumer suspended, \
                 consumer terminated",
                tp_02_03,
            ),
            Scenario::new(
                "TP:02-04",
                "TP:02-04: Verify transfer request, provider started, consumer suspended, \
                 consumer started, consumer completed",
                tp_02_04,
            ),
            Scenario::new(
                "TP:02-05",
                "TP:02-05: Verify transfer request, consumer terminated",
                tp_02_05,
            ),
        ],
    }
}

/// Returns the TP_03 group.
fn provider_03() -> ScenarioGroup {
    ScenarioGroup {
        name: "TP_03: Transfer request provider negative scenarios",
        setup: register_transfer_validators,
        scenarios: vec![
            Scenario::new(
                "TP:03-01",
                "TP:03-01: Verify transfer request, consumer completed",
                tp_03_01,
            ),
            Scenario::new(
                "TP:03-02",
                "TP:03-02: Verify transfer request, consumer suspended",
                tp_03_02,
            ),
            Scenario::new(
                "TP:03-03",
                "TP:03-03: Verify transfer request, provider started, consumer suspended, \
                 consumer completed",
                tp_03_03,
            ),
            Scenario::new(
                "TP:03-04",
                "TP:03-04: Verify transfer request, provider started, consumer terminated, \
                 consumer started",
                tp_03_04,
            ),
            Scenario::new(
                "TP:03-05",
                "TP:03-05: Verify transfer request, provider started, consumer terminated, \
                 consumer suspended",
                tp_03_05,
            ),
            Scenario::new(
                "TP:03-06",
                "TP:03-06: Verify transfer request, provider started, consumer terminated, \
                 consumer completed",
                tp_03_06,
            ),
        ],
    }
}

// ============================================================================
// SECTION: Scenario Services
// ============================================================================

/// Services shared by provider transfer scenarios.
struct ProviderScenario<'a> {
    /// Launcher owning the scoped services.
    launcher: &'a DspSystemLauncher,
    /// Scope of the running scenario.
    scope: &'static str,
    /// Mock scripting a local provider.
    mock: Arc<dyn ProviderTransferProcessMock>,
    /// Messages of a local provider.
    actions: ProviderTransferActions,
    /// Consumer transfer manager of the TCK.
    manager: Arc<dyn ConsumerTransferProcessManager>,
    /// Agreement the transfer runs under.
    agreement_id: String,
    /// Requested transfer format.
    format: String,
}

impl<'a> ProviderScenario<'a> {
    /// Resolves the services of `context`.
    fn new(context: &ScenarioContext<'a>) -> Result<Self, VerificationError> {
        let launcher = context.dsp_launcher()?;
        let scope = context.scope();
        Ok(Self {
            launcher,
            scope,
            mock: launcher.provider_transfer_mock(scope)?,
            actions: ProviderTransferActions::new(Arc::clone(context.serializer()))?,
            manager: launcher.consumer_connector(scope)?.consumer_transfer_manager(),
            agreement_id: context.agreement_id(),
            format: context.transfer_format(),
        })
    }

    /// Queues `steps` for the transfer request, pausing between them.
    fn on_request(&self, steps: Vec<ProviderTransferAction>) {
        self.mock.record_transfer_requested_action(ProviderTransferActions::sequence(steps));
    }

    /// Returns a pipeline whose first stage sends the transfer request.
    /// `expect` registers handlers that must be in place before the request.
    fn pipeline<F>(&self, expect: F) -> Result<ProviderTransferProcessPipeline, VerificationError>
    where
        F: FnOnce(ProviderTransferProcessPipeline) -> ProviderTransferProcessPipeline,
    {
        let pipeline = expect(self.launcher.provider_transfer_pipeline(self.scope)?);
        Ok(pipeline.send_transfer_request(&self.agreement_id, &self.format, None))
    }

    /// Registers a handler applying the next start message.
    fn expect_start(
        &self,
        pipeline: ProviderTransferProcessPipeline,
    ) -> ProviderTransferProcessPipeline {
        let manager = Arc::clone(&self.manager);
        pipeline.expect_start_message(move |start| manager.handle_start(start, &any_data_address))
    }

    /// Registers a handler applying the next completion message.
    fn expect_completion(
        &self,
        pipeline: ProviderTransferProcessPipeline,
    ) -> ProviderTransferProcessPipeline {
        let manager = Arc::clone(&self.manager);
        pipeline.expect_completion_message(move |completion| manager.handle_completion(completion))
    }

    /// Registers a handler applying the next suspension message.
    fn expect_suspension(
        &self,
        pipeline: ProviderTransferProcessPipeline,
    ) -> ProviderTransferProcessPipeline {
        let manager = Arc::clone(&self.manager);
        pipeline.expect_suspension_message(move |suspension| manager.handle_suspension(suspension))
    }

    /// Registers a handler applying the next termination message.
    fn expect_termination(
        &self,
        pipeline: ProviderTransferProcessPipeline,
    ) -> ProviderTransferProcessPipeline {
        let manager = Arc::clone(&self.manager);
        pipeline
            .expect_termination_message(move |termination| manager.handle_termination(termination))
    }

    /// Runs `pipeline`, then verifies the queued messages.
    fn run(&self, pipeline: ProviderTransferProcessPipeline) -> Result<(), VerificationError> {
        pipeline.execute()?;
        self.mock.verify()?;
        Ok(())
    }

    /// Provider starts the transfer; the TCK waits for and checks `STARTED`.
    fn started(&self) -> Result<ProviderTransferProcessPipeline, VerificationError> {
        self.on_request(vec![self.actions.post_start()]);
        Ok(self
            .pipeline(|pipeline| self.expect_start(pipeline))?
            .then_wait_for_state(TransferState::Started)
            .then_verify_provider_state(TransferState::Started))
    }

    /// Transfer is requested and left in `REQUESTED`.
    fn requested(&self) -> Result<ProviderTransferProcessPipeline, VerificationError> {
        Ok(self
            .pipeline(|pipeline| pipeline)?
            .then_wait_for_state(TransferState::Requested)
            .then_verify_provider_state(TransferState::Requested))
    }
}

// ============================================================================
// SECTION: TP_01
// ============================================================================

/// Provider starts, then terminates.
fn tp_01_01(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ProviderScenario::new(context)?;
    scenario.on_request(vec![scenario.actions.post_start(), scenario.actions.post_terminate()]);
    let pipeline = scenario.pipeline(|pipeline| scenario.expect_start(pipeline))?;
    let pipeline =
        scenario.expect_termination(pipeline.then_wait_for_state(TransferState::Started));
    scenario.run(
        pipeline
            .then_wait_for_state(TransferState::Terminated)
            .then_verify_provider_state(TransferState::Terminated),
    )
}

/// Provider starts, then completes.
fn tp_01_02(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ProviderScenario::new(context)?;
    scenario.on_request(vec![scenario.actions.post_start(), scenario.actions.post_complete()]);
    let pipeline = scenario.pipeline(|pipeline| scenario.expect_start(pipeline))?;
    let pipeline = scenario.expect_completion(pipeline.then_wait_for_state(TransferState::Started));
    scenario.run(
        pipeline
            .then_wait_for_state(TransferState::Completed)
            .then_verify_provider_state(TransferState::Completed),
    )
}

/// Provider starts, suspends, then terminates.
fn tp_01_03(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ProviderScenario::new(context)?;
    scenario.on_request(vec![
        scenario.actions.post_start(),
        scenario.actions.post_suspend(),
        scenario.actions.post_terminate(),
    ]);
    let pipeline = scenario.pipeline(|pipeline| scenario.expect_start(pipeline))?;
    let pipeline = scenario.expect_suspension(pipeline.then_wait_for_state(TransferState::Started));
    let pipeline =
        scenario.expect_termination(pipeline.then_wait_for_state(TransferState::Suspended));
    scenario.run(
        pipeline
            .then_wait_for_state(TransferState::Terminated)
            .then_verify_provider_state(TransferState::Terminated),
    )
}

/// Provider starts, suspends, resumes, then completes.
fn tp_01_04(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ProviderScenario::new(context)?;
    scenario.on_request(vec![
        scenario.actions.post_start(),
        scenario.actions.post_suspend(),
        scenario.actions.post_start(),
        scenario.actions.post_complete(),
    ]);
    let pipeline = scenario.pipeline(|pipeline| scenario.expect_start(pipeline))?;
    let pipeline = scenario.expect_suspension(pipeline.then_wait_for_state(TransferState::Started));
    let pipeline = scenario.expect_start(pipeline.then_wait_for_state(TransferState::Suspended));
    let pipeline = scenario.expect_completion(pipeline.then_wait_for_state(TransferState::Started));
    scenario.run(
        pipeline
            .then_wait_for_state(TransferState::Completed)
            .then_verify_provider_state(TransferState::Completed),
    )
}

/// Provider terminates the requested transfer.
fn tp_01_05(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ProviderScenario::new(context)?;
    scenario.on_request(vec![scenario.actions.post_terminate()]);
    let pipeline = scenario.pipeline(|pipeline| scenario.expect_termination(pipeline))?;
    scenario.run(
        pipeline
            .then_wait_for_state(TransferState::Terminated)
            .then_verify_provider_state(TransferState::Terminated),
    )
}

// ============================================================================
// SECTION: TP_02
// ============================================================================

/// Provider starts, consumer terminates.
fn tp_02_01(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ProviderScenario::new(context)?;
    let pipeline = scenario
        .started()?
        .send_termination(false)
        .then_wait_for_state(TransferState::Terminated)
        .then_verify_provider_state(TransferState::Terminated);
    scenario.run(pipeline)
}

/// Provider starts, consumer completes.
fn tp_02_02(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ProviderScenario::new(context)?;
    let pipeline = scenario
        .started()?
        .send_completion(false)
        .then_wait_for_state(TransferState::Completed)
        .then_verify_provider_state(TransferState::Completed);
    scenario.run(pipeline)
}

/// Provider starts, consumer suspends, then terminates.
fn tp_02_03(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ProviderScenario::new(context)?;
    let pipeline = scenario
        .started()?
        .send_suspension(false)
        .then_wait_for_state(TransferState::Suspended)
        .then_verify_provider_state(TransferState::Suspended)
        .send_termination(false)
        .then_wait_for_state(TransferState::Terminated)
        .then_verify_provider_state(TransferState::Terminated);
    scenario.run(pipeline)
}

/// Provider starts, consumer suspends, resumes, then completes.
fn tp_02_04(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ProviderScenario::new(context)?;
    let pipeline = scenario
        .started()?
        .send_suspension(false)
        .then_wait_for_state(TransferState::Suspended)
        .then_pause()
        .then_verify_provider_state(TransferState::Suspended)
        .send_started(false)
        .then_wait_for_state(TransferState::Started)
        .then_verify_provider_state(TransferState::Started)
        .send_completion(false)
        .then_wait_for_state(TransferState::Completed)
        .then_verify_provider_state(TransferState::Completed);
    scenario.run(pipeline)
}

/// Consumer terminates the requested transfer.
fn tp_02_05(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ProviderScenario::new(context)?;
    let pipeline = scenario
        .requested()?
        .send_termination(false)
        .then_wait_for_state(TransferState::Terminated)
        .then_verify_provider_state(TransferState::Terminated);
    scenario.run(pipeline)
}

// ============================================================================
// SECTION: TP_03
// ============================================================================

/// Completing a requested transfer is rejected.
fn tp_03_01(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ProviderScenario::new(context)?;
    let pipeline = scenario
        .requested()?
        .send_completion(true)
        .then_wait_for_state(TransferState::Requested)
        .then_verify_provider_state(TransferState::Requested);
    scenario.run(pipeline)
}

/// Suspending a requested transfer is rejected.
fn tp_03_02(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ProviderScenario::new(context)?;
    let pipeline = scenario
        .requested()?
        .send_suspension(true)
        .then_wait_for_state(TransferState::Requested)
        .then_verify_provider_state(TransferState::Requested);
    scenario.run(pipeline)
}

/// Completing a suspended transfer is rejected.
fn tp_03_03(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ProviderScenario::new(context)?;
    let pipeline = scenario
        .started()?
        .send_suspension(false)
        .then_wait_for_state(TransferState::Suspended)
        .then_verify_provider_state(TransferState::Suspended)
        .send_completion(true)
        .then_wait_for_state(TransferState::Suspended)
        .then_verify_provider_state(TransferState::Suspended);
    scenario.run(pipeline)
}

/// Starting a terminated transfer is rejected.
fn tp_03_04(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ProviderScenario::new(context)?;
    let pipeline = scenario
        .started()?
        .send_termination(false)
        .then_wait_for_state(TransferState::Terminated)
        .then_verify_provider_state(TransferState::Terminated)
        .send_started(true)
        .then_wait_for_state(TransferState::Terminated)
        .then_verify_provider_state(TransferState::Terminated);
    scenario.run(pipeline)
}

/// Suspending a terminated transfer is rejected.
fn tp_03_05(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ProviderScenario::new(context)?;
    let pipeline = scenario
        .started()?
        .send_termination(false)
        .then_wait_for_state(TransferState::Terminated)
        .then_verify_provider_state(TransferState::Terminated)
        .send_suspension(true)
        .then_wait_for_state(TransferState::Terminated)
        .then_verify_provider_state(TransferState::Terminated);
    scenario.run(pipeline)
}

/// Completing a terminated transfer is rejected.
fn tp_03_06(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ProviderScenario::new(context)?;
    let pipeline = scenario
        .started()?
        .send_termination(false)
        .then_wait_for_state(TransferState::Terminated)
        .then_verify_provider_state(TransferState::Terminated)
        .send_completion(true)
        .then_wait_for_state(TransferState::Terminated)
        .then_verify_provider_state(TransferState::Terminated);
    scenario.run(pipeline)
}
