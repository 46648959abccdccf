// crates/dsp-tck-suite/src/negotiation/consumer.rs
// ============================================================================
// Module: Consumer Negotiation Scenarios
// Description: CN_C_01, CN_C_02 and CN_C_03 scenarios, the TCK acting as provider.
// Purpose: Verify a consumer under test through complete and invalid exchanges.
// Dependencies: dsp-tck-api, dsp-tck-system
// ============================================================================

//! ## Overview
//! Every scenario signals the consumer under test to request the dataset,
//! answers the request through the provider manager of the scenario's
//! provider connector and then drives offers, agreements, finalized events
//! and terminations against the consumer.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::thread;

use dsp_tck_api::Connector;
use dsp_tck_api::ConsumerNegotiationMock;
use dsp_tck_api::NegotiationState;
use dsp_tck_api::ProviderNegotiationManager;
use dsp_tck_api::mock::ConsumerAction;
use dsp_tck_system::ConsumerNegotiationPipeline;
use dsp_tck_system::DspSystemLauncher;
use dsp_tck_system::pipeline::PAUSE;

use super::register_negotiation_validators;
use crate::actions::ConsumerActions;
use crate::scenario::Scenario;
use crate::scenario::ScenarioContext;
use crate::scenario::ScenarioGroup;
use crate::scenario::VerificationError;
use crate::scenario::offer_id_from_dataset_id;

// ============================================================================
// SECTION: Groups
// ============================================================================

/// Returns the consumer negotiation groups.
#[must_use]
pub fn consumer_groups() -> Vec<ScenarioGroup> {
    vec![consumer_01(), consumer_02(), consumer_03()]
}

/// Returns the CN_C_01 group.
fn consumer_01() -> ScenarioGroup {
    ScenarioGroup {
        name: "CN_C_01: Contract request consumer scenarios",
        setup: register_negotiation_validators,
        scenarios: vec![
            Scenario::new(
                "CN_C:01-01",
                "CN_C:01-01: Verify contract request, offer received, consumer accepted, provider \
                 agreed, consumer verified, provider finalized",
                cn_c_01_01,
            ),
            Scenario::new(
                "CN_C:01-02",
                "CN_C:01-02: Verify contract request, offer received, consumer counter-offer, \
                 provider terminated",
                cn_c_01_02,
            ),
            Scenario::new(
                "CN_C:01-03",
                "CN_C:01-03: Verify contract request, offer received, consumer terminated",
                cn_c_01_03,
            ),
            Scenario::new(
                "CN_C:01-04",
                "CN_C:01-04: Verify contract request, provider agreement, consumer verified, \
                 provider finalized",
                cn_c_01_04,
            ),
        ],
    }
}

/// Returns the CN_C_02 group.
fn consumer_02() -> ScenarioGroup {
    ScenarioGroup {
        name: "CN_C_02: Contract request consumer scenarios",
        setup: register_negotiation_validators,
        scenarios: vec![
            Scenario::new(
                "CN_C:02-01",
                "CN_C:02-01: Verify contract request, provider terminated",
                cn_c_02_01,
            ),
            Scenario::new(
                "CN_C:02-02",
                "CN_C:02-02: Verify contract request, consumer terminated",
                cn_c_02_02,
            ),
            Scenario::new(
                "CN_C:02-03",
                "CN_C:02-03: Verify contract request, provider agreement, consumer terminated",
                cn_c_02_03,
            ),
            Scenario::new(
                "CN_C:02-04",
                "CN_C:02-04: Verify contract request, offer received, provider terminated",
                cn_c_02_04,
            ),
            Scenario::new(
                "CN_C:02-05",
                "CN_C:02-05: Verify contract request, offer received, consumer accepted, provider \
                 terminated",
                cn_c_02_05,
            ),
            Scenario::new(
                "CN_C:02-06",
                "CN_C:02-06: Verify contract request, provider agreement, consumer verified, \
                 provider terminated",
                cn_c_02_06,
            ),
        ],
    }
}

/// Returns the CN_C_03 group.
fn consumer_03() -> ScenarioGroup {
    ScenarioGroup {
        name: "CN_C_03: Contract request consumer negative test scenarios",
        setup: register_negotiation_validators,
        scenarios: vec![
            Scenario::new(
                "CN_C:03-01",
                "CN_C:03-01: Verify contract request, invalid provider finalized",
                cn_c_03_01,
            ),
            Scenario::new(
                "CN_C:03-02",
                "CN_C:03-02: Verify contract request, offer received, invalid provider agreed",
                cn_c_03_02,
            ),
            Scenario::new(
                "CN_C:03-03",
                "CN_C:03-03: Verify contract request, offer received, invalid provider finalized",
                cn_c_03_03,
            ),
            Scenario::new(
                "CN_C:03-04",
                "CN_C:03-04: Verify contract request, offer received, consumer accepted, invalid \
                 provider finalized",
                cn_c_03_04,
            ),
            Scenario::new(
                "CN_C:03-05",
                "CN_C:03-05: Verify contract request, offer received, consumer accepted, invalid \
                 provider offer",
                cn_c_03_05,
            ),
            Scenario::new(
                "CN_C:03-06",
                "CN_C:03-06: Verify contract request, offer received, consumer accepted, provider \
                 agreed, invalid provider finalized",
                cn_c_03_06,
            ),
        ],
    }
}

// ============================================================================
// SECTION: Scenario Services
// ============================================================================

/// Services shared by consumer scenarios.
struct ConsumerScenario<'a> {
    /// Launcher owning the scoped services.
    launcher: &'a DspSystemLauncher,
    /// Scope of the running scenario.
    scope: &'static str,
    /// Mock scripting a local consumer.
    mock: Arc<dyn ConsumerNegotiationMock>,
    /// Messages of a local consumer.
    actions: ConsumerActions,
    /// Provider manager of the TCK.
    manager: Arc<dyn ProviderNegotiationManager>,
    /// Dataset the consumer requests.
    dataset_id: String,
}

impl<'a> ConsumerScenario<'a> {
    /// Resolves the services of `context`.
    fn new(context: &ScenarioContext<'a>) -> Result<Self, VerificationError> {
        let launcher = context.dsp_launcher()?;
        let scope = context.scope();
        let participant_id = &launcher.config()?.connector_under_test_id;
        Ok(Self {
            launcher,
            scope,
            mock: launcher.consumer_negotiation_mock(scope)?,
            actions: ConsumerActions::new(Arc::clone(context.serializer()), participant_id)?,
            manager: launcher.provider_connector(scope)?.provider_negotiation_manager(),
            dataset_id: context.dataset_id(),
        })
    }

    /// Returns a handle on the TCK provider manager.
    fn manager(&self) -> Arc<dyn ProviderNegotiationManager> {
        Arc::clone(&self.manager)
    }

    /// Queues the initial request and returns a pipeline that answers it and
    /// waits for `REQUESTED`.
    fn requested(&self) -> Result<ConsumerNegotiationPipeline, VerificationError> {
        self.mock.record_initialized_action(self.actions.post_request());
        Ok(self.started(self.launcher.consumer_pipeline(self.scope)?))
    }

    /// Adds the initial request stages to `pipeline`.
    fn started(&self, pipeline: ConsumerNegotiationPipeline) -> ConsumerNegotiationPipeline {
        let manager = self.manager();
        pipeline
            .expect_initial_request(move |request, counter_party_id| {
                manager.handle_contract_request(request, counter_party_id)
            })
            .initiate_request(&self.dataset_id, &offer_id_from_dataset_id(&self.dataset_id))
            .then_wait_for_state(NegotiationState::Requested)
    }

    /// Runs `pipeline`, then verifies the queued messages.
    fn run(&self, pipeline: ConsumerNegotiationPipeline) -> Result<(), VerificationError> {
        pipeline.execute()?;
        self.mock.verify()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: CN_C_01
// ============================================================================

/// Offer, acceptance, agreement, verification, finalization.
fn cn_c_01_01(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ConsumerScenario::new(context)?;
    scenario.mock.record_offered_action(scenario.actions.post_accepted());
    scenario.mock.record_agreed_action(scenario.actions.post_verification());
    let accepted_manager = scenario.manager();
    let verified_manager = scenario.manager();
    let pipeline = scenario
        .requested()?
        .expect_accepted_event(move |event| accepted_manager.handle_accepted(event))
        .send_offer_message(false)
        .then_wait_for_state(NegotiationState::Accepted)
        .expect_verified_message(move |verification| verified_manager.handle_verified(verification))
        .send_agreement_message(false)
        .then_wait_for_state(NegotiationState::Verified)
        .send_finalized_event(false)
        .then_verify_consumer_state(NegotiationState::Finalized);
    scenario.run(pipeline)
}

/// Offer answered by a counter-offer, provider terminates.
fn cn_c_01_02(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ConsumerScenario::new(context)?;
    scenario.mock.record_offered_action(scenario.actions.post_offer());
    let manager = scenario.manager();
    let pipeline = scenario
        .requested()?
        .expect_request(move |request, counter_party_id| {
            manager.handle_contract_request(request, counter_party_id)
        })
        .send_offer_message(false)
        .then_wait_for_state(NegotiationState::Requested)
        .send_termination(false)
        .then_wait_for_state(NegotiationState::Terminated);
    scenario.run(pipeline)
}

/// Offer answered by a consumer termination.
fn cn_c_01_03(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ConsumerScenario::new(context)?;
    scenario.mock.record_offered_action(scenario.actions.post_terminated());
    let manager = scenario.manager();
    let pipeline = scenario
        .requested()?
        .expect_termination_message(move |termination| manager.handle_termination(termination))
        .send_offer_message(false)
        .then_wait_for_state(NegotiationState::Terminated)
        .then_verify_consumer_state(NegotiationState::Terminated);
    scenario.run(pipeline)
}

/// Agreement, verification, finalization.
fn cn_c_01_04(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ConsumerScenario::new(context)?;
    scenario.mock.record_agreed_action(scenario.actions.post_verification());
    let manager = scenario.manager();
    let pipeline = scenario
        .requested()?
        .expect_verified_message(move |verification| manager.handle_verified(verification))
        .send_agreement_message(false)
        .then_wait_for_state(NegotiationState::Verified)
        .send_finalized_event(false)
        .then_verify_consumer_state(NegotiationState::Finalized);
    scenario.run(pipeline)
}

// ============================================================================
// SECTION: CN_C_02
// ============================================================================

/// Provider terminates the requested negotiation.
fn cn_c_02_01(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ConsumerScenario::new(context)?;
    let pipeline = scenario
        .requested()?
        .send_termination(false)
        .then_wait_for_state(NegotiationState::Terminated)
        .then_verify_consumer_state(NegotiationState::Terminated);
    scenario.run(pipeline)
}

/// Consumer terminates right after its request.
fn cn_c_02_02(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ConsumerScenario::new(context)?;
    scenario.mock.record_initialized_action(request_then_terminate(&scenario.actions));
    let manager = scenario.manager();
    let pipeline = scenario
        .started(scenario.launcher.consumer_pipeline(scenario.scope)?)
        .expect_termination_message(move |termination| manager.handle_termination(termination))
        .then_wait_for_state(NegotiationState::Terminated)
        .then_verify_consumer_state(NegotiationState::Terminated);
    scenario.run(pipeline)
}

/// Agreement answered by a consumer termination.
fn cn_c_02_03(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ConsumerScenario::new(context)?;
    scenario.mock.record_agreed_action(scenario.actions.post_terminated());
    let manager = scenario.manager();
    let pipeline = scenario
        .requested()?
        .expect_termination_message(move |termination| manager.handle_termination(termination))
        .send_agreement_message(false)
        .then_wait_for_state(NegotiationState::Terminated)
        .then_verify_consumer_state(NegotiationState::Terminated);
    scenario.run(pipeline)
}

/// Provider terminates after its offer.
fn cn_c_02_04(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ConsumerScenario::new(context)?;
    let pipeline = scenario
        .requested()?
        .send_offer_message(false)
        .then_wait_for_state(NegotiationState::Offered)
        .then_verify_consumer_state(NegotiationState::Offered)
        .send_termination(false)
        .then_wait_for_state(NegotiationState::Terminated)
        .then_verify_consumer_state(NegotiationState::Terminated);
    scenario.run(pipeline)
}

/// Provider terminates an accepted negotiation.
fn cn_c_02_05(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ConsumerScenario::new(context)?;
    scenario.mock.record_offered_action(scenario.actions.post_accepted());
    let manager = scenario.manager();
    let pipeline = scenario
        .requested()?
        .expect_accepted_event(move |event| manager.handle_accepted(event))
        .send_offer_message(false)
        .then_wait_for_state(NegotiationState::Accepted)
        .send_termination(false)
        .then_wait_for_state(NegotiationState::Terminated)
        .then_verify_consumer_state(NegotiationState::Terminated);
    scenario.run(pipeline)
}

/// Provider terminates a verified negotiation.
fn cn_c_02_06(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ConsumerScenario::new(context)?;
    scenario.mock.record_agreed_action(scenario.actions.post_verification());
    let manager = scenario.manager();
    let pipeline = scenario
        .requested()?
        .expect_verified_message(move |verification| manager.handle_verified(verification))
        .send_agreement_message(false)
        .then_wait_for_state(NegotiationState::Verified)
        .send_termination(false)
        .then_verify_consumer_state(NegotiationState::Terminated);
    scenario.run(pipeline)
}

// ============================================================================
// SECTION: CN_C_03
// ============================================================================

/// Requested negotiation rejects a finalized event.
fn cn_c_03_01(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ConsumerScenario::new(context)?;
    let pipeline = scenario
        .requested()?
        .send_finalized_event(true)
        .then_verify_consumer_state(NegotiationState::Requested);
    scenario.run(pipeline)
}

/// Offered negotiation rejects an agreement.
fn cn_c_03_02(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ConsumerScenario::new(context)?;
    let pipeline = scenario
        .requested()?
        .send_offer_message(false)
        .then_wait_for_state(NegotiationState::Offered)
        .then_verify_consumer_state(NegotiationState::Offered)
        .send_agreement_message(true)
        .then_verify_consumer_state(NegotiationState::Offered);
    scenario.run(pipeline)
}

/// Offered negotiation rejects a finalized event.
fn cn_c_03_03(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ConsumerScenario::new(context)?;
    let pipeline = scenario
        .requested()?
        .send_offer_message(false)
        .then_wait_for_state(NegotiationState::Offered)
        .send_finalized_event(true)
        .then_verify_consumer_state(NegotiationState::Offered);
    scenario.run(pipeline)
}

/// Accepted negotiation rejects a finalized event.
fn cn_c_03_04(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ConsumerScenario::new(context)?;
    scenario.mock.record_offered_action(scenario.actions.post_accepted());
    let manager = scenario.manager();
    let pipeline = scenario
        .requested()?
        .expect_accepted_event(move |event| manager.handle_accepted(event))
        .send_offer_message(false)
        .then_wait_for_state(NegotiationState::Accepted)
        .send_finalized_event(true)
        .then_verify_consumer_state(NegotiationState::Accepted);
    scenario.run(pipeline)
}

/// Accepted negotiation rejects another offer.
fn cn_c_03_05(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ConsumerScenario::new(context)?;
    scenario.mock.record_offered_action(scenario.actions.post_accepted());
    let manager = scenario.manager();
    let pipeline = scenario
        .requested()?
        .expect_accepted_event(move |event| manager.handle_accepted(event))
        .send_offer_message(false)
        .then_wait_for_state(NegotiationState::Accepted)
        .send_offer_message(true)
        .then_verify_consumer_state(NegotiationState::Accepted);
    scenario.run(pipeline)
}

/// Agreed negotiation rejects a finalized event before verification.
fn cn_c_03_06(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ConsumerScenario::new(context)?;
    scenario.mock.record_offered_action(scenario.actions.post_accepted());
    let manager = scenario.manager();
    let pipeline = scenario
        .requested()?
        .expect_accepted_event(move |event| manager.handle_accepted(event))
        .send_offer_message(false)
        .then_wait_for_state(NegotiationState::Accepted)
        .send_agreement_message(false)
        .then_wait_for_state(NegotiationState::Agreed)
        .send_finalized_event(true)
        .then_verify_consumer_state(NegotiationState::Agreed);
    scenario.run(pipeline)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Requests the dataset, pauses, then terminates.
fn request_then_terminate(actions: &ConsumerActions) -> ConsumerAction {
    let request = actions.post_request();
    let terminate = actions.post_terminated();
    Box::new(move |address, negotiation| {
        request(address, negotiation)?;
        thread::sleep(PAUSE);
        terminate(address, negotiation)
    })
}
