// crates/dsp-tck-suite/src/negotiation/provider.rs
// ============================================================================
// Module: Provider Negotiation Scenarios
// Description: CN_01 and CN_03 scenarios, the TCK acting as consumer.
// Purpose: Verify a provider under test through complete and invalid exchanges.
// Dependencies: dsp-tck-api, dsp-tck-system
// ============================================================================

//! ## Overview
//! The TCK consumer sends contract requests, counter-offers, acceptances,
//! verifications and terminations to the provider under test and handles
//! the offers, agreements and events it sends back through the consumer
//! manager of the scenario's consumer connector.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use dsp_tck_api::Connector;
use dsp_tck_api::ConsumerNegotiationManager;
use dsp_tck_api::NegotiationState;
use dsp_tck_api::ProviderNegotiationMock;
use dsp_tck_system::DspSystemLauncher;
use dsp_tck_system::ProviderNegotiationPipeline;

use super::register_negotiation_validators;
use crate::actions::ProviderActions;
use crate::scenario::Scenario;
use crate::scenario::ScenarioContext;
use crate::scenario::ScenarioGroup;
use crate::scenario::VerificationError;

// ============================================================================
// SECTION: Groups
// ============================================================================

/// Returns the provider negotiation groups.
#[must_use]
pub fn provider_groups() -> Vec<ScenarioGroup> {
    vec![provider_01(), provider_03()]
}

/// Returns the CN_01 group.
#[must_use]
fn provider_01() -> ScenarioGroup {
    ScenarioGroup {
        name: "CN_01: Contract request provider scenarios",
        setup: register_negotiation_validators,
        scenarios: vec![
            Scenario::new(
                "CN:01-01",
                "CN:01-01: Verify contract request, offer received, consumer terminated",
                cn_01_01,
            ),
            Scenario::new(
                "CN:01-02",
                "CN:01-02: Verify contract request, offer received, consumer counter-offer, \
                 provider terminated",
                cn_01_02,
            ),
            Scenario::new(
                "CN:01-03",
                "CN:01-03: Verify contract request, offer received, consumer accepted, provider \
                 agreement, consumer verified, provider finalized",
                cn_01_03,
            ),
            Scenario::new(
                "CN:01-04",
                "CN:01-04: Verify contract request, provider agreement, consumer verified, \
                 provider finalized",
                cn_01_04,
            ),
        ],
    }
}

/// Returns the CN_03 group.
#[must_use]
fn provider_03() -> ScenarioGroup {
    ScenarioGroup {
        name: "CN_03: Contract request provider negative test scenarios",
        setup: register_negotiation_validators,
        scenarios: vec![
            Scenario::new(
                "CN:03-01",
                "CN:03-01: Verify contract request, provider agreement, consumer verified, \
                 provider finalized, invalid consumer terminated",
                cn_03_01,
            ),
            Scenario::new(
                "CN:03-02",
                "CN:03-02: Verify contract request, offer received, invalid consumer verified",
                cn_03_02,
            ),
            Scenario::new(
                "CN:03-03",
                "CN:03-03: Verify contract request, offer received, consumer accepted, illegal \
                 consumer verified",
                cn_03_03,
            ),
            Scenario::new(
                "CN:03-04",
                "CN:03-04: Verify contract request, offer received, consumer counter-offer (x2), \
                 provider terminated",
                cn_03_04,
            ),
        ],
    }
}

// ============================================================================
// SECTION: Scenario Services
// ============================================================================

/// Services shared by provider scenarios.
struct ProviderScenario<'a> {
    /// Launcher owning the scoped services.
    launcher: &'a DspSystemLauncher,
    /// Scope of the running scenario.
    scope: &'static str,
    /// Mock scripting a local provider.
    mock: Arc<dyn ProviderNegotiationMock>,
    /// Replies of a local provider.
    actions: ProviderActions,
    /// Consumer manager of the TCK.
    manager: Arc<dyn ConsumerNegotiationManager>,
    /// Requested dataset.
    dataset_id: String,
    /// Requested offer.
    offer_id: String,
}

impl<'a> ProviderScenario<'a> {
    /// Resolves the services of `context`.
    fn new(context: &ScenarioContext<'a>) -> Result<Self, VerificationError> {
        let launcher = context.dsp_launcher()?;
        let scope = context.scope();
        let participant_id = &launcher.config()?.connector_under_test_id;
        Ok(Self {
            launcher,
            scope,
            mock: launcher.provider_negotiation_mock(scope)?,
            actions: ProviderActions::new(Arc::clone(context.serializer()), participant_id)?,
            manager: launcher.consumer_connector(scope)?.consumer_negotiation_manager(),
            dataset_id: context.dataset_id(),
            offer_id: context.offer_id(),
        })
    }

    /// Returns a handle on the TCK consumer manager.
    fn manager(&self) -> Arc<dyn ConsumerNegotiationManager> {
        Arc::clone(&self.manager)
    }

    /// Returns a pipeline starting with the contract request.
    fn pipeline(&self) -> Result<ProviderNegotiationPipeline, VerificationError> {
        Ok(self.launcher.provider_pipeline(self.scope)?)
    }

    /// Runs `pipeline`, then verifies the queued replies.
    fn run(&self, pipeline: ProviderNegotiationPipeline) -> Result<(), VerificationError> {
        pipeline.execute()?;
        self.mock.verify()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: CN_01
// ============================================================================

/// Request, offer, consumer terminates.
fn cn_01_01(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ProviderScenario::new(context)?;
    scenario.mock.record_contract_requested_action(scenario.actions.post_offer());
    let manager = scenario.manager();
    let pipeline = scenario
        .pipeline()?
        .expect_offer_message(move |offer| manager.handle_offer(offer))
        .send_request_message(&scenario.dataset_id, &scenario.offer_id)
        .then_wait_for_state(NegotiationState::Offered)
        .send_termination(false)
        .then_verify_provider_state(NegotiationState::Terminated);
    scenario.run(pipeline)
}

/// Request, offer, counter-offer, provider terminates.
fn cn_01_02(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ProviderScenario::new(context)?;
    scenario.mock.record_contract_requested_action(scenario.actions.post_offer());
    scenario.mock.record_contract_requested_action(scenario.actions.post_terminate());
    let offer_manager = scenario.manager();
    let termination_manager = scenario.manager();
    let pipeline = scenario
        .pipeline()?
        .expect_offer_message(move |offer| offer_manager.handle_offer(offer))
        .send_request_message(&scenario.dataset_id, &scenario.offer_id)
        .then_wait_for_state(NegotiationState::Offered)
        .expect_termination_message(move |termination| {
            termination_manager.handle_termination(termination)
        })
        .send_counter_offer_message("CD123:ACN0102:456", "ACN0102", false)
        .then_wait_for_state(NegotiationState::Terminated);
    scenario.run(pipeline)
}

/// Request, offer, acceptance, agreement, verification, finalization.
fn cn_01_03(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ProviderScenario::new(context)?;
    scenario.mock.record_contract_requested_action(scenario.actions.post_offer());
    scenario.mock.record_agreed_action(scenario.actions.post_agreed());
    scenario.mock.record_verified_action(scenario.actions.post_finalized());
    let offer_manager = scenario.manager();
    let agreement_manager = scenario.manager();
    let finalized_manager = scenario.manager();
    let pipeline = scenario
        .pipeline()?
        .expect_offer_message(move |offer| offer_manager.handle_offer(offer))
        .send_request_message(&scenario.dataset_id, &scenario.offer_id)
        .then_wait_for_state(NegotiationState::Offered)
        .expect_agreement_message(move |agreement| agreement_manager.handle_agreement(agreement))
        .accept_last_offer()
        .then_wait_for_state(NegotiationState::Agreed)
        .expect_finalized_event(move |event| finalized_manager.handle_finalized(event))
        .send_verified_event(false)
        .then_wait_for_state(NegotiationState::Finalized);
    scenario.run(pipeline)
}

/// Request, agreement, verification, finalization.
fn cn_01_04(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ProviderScenario::new(context)?;
    scenario.mock.record_contract_requested_action(scenario.actions.post_agreed());
    scenario.mock.record_verified_action(scenario.actions.post_finalized());
    let agreement_manager = scenario.manager();
    let finalized_manager = scenario.manager();
    let pipeline = scenario
        .pipeline()?
        .expect_agreement_message(move |agreement| agreement_manager.handle_agreement(agreement))
        .send_request_message(&scenario.dataset_id, &scenario.offer_id)
        .then_wait_for_state(NegotiationState::Agreed)
        .expect_finalized_event(move |event| finalized_manager.handle_finalized(event))
        .send_verified_event(false)
        .then_wait_for_state(NegotiationState::Finalized);
    scenario.run(pipeline)
}

// ============================================================================
// SECTION: CN_03
// ============================================================================

/// Finalized negotiation rejects a consumer termination.
fn cn_03_01(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ProviderScenario::new(context)?;
    scenario.mock.record_contract_requested_action(scenario.actions.post_agreed());
    scenario.mock.record_verified_action(scenario.actions.post_finalized());
    let agreement_manager = scenario.manager();
    let finalized_manager = scenario.manager();
    let pipeline = scenario
        .pipeline()?
        .expect_agreement_message(move |agreement| agreement_manager.handle_agreement(agreement))
        .send_request_message(&scenario.dataset_id, &scenario.offer_id)
        .then_wait_for_state(NegotiationState::Agreed)
        .expect_finalized_event(move |event| finalized_manager.handle_finalized(event))
        .send_verified_event(false)
        .then_wait_for_state(NegotiationState::Finalized)
        .then_verify_provider_state(NegotiationState::Finalized)
        .send_termination(true);
    scenario.run(pipeline)
}

/// Offered negotiation rejects a verification.
fn cn_03_02(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ProviderScenario::new(context)?;
    scenario.mock.record_contract_requested_action(scenario.actions.post_offer());
    let manager = scenario.manager();
    let pipeline = scenario
        .pipeline()?
        .expect_offer_message(move |offer| manager.handle_offer(offer))
        .send_request_message(&scenario.dataset_id, &scenario.offer_id)
        .then_wait_for_state(NegotiationState::Offered)
        .send_verified_event(true);
    scenario.run(pipeline)
}

/// Accepted negotiation rejects a verification before any agreement.
fn cn_03_03(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ProviderScenario::new(context)?;
    scenario.mock.record_contract_requested_action(scenario.actions.post_offer());
    let manager = scenario.manager();
    let pipeline = scenario
        .pipeline()?
        .expect_offer_message(move |offer| manager.handle_offer(offer))
        .send_request_message(&scenario.dataset_id, &scenario.offer_id)
        .then_wait_for_state(NegotiationState::Offered)
        .accept_last_offer()
        .send_verified_event(true);
    scenario.run(pipeline)
}

/// A second counter-offer without a new offer is rejected.
fn cn_03_04(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let scenario = ProviderScenario::new(context)?;
    scenario.mock.record_contract_requested_action(scenario.actions.post_offer());
    scenario.mock.record_contract_requested_action(Box::new(|_| Ok(())));
    let manager = scenario.manager();
    let pipeline = scenario
        .pipeline()?
        .expect_offer_message(move |offer| manager.handle_offer(offer))
        .send_request_message(&scenario.dataset_id, &scenario.offer_id)
        .then_wait_for_state(NegotiationState::Offered)
        .send_counter_offer_message(&scenario.offer_id, &scenario.dataset_id, false)
        .send_counter_offer_message(&scenario.offer_id, &scenario.dataset_id, true);
    scenario.run(pipeline)
}
