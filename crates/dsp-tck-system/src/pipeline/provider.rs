// crates/dsp-tck-system/src/pipeline/provider.rs
// ============================================================================
// Module: Provider Negotiation Pipeline
// Description: Drives a connector under test that plays the provider.
// Purpose: Let the TCK act as consumer while scenarios check provider behaviour.
// Dependencies: dsp-tck-api, dsp-tck-core, tracing
// ============================================================================

//! ## Overview
//! The TCK plays the consumer through the consumer manager of a TCK
//! connector. Messages sent to the provider are applied locally first, so
//! the provider's replies find the TCK negotiation in the right state.
//! Local state only changes when the send is expected to succeed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use dsp_tck_api::ConsumerNegotiationManager;
use dsp_tck_api::ContractNegotiation;
use dsp_tck_api::NegotiationError;
use dsp_tck_api::NegotiationState;
use dsp_tck_api::access::string_id_property;
use dsp_tck_api::constants::DSPACE_PROPERTY_PROVIDER_PID_EXPANDED;
use dsp_tck_api::constants::TCK_PARTICIPANT_ID;
use dsp_tck_api::messages::negotiation;
use dsp_tck_core::CallbackEndpoint;
use dsp_tck_core::JsonObject;
use dsp_tck_core::MessageSerializer;
use tracing::debug;

use super::PipelineCore;
use super::PipelineError;
use super::check_state;
use super::correlation_id;
use super::pause;
use crate::client::ProviderNegotiationClient;

// ============================================================================
// SECTION: Paths
// ============================================================================

/// Callback path of offers sent by the provider.
const OFFERS_PATH: &str = "/negotiations/[^/]+/offers";
/// Callback path of agreements sent by the provider.
const AGREEMENT_PATH: &str = "/negotiations/[^/]+/agreement";
/// Callback path of events sent by the provider.
const EVENTS_PATH: &str = "/negotiations/[^/]+/events";
/// Callback path of terminations sent by the provider.
const TERMINATION_PATH: &str = "/negotiations/[^/]+/termination";

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Staged negotiation against a provider under test.
pub struct ProviderNegotiationPipeline {
    /// Stages and shared services.
    core: PipelineCore<ContractNegotiation>,
    /// Client calling the provider.
    client: Arc<dyn ProviderNegotiationClient>,
    /// Consumer manager of the TCK connector.
    manager: Arc<dyn ConsumerNegotiationManager>,
    /// Participant id of the provider under test.
    provider_id: String,
}

impl ProviderNegotiationPipeline {
    /// Creates an empty pipeline. `manager` holds the TCK negotiations,
    /// `provider_id` names the connector under test in sent policies.
    #[must_use]
    pub fn new(
        client: Arc<dyn ProviderNegotiationClient>,
        manager: Arc<dyn ConsumerNegotiationManager>,
        endpoint: Arc<CallbackEndpoint>,
        serializer: Arc<MessageSerializer>,
        provider_id: &str,
        wait: Duration,
    ) -> Self {
        Self {
            core: PipelineCore::new(endpoint, serializer, wait),
            client,
            manager,
            provider_id: provider_id.to_string(),
        }
    }

    /// Creates a TCK negotiation and sends the initial contract request.
    #[must_use]
    pub fn send_request_message(mut self, dataset_id: &str, offer_id: &str) -> Self {
        let client = Arc::clone(&self.client);
        let manager = Arc::clone(&self.manager);
        let slot = self.core.process.clone();
        let address = self.core.endpoint.address().to_string();
        let dataset_id = dataset_id.to_string();
        let offer_id = offer_id.to_string();
        self.core.stage(move || {
            let tracked = manager.create_negotiation(&dataset_id, &offer_id, Some(&address))?;
            slot.set(Arc::clone(&tracked));
            let request = negotiation::create_contract_request(
                tracked.id(),
                None,
                &offer_id,
                &dataset_id,
                Some(&address),
            );
            debug!(consumer_pid = %tracked.id(), dataset = %dataset_id, "sending contract request");
            if let Some(response) = client.contract_request(&request, TCK_PARTICIPANT_ID, false)? {
                let provider_pid =
                    string_id_property(DSPACE_PROPERTY_PROVIDER_PID_EXPANDED, &response)?;
                manager.contract_requested(tracked.id(), &provider_pid)?;
            }
            Ok(())
        });
        self
    }

    /// Sends a counter-offer for the tracked negotiation.
    #[must_use]
    pub fn send_counter_offer_message(
        mut self,
        offer_id: &str,
        dataset_id: &str,
        expect_error: bool,
    ) -> Self {
        let client = Arc::clone(&self.client);
        let slot = self.core.process.clone();
        let provider_id = self.provider_id.clone();
        let offer_id = offer_id.to_string();
        let dataset_id = dataset_id.to_string();
        self.core.stage(move || {
            pause();
            let tracked = slot.require()?;
            let provider_pid = correlation_id(&tracked)?;
            let message = negotiation::create_counter_offer(
                &provider_pid,
                tracked.id(),
                &offer_id,
                &provider_id,
                TCK_PARTICIPANT_ID,
                &dataset_id,
            );
            if !expect_error {
                tracked.transition(NegotiationState::Requested)?;
            }
            client.counter_offer_request(&message, TCK_PARTICIPANT_ID, expect_error)?;
            Ok(())
        });
        self
    }

    /// Accepts the last offer of the provider.
    #[must_use]
    pub fn accept_last_offer(mut self) -> Self {
        let client = Arc::clone(&self.client);
        let manager = Arc::clone(&self.manager);
        let slot = self.core.process.clone();
        self.core.stage(move || {
            pause();
            let tracked = slot.require()?;
            let provider_pid = correlation_id(&tracked)?;
            let event = negotiation::create_accepted_event(&provider_pid, tracked.id());
            manager.accepted(tracked.id())?;
            client.accept(&event)?;
            Ok(())
        });
        self
    }

    /// Sends an agreement verification.
    #[must_use]
    pub fn send_verified_event(mut self, expect_error: bool) -> Self {
        let client = Arc::clone(&self.client);
        let manager = Arc::clone(&self.manager);
        let slot = self.core.process.clone();
        self.core.stage(move || {
            pause();
            let tracked = slot.require()?;
            let provider_pid = correlation_id(&tracked)?;
            let message = negotiation::create_verification(&provider_pid, tracked.id());
            if !expect_error {
                manager.verified(tracked.id())?;
            }
            client.verify(&message, expect_error)?;
            Ok(())
        });
        self
    }

    /// Sends a termination for the tracked negotiation.
    #[must_use]
    pub fn send_termination(mut self, expect_error: bool) -> Self {
        let client = Arc::clone(&self.client);
        let manager = Arc::clone(&self.manager);
        let slot = self.core.process.clone();
        self.core.stage(move || {
            pause();
            let tracked = slot.require()?;
            let provider_pid = correlation_id(&tracked)?;
            let message = negotiation::create_termination(
                &tracked.provider_pid(),
                &tracked.consumer_pid(),
                "1",
                &[],
            );
            if !expect_error {
                manager.terminated(tracked.id())?;
            }
            client.terminate(&provider_pid, &message, expect_error)?;
            Ok(())
        });
        self
    }

    /// Expects an offer from the provider and applies `action` to it.
    #[must_use]
    pub fn expect_offer_message<F>(mut self, action: F) -> Self
    where
        F: Fn(&JsonObject) -> Result<(), NegotiationError> + Send + Sync + 'static,
    {
        self.core.expect(OFFERS_PATH, move |message| action(message).map(|()| None));
        self
    }

    /// Expects an agreement from the provider and applies `action` to it.
    #[must_use]
    pub fn expect_agreement_message<F>(mut self, action: F) -> Self
    where
        F: Fn(&JsonObject) -> Result<(), NegotiationError> + Send + Sync + 'static,
    {
        self.core.expect(AGREEMENT_PATH, move |message| action(message).map(|()| None));
        self
    }

    /// Expects a `FINALIZED` event and applies `action` to it.
    #[must_use]
    pub fn expect_finalized_event<F>(mut self, action: F) -> Self
    where
        F: Fn(&JsonObject) -> Result<(), NegotiationError> + Send + Sync + 'static,
    {
        self.core.expect(EVENTS_PATH, move |message| action(message).map(|()| None));
        self
    }

    /// Expects a termination and answers with the result of `action`.
    #[must_use]
    pub fn expect_termination_message<F>(mut self, action: F) -> Self
    where
        F: Fn(&JsonObject) -> Result<JsonObject, NegotiationError> + Send + Sync + 'static,
    {
        self.core.expect_reply(TERMINATION_PATH, action);
        self
    }

    /// Waits for the last expected message, then for `state`.
    #[must_use]
    pub fn then_wait_for_state(mut self, state: NegotiationState) -> Self {
        self.core.then_wait_for_state(state);
        self
    }

    /// Fetches the provider negotiation and checks its state.
    #[must_use]
    pub fn then_verify_provider_state(mut self, state: NegotiationState) -> Self {
        let client = Arc::clone(&self.client);
        let slot = self.core.process.clone();
        self.core.stage(move || {
            pause();
            let tracked = slot.require()?;
            let provider_pid = correlation_id(&tracked)?;
            let reported = client.get_negotiation(&provider_pid)?;
            check_state(&reported, state)
        });
        self
    }

    /// Runs every stage in order.
    ///
    /// # Errors
    /// Returns the first [`PipelineError`] raised by a stage.
    pub fn execute(self) -> Result<(), PipelineError> {
        self.core.execute()
    }
}
