// crates/dsp-tck-system/src/pipeline/consumer.rs
// ============================================================================
// Module: Consumer Negotiation Pipeline
// Description: Drives a connector under test that plays the consumer.
// Purpose: Let the TCK act as provider while scenarios check consumer behaviour.
// Dependencies: dsp-tck-api, dsp-tck-core, tracing
// ============================================================================

//! ## Overview
//! The TCK plays the provider through the provider manager of a TCK
//! connector. The consumer under test starts each negotiation, so the
//! pipeline learns the TCK negotiation from the first contract request the
//! provider manager records after `initiate_request`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::Weak;
use std::time::Duration;

use dsp_tck_api::ContractNegotiation;
use dsp_tck_api::ListenerId;
use dsp_tck_api::NegotiationError;
use dsp_tck_api::NegotiationListener;
use dsp_tck_api::NegotiationState;
use dsp_tck_api::ProviderNegotiationManager;
use dsp_tck_api::constants::TCK_PARTICIPANT_ID;
use dsp_tck_api::messages::negotiation;
use dsp_tck_api::random_uuid;
use dsp_tck_core::CallbackEndpoint;
use dsp_tck_core::JsonObject;
use dsp_tck_core::MessageSerializer;
use tracing::debug;

use super::NegotiationSlot;
use super::PipelineCore;
use super::PipelineError;
use super::check_state;
use super::correlation_id;
use super::pause;
use crate::client::ConsumerNegotiationClient;

// ============================================================================
// SECTION: Paths
// ============================================================================

/// Callback path of initial contract requests.
const INITIAL_REQUEST_PATH: &str = "/negotiations/request";
/// Callback path of counter-offers.
const REQUEST_PATH: &str = "/negotiations/[^/]+/request";
/// Callback path of events sent by the consumer.
const EVENTS_PATH: &str = "/negotiations/[^/]+/events";
/// Callback path of agreement verifications.
const VERIFICATION_PATH: &str = "/negotiations/[^/]+/agreement/verification";
/// Callback path of terminations sent by the consumer.
const TERMINATION_PATH: &str = "/negotiations/[^/]+/termination";

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Staged negotiation against a consumer under test.
pub struct ConsumerNegotiationPipeline {
    /// Stages and shared services.
    core: PipelineCore<ContractNegotiation>,
    /// Client calling the consumer.
    client: Arc<dyn ConsumerNegotiationClient>,
    /// Provider manager of the TCK connector.
    manager: Arc<dyn ProviderNegotiationManager>,
    /// Participant id of the consumer under test.
    consumer_id: String,
}

impl ConsumerNegotiationPipeline {
    /// Creates an empty pipeline. `manager` holds the TCK negotiations,
    /// `consumer_id` names the connector under test in sent policies.
    #[must_use]
    pub fn new(
        client: Arc<dyn ConsumerNegotiationClient>,
        manager: Arc<dyn ProviderNegotiationManager>,
        endpoint: Arc<CallbackEndpoint>,
        serializer: Arc<MessageSerializer>,
        consumer_id: &str,
        wait: Duration,
    ) -> Self {
        Self {
            core: PipelineCore::new(endpoint, serializer, wait),
            client,
            manager,
            consumer_id: consumer_id.to_string(),
        }
    }

    /// Asks the consumer to start a negotiation and tracks the first
    /// negotiation it requests.
    #[must_use]
    pub fn initiate_request(mut self, dataset_id: &str, offer_id: &str) -> Self {
        let client = Arc::clone(&self.client);
        let manager = Arc::clone(&self.manager);
        let slot = self.core.process.clone();
        let dataset_id = dataset_id.to_string();
        let offer_id = offer_id.to_string();
        self.core.stage(move || {
            let registration = Arc::new(OnceLock::new());
            let listener = FirstRequestListener {
                slot,
                manager: Arc::downgrade(&manager),
                registration: Arc::clone(&registration),
            };
            let id = manager.register_listener(Arc::new(listener));
            if registration.set(id).is_err() {
                debug!("request listener registered twice");
            }
            debug!(dataset = %dataset_id, offer = %offer_id, "initiating consumer request");
            client.initiate_request(&dataset_id, &offer_id)?;
            Ok(())
        });
        self
    }

    /// Sends an offer to the consumer.
    #[must_use]
    pub fn send_offer_message(mut self, expect_error: bool) -> Self {
        let client = Arc::clone(&self.client);
        let manager = Arc::clone(&self.manager);
        let slot = self.core.process.clone();
        let consumer_id = self.consumer_id.clone();
        self.core.stage(move || {
            pause();
            let tracked = slot.require()?;
            let consumer_pid = correlation_id(&tracked)?;
            let assignee = tracked.counter_party_id().unwrap_or(&consumer_id);
            let message = negotiation::create_offer(
                tracked.id(),
                &consumer_pid,
                tracked.offer_id(),
                TCK_PARTICIPANT_ID,
                assignee,
                tracked.dataset_id(),
            );
            if !expect_error {
                manager.offered(tracked.id())?;
            }
            client.contract_offer(&consumer_pid, &message, callback(&tracked), expect_error)?;
            Ok(())
        });
        self
    }

    /// Sends an agreement to the consumer.
    #[must_use]
    pub fn send_agreement_message(mut self, expect_error: bool) -> Self {
        let client = Arc::clone(&self.client);
        let manager = Arc::clone(&self.manager);
        let slot = self.core.process.clone();
        let consumer_id = self.consumer_id.clone();
        let address = self.core.endpoint.address().to_string();
        self.core.stage(move || {
            pause();
            let tracked = slot.require()?;
            let consumer_pid = correlation_id(&tracked)?;
            let message = negotiation::create_agreement(
                tracked.id(),
                &consumer_pid,
                &random_uuid(),
                TCK_PARTICIPANT_ID,
                &consumer_id,
                tracked.dataset_id(),
                &address,
            );
            if !expect_error {
                manager.agreed(tracked.id())?;
            }
            client.contract_agreement(&consumer_pid, &message, callback(&tracked), expect_error)?;
            Ok(())
        });
        self
    }

    /// Sends a `FINALIZED` event to the consumer.
    #[must_use]
    pub fn send_finalized_event(mut self, expect_error: bool) -> Self {
        let client = Arc::clone(&self.client);
        let manager = Arc::clone(&self.manager);
        let slot = self.core.process.clone();
        self.core.stage(move || {
            pause();
            let tracked = slot.require()?;
            let consumer_pid = correlation_id(&tracked)?;
            let event = negotiation::create_finalized_event(tracked.id(), &consumer_pid);
            if !expect_error {
                manager.finalized(tracked.id())?;
            }
            client.finalize(&consumer_pid, &event, callback(&tracked), expect_error)?;
            Ok(())
        });
        self
    }

    /// Sends a termination to the consumer.
    #[must_use]
    pub fn send_termination(mut self, expect_error: bool) -> Self {
        let client = Arc::clone(&self.client);
        let manager = Arc::clone(&self.manager);
        let slot = self.core.process.clone();
        self.core.stage(move || {
            pause();
            let tracked = slot.require()?;
            let consumer_pid = correlation_id(&tracked)?;
            let message = negotiation::create_termination(
                &tracked.provider_pid(),
                &tracked.consumer_pid(),
                "1",
                &[],
            );
            if !expect_error {
                manager.terminated(tracked.id())?;
            }
            client.terminate(&consumer_pid, &message, callback(&tracked), expect_error)?;
            Ok(())
        });
        self
    }

    /// Expects the initial contract request. `action` receives the message
    /// and the consumer participant id and returns the response body.
    #[must_use]
    pub fn expect_initial_request<F>(mut self, action: F) -> Self
    where
        F: Fn(&JsonObject, &str) -> Result<JsonObject, NegotiationError> + Send + Sync + 'static,
    {
        let consumer_id = self.consumer_id.clone();
        self.core.expect_reply(INITIAL_REQUEST_PATH, move |message| action(message, &consumer_id));
        self
    }

    /// Expects a counter-offer from the consumer.
    #[must_use]
    pub fn expect_request<F>(mut self, action: F) -> Self
    where
        F: Fn(&JsonObject, &str) -> Result<JsonObject, NegotiationError> + Send + Sync + 'static,
    {
        let consumer_id = self.consumer_id.clone();
        self.core.expect_reply(REQUEST_PATH, move |message| action(message, &consumer_id));
        self
    }

    /// Expects an `ACCEPTED` event from the consumer.
    #[must_use]
    pub fn expect_accepted_event<F>(mut self, action: F) -> Self
    where
        F: Fn(&JsonObject) -> Result<(), NegotiationError> + Send + Sync + 'static,
    {
        self.core.expect(EVENTS_PATH, move |message| action(message).map(|()| None));
        self
    }

    /// Expects an agreement verification from the consumer.
    #[must_use]
    pub fn expect_verified_message<F>(mut self, action: F) -> Self
    where
        F: Fn(&JsonObject) -> Result<(), NegotiationError> + Send + Sync + 'static,
    {
        self.core.expect(VERIFICATION_PATH, move |message| action(message).map(|()| None));
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

    /// Fetches the consumer negotiation and checks its state.
    #[must_use]
    pub fn then_verify_consumer_state(mut self, state: NegotiationState) -> Self {
        let client = Arc::clone(&self.client);
        let slot = self.core.process.clone();
        self.core.stage(move || {
            pause();
            let tracked = slot.require()?;
            let consumer_pid = correlation_id(&tracked)?;
            let reported = client.get_negotiation(&consumer_pid, callback(&tracked))?;
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

/// Returns the consumer callback address recorded on `negotiation`.
fn callback(negotiation: &ContractNegotiation) -> &str {
    negotiation.callback_address().unwrap_or_default()
}

// ============================================================================
// SECTION: Request Listener
// ============================================================================

/// Records the first requested negotiation, then removes itself.
struct FirstRequestListener {
    /// Slot of the pipeline.
    slot: NegotiationSlot,
    /// Manager the listener is registered with.
    manager: Weak<dyn ProviderNegotiationManager>,
    /// Registration id, set right after registering.
    registration: Arc<OnceLock<ListenerId>>,
}

impl NegotiationListener for FirstRequestListener {
    fn contract_requested(&self, negotiation: &Arc<ContractNegotiation>) {
        if self.slot.fill(negotiation) {
            debug!(provider_pid = %negotiation.id(), "tracking requested negotiation");
        }
        if let (Some(manager), Some(id)) = (self.manager.upgrade(), self.registration.get()) {
            manager.deregister_listener(*id);
        }
    }
}
