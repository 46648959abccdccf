// crates/dsp-tck-suite/src/actions/consumer.rs
// ============================================================================
// Module: Consumer Actions
// Description: Messages of a local consumer under test.
// Purpose: Post requests, events, verifications, terminations and counter-offers.
// Dependencies: dsp-tck-api, dsp-tck-core, dsp-tck-system
// ============================================================================

//! ## Overview
//! Consumer actions receive the TCK callback address and the consumer
//! negotiation of the local connector. The initial request learns the
//! provider process id from the reply; every later message is addressed to
//! `<callback>/negotiations/<providerPid>/...`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use dsp_tck_api::NegotiationState;
use dsp_tck_api::access::string_id_property;
use dsp_tck_api::constants::DSPACE_PROPERTY_PROVIDER_PID_EXPANDED;
use dsp_tck_api::constants::TCK_PARTICIPANT_ID;
use dsp_tck_api::messages::negotiation;
use dsp_tck_api::mock::ConsumerAction;
use dsp_tck_core::MessageSerializer;
use dsp_tck_system::ClientError;
use dsp_tck_system::client::HttpExecutor;
use tracing::debug;

use super::correlation_id;
use super::post;

// ============================================================================
// SECTION: Actions
// ============================================================================

/// Factory of consumer mock actions.
#[derive(Clone)]
pub struct ConsumerActions {
    /// Executor posting to the TCK endpoint.
    http: HttpExecutor,
    /// Participant id of the local consumer.
    participant_id: String,
}

impl ConsumerActions {
    /// Creates the factory; `participant_id` names the local consumer in
    /// counter-offers.
    ///
    /// # Errors
    /// Returns [`ClientError`] when the HTTP client cannot be built.
    pub fn new(
        serializer: Arc<MessageSerializer>,
        participant_id: &str,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            http: HttpExecutor::new(serializer, None)?,
            participant_id: participant_id.to_string(),
        })
    }

    /// Sends the initial contract request, then records the provider
    /// process id and moves to `REQUESTED`.
    #[must_use]
    pub fn post_request(&self) -> ConsumerAction {
        let actions = self.clone();
        Box::new(move |address, negotiation| {
            let message = negotiation::create_contract_request(
                negotiation.id(),
                None,
                negotiation.offer_id(),
                negotiation.dataset_id(),
                Some(address),
            );
            let url = format!("{}/negotiations/request", base(address));
            let reply = post(&actions.http, &url, "request", negotiation.id(), &message)?;
            let response = actions.http.serializer().process_json_ld_bytes(&reply.body)?;
            let provider_pid =
                string_id_property(DSPACE_PROPERTY_PROVIDER_PID_EXPANDED, &response)?;
            debug!(
                consumer_pid = %negotiation.id(),
                provider_pid = %provider_pid,
                "request acknowledged"
            );
            negotiation.set_correlation_id(&provider_pid, NegotiationState::Requested)?;
            Ok(())
        })
    }

    /// Accepts the last offer.
    #[must_use]
    pub fn post_accepted(&self) -> ConsumerAction {
        let actions = self.clone();
        Box::new(move |address, negotiation| {
            let provider_pid = correlation_id(negotiation)?;
            let event = negotiation::create_accepted_event(&provider_pid, negotiation.id());
            negotiation.transition(NegotiationState::Accepted)?;
            let url = format!("{}/negotiations/{provider_pid}/events", base(address));
            post(&actions.http, &url, "accept", negotiation.id(), &event).map(|_| ())
        })
    }

    /// Verifies the agreement.
    #[must_use]
    pub fn post_verification(&self) -> ConsumerAction {
        let actions = self.clone();
        Box::new(move |address, negotiation| {
            let provider_pid = correlation_id(negotiation)?;
            let message = negotiation::create_verification(&provider_pid, negotiation.id());
            negotiation.transition(NegotiationState::Verified)?;
            let url =
                format!("{}/negotiations/{provider_pid}/agreement/verification", base(address));
            post(&actions.http, &url, "verify", negotiation.id(), &message).map(|_| ())
        })
    }

    /// Terminates the negotiation.
    #[must_use]
    pub fn post_terminated(&self) -> ConsumerAction {
        let actions = self.clone();
        Box::new(move |address, negotiation| {
            let provider_pid = correlation_id(negotiation)?;
            let message =
                negotiation::create_termination(&provider_pid, negotiation.id(), "1", &[]);
            negotiation.transition(NegotiationState::Terminated)?;
            let url = format!("{}/negotiations/{provider_pid}/termination", base(address));
            post(&actions.http, &url, "termination", negotiation.id(), &message).map(|_| ())
        })
    }

    /// Answers an offer with a counter-offer.
    #[must_use]
    pub fn post_offer(&self) -> ConsumerAction {
        let actions = self.clone();
        Box::new(move |address, negotiation| {
            let provider_pid = correlation_id(negotiation)?;
            let message = negotiation::create_counter_offer(
                &provider_pid,
                negotiation.id(),
                negotiation.offer_id(),
                &actions.participant_id,
                TCK_PARTICIPANT_ID,
                negotiation.dataset_id(),
            );
            negotiation.transition(NegotiationState::Requested)?;
            let url = format!("{}/negotiations/{provider_pid}/request", base(address));
            post(&actions.http, &url, "counter-offer", negotiation.id(), &message).map(|_| ())
        })
    }
}

/// Returns `address` without a trailing `/`.
fn base(address: &str) -> &str {
    address.trim_end_matches('/')
}
