// crates/dsp-tck-suite/src/actions/provider.rs
// ============================================================================
// Module: Provider Actions
// Description: Replies of a local provider under test.
// Purpose: Post offers, agreements, finalized events and terminations to the TCK.
// Dependencies: dsp-tck-api, dsp-tck-core, dsp-tck-system
// ============================================================================

//! ## Overview
//! Provider actions receive the provider negotiation of the local connector.
//! Messages go to `<callback>/negotiations/<consumerPid>/...`, where the
//! callback address and consumer process id were recorded from the
//! contract request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::thread;

use dsp_tck_api::ContractNegotiation;
use dsp_tck_api::NegotiationState;
use dsp_tck_api::constants::TCK_PARTICIPANT_ID;
use dsp_tck_api::messages::negotiation;
use dsp_tck_api::mock::ActionError;
use dsp_tck_api::mock::ProviderAction;
use dsp_tck_api::random_uuid;
use dsp_tck_core::MessageSerializer;
use dsp_tck_system::ClientError;
use dsp_tck_system::client::HttpExecutor;
use dsp_tck_system::pipeline::PAUSE;

use super::correlation_id;
use super::post;

// ============================================================================
// SECTION: Actions
// ============================================================================

/// Factory of provider mock actions.
#[derive(Clone)]
pub struct ProviderActions {
    /// Executor posting to the TCK endpoint.
    http: HttpExecutor,
    /// Participant id of the local provider.
    participant_id: String,
}

impl ProviderActions {
    /// Creates the factory; `participant_id` names the local provider in
    /// offers and agreements.
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

    /// Offers the requested contract.
    #[must_use]
    pub fn post_offer(&self) -> ProviderAction {
        let actions = self.clone();
        Box::new(move |negotiation| {
            thread::sleep(PAUSE);
            let callback = callback(negotiation)?;
            let consumer_pid = correlation_id(negotiation)?;
            let message = negotiation::create_offer(
                negotiation.id(),
                &consumer_pid,
                negotiation.offer_id(),
                &actions.participant_id,
                assignee(negotiation),
                negotiation.dataset_id(),
            );
            negotiation.transition(NegotiationState::Offered)?;
            let url = format!("{callback}/negotiations/{consumer_pid}/offers");
            post(&actions.http, &url, "offer", negotiation.id(), &message).map(|_| ())
        })
    }

    /// Agrees to the requested contract.
    #[must_use]
    pub fn post_agreed(&self) -> ProviderAction {
        let actions = self.clone();
        Box::new(move |negotiation| {
            thread::sleep(PAUSE);
            let callback = callback(negotiation)?;
            let consumer_pid = correlation_id(negotiation)?;
            let message = negotiation::create_agreement(
                negotiation.id(),
                &consumer_pid,
                &random_uuid(),
                &actions.participant_id,
                assignee(negotiation),
                negotiation.dataset_id(),
                callback,
            );
            negotiation.transition(NegotiationState::Agreed)?;
            let url = format!("{callback}/negotiations/{consumer_pid}/agreement");
            post(&actions.http, &url, "agreement", negotiation.id(), &message).map(|_| ())
        })
    }

    /// Finalizes a verified negotiation.
    #[must_use]
    pub fn post_finalized(&self) -> ProviderAction {
        let actions = self.clone();
        Box::new(move |negotiation| {
            thread::sleep(PAUSE);
            let callback = callback(negotiation)?;
            let consumer_pid = correlation_id(negotiation)?;
            let message = negotiation::create_finalized_event(negotiation.id(), &consumer_pid);
            negotiation.transition(NegotiationState::Finalized)?;
            let url = format!("{callback}/negotiations/{consumer_pid}/events");
            post(&actions.http, &url, "finalize", negotiation.id(), &message).map(|_| ())
        })
    }

    /// Terminates the negotiation.
    #[must_use]
    pub fn post_terminate(&self) -> ProviderAction {
        let actions = self.clone();
        Box::new(move |negotiation| {
            thread::sleep(PAUSE);
            let callback = callback(negotiation)?;
            let consumer_pid = correlation_id(negotiation)?;
            let message =
                negotiation::create_termination(negotiation.id(), &consumer_pid, "1", &[]);
            negotiation.transition(NegotiationState::Terminated)?;
            let url = format!("{callback}/negotiations/{consumer_pid}/termination");
            post(&actions.http, &url, "termination", negotiation.id(), &message).map(|_| ())
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the consumer callback address without a trailing `/`.
fn callback(negotiation: &ContractNegotiation) -> Result<&str, ActionError> {
    negotiation
        .callback_address()
        .map(|address| address.trim_end_matches('/'))
        .ok_or_else(|| format!("negotiation {} has no callback address", negotiation.id()).into())
}

/// Returns the consumer participant id, the TCK unless recorded otherwise.
fn assignee(negotiation: &ContractNegotiation) -> &str {
    negotiation.counter_party_id().unwrap_or(TCK_PARTICIPANT_ID)
}
