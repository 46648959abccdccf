// crates/dsp-tck-system/src/client/negotiation.rs
// ============================================================================
// Module: Negotiation Clients
// Description: HTTP and local clients for contract negotiation messages.
// Purpose: Deliver TCK negotiation messages to the connector under test.
// Dependencies: dsp-tck-api, dsp-tck-core, serde_json, tracing, url
// ============================================================================

//! ## Overview
//! HTTP clients address a remote connector: the provider client below the
//! connector's DSP base URL, the consumer client at the callback address the
//! consumer announced. Local clients expand each message and hand it to the
//! managers of an in-process connector.
//! Invariants:
//! - Local operations with `expect_error` swallow only state errors and
//!   fail when none occurs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use dsp_tck_api::Connector;
use dsp_tck_api::access::compact_string_property;
use dsp_tck_api::access::string_id_property;
use dsp_tck_api::constants::DSPACE_PROPERTY_CONSUMER_PID;
use dsp_tck_api::constants::DSPACE_PROPERTY_PROVIDER_PID;
use dsp_tck_api::constants::DSPACE_PROPERTY_STATE_EXPANDED;
use dsp_tck_api::constants::TCK_PARTICIPANT_ID;
use dsp_tck_api::messages::negotiation::create_negotiation_response;
use dsp_tck_core::JsonObject;
use dsp_tck_core::MessageSerializer;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::ClientError;
use super::ConsumerNegotiationClient;
use super::ProviderNegotiationClient;
use super::http::HttpExecutor;
use super::http::HttpReply;
use super::http::base_url;
use super::http::join;
use super::local::execute;

// ============================================================================
// SECTION: HTTP Provider Client
// ============================================================================

/// Calls a remote provider below its DSP base URL.
pub struct HttpProviderNegotiationClient {
    /// Provider DSP base URL, ending with `/`.
    base: Url,
    /// Shared HTTP executor.
    executor: HttpExecutor,
}

impl HttpProviderNegotiationClient {
    /// Creates a client for the provider at `base_url`.
    ///
    /// # Errors
    /// Returns [`ClientError::InvalidUrl`] when `base_url` is not a URL.
    pub fn new(base: &str, executor: HttpExecutor) -> Result<Self, ClientError> {
        Ok(Self { base: base_url(base)?, executor })
    }

    /// Posts a message below the base URL.
    fn post(&self, path: &str, message: &JsonObject) -> Result<HttpReply, ClientError> {
        self.executor.post_json_ld(&join(&self.base, path)?, message)
    }
}

impl ProviderNegotiationClient for HttpProviderNegotiationClient {
    fn contract_request(
        &self,
        message: &JsonObject,
        counter_party_id: &str,
        expect_error: bool,
    ) -> Result<Option<JsonObject>, ClientError> {
        let consumer_pid = compact_string_property(DSPACE_PROPERTY_CONSUMER_PID, message)?;
        debug!(
            consumer_pid = %consumer_pid,
            counter_party = %counter_party_id,
            "sending contract request"
        );
        let reply = self.post("negotiations/request", message)?;
        reply.check("contract request", &consumer_pid, expect_error)?;
        if expect_error {
            return Ok(None);
        }
        let negotiation = self.executor.serializer().process_json_ld_bytes(&reply.body)?;
        debug!(consumer_pid = %consumer_pid, "received contract request response");
        Ok(Some(negotiation))
    }

    fn counter_offer_request(
        &self,
        message: &JsonObject,
        counter_party_id: &str,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        let provider_pid = compact_string_property(DSPACE_PROPERTY_PROVIDER_PID, message)?;
        debug!(
            provider_pid = %provider_pid,
            counter_party = %counter_party_id,
            "sending counter-offer"
        );
        let reply = self.post(&format!("negotiations/{provider_pid}/request"), message)?;
        reply.check("counter-offer", &provider_pid, expect_error)
    }

    fn accept(&self, event: &JsonObject) -> Result<(), ClientError> {
        let provider_pid = compact_string_property(DSPACE_PROPERTY_PROVIDER_PID, event)?;
        let reply = self.post(&format!("negotiations/{provider_pid}/events"), event)?;
        if !reply.is_success() {
            return Err(ClientError::Verification(format!(
                "Accept event failed with code {}: {provider_pid}",
                reply.status
            )));
        }
        debug!(provider_pid = %provider_pid, "received accept response");
        Ok(())
    }

    fn verify(&self, message: &JsonObject, expect_error: bool) -> Result<(), ClientError> {
        let provider_pid = compact_string_property(DSPACE_PROPERTY_PROVIDER_PID, message)?;
        let path = format!("negotiations/{provider_pid}/agreement/verification");
        let reply = self.post(&path, message)?;
        reply.check("verify", &provider_pid, expect_error)?;
        debug!(provider_pid = %provider_pid, "received verification response");
        Ok(())
    }

    fn terminate(
        &self,
        provider_pid: &str,
        message: &JsonObject,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        let reply = self.post(&format!("negotiations/{provider_pid}/termination"), message)?;
        reply.check("termination", provider_pid, expect_error)?;
        debug!(provider_pid = %provider_pid, "received negotiation terminate response");
        Ok(())
    }

    fn get_negotiation(&self, provider_pid: &str) -> Result<JsonObject, ClientError> {
        let reply = self.executor.get(&join(&self.base, &format!("negotiations/{provider_pid}"))?)?;
        reply.check("get negotiation", provider_pid, false)?;
        let negotiation = self.executor.serializer().process_json_ld_bytes(&reply.body)?;
        log_negotiation_status(&negotiation);
        Ok(negotiation)
    }
}

// ============================================================================
// SECTION: HTTP Consumer Client
// ============================================================================

/// Calls a remote consumer through its initiate URL and callback address.
pub struct HttpConsumerNegotiationClient {
    /// URL that makes the consumer start a negotiation.
    initiate_url: String,
    /// Address the consumer should send its request to.
    tck_address: String,
    /// Shared HTTP executor.
    executor: HttpExecutor,
}

impl HttpConsumerNegotiationClient {
    /// Creates a client that initiates negotiations at `initiate_url` and
    /// points the consumer at `tck_address`.
    #[must_use]
    pub fn new(
        initiate_url: impl Into<String>,
        tck_address: impl Into<String>,
        executor: HttpExecutor,
    ) -> Self {
        Self { initiate_url: initiate_url.into(), tck_address: tck_address.into(), executor }
    }

    /// Posts a message to `{callback}/negotiations/{consumer_pid}/{suffix}`.
    fn post_callback(
        &self,
        callback_address: &str,
        consumer_pid: &str,
        suffix: &str,
        message: &JsonObject,
    ) -> Result<HttpReply, ClientError> {
        let base = callback_address.trim_end_matches('/');
        let url = format!("{base}/negotiations/{consumer_pid}/{suffix}");
        self.executor.post_json_ld(&url, message)
    }
}

impl ConsumerNegotiationClient for HttpConsumerNegotiationClient {
    fn initiate_request(&self, dataset_id: &str, offer_id: &str) -> Result<(), ClientError> {
        let mut request = JsonObject::new();
        request.insert("providerId".to_string(), Value::String(TCK_PARTICIPANT_ID.to_string()));
        request.insert("offerId".to_string(), Value::String(offer_id.to_string()));
        request.insert("datasetId".to_string(), Value::String(dataset_id.to_string()));
        request.insert("connectorAddress".to_string(), Value::String(self.tck_address.clone()));
        let reply = self.executor.post_plain_json(&self.initiate_url, &request)?;
        reply.check("initiate request", dataset_id, false)?;
        debug!(dataset = %dataset_id, offer = %offer_id, "received initiate request response");
        Ok(())
    }

    fn contract_offer(
        &self,
        consumer_pid: &str,
        message: &JsonObject,
        callback_address: &str,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        let reply = self.post_callback(callback_address, consumer_pid, "offers", message)?;
        reply.check("offer", consumer_pid, expect_error)?;
        debug!(consumer_pid = %consumer_pid, "received contract offer response");
        Ok(())
    }

    fn contract_agreement(
        &self,
        consumer_pid: &str,
        message: &JsonObject,
        callback_address: &str,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        let reply = self.post_callback(callback_address, consumer_pid, "agreement", message)?;
        reply.check("agreement", consumer_pid, expect_error)?;
        debug!(consumer_pid = %consumer_pid, "received contract agreement response");
        Ok(())
    }

    fn finalize(
        &self,
        consumer_pid: &str,
        event: &JsonObject,
        callback_address: &str,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        let reply = self.post_callback(callback_address, consumer_pid, "events", event)?;
        reply.check("finalize", consumer_pid, expect_error)?;
        debug!(consumer_pid = %consumer_pid, "received contract finalize response");
        Ok(())
    }

    fn terminate(
        &self,
        consumer_pid: &str,
        message: &JsonObject,
        callback_address: &str,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        let reply = self.post_callback(callback_address, consumer_pid, "termination", message)?;
        reply.check("termination", consumer_pid, expect_error)?;
        debug!(consumer_pid = %consumer_pid, "received negotiation terminate response");
        Ok(())
    }

    fn get_negotiation(
        &self,
        consumer_pid: &str,
        callback_address: &str,
    ) -> Result<JsonObject, ClientError> {
        let url = format!("{}/negotiations/{consumer_pid}", callback_address.trim_end_matches('/'));
        let reply = self.executor.get(&url)?;
        reply.check("get negotiation", consumer_pid, false)?;
        let negotiation = self.executor.serializer().process_json_ld_bytes(&reply.body)?;
        log_negotiation_status(&negotiation);
        Ok(negotiation)
    }
}

/// Logs the state of a fetched negotiation.
fn log_negotiation_status(negotiation: &JsonObject) {
    let state = string_id_property(DSPACE_PROPERTY_STATE_EXPANDED, negotiation).unwrap_or_default();
    debug!(state = %state, "received negotiation status response");
}

// ============================================================================
// SECTION: Local Provider Client
// ============================================================================

/// Delivers messages to the provider manager of a local connector.
pub struct LocalProviderNegotiationClient {
    /// Connector playing the provider under test.
    connector: Arc<dyn Connector>,
    /// Serializer validating and expanding messages.
    serializer: Arc<MessageSerializer>,
}

impl LocalProviderNegotiationClient {
    /// Creates a client for `connector`.
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>, serializer: Arc<MessageSerializer>) -> Self {
        Self { connector, serializer }
    }
}

impl ProviderNegotiationClient for LocalProviderNegotiationClient {
    fn contract_request(
        &self,
        message: &JsonObject,
        counter_party_id: &str,
        expect_error: bool,
    ) -> Result<Option<JsonObject>, ClientError> {
        let manager = self.connector.provider_negotiation_manager();
        execute(&self.serializer, "contractRequest", message, expect_error, |expanded| {
            let response = manager.handle_contract_request(expanded, counter_party_id)?;
            Ok(self.serializer.process_json_ld(&response)?)
        })
    }

    fn counter_offer_request(
        &self,
        message: &JsonObject,
        counter_party_id: &str,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        let manager = self.connector.provider_negotiation_manager();
        execute(&self.serializer, "counterOffer", message, expect_error, |expanded| {
            manager.handle_contract_request(expanded, counter_party_id)?;
            Ok(())
        })
        .map(|_| ())
    }

    fn accept(&self, event: &JsonObject) -> Result<(), ClientError> {
        let expanded = self.serializer.process_json_ld(event)?;
        self.connector.provider_negotiation_manager().handle_accepted(&expanded)?;
        Ok(())
    }

    fn verify(&self, message: &JsonObject, expect_error: bool) -> Result<(), ClientError> {
        let manager = self.connector.provider_negotiation_manager();
        execute(&self.serializer, "verify", message, expect_error, |expanded| {
            manager.handle_verified(expanded)?;
            Ok(())
        })
        .map(|_| ())
    }

    fn terminate(
        &self,
        _provider_pid: &str,
        message: &JsonObject,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        let manager = self.connector.provider_negotiation_manager();
        execute(&self.serializer, "termination", message, expect_error, |expanded| {
            manager.handle_termination(expanded)?;
            Ok(())
        })
        .map(|_| ())
    }

    fn get_negotiation(&self, provider_pid: &str) -> Result<JsonObject, ClientError> {
        let negotiation = self.connector.provider_negotiation_manager().find_by_id(provider_pid)?;
        let response = create_negotiation_response(
            &negotiation.provider_pid(),
            &negotiation.consumer_pid(),
            negotiation.state().as_str(),
        );
        Ok(self.serializer.process_json_ld(&response)?)
    }
}

// ============================================================================
// SECTION: Local Consumer Client
// ============================================================================

/// Delivers messages to the consumer manager of a local connector.
pub struct LocalConsumerNegotiationClient {
    /// Connector playing the consumer under test.
    connector: Arc<dyn Connector>,
    /// Serializer validating and expanding messages.
    serializer: Arc<MessageSerializer>,
}

impl LocalConsumerNegotiationClient {
    /// Creates a client for `connector`.
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>, serializer: Arc<MessageSerializer>) -> Self {
        Self { connector, serializer }
    }
}

impl ConsumerNegotiationClient for LocalConsumerNegotiationClient {
    fn initiate_request(&self, dataset_id: &str, offer_id: &str) -> Result<(), ClientError> {
        let manager = self.connector.consumer_negotiation_manager();
        manager.create_negotiation(dataset_id, offer_id, None)?;
        Ok(())
    }

    fn contract_offer(
        &self,
        _consumer_pid: &str,
        message: &JsonObject,
        _callback_address: &str,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        let manager = self.connector.consumer_negotiation_manager();
        execute(&self.serializer, "offer", message, expect_error, |expanded| {
            manager.handle_offer(expanded)?;
            Ok(())
        })
        .map(|_| ())
    }

    fn contract_agreement(
        &self,
        _consumer_pid: &str,
        message: &JsonObject,
        _callback_address: &str,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        let manager = self.connector.consumer_negotiation_manager();
        execute(&self.serializer, "agreement", message, expect_error, |expanded| {
            manager.handle_agreement(expanded)?;
            Ok(())
        })
        .map(|_| ())
    }

    fn finalize(
        &self,
        _consumer_pid: &str,
        event: &JsonObject,
        _callback_address: &str,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        let manager = self.connector.consumer_negotiation_manager();
        execute(&self.serializer, "finalize", event, expect_error, |expanded| {
            manager.handle_finalized(expanded)?;
            Ok(())
        })
        .map(|_| ())
    }

    fn terminate(
        &self,
        _consumer_pid: &str,
        message: &JsonObject,
        _callback_address: &str,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        let manager = self.connector.consumer_negotiation_manager();
        execute(&self.serializer, "termination", message, expect_error, |expanded| {
            manager.handle_termination(expanded)?;
            Ok(())
        })
        .map(|_| ())
    }

    fn get_negotiation(
        &self,
        consumer_pid: &str,
        _callback_address: &str,
    ) -> Result<JsonObject, ClientError> {
        let negotiation = self.connector.consumer_negotiation_manager().find_by_id(consumer_pid)?;
        let response = create_negotiation_response(
            &negotiation.provider_pid(),
            &negotiation.consumer_pid(),
            negotiation.state().as_str(),
        );
        Ok(self.serializer.process_json_ld(&response)?)
    }
}
