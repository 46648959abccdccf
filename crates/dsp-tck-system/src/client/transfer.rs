// crates/dsp-tck-system/src/client/transfer.rs
// ============================================================================
// Module: Transfer Process Clients
// Description: HTTP and local clients for transfer process messages.
// Purpose: Deliver TCK transfer messages to the connector under test.
// Dependencies: dsp-tck-api, dsp-tck-core, serde_json, tracing, url
// ============================================================================

//! ## Overview
//! The HTTP provider client posts below the provider's DSP base URL; the
//! HTTP consumer client starts transfers through the consumer's initiate URL
//! and then posts to the callback address the consumer announced in its
//! transfer request. Local clients expand each message and hand it to the
//! transfer managers of an in-process connector.
//! Invariants:
//! - Local operations with `expect_error` swallow only state errors and
//!   fail when none occurs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use dsp_tck_api::Connector;
use dsp_tck_api::DataAddress;
use dsp_tck_api::TransferProcess;
use dsp_tck_api::TransferProcessManager;
use dsp_tck_api::access::compact_string_property;
use dsp_tck_api::access::string_id_property;
use dsp_tck_api::constants::DSPACE_PROPERTY_CONSUMER_PID;
use dsp_tck_api::constants::DSPACE_PROPERTY_STATE_EXPANDED;
use dsp_tck_api::constants::TCK_PARTICIPANT_ID;
use dsp_tck_api::messages::transfer::create_transfer_response;
use dsp_tck_core::JsonObject;
use dsp_tck_core::MessageSerializer;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::ClientError;
use super::ConsumerTransferProcessClient;
use super::ProviderTransferProcessClient;
use super::TransferProcessClient;
use super::http::HttpExecutor;
use super::http::base_url;
use super::http::join;
use super::local::execute;

// ============================================================================
// SECTION: Message Kinds
// ============================================================================

/// Transfer messages addressed to an existing process.
#[derive(Debug, Clone, Copy)]
enum TransferMessage {
    /// `TransferStartMessage`.
    Start,
    /// `TransferCompletionMessage`.
    Completion,
    /// `TransferSuspensionMessage`.
    Suspension,
    /// `TransferTerminationMessage`.
    Termination,
}

impl TransferMessage {
    /// Path segment below `transfers/{pid}/`, also used as operation name.
    const fn operation(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Completion => "completion",
            Self::Suspension => "suspension",
            Self::Termination => "termination",
        }
    }
}

/// Logs the state of a fetched transfer process.
fn log_transfer_status(process: &JsonObject) {
    let state = string_id_property(DSPACE_PROPERTY_STATE_EXPANDED, process).unwrap_or_default();
    debug!(state = %state, "received transfer status response");
}

// ============================================================================
// SECTION: HTTP Provider Client
// ============================================================================

/// Calls a remote provider below its DSP base URL.
pub struct HttpProviderTransferProcessClient {
    /// Provider DSP base URL, ending with `/`.
    base: Url,
    /// Shared HTTP executor.
    executor: HttpExecutor,
}

impl HttpProviderTransferProcessClient {
    /// Creates a client for the provider at `base`.
    ///
    /// # Errors
    /// Returns [`ClientError::InvalidUrl`] when `base` is not a URL.
    pub fn new(base: &str, executor: HttpExecutor) -> Result<Self, ClientError> {
        Ok(Self { base: base_url(base)?, executor })
    }

    /// Posts `message` to `transfers/{provider_pid}/{kind}`.
    fn send(
        &self,
        kind: TransferMessage,
        provider_pid: &str,
        message: &JsonObject,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        let path = format!("transfers/{provider_pid}/{}", kind.operation());
        let url = join(&self.base, &path)?;
        let reply = self.executor.post_json_ld(&url, message)?;
        reply.check(kind.operation(), provider_pid, expect_error)?;
        debug!(provider_pid = %provider_pid, operation = kind.operation(), "received response");
        Ok(())
    }
}

impl TransferProcessClient for HttpProviderTransferProcessClient {
    fn start_transfer(
        &self,
        counter_party_pid: &str,
        message: &JsonObject,
        _callback_address: &str,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        self.send(TransferMessage::Start, counter_party_pid, message, expect_error)
    }

    fn complete_transfer(
        &self,
        counter_party_pid: &str,
        message: &JsonObject,
        _callback_address: &str,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        self.send(TransferMessage::Completion, counter_party_pid, message, expect_error)
    }

    fn suspend_transfer(
        &self,
        counter_party_pid: &str,
        message: &JsonObject,
        _callback_address: &str,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        self.send(TransferMessage::Suspension, counter_party_pid, message, expect_error)
    }

    fn terminate_transfer(
        &self,
        counter_party_pid: &str,
        message: &JsonObject,
        _callback_address: &str,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        self.send(TransferMessage::Termination, counter_party_pid, message, expect_error)
    }

    fn get_transfer_process(
        &self,
        counter_party_pid: &str,
        _callback_address: &str,
    ) -> Result<JsonObject, ClientError> {
        let url = join(&self.base, &format!("transfers/{counter_party_pid}"))?;
        let reply = self.executor.get(&url)?;
        reply.check("get transfer process", counter_party_pid, false)?;
        let process = self.executor.serializer().process_json_ld_bytes(&reply.body)?;
        log_transfer_status(&process);
        Ok(process)
    }
}

impl ProviderTransferProcessClient for HttpProviderTransferProcessClient {
    fn transfer_request(
        &self,
        message: &JsonObject,
        counter_party_id: &str,
        expect_error: bool,
    ) -> Result<Option<JsonObject>, ClientError> {
        let consumer_pid = compact_string_property(DSPACE_PROPERTY_CONSUMER_PID, message)?;
        debug!(
            consumer_pid = %consumer_pid,
            counter_party = %counter_party_id,
            "sending transfer request"
        );
        let reply = self.executor.post_json_ld(&join(&self.base, "transfers/request")?, message)?;
        reply.check("transfer request", &consumer_pid, expect_error)?;
        if expect_error {
            return Ok(None);
        }
        let process = self.executor.serializer().process_json_ld_bytes(&reply.body)?;
        debug!(consumer_pid = %consumer_pid, "received transfer request response");
        Ok(Some(process))
    }
}

// ============================================================================
// SECTION: HTTP Consumer Client
// ============================================================================

/// Calls a remote consumer through its initiate URL and callback address.
pub struct HttpConsumerTransferProcessClient {
    /// URL that makes the consumer request a transfer.
    initiate_url: String,
    /// Address the consumer should send its request to.
    tck_address: String,
    /// Shared HTTP executor.
    executor: HttpExecutor,
}

impl HttpConsumerTransferProcessClient {
    /// Creates a client that initiates transfers at `initiate_url` and
    /// points the consumer at `tck_address`.
    #[must_use]
    pub fn new(
        initiate_url: impl Into<String>,
        tck_address: impl Into<String>,
        executor: HttpExecutor,
    ) -> Self {
        Self { initiate_url: initiate_url.into(), tck_address: tck_address.into(), executor }
    }

    /// Posts `message` to `{callback}/transfers/{consumer_pid}/{kind}`.
    fn send(
        &self,
        kind: TransferMessage,
        consumer_pid: &str,
        message: &JsonObject,
        callback_address: &str,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        let url = format!(
            "{}/transfers/{consumer_pid}/{}",
            callback_address.trim_end_matches('/'),
            kind.operation()
        );
        let reply = self.executor.post_json_ld(&url, message)?;
        reply.check(kind.operation(), consumer_pid, expect_error)?;
        debug!(consumer_pid = %consumer_pid, operation = kind.operation(), "received response");
        Ok(())
    }
}

impl TransferProcessClient for HttpConsumerTransferProcessClient {
    fn start_transfer(
        &self,
        consumer_pid: &str,
        message: &JsonObject,
        callback: &str,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        self.send(TransferMessage::Start, consumer_pid, message, callback, expect_error)
    }

    fn complete_transfer(
        &self,
        consumer_pid: &str,
        message: &JsonObject,
        callback: &str,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        self.send(TransferMessage::Completion, consumer_pid, message, callback, expect_error)
    }

    fn suspend_transfer(
        &self,
        consumer_pid: &str,
        message: &JsonObject,
        callback: &str,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        self.send(TransferMessage::Suspension, consumer_pid, message, callback, expect_error)
    }

    fn terminate_transfer(
        &self,
        consumer_pid: &str,
        message: &JsonObject,
        callback: &str,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        self.send(TransferMessage::Termination, consumer_pid, message, callback, expect_error)
    }

    fn get_transfer_process(
        &self,
        consumer_pid: &str,
        callback: &str,
    ) -> Result<JsonObject, ClientError> {
        let url = format!("{}/transfers/{consumer_pid}", callback.trim_end_matches('/'));
        let reply = self.executor.get(&url)?;
        reply.check("get transfer process", consumer_pid, false)?;
        let process = self.executor.serializer().process_json_ld_bytes(&reply.body)?;
        log_transfer_status(&process);
        Ok(process)
    }
}

impl ConsumerTransferProcessClient for HttpConsumerTransferProcessClient {
    fn initiate_transfer_request(
        &self,
        agreement_id: &str,
        format: &str,
    ) -> Result<(), ClientError> {
        let mut request = JsonObject::new();
        request.insert("providerId".to_string(), Value::String(TCK_PARTICIPANT_ID.to_string()));
        request.insert("agreementId".to_string(), Value::String(agreement_id.to_string()));
        request.insert("format".to_string(), Value::String(format.to_string()));
        request.insert("connectorAddress".to_string(), Value::String(self.tck_address.clone()));
        let reply = self.executor.post_plain_json(&self.initiate_url, &request)?;
        reply.check("initiate transfer request", agreement_id, false)?;
        debug!(agreement = %agreement_id, format = %format, "received initiate transfer response");
        Ok(())
    }
}

// ============================================================================
// SECTION: Local Clients
// ============================================================================

/// Applies `message` to `manager` under the error expectation of `kind`.
fn apply<M: TransferProcessManager + ?Sized>(
    manager: &M,
    serializer: &MessageSerializer,
    kind: TransferMessage,
    message: &JsonObject,
    expect_error: bool,
) -> Result<(), ClientError> {
    execute(serializer, kind.operation(), message, expect_error, |expanded| {
        match kind {
            TransferMessage::Start => {
                manager.handle_start(expanded, &|_: Option<&DataAddress>| true)?
            }
            TransferMessage::Completion => manager.handle_completion(expanded)?,
            TransferMessage::Suspension => manager.handle_suspension(expanded)?,
            TransferMessage::Termination => manager.handle_termination(expanded)?,
        };
        Ok(())
    })
    .map(|_| ())
}

/// Expands the `TransferProcess` response describing `process`.
fn describe(
    serializer: &MessageSerializer,
    process: &TransferProcess,
) -> Result<JsonObject, ClientError> {
    let response = create_transfer_response(
        &process.provider_pid(),
        &process.consumer_pid(),
        process.state().as_str(),
    );
    Ok(serializer.process_json_ld(&response)?)
}

/// Delivers messages to the provider transfer manager of a local connector.
pub struct LocalProviderTransferProcessClient {
    /// Connector playing the provider under test.
    connector: Arc<dyn Connector>,
    /// Serializer validating and expanding messages.
    serializer: Arc<MessageSerializer>,
}

impl LocalProviderTransferProcessClient {
    /// Creates a client for `connector`.
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>, serializer: Arc<MessageSerializer>) -> Self {
        Self { connector, serializer }
    }

    /// Delivers a message addressed to an existing provider process.
    fn deliver(
        &self,
        kind: TransferMessage,
        message: &JsonObject,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        let manager = self.connector.provider_transfer_manager();
        apply(manager.as_ref(), &self.serializer, kind, message, expect_error)
    }
}

impl TransferProcessClient for LocalProviderTransferProcessClient {
    fn start_transfer(
        &self,
        _counter_party_pid: &str,
        message: &JsonObject,
        _callback_address: &str,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        self.deliver(TransferMessage::Start, message, expect_error)
    }

    fn complete_transfer(
        &self,
        _counter_party_pid: &str,
        message: &JsonObject,
        _callback_address: &str,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        self.deliver(TransferMessage::Completion, message, expect_error)
    }

    fn suspend_transfer(
        &self,
        _counter_party_pid: &str,
        message: &JsonObject,
        _callback_address: &str,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        self.deliver(TransferMessage::Suspension, message, expect_error)
    }

    fn terminate_transfer(
        &self,
        _counter_party_pid: &str,
        message: &JsonObject,
        _callback_address: &str,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        self.deliver(TransferMessage::Termination, message, expect_error)
    }

    fn get_transfer_process(
        &self,
        counter_party_pid: &str,
        _callback_address: &str,
    ) -> Result<JsonObject, ClientError> {
        let process = self.connector.provider_transfer_manager().find_by_id(counter_party_pid)?;
        describe(&self.serializer, &process)
    }
}

impl ProviderTransferProcessClient for LocalProviderTransferProcessClient {
    fn transfer_request(
        &self,
        message: &JsonObject,
        counter_party_id: &str,
        expect_error: bool,
    ) -> Result<Option<JsonObject>, ClientError> {
        let manager = self.connector.provider_transfer_manager();
        execute(&self.serializer, "transfer request", message, expect_error, |expanded| {
            let response = manager.handle_transfer_request(expanded, counter_party_id)?;
            Ok(self.serializer.process_json_ld(&response)?)
        })
    }
}

/// Delivers messages to the consumer transfer manager of a local connector.
pub struct LocalConsumerTransferProcessClient {
    /// Connector playing the consumer under test.
    connector: Arc<dyn Connector>,
    /// Serializer validating and expanding messages.
    serializer: Arc<MessageSerializer>,
}

impl LocalConsumerTransferProcessClient {
    /// Creates a client for `connector`.
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>, serializer: Arc<MessageSerializer>) -> Self {
        Self { connector, serializer }
    }

    /// Delivers a message addressed to an existing consumer process.
    fn deliver(
        &self,
        kind: TransferMessage,
        message: &JsonObject,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        let manager = self.connector.consumer_transfer_manager();
        apply(manager.as_ref(), &self.serializer, kind, message, expect_error)
    }
}

impl TransferProcessClient for LocalConsumerTransferProcessClient {
    fn start_transfer(
        &self,
        _counter_party_pid: &str,
        message: &JsonObject,
        _callback_address: &str,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        self.deliver(TransferMessage::Start, message, expect_error)
    }

    fn complete_transfer(
        &self,
        _counter_party_pid: &str,
        message: &JsonObject,
        _callback_address: &str,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        self.deliver(TransferMessage::Completion, message, expect_error)
    }

    fn suspend_transfer(
        &self,
        _counter_party_pid: &str,
        message: &JsonObject,
        _callback_address: &str,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        self.deliver(TransferMessage::Suspension, message, expect_error)
    }

    fn terminate_transfer(
        &self,
        _counter_party_pid: &str,
        message: &JsonObject,
        _callback_address: &str,
        expect_error: bool,
    ) -> Result<(), ClientError> {
        self.deliver(TransferMessage::Termination, message, expect_error)
    }

    fn get_transfer_process(
        &self,
        counter_party_pid: &str,
        _callback_address: &str,
    ) -> Result<JsonObject, ClientError> {
        let process = self.connector.consumer_transfer_manager().find_by_id(counter_party_pid)?;
        describe(&self.serializer, &process)
    }
}

impl ConsumerTransferProcessClient for LocalConsumerTransferProcessClient {
    fn initiate_transfer_request(
        &self,
        agreement_id: &str,
        format: &str,
    ) -> Result<(), ClientError> {
        let manager = self.connector.consumer_transfer_manager();
        let process = manager.create_transfer_process(agreement_id, format, None);
        debug!(consumer_pid = %process.id(), agreement = %agreement_id, "created transfer process");
        Ok(())
    }
}
