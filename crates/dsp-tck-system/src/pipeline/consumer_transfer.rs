// crates/dsp-tck-system/src/pipeline/consumer_transfer.rs
// ============================================================================
// Module: Consumer Transfer Process Pipeline
// Description: Drives a connector under test that consumes data.
// Purpose: Let the TCK act as provider while scenarios check consumer transfers.
// Dependencies: dsp-tck-api, dsp-tck-core, tracing
// ============================================================================

//! ## Overview
//! The TCK plays the provider through the transfer manager of a TCK
//! connector. The consumer under test sends the transfer request, so the
//! pipeline learns the TCK process from the first request the provider
//! manager records after `initiate_transfer_request`.
//! Invariants:
//! - `then_verify_consumer_state` polls until the consumer reports the
//!   state or the wait runs out.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::Weak;
use std::time::Duration;

use dsp_tck_api::ListenerId;
use dsp_tck_api::ProviderTransferProcessManager;
use dsp_tck_api::TransferError;
use dsp_tck_api::TransferProcess;
use dsp_tck_api::TransferProcessListener;
use dsp_tck_api::TransferState;
use dsp_tck_api::access::string_id_property;
use dsp_tck_api::constants::DSPACE_NAMESPACE;
use dsp_tck_api::constants::DSPACE_PROPERTY_STATE_EXPANDED;
use dsp_tck_api::messages::transfer;
use dsp_tck_core::CallbackEndpoint;
use dsp_tck_core::JsonObject;
use dsp_tck_core::MessageSerializer;
use tracing::debug;

use super::PipelineCore;
use super::PipelineError;
use super::ProcessSlot;
use super::correlation_id;
use super::pause;
use crate::client::ConsumerTransferProcessClient;

// ============================================================================
// SECTION: Paths
// ============================================================================

/// Callback path of transfer requests.
const REQUEST_PATH: &str = "/transfers/request";
/// Callback path of start messages.
const START_PATH: &str = "/transfers/[^/]+/start";
/// Callback path of completion messages.
const COMPLETION_PATH: &str = "/transfers/[^/]+/completion";
/// Callback path of suspension messages.
const SUSPENSION_PATH: &str = "/transfers/[^/]+/suspension";
/// Callback path of termination messages.
const TERMINATION_PATH: &str = "/transfers/[^/]+/termination";

/// Code sent with suspensions and terminations.
const REASON_CODE: &str = "1";

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Staged transfer process against a consumer under test.
pub struct ConsumerTransferProcessPipeline {
    /// Stages and shared services.
    core: PipelineCore<TransferProcess>,
    /// Client calling the consumer.
    client: Arc<dyn ConsumerTransferProcessClient>,
    /// Provider transfer manager of the TCK connector.
    manager: Arc<dyn ProviderTransferProcessManager>,
    /// Participant id of the consumer under test.
    consumer_id: String,
}

impl ConsumerTransferProcessPipeline {
    /// Creates an empty pipeline. `manager` holds the TCK transfer
    /// processes; `consumer_id` names the connector under test.
    #[must_use]
    pub fn new(
        client: Arc<dyn ConsumerTransferProcessClient>,
        manager: Arc<dyn ProviderTransferProcessManager>,
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

    /// Asks the consumer to request a transfer and tracks the first process
    /// the TCK provider records.
    #[must_use]
    pub fn initiate_transfer_request(mut self, agreement_id: &str, format: &str) -> Self {
        let client = Arc::clone(&self.client);
        let manager = Arc::clone(&self.manager);
        let slot = self.core.process.clone();
        let agreement_id = agreement_id.to_string();
        let format = format.to_string();
        self.core.stage(move || {
            let registration = Arc::new(OnceLock::new());
            let listener = FirstRequestedListener {
                slot,
                manager: Arc::downgrade(&manager),
                registration: Arc::clone(&registration),
            };
            let id = manager.register_listener(Arc::new(listener));
            if registration.set(id).is_err() {
                debug!("transfer listener registered twice");
            }
            debug!(agreement = %agreement_id, format = %format, "initiating consumer transfer");
            client.initiate_transfer_request(&agreement_id, &format)?;
            Ok(())
        });
        self
    }

    /// Sends a start message carrying `data_address`.
    #[must_use]
    pub fn send_started(mut self, data_address: Option<JsonObject>, expect_error: bool) -> Self {
        let client = Arc::clone(&self.client);
        let manager = Arc::clone(&self.manager);
        let slot = self.core.process.clone();
        self.core.stage(move || {
            pause();
            let tracked = slot.require()?;
            let consumer_pid = correlation_id(&tracked)?;
            let message = transfer::create_start_request(tracked.id(), &consumer_pid, data_address);
            if !expect_error {
                manager.started(tracked.id())?;
            }
            client.start_transfer(&consumer_pid, &message, callback(&tracked), expect_error)?;
            Ok(())
        });
        self
    }

    /// Sends a completion message.
    #[must_use]
    pub fn send_completion(mut self, expect_error: bool) -> Self {
        let client = Arc::clone(&self.client);
        let manager = Arc::clone(&self.manager);
        let slot = self.core.process.clone();
        self.core.stage(move || {
            pause();
            let tracked = slot.require()?;
            let consumer_pid = correlation_id(&tracked)?;
            let message = transfer::create_completion(tracked.id(), &consumer_pid);
            if !expect_error {
                manager.completed(tracked.id())?;
            }
            client.complete_transfer(&consumer_pid, &message, callback(&tracked), expect_error)?;
            Ok(())
        });
        self
    }

    /// Sends a suspension message.
    #[must_use]
    pub fn send_suspension(mut self, expect_error: bool) -> Self {
        let client = Arc::clone(&self.client);
        let manager = Arc::clone(&self.manager);
        let slot = self.core.process.clone();
        self.core.stage(move || {
            pause();
            let tracked = slot.require()?;
            let consumer_pid = correlation_id(&tracked)?;
            let message =
                transfer::create_suspension(tracked.id(), &consumer_pid, REASON_CODE, &[]);
            if !expect_error {
                manager.suspended(tracked.id())?;
            }
            client.suspend_transfer(&consumer_pid, &message, callback(&tracked), expect_error)?;
            Ok(())
        });
        self
    }

    /// Sends a termination message.
    #[must_use]
    pub fn send_termination(mut self, expect_error: bool) -> Self {
        let client = Arc::clone(&self.client);
        let manager = Arc::clone(&self.manager);
        let slot = self.core.process.clone();
        self.core.stage(move || {
            pause();
            let tracked = slot.require()?;
            let consumer_pid = correlation_id(&tracked)?;
            let message =
                transfer::create_termination(tracked.id(), &consumer_pid, REASON_CODE, &[]);
            if !expect_error {
                manager.terminated(tracked.id())?;
            }
            client.terminate_transfer(&consumer_pid, &message, callback(&tracked), expect_error)?;
            Ok(())
        });
        self
    }

    /// Expects the transfer request. `action` receives the message and the
    /// consumer participant id and returns the response body.
    #[must_use]
    pub fn expect_transfer_request<F>(mut self, action: F) -> Self
    where
        F: Fn(&JsonObject, &str) -> Result<JsonObject, TransferError> + Send + Sync + 'static,
    {
        let consumer_id = self.consumer_id.clone();
        self.core.expect_reply(REQUEST_PATH, move |message| action(message, &consumer_id));
        self
    }

    /// Expects a start message from the consumer.
    #[must_use]
    pub fn expect_start_message<F>(mut self, action: F) -> Self
    where
        F: Fn(&JsonObject) -> Result<JsonObject, TransferError> + Send + Sync + 'static,
    {
        self.core.expect_reply(START_PATH, action);
        self
    }

    /// Expects a completion message from the consumer.
    #[must_use]
    pub fn expect_completion_message<F>(mut self, action: F) -> Self
    where
        F: Fn(&JsonObject) -> Result<JsonObject, TransferError> + Send + Sync + 'static,
    {
        self.core.expect_reply(COMPLETION_PATH, action);
        self
    }

    /// Expects a suspension message from the consumer.
    #[must_use]
    pub fn expect_suspension_message<F>(mut self, action: F) -> Self
    where
        F: Fn(&JsonObject) -> Result<JsonObject, TransferError> + Send + Sync + 'static,
    {
        self.core.expect_reply(SUSPENSION_PATH, action);
        self
    }

    /// Expects a termination message from the consumer.
    #[must_use]
    pub fn expect_termination_message<F>(mut self, action: F) -> Self
    where
        F: Fn(&JsonObject) -> Result<JsonObject, TransferError> + Send + Sync + 'static,
    {
        self.core.expect_reply(TERMINATION_PATH, action);
        self
    }

    /// Waits for the last expected message, then for `state`.
    #[must_use]
    pub fn then_wait_for_state(mut self, state: TransferState) -> Self {
        self.core.then_wait_for_state(state);
        self
    }

    /// Polls the consumer transfer process until it reports `state`.
    #[must_use]
    pub fn then_verify_consumer_state(mut self, state: TransferState) -> Self {
        let client = Arc::clone(&self.client);
        let slot = self.core.process.clone();
        let expected = format!("{DSPACE_NAMESPACE}{state}");
        let description = format!("consumer transfer process state to be {state}");
        self.core.then_wait_until(description, move || {
            let tracked = slot.require()?;
            let consumer_pid = correlation_id(&tracked)?;
            let reported = client.get_transfer_process(&consumer_pid, callback(&tracked))?;
            let actual = string_id_property(DSPACE_PROPERTY_STATE_EXPANDED, &reported)?;
            Ok(actual == expected)
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

/// Returns the consumer callback address recorded on `process`.
fn callback(process: &TransferProcess) -> &str {
    process.callback_address().unwrap_or_default()
}

// ============================================================================
// SECTION: Request Listener
// ============================================================================

/// Records the first requested transfer process, then removes itself.
struct FirstRequestedListener {
    /// Slot of the pipeline.
    slot: ProcessSlot<TransferProcess>,
    /// Manager the listener is registered with.
    manager: Weak<dyn ProviderTransferProcessManager>,
    /// Registration id, set right after registering.
    registration: Arc<OnceLock<ListenerId>>,
}

impl TransferProcessListener for FirstRequestedListener {
    fn requested(&self, process: &Arc<TransferProcess>) {
        if self.slot.fill(process) {
            debug!(provider_pid = %process.id(), "tracking requested transfer process");
        }
        if let (Some(manager), Some(id)) = (self.manager.upgrade(), self.registration.get()) {
            manager.deregister_listener(*id);
        }
    }
}
