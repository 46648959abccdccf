// crates/dsp-tck-system/src/pipeline/provider_transfer.rs
// ============================================================================
// Module: Provider Transfer Process Pipeline
// Description: Drives a connector under test that provides data.
// Purpose: Let the TCK act as consumer while scenarios check provider transfers.
// Dependencies: dsp-tck-api, dsp-tck-core, tracing
// ============================================================================

//! ## Overview
//! The TCK plays the consumer through the transfer manager of a TCK
//! connector. A transfer starts with `send_transfer_request`; later sends
//! move the TCK process first and only when the provider is expected to
//! accept the message.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use dsp_tck_api::ConsumerTransferProcessManager;
use dsp_tck_api::DataAddress;
use dsp_tck_api::TransferError;
use dsp_tck_api::TransferProcess;
use dsp_tck_api::TransferState;
use dsp_tck_api::access::string_id_property;
use dsp_tck_api::constants::DSPACE_PROPERTY_PROVIDER_PID_EXPANDED;
use dsp_tck_api::messages::transfer;
use dsp_tck_core::CallbackEndpoint;
use dsp_tck_core::JsonObject;
use dsp_tck_core::MessageSerializer;
use tracing::debug;

use super::PipelineCore;
use super::PipelineError;
use super::check_state;
use super::correlation_id;
use super::pause;
use crate::client::ProviderTransferProcessClient;

// ============================================================================
// SECTION: Paths
// ============================================================================

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

/// Staged transfer process against a provider under test.
pub struct ProviderTransferProcessPipeline {
    /// Stages and shared services.
    core: PipelineCore<TransferProcess>,
    /// Client calling the provider.
    client: Arc<dyn ProviderTransferProcessClient>,
    /// Consumer transfer manager of the TCK connector.
    manager: Arc<dyn ConsumerTransferProcessManager>,
    /// Participant id of the provider under test.
    provider_id: String,
}

impl ProviderTransferProcessPipeline {
    /// Creates an empty pipeline. `manager` holds the TCK transfer
    /// processes; `provider_id` names the connector under test.
    #[must_use]
    pub fn new(
        client: Arc<dyn ProviderTransferProcessClient>,
        manager: Arc<dyn ConsumerTransferProcessManager>,
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

    /// Creates a TCK transfer process and sends the transfer request.
    #[must_use]
    pub fn send_transfer_request(
        mut self,
        agreement_id: &str,
        format: &str,
        data_address: Option<DataAddress>,
    ) -> Self {
        let client = Arc::clone(&self.client);
        let manager = Arc::clone(&self.manager);
        let slot = self.core.process.clone();
        let address = self.core.endpoint.address().to_string();
        let provider_id = self.provider_id.clone();
        let agreement_id = agreement_id.to_string();
        let format = format.to_string();
        self.core.stage(move || {
            let tracked = manager.create_transfer_process(&agreement_id, &format, data_address);
            slot.set(Arc::clone(&tracked));
            let request = transfer::create_transfer_request(
                tracked.id(),
                tracked.agreement_id(),
                tracked.format(),
                tracked.data_address().as_ref(),
                &address,
            );
            debug!(consumer_pid = %tracked.id(), agreement = %agreement_id, "sending transfer");
            if let Some(response) = client.transfer_request(&request, &provider_id, false)? {
                let provider_pid =
                    string_id_property(DSPACE_PROPERTY_PROVIDER_PID_EXPANDED, &response)?;
                manager.transfer_requested(tracked.id(), &provider_pid)?;
            }
            Ok(())
        });
        self
    }

    /// Sends a start message, resuming a suspended transfer.
    #[must_use]
    pub fn send_started(mut self, expect_error: bool) -> Self {
        let client = Arc::clone(&self.client);
        let manager = Arc::clone(&self.manager);
        let slot = self.core.process.clone();
        self.core.stage(move || {
            pause();
            let tracked = slot.require()?;
            let provider_pid = correlation_id(&tracked)?;
            let message = transfer::create_start_request(&provider_pid, tracked.id(), None);
            if !expect_error {
                manager.started(tracked.id())?;
            }
            client.start_transfer(&provider_pid, &message, "", expect_error)?;
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
            let provider_pid = correlation_id(&tracked)?;
            let message = transfer::create_completion(&provider_pid, tracked.id());
            if !expect_error {
                manager.completed(tracked.id())?;
            }
            client.complete_transfer(&provider_pid, &message, "", expect_error)?;
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
            let provider_pid = correlation_id(&tracked)?;
            let message =
                transfer::create_suspension(&provider_pid, tracked.id(), REASON_CODE, &[]);
            if !expect_error {
                manager.suspended(tracked.id())?;
            }
            client.suspend_transfer(&provider_pid, &message, "", expect_error)?;
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
            let provider_pid = correlation_id(&tracked)?;
            let message =
                transfer::create_termination(&provider_pid, tracked.id(), REASON_CODE, &[]);
            if !expect_error {
                manager.terminated(tracked.id())?;
            }
            client.terminate_transfer(&provider_pid, &message, "", expect_error)?;
            Ok(())
        });
        self
    }

    /// Expects a start message and answers with the result of `action`.
    #[must_use]
    pub fn expect_start_message<F>(mut self, action: F) -> Self
    where
        F: Fn(&JsonObject) -> Result<JsonObject, TransferError> + Send + Sync + 'static,
    {
        self.core.expect_reply(START_PATH, action);
        self
    }

    /// Expects a completion message and answers with the result of `action`.
    #[must_use]
    pub fn expect_completion_message<F>(mut self, action: F) -> Self
    where
        F: Fn(&JsonObject) -> Result<JsonObject, TransferError> + Send + Sync + 'static,
    {
        self.core.expect_reply(COMPLETION_PATH, action);
        self
    }

    /// Expects a suspension message and answers with the result of `action`.
    #[must_use]
    pub fn expect_suspension_message<F>(mut self, action: F) -> Self
    where
        F: Fn(&JsonObject) -> Result<JsonObject, TransferError> + Send + Sync + 'static,
    {
        self.core.expect_reply(SUSPENSION_PATH, action);
        self
    }

    /// Expects a termination message and answers with the result of `action`.
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

    /// Gives the provider time to settle before the next stage.
    #[must_use]
    pub fn then_pause(mut self) -> Self {
        self.core.stage(|| {
            pause();
            Ok(())
        });
        self
    }

    /// Fetches the provider transfer process and checks its state.
    #[must_use]
    pub fn then_verify_provider_state(mut self, state: TransferState) -> Self {
        let client = Arc::clone(&self.client);
        let slot = self.core.process.clone();
        self.core.stage(move || {
            pause();
            let tracked = slot.require()?;
            let provider_pid = correlation_id(&tracked)?;
            let reported = client.get_transfer_process(&provider_pid, "")?;
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
