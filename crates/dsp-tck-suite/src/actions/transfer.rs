// crates/dsp-tck-suite/src/actions/transfer.rs
// ============================================================================
// Module: Transfer Process Actions
// Description: Messages a local transfer participant under test sends back.
// Purpose: Post transfer requests, starts, suspensions, completions and terminations.
// Dependencies: dsp-tck-api, dsp-tck-core, dsp-tck-system, tracing
// ============================================================================

//! ## Overview
//! Provider actions receive the provider process of the local connector and
//! post to `<callback>/transfers/<consumerPid>/...`. Consumer actions
//! receive the TCK callback address and the consumer process; the transfer
//! request learns the provider process id from the reply, and later
//! messages go to `<address>/transfers/<providerPid>/...`.
//! Invariants:
//! - `sequence` pauses between steps and stops at the first failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::thread;

use dsp_tck_api::TransferProcess;
use dsp_tck_api::TransferState;
use dsp_tck_api::access::string_id_property;
use dsp_tck_api::constants::DSPACE_PROPERTY_PROVIDER_PID_EXPANDED;
use dsp_tck_api::messages::transfer;
use dsp_tck_api::mock::ActionError;
use dsp_tck_api::mock::ConsumerTransferAction;
use dsp_tck_api::mock::ProviderTransferAction;
use dsp_tck_core::JsonObject;
use dsp_tck_core::MessageSerializer;
use dsp_tck_system::ClientError;
use dsp_tck_system::client::HttpExecutor;
use dsp_tck_system::pipeline::PAUSE;
use tracing::debug;

use super::post;

// ============================================================================
// SECTION: Messages
// ============================================================================

/// Reason code sent with suspensions and terminations.
const REASON_CODE: &str = "1";

/// Transfer messages a participant sends once the transfer exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
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
    /// Path segment the message is posted to.
    const fn path(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Completion => "completion",
            Self::Suspension => "suspension",
            Self::Termination => "termination",
        }
    }

    /// State the sender moves to.
    const fn state(self) -> TransferState {
        match self {
            Self::Start => TransferState::Started,
            Self::Completion => TransferState::Completed,
            Self::Suspension => TransferState::Suspended,
            Self::Termination => TransferState::Terminated,
        }
    }

    /// Builds the message for `process`.
    fn build(self, process: &TransferProcess) -> JsonObject {
        let provider_pid = process.provider_pid();
        let consumer_pid = process.consumer_pid();
        match self {
            Self::Start => transfer::create_start_request(&provider_pid, &consumer_pid, None),
            Self::Completion => transfer::create_completion(&provider_pid, &consumer_pid),
            Self::Suspension => {
                transfer::create_suspension(&provider_pid, &consumer_pid, REASON_CODE, &[])
            }
            Self::Termination => {
                transfer::create_termination(&provider_pid, &consumer_pid, REASON_CODE, &[])
            }
        }
    }
}

/// Moves `process` to the state `kind` announces and posts the message to
/// `<base>/transfers/<counter-party pid>/<kind>`.
fn send(
    http: &HttpExecutor,
    base: &str,
    kind: TransferMessage,
    process: &TransferProcess,
) -> Result<(), ActionError> {
    let counter_party_pid = process
        .correlation_id()
        .ok_or_else(|| format!("transfer process {} has no correlation id", process.id()))?;
    let message = kind.build(process);
    process.transition(kind.state())?;
    let base = base.trim_end_matches('/');
    let url = format!("{base}/transfers/{counter_party_pid}/{}", kind.path());
    post(http, &url, kind.path(), process.id(), &message).map(|_| ())
}

// ============================================================================
// SECTION: Provider Actions
// ============================================================================

/// Factory of provider transfer mock actions.
#[derive(Clone)]
pub struct ProviderTransferActions {
    /// Executor posting to the TCK endpoint.
    http: HttpExecutor,
}

impl ProviderTransferActions {
    /// Creates the factory.
    ///
    /// # Errors
    /// Returns [`ClientError`] when the HTTP client cannot be built.
    pub fn new(serializer: Arc<MessageSerializer>) -> Result<Self, ClientError> {
        Ok(Self { http: HttpExecutor::new(serializer, None)? })
    }

    /// Starts the transfer.
    #[must_use]
    pub fn post_start(&self) -> ProviderTransferAction {
        self.action(TransferMessage::Start)
    }

    /// Completes the transfer.
    #[must_use]
    pub fn post_complete(&self) -> ProviderTransferAction {
        self.action(TransferMessage::Completion)
    }

    /// Suspends the transfer.
    #[must_use]
    pub fn post_suspend(&self) -> ProviderTransferAction {
        self.action(TransferMessage::Suspension)
    }

    /// Terminates the transfer.
    #[must_use]
    pub fn post_terminate(&self) -> ProviderTransferAction {
        self.action(TransferMessage::Termination)
    }

    /// Runs `steps` in order with a pause between them.
    #[must_use]
    pub fn sequence(steps: Vec<ProviderTransferAction>) -> ProviderTransferAction {
        Box::new(move |process| {
            for (index, step) in steps.into_iter().enumerate() {
                if index > 0 {
                    thread::sleep(PAUSE);
                }
                step(process)?;
            }
            Ok(())
        })
    }

    /// Sends `kind` to the consumer callback recorded on the process. The
    /// action waits first so the TCK consumer records the provider pid.
    fn action(&self, kind: TransferMessage) -> ProviderTransferAction {
        let http = self.http.clone();
        Box::new(move |process| {
            thread::sleep(PAUSE);
            let callback = process.callback_address().ok_or_else(|| {
                format!("transfer process {} has no callback address", process.id())
            })?;
            send(&http, callback, kind, process)
        })
    }
}

// ============================================================================
// SECTION: Consumer Actions
// ============================================================================

/// Factory of consumer transfer mock actions.
#[derive(Clone)]
pub struct ConsumerTransferActions {
    /// Executor posting to the TCK endpoint.
    http: HttpExecutor,
}

impl ConsumerTransferActions {
    /// Creates the factory.
    ///
    /// # Errors
    /// Returns [`ClientError`] when the HTTP client cannot be built.
    pub fn new(serializer: Arc<MessageSerializer>) -> Result<Self, ClientError> {
        Ok(Self { http: HttpExecutor::new(serializer, None)? })
    }

    /// Sends the transfer request, then records the provider process id and
    /// moves to `REQUESTED`.
    #[must_use]
    pub fn post_transfer_request(&self) -> ConsumerTransferAction {
        let http = self.http.clone();
        Box::new(move |address, process| {
            let base = address.trim_end_matches('/');
            let data_address = process.data_address();
            let message = transfer::create_transfer_request(
                process.id(),
                process.agreement_id(),
                process.format(),
                data_address.as_ref(),
                base,
            );
            let url = format!("{base}/transfers/request");
            let reply = post(&http, &url, "transfer request", process.id(), &message)?;
            let response = http.serializer().process_json_ld_bytes(&reply.body)?;
            let provider_pid =
                string_id_property(DSPACE_PROPERTY_PROVIDER_PID_EXPANDED, &response)?;
            debug!(
                consumer_pid = %process.id(),
                provider_pid = %provider_pid,
                "transfer requested"
            );
            process.set_correlation_id(&provider_pid);
            process.transition(TransferState::Requested)?;
            Ok(())
        })
    }

    /// Starts a suspended transfer.
    #[must_use]
    pub fn post_start(&self) -> ConsumerTransferAction {
        self.action(TransferMessage::Start)
    }

    /// Completes the transfer.
    #[must_use]
    pub fn post_complete(&self) -> ConsumerTransferAction {
        self.action(TransferMessage::Completion)
    }

    /// Suspends the transfer.
    #[must_use]
    pub fn post_suspend(&self) -> ConsumerTransferAction {
        self.action(TransferMessage::Suspension)
    }

    /// Terminates the transfer.
    #[must_use]
    pub fn post_terminate(&self) -> ConsumerTransferAction {
        self.action(TransferMessage::Termination)
    }

    /// Runs `steps` in order with a pause between them.
    #[must_use]
    pub fn sequence(steps: Vec<ConsumerTransferAction>) -> ConsumerTransferAction {
        Box::new(move |address, process| {
            for (index, step) in steps.into_iter().enumerate() {
                if index > 0 {
                    thread::sleep(PAUSE);
                }
                step(address, process)?;
            }
            Ok(())
        })
    }

    /// Sends `kind` to the TCK provider at `address`.
    fn action(&self, kind: TransferMessage) -> ConsumerTransferAction {
        let http = self.http.clone();
        Box::new(move |address, process| send(&http, address, kind, process))
    }
}
