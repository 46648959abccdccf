// crates/dsp-tck-system/src/connector/transfer.rs
// ============================================================================
// Module: TCK Transfer Process Manager
// Description: Transfer process manager for either side of a transfer.
// Purpose: Apply transfer messages to local processes and notify listeners.
// Dependencies: dsp-tck-api, dsp-tck-core, serde_json, tracing
// ============================================================================

//! ## Overview
//! One manager type serves both roles: the role decides which process id in
//! an incoming message names the local process. Provider managers accept
//! transfer requests; consumer managers create processes and record the
//! provider's process id once the request is acknowledged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use dsp_tck_api::ConsumerTransferProcessManager;
use dsp_tck_api::DataAddress;
use dsp_tck_api::ListenerId;
use dsp_tck_api::ParticipantRole;
use dsp_tck_api::ProviderTransferProcessManager;
use dsp_tck_api::TransferError;
use dsp_tck_api::TransferProcess;
use dsp_tck_api::TransferProcessListener;
use dsp_tck_api::TransferProcessManager;
use dsp_tck_api::TransferState;
use dsp_tck_api::access::AccessError;
use dsp_tck_api::access::map_property;
use dsp_tck_api::access::string_id_property;
use dsp_tck_api::access::string_property;
use dsp_tck_api::connector::DataAddressPredicate;
use dsp_tck_api::constants::DSPACE_NAMESPACE;
use dsp_tck_api::constants::DSPACE_PROPERTY_AGREEMENT_ID_EXPANDED;
use dsp_tck_api::constants::DSPACE_PROPERTY_CALLBACK_ADDRESS_EXPANDED;
use dsp_tck_api::constants::DSPACE_PROPERTY_CONSUMER_PID_EXPANDED;
use dsp_tck_api::constants::DSPACE_PROPERTY_DATA_ADDRESS_EXPANDED;
use dsp_tck_api::constants::DSPACE_PROPERTY_ENDPOINT_EXPANDED;
use dsp_tck_api::constants::DSPACE_PROPERTY_ENDPOINT_PROPERTIES_EXPANDED;
use dsp_tck_api::constants::DSPACE_PROPERTY_ENDPOINT_PROPERTY_NAME_EXPANDED;
use dsp_tck_api::constants::DSPACE_PROPERTY_ENDPOINT_PROPERTY_VALUE_EXPANDED;
use dsp_tck_api::constants::DSPACE_PROPERTY_ENDPOINT_TYPE_EXPANDED;
use dsp_tck_api::constants::DSPACE_PROPERTY_FORMAT_EXPANDED;
use dsp_tck_api::constants::DSPACE_PROPERTY_PROVIDER_PID_EXPANDED;
use dsp_tck_api::messages::transfer::create_transfer_response;
use dsp_tck_core::JsonObject;
use serde_json::Value;
use tracing::debug;

use super::ListenerRegistry;

// ============================================================================
// SECTION: Manager
// ============================================================================

/// Transfer processes of one side of the protocol.
///
/// # Invariants
/// - Processes are keyed by local process id and never removed.
pub struct TckTransferProcessManager {
    /// Side this manager plays.
    role: ParticipantRole,
    /// Processes keyed by local process id.
    processes: RwLock<BTreeMap<String, Arc<TransferProcess>>>,
    /// Registered listeners.
    listeners: ListenerRegistry<dyn TransferProcessListener>,
}

impl TckTransferProcessManager {
    /// Creates an empty manager for `role`.
    #[must_use]
    pub const fn new(role: ParticipantRole) -> Self {
        Self { role, processes: RwLock::new(BTreeMap::new()), listeners: ListenerRegistry::new() }
    }

    /// Adds a process.
    fn insert(&self, process: &Arc<TransferProcess>) {
        self.processes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(process.id().to_string(), Arc::clone(process));
    }

    /// Reads the local process id from an expanded message.
    fn local_id(&self, message: &JsonObject) -> Result<String, AccessError> {
        match self.role {
            ParticipantRole::Provider => {
                string_id_property(DSPACE_PROPERTY_PROVIDER_PID_EXPANDED, message)
            }
            ParticipantRole::Consumer => {
                string_id_property(DSPACE_PROPERTY_CONSUMER_PID_EXPANDED, message)
            }
        }
    }

    /// Transitions a process, then notifies listeners through `notify`.
    fn transition(
        &self,
        id: &str,
        state: TransferState,
        notify: impl Fn(&dyn TransferProcessListener, &Arc<TransferProcess>),
    ) -> Result<Arc<TransferProcess>, TransferError> {
        let process = self.find_by_id(id)?;
        process.transition(state)?;
        self.listeners.notify(|listener| notify(listener, &process));
        Ok(process)
    }

    /// Applies a message that moves the local process to `state`.
    fn handle_message(
        &self,
        message: &JsonObject,
        state: TransferState,
        notify: impl Fn(&dyn TransferProcessListener, &Arc<TransferProcess>),
    ) -> Result<JsonObject, TransferError> {
        let id = self.local_id(message)?;
        debug!(transfer = %id, state = %state, "received transfer message");
        let process = self.transition(&id, state, notify)?;
        Ok(response(&process))
    }
}

/// Builds the compact `TransferProcess` response for a process.
fn response(process: &TransferProcess) -> JsonObject {
    create_transfer_response(
        &process.provider_pid(),
        &process.consumer_pid(),
        process.state().as_str(),
    )
}

/// Parses an expanded data address.
fn to_data_address(address: &JsonObject) -> Result<DataAddress, AccessError> {
    let endpoint_type = string_id_property(DSPACE_PROPERTY_ENDPOINT_TYPE_EXPANDED, address)?;
    let endpoint = string_property(DSPACE_PROPERTY_ENDPOINT_EXPANDED, address)?;
    let mut endpoint_properties = BTreeMap::new();
    if let Some(Value::Array(properties)) =
        address.get(DSPACE_PROPERTY_ENDPOINT_PROPERTIES_EXPANDED)
    {
        for property in properties.iter().filter_map(Value::as_object) {
            let name = string_property(DSPACE_PROPERTY_ENDPOINT_PROPERTY_NAME_EXPANDED, property)?;
            let value =
                string_property(DSPACE_PROPERTY_ENDPOINT_PROPERTY_VALUE_EXPANDED, property)?;
            endpoint_properties.insert(name, value);
        }
    }
    Ok(DataAddress { endpoint_type, endpoint, endpoint_properties })
}

impl TransferProcessManager for TckTransferProcessManager {
    fn find_by_id(&self, id: &str) -> Result<Arc<TransferProcess>, TransferError> {
        self.processes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| TransferError::NotFound(id.to_string()))
    }

    fn find_by_correlation_id(&self, id: &str) -> Option<Arc<TransferProcess>> {
        self.processes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|process| process.correlation_id().as_deref() == Some(id))
            .cloned()
    }

    fn register_listener(&self, listener: Arc<dyn TransferProcessListener>) -> ListenerId {
        self.listeners.register(listener)
    }

    fn deregister_listener(&self, id: ListenerId) {
        self.listeners.deregister(id);
    }

    fn started(&self, id: &str) -> Result<(), TransferError> {
        self.transition(id, TransferState::Started, |listener, process| listener.started(process))
            .map(|_| ())
    }

    fn completed(&self, id: &str) -> Result<(), TransferError> {
        self.transition(id, TransferState::Completed, |listener, process| {
            listener.completed(process);
        })
            .map(|_| ())
    }

    fn suspended(&self, id: &str) -> Result<(), TransferError> {
        self.transition(id, TransferState::Suspended, |listener, process| {
            listener.suspended(process);
        })
            .map(|_| ())
    }

    fn terminated(&self, id: &str) -> Result<(), TransferError> {
        self.transition(id, TransferState::Terminated, |listener, process| {
            listener.terminated(process);
        })
            .map(|_| ())
    }

    fn handle_start(
        &self,
        message: &JsonObject,
        predicate: DataAddressPredicate<'_>,
    ) -> Result<JsonObject, TransferError> {
        let id = self.local_id(message)?;
        debug!(transfer = %id, "received start message");
        let data_address = map_property(DSPACE_PROPERTY_DATA_ADDRESS_EXPANDED, message, true)?
            .map(to_data_address)
            .transpose()?;
        if !predicate(data_address.as_ref()) {
            debug!(transfer = %id, "data address predicate failed");
            return Err(TransferError::DataAddressRejected);
        }
        let process = self.find_by_id(&id)?;
        process.transition_with(TransferState::Started, |process| {
            process.set_data_address(data_address);
        })?;
        self.listeners.notify(|listener| listener.started(&process));
        Ok(response(&process))
    }

    fn handle_completion(&self, message: &JsonObject) -> Result<JsonObject, TransferError> {
        self.handle_message(message, TransferState::Completed, |listener, process| {
            listener.completed(process);
        })
    }

    fn handle_suspension(&self, message: &JsonObject) -> Result<JsonObject, TransferError> {
        self.handle_message(message, TransferState::Suspended, |listener, process| {
            listener.suspended(process);
        })
    }

    fn handle_termination(&self, message: &JsonObject) -> Result<JsonObject, TransferError> {
        self.handle_message(message, TransferState::Terminated, |listener, process| {
            listener.terminated(process);
        })
    }
}

impl ProviderTransferProcessManager for TckTransferProcessManager {
    fn handle_transfer_request(
        &self,
        message: &JsonObject,
        counter_party_id: &str,
    ) -> Result<JsonObject, TransferError> {
        let consumer_pid = string_id_property(DSPACE_PROPERTY_CONSUMER_PID_EXPANDED, message)?;
        debug!(
            consumer_pid = %consumer_pid,
            counter_party = %counter_party_id,
            "received transfer request"
        );
        if let Some(existing) = self.find_by_correlation_id(&consumer_pid) {
            return Ok(response(&existing));
        }
        let callback_address = string_property(DSPACE_PROPERTY_CALLBACK_ADDRESS_EXPANDED, message)?;
        let mut builder = TransferProcess::builder()
            .role(ParticipantRole::Provider)
            .state(TransferState::Requested)
            .correlation_id(consumer_pid)
            .callback_address(callback_address);
        if let Ok(agreement_id) =
            string_id_property(DSPACE_PROPERTY_AGREEMENT_ID_EXPANDED, message)
        {
            builder = builder.agreement_id(agreement_id);
        }
        if let Ok(format) = string_id_property(DSPACE_PROPERTY_FORMAT_EXPANDED, message) {
            let format = format
                .strip_prefix(DSPACE_NAMESPACE)
                .map_or(format.clone(), ToString::to_string);
            builder = builder.format(format);
        }
        let process = Arc::new(builder.build());
        self.insert(&process);
        self.listeners.notify(|listener| listener.requested(&process));
        Ok(response(&process))
    }
}

impl ConsumerTransferProcessManager for TckTransferProcessManager {
    fn create_transfer_process(
        &self,
        agreement_id: &str,
        format: &str,
        data_address: Option<DataAddress>,
    ) -> Arc<TransferProcess> {
        let mut builder = TransferProcess::builder()
            .role(ParticipantRole::Consumer)
            .agreement_id(agreement_id)
            .format(format);
        if let Some(data_address) = data_address {
            builder = builder.data_address(data_address);
        }
        let process = Arc::new(builder.build());
        self.insert(&process);
        self.listeners.notify(|listener| listener.transfer_initialized(&process));
        process
    }

    fn transfer_requested(
        &self,
        consumer_pid: &str,
        provider_pid: &str,
    ) -> Result<(), TransferError> {
        let process = self.find_by_id(consumer_pid)?;
        process.set_correlation_id(provider_pid);
        process.transition(TransferState::Requested)?;
        self.listeners.notify(|listener| listener.requested(&process));
        Ok(())
    }
}
