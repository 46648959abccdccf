// crates/dsp-tck-api/src/transfer.rs
// ============================================================================
// Module: Transfer Process State Machine
// Description: Transfer process states, transitions, and data addresses.
// Purpose: Track one side of a DSP transfer process.
// Dependencies: tracing, crate::state, crate::identifiers
// ============================================================================

//! ## Overview
//! A [`TransferProcess`] records the agreement and format a transfer was
//! requested for, the counter-party correlation id, and the data address the
//! provider announced when starting the transfer.
//! Invariants:
//! - `id` is assigned at build time and never changes.
//! - `REQUESTED` and `STARTED` are only entered once the correlation id is set.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

use tracing::debug;

use crate::identifiers::random_uuid;
use crate::state::ParticipantRole;
use crate::state::ProtocolState;
use crate::state::StateError;
use crate::state::check_transition;

// ============================================================================
// SECTION: States
// ============================================================================

/// Transfer process states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum TransferState {
    /// Created locally.
    #[default]
    Initialized,
    /// Consumer requested the transfer.
    Requested,
    /// Provider started the transfer.
    Started,
    /// Transfer completed.
    Completed,
    /// Transfer suspended by either side.
    Suspended,
    /// Transfer terminated by either side.
    Terminated,
}

impl TransferState {
    /// Every state in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Initialized,
        Self::Requested,
        Self::Started,
        Self::Completed,
        Self::Suspended,
        Self::Terminated,
    ];

    /// Returns the protocol name of the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initialized => "INITIALIZED",
            Self::Requested => "REQUESTED",
            Self::Started => "STARTED",
            Self::Completed => "COMPLETED",
            Self::Suspended => "SUSPENDED",
            Self::Terminated => "TERMINATED",
        }
    }

    /// Parses a protocol state name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.as_str() == name)
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ProtocolState for TransferState {
    fn transitions(self) -> &'static [Self] {
        match self {
            Self::Initialized => &[Self::Requested],
            Self::Requested | Self::Suspended => &[Self::Started, Self::Terminated],
            Self::Started => &[Self::Suspended, Self::Terminated, Self::Completed],
            Self::Completed | Self::Terminated => &[],
        }
    }

    fn requires_correlation_id(self) -> bool {
        matches!(self, Self::Requested | Self::Started)
    }
}

// ============================================================================
// SECTION: Data Address
// ============================================================================

/// Where and how transferred data can be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataAddress {
    /// Endpoint type IRI.
    pub endpoint_type: String,
    /// Endpoint URL.
    pub endpoint: String,
    /// Additional endpoint properties by name.
    pub endpoint_properties: BTreeMap<String, String>,
}

// ============================================================================
// SECTION: Transfer Process
// ============================================================================

/// Mutable transfer data guarded by the state lock.
#[derive(Debug)]
struct TransferData {
    /// Current state.
    state: TransferState,
    /// Counter-party process id.
    correlation_id: Option<String>,
    /// Data address announced on start.
    data_address: Option<DataAddress>,
}

/// One side of a transfer process.
///
/// # Invariants
/// - `role` decides whether `id` is the consumer or provider process id.
#[derive(Debug)]
pub struct TransferProcess {
    /// Local process id.
    id: String,
    /// Side that owns this process.
    role: ParticipantRole,
    /// Agreement the transfer is executed under.
    agreement_id: String,
    /// Requested transfer format.
    format: String,
    /// Counter-party callback address.
    callback_address: Option<String>,
    /// Guarded mutable data.
    data: RwLock<TransferData>,
}

impl TransferProcess {
    /// Starts building a transfer process.
    #[must_use]
    pub fn builder() -> TransferProcessBuilder {
        TransferProcessBuilder::default()
    }

    /// Returns the local process id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the owning side.
    #[must_use]
    pub const fn role(&self) -> ParticipantRole {
        self.role
    }

    /// Returns the agreement id.
    #[must_use]
    pub fn agreement_id(&self) -> &str {
        &self.agreement_id
    }

    /// Returns the transfer format.
    #[must_use]
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Returns the counter-party callback address.
    #[must_use]
    pub fn callback_address(&self) -> Option<&str> {
        self.callback_address.as_deref()
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransferState {
        self.read().state
    }

    /// Returns the counter-party process id once known.
    #[must_use]
    pub fn correlation_id(&self) -> Option<String> {
        self.read().correlation_id.clone()
    }

    /// Sets the counter-party process id.
    pub fn set_correlation_id(&self, correlation_id: &str) {
        self.write().correlation_id = Some(correlation_id.to_string());
    }

    /// Returns the data address once announced.
    #[must_use]
    pub fn data_address(&self) -> Option<DataAddress> {
        self.read().data_address.clone()
    }

    /// Replaces the data address.
    pub fn set_data_address(&self, data_address: Option<DataAddress>) {
        self.write().data_address = data_address;
    }

    /// Returns the consumer process id; empty while unknown.
    #[must_use]
    pub fn consumer_pid(&self) -> String {
        match self.role {
            ParticipantRole::Consumer => self.id.clone(),
            ParticipantRole::Provider => self.correlation_id().unwrap_or_default(),
        }
    }

    /// Returns the provider process id; empty while unknown.
    #[must_use]
    pub fn provider_pid(&self) -> String {
        match self.role {
            ParticipantRole::Provider => self.id.clone(),
            ParticipantRole::Consumer => self.correlation_id().unwrap_or_default(),
        }
    }

    /// Transitions to `state`.
    ///
    /// # Errors
    /// Returns [`StateError`] when the transition is not legal.
    pub fn transition(&self, state: TransferState) -> Result<(), StateError> {
        self.transition_with(state, |_| {})
    }

    /// Transitions to `state`, then runs `work`.
    ///
    /// # Errors
    /// Returns [`StateError`] when the transition is not legal; `work` does
    /// not run in that case.
    pub fn transition_with<F>(&self, state: TransferState, work: F) -> Result<(), StateError>
    where
        F: FnOnce(&Self),
    {
        let mut data = self.write();
        let current = data.state;
        check_transition(current, state, data.correlation_id.is_some())?;
        data.state = state;
        drop(data);
        debug!(transfer = %self.id, from = %current, to = %state, "transfer transition");
        work(self);
        Ok(())
    }

    /// Acquires the data lock for reading.
    fn read(&self) -> RwLockReadGuard<'_, TransferData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquires the data lock for writing.
    fn write(&self) -> RwLockWriteGuard<'_, TransferData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builder for [`TransferProcess`].
#[derive(Debug, Default)]
pub struct TransferProcessBuilder {
    /// Counter-party process id.
    correlation_id: Option<String>,
    /// Agreement id.
    agreement_id: String,
    /// Transfer format.
    format: String,
    /// Counter-party callback address.
    callback_address: Option<String>,
    /// Initial data address.
    data_address: Option<DataAddress>,
    /// Initial state.
    state: TransferState,
    /// Owning side.
    role: ParticipantRole,
}

impl TransferProcessBuilder {
    /// Sets the counter-party process id.
    #[must_use]
    pub fn correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Sets the agreement id.
    #[must_use]
    pub fn agreement_id(mut self, agreement_id: impl Into<String>) -> Self {
        self.agreement_id = agreement_id.into();
        self
    }

    /// Sets the transfer format.
    #[must_use]
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Sets the counter-party callback address.
    #[must_use]
    pub fn callback_address(mut self, callback_address: impl Into<String>) -> Self {
        self.callback_address = Some(callback_address.into());
        self
    }

    /// Sets the initial data address.
    #[must_use]
    pub fn data_address(mut self, data_address: DataAddress) -> Self {
        self.data_address = Some(data_address);
        self
    }

    /// Sets the initial state.
    #[must_use]
    pub const fn state(mut self, state: TransferState) -> Self {
        self.state = state;
        self
    }

    /// Sets the owning side.
    #[must_use]
    pub const fn role(mut self, role: ParticipantRole) -> Self {
        self.role = role;
        self
    }

    /// Builds the process with a fresh process id.
    #[must_use]
    pub fn build(self) -> TransferProcess {
        TransferProcess {
            id: random_uuid(),
            role: self.role,
            agreement_id: self.agreement_id,
            format: self.format,
            callback_address: self
                .callback_address
                .map(|address| address.trim_end_matches('/').to_string()),
            data: RwLock::new(TransferData {
                state: self.state,
                correlation_id: self.correlation_id,
                data_address: self.data_address,
            }),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
