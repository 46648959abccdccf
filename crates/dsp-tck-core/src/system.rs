// crates/dsp-tck-core/src/system.rs
// ============================================================================
// Module: System Launcher Contract
// Description: Interface between the TCK runtime and a system under test.
// Purpose: Start, expose, and stop the services a scenario runs against.
// Dependencies: thiserror, crate::endpoint, crate::message, crate::properties
// ============================================================================

//! ## Overview
//! A [`SystemLauncher`] prepares the services that verification scenarios
//! need: connectors, clients, mocks, and pipelines. The runtime starts a
//! launcher with a [`SystemConfiguration`] and hands it to every scenario,
//! which resolves the concrete launcher type through [`SystemLauncher::as_any`].
//! Invariants:
//! - `start` is called exactly once before any scenario runs.
//! - `close` is called once after the last scenario.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::sync::Arc;

use thiserror::Error;

use crate::endpoint::CallbackEndpoint;
use crate::message::MessageSerializer;
use crate::properties::PropertyError;
use crate::properties::TckProperties;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Services and settings handed to a launcher at start.
#[derive(Clone)]
pub struct SystemConfiguration {
    /// Effective run properties.
    pub properties: TckProperties,
    /// Callback endpoint the connector under test calls.
    pub endpoint: Arc<CallbackEndpoint>,
    /// Shared message serializer.
    pub serializer: Arc<MessageSerializer>,
}

// ============================================================================
// SECTION: Launcher
// ============================================================================

/// Launcher errors.
#[derive(Debug, Error)]
pub enum LauncherError {
    /// Launcher configuration is invalid or incomplete.
    #[error(transparent)]
    Config(#[from] PropertyError),
    /// A service could not be created.
    #[error("{0}")]
    Service(String),
}

/// Starts and exposes the system a scenario verifies.
pub trait SystemLauncher: Send {
    /// Starts the launcher.
    ///
    /// # Errors
    /// Returns [`LauncherError`] when configuration is invalid.
    fn start(&mut self, configuration: &SystemConfiguration) -> Result<(), LauncherError>;

    /// Releases launcher resources.
    fn close(&mut self) {}

    /// Returns the launcher for downcasting to its concrete type.
    fn as_any(&self) -> &dyn Any;
}
