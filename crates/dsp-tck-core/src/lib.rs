// crates/dsp-tck-core/src/lib.rs
// ============================================================================
// Module: DSP TCK Core Library
// Description: Runtime plumbing shared by every TCK crate.
// Purpose: Provide configuration, callback endpoint, JSON-LD processing, and logging.
// Dependencies: axum, jsonschema, regex, serde_json, tokio, toml, tracing
// ============================================================================

//! ## Overview
//! The core crate carries everything the TCK needs that is not specific to a
//! Dataspace Protocol message: the flat property set that configures a run,
//! the callback endpoint that receives protocol messages from the connector
//! under test, the HTTP server fronting that endpoint, the JSON-LD expander,
//! schema validation, and the launcher contract.
//! Invariants:
//! - Compact messages are validated before they are expanded or written.
//! - Callback handlers are matched by full regex match on a normalised path.
//! - No component panics on malformed network input.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod endpoint;
pub mod jsonld;
pub mod logging;
pub mod message;
pub mod properties;
pub mod server;
pub mod system;
pub mod validation;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use endpoint::CallbackEndpoint;
pub use endpoint::DelegatingHandler;
pub use endpoint::EndpointError;
pub use endpoint::HandlerResponse;
pub use endpoint::ProtocolHandler;
pub use endpoint::RequestHeaders;
pub use jsonld::ContextLoader;
pub use jsonld::JsonLdError;
pub use jsonld::JsonObject;
pub use message::MessageError;
pub use message::MessageSerializer;
pub use properties::PropertyError;
pub use properties::TckProperties;
pub use server::CallbackServer;
pub use server::ServerError;
pub use system::LauncherError;
pub use system::SystemConfiguration;
pub use system::SystemLauncher;
pub use validation::MessageValidator;
pub use validation::SchemaValidator;
pub use validation::ValidationError;
