// crates/dsp-tck-system/src/lib.rs
// ============================================================================
// Module: DSP TCK System Library
// Description: Services that drive a connector under test.
// Purpose: Provide the TCK connector, clients, mocks, pipelines, and launcher.
// Dependencies: dsp-tck-api, dsp-tck-core, reqwest, serde_json, thiserror, tracing, url
// ============================================================================

//! ## Overview
//! The system crate turns the protocol model of `dsp-tck-api` into running
//! services: an in-process [`connector::TckConnector`], clients calling a
//! connector under test, mocks scripting a local connector under test,
//! pipelines describing negotiation exchanges, and the
//! [`launcher::DspSystemLauncher`] tying them together per scenario scope.
//! Invariants:
//! - The TCK side of every exchange is tracked by a [`connector::TckConnector`].
//! - Remote and local connectors under test are driven through the same client traits.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod client;
pub mod connector;
pub mod launcher;
pub mod mock;
pub mod pipeline;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use client::ClientError;
pub use connector::TckConnector;
pub use launcher::DspSystemConfig;
pub use launcher::DspSystemLauncher;
pub use pipeline::ConsumerNegotiationPipeline;
pub use pipeline::ConsumerTransferProcessPipeline;
pub use pipeline::PipelineError;
pub use pipeline::ProviderNegotiationPipeline;
pub use pipeline::ProviderTransferProcessPipeline;
