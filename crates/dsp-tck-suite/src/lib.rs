// crates/dsp-tck-suite/src/lib.rs
// ============================================================================
// Module: DSP TCK Suite Library
// Description: Verification scenarios and the runtime executing them.
// Purpose: Provide the CN, CN_C, TP, TP_C, CAT and MET scenario groups and TckRuntime.
// Dependencies: dsp-tck-api, dsp-tck-core, dsp-tck-system, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! Scenarios are plain functions grouped into [`scenario::ScenarioGroup`]s.
//! [`runtime::TckRuntime`] starts the shared services, resolves the system
//! launcher and runs the selected scenarios, reporting through
//! [`runtime::ExecutionListener`]s.
//! Invariants:
//! - Every scenario runs in its own launcher scope, named by its id.
//! - Group setup registers message validators before the first scenario runs.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod actions;
pub mod catalog;
pub mod metadata;
pub mod negotiation;
pub mod runtime;
pub mod scenario;
pub mod transfer;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use runtime::ExecutionSummary;
pub use runtime::TckRuntime;
pub use scenario::ScenarioGroup;
pub use scenario::VerificationError;

// ============================================================================
// SECTION: Suites
// ============================================================================

/// Returns every scenario group in execution order.
#[must_use]
pub fn all_groups() -> Vec<ScenarioGroup> {
    let mut groups = negotiation::provider::provider_groups();
    groups.extend(negotiation::consumer::consumer_groups());
    groups.extend(transfer::provider::provider_groups());
    groups.extend(transfer::consumer::consumer_groups());
    groups.push(catalog::catalog_group());
    groups.push(metadata::metadata_group());
    groups
}
