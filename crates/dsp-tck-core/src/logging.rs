// crates/dsp-tck-core/src/logging.rs
// ============================================================================
// Module: Logging
// Description: Tracing subscriber installation.
// Purpose: Route protocol diagnostics to stderr at the configured level.
// Dependencies: tracing, tracing-subscriber
// ============================================================================

//! ## Overview
//! Installs a `tracing-subscriber` formatter writing to stderr. Debug output
//! is enabled by `dataspacetck.debug`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;

use tracing::Level;

// ============================================================================
// SECTION: Initialisation
// ============================================================================

/// Installs the global subscriber. Returns false when one is already set.
pub fn init(debug: bool) -> bool {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init()
        .is_ok()
}
