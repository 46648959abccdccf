// crates/dsp-tck-api/src/identifiers.rs
// ============================================================================
// Module: Identifiers
// Description: Random identifier generation for messages and processes.
// Purpose: Produce RFC 4122 version 4 UUID strings.
// Dependencies: rand
// ============================================================================

//! ## Overview
//! Message `@id` values, negotiation ids, and agreement ids are random
//! version 4 UUIDs drawn from the operating system RNG.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;

use rand::RngCore;
use rand::rngs::OsRng;

// ============================================================================
// SECTION: UUID Generation
// ============================================================================

/// Returns a new random UUID in hyphenated lower-case form.
#[must_use]
pub fn random_uuid() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    let mut out = String::with_capacity(36);
    for (index, byte) in bytes.iter().enumerate() {
        if matches!(index, 4 | 6 | 8 | 10) {
            out.push('-');
        }
        let _ = write!(out, "{byte:02x}");
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================
