// crates/dsp-tck-system/src/connector/catalog.rs
// ============================================================================
// Module: TCK Catalog Manager
// Description: In-memory catalog of the TCK participant.
// Purpose: Serve datasets to catalog clients and scenarios.
// Dependencies: dsp-tck-api
// ============================================================================

//! ## Overview
//! Holds one [`Catalog`] owned by the TCK participant. Scenarios seed it with
//! datasets before local catalog clients query it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::PoisonError;
use std::sync::RwLock;

use dsp_tck_api::Catalog;
use dsp_tck_api::CatalogManager;
use dsp_tck_api::Dataset;
use dsp_tck_api::constants::TCK_PARTICIPANT_ID;

// ============================================================================
// SECTION: Manager
// ============================================================================

/// Catalog manager backed by a lock-guarded catalog.
pub struct TckCatalogManager {
    /// Catalog of the TCK participant.
    catalog: RwLock<Catalog>,
}

impl TckCatalogManager {
    /// Creates an empty catalog owned by the TCK participant.
    #[must_use]
    pub fn new() -> Self {
        Self { catalog: RwLock::new(Catalog::new(TCK_PARTICIPANT_ID)) }
    }
}

impl Default for TckCatalogManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogManager for TckCatalogManager {
    fn add_dataset(&self, dataset: Dataset) {
        self.catalog.write().unwrap_or_else(PoisonError::into_inner).add_dataset(dataset);
    }

    fn catalog(&self) -> Catalog {
        self.catalog.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn dataset(&self, dataset_id: &str) -> Option<Dataset> {
        let catalog = self.catalog.read().unwrap_or_else(PoisonError::into_inner);
        catalog.datasets().get(dataset_id).cloned()
    }
}
