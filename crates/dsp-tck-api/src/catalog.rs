// crates/dsp-tck-api/src/catalog.rs
// ============================================================================
// Module: Catalog Model
// Description: Catalog, dataset, offer, and distribution values.
// Purpose: Hold the datasets the local connector advertises.
// Dependencies: none
// ============================================================================

//! ## Overview
//! A [`Catalog`] belongs to one participant and holds datasets keyed by id.
//! Each [`Dataset`] carries the offers that may be negotiated for it and the
//! distributions through which it can be transferred.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

// ============================================================================
// SECTION: Model
// ============================================================================

/// Permission rule of an offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    /// Permitted action IRI.
    pub action: String,
}

/// Offer policy attached to a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Offer {
    /// Offer id.
    pub id: String,
    /// Permission rules.
    pub permissions: Vec<Permission>,
}

/// Service that serves a distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataService {
    /// Service id.
    pub id: String,
    /// Service endpoint URL.
    pub url: String,
}

/// Transfer format of a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    /// Format name.
    pub format: String,
    /// Serving data service.
    pub data_service: DataService,
}

/// Dataset advertised in a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    /// Dataset id.
    pub id: String,
    /// Negotiable offers.
    pub offers: Vec<Offer>,
    /// Available distributions.
    pub distributions: Vec<Distribution>,
}

/// Catalog of one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    /// Owning participant id.
    participant_id: String,
    /// Datasets keyed by id.
    datasets: BTreeMap<String, Dataset>,
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new(participant_id: impl Into<String>) -> Self {
        Self { participant_id: participant_id.into(), datasets: BTreeMap::new() }
    }

    /// Returns the owning participant id.
    #[must_use]
    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    /// Returns the datasets keyed by id.
    #[must_use]
    pub const fn datasets(&self) -> &BTreeMap<String, Dataset> {
        &self.datasets
    }

    /// Adds or replaces a dataset.
    pub fn add_dataset(&mut self, dataset: Dataset) {
        self.datasets.insert(dataset.id.clone(), dataset);
    }
}
