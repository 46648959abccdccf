// crates/dsp-tck-api/src/messages/catalog.rs
// ============================================================================
// Module: Catalog Messages
// Description: Builders for catalog requests and catalog responses.
// Purpose: Render the catalog model as DCAT messages.
// Dependencies: serde_json, crate::catalog
// ============================================================================

//! ## Overview
//! Nested datasets, offers, distributions, and data services carry `@id` and
//! `@type` but no `@context`; only the top-level message carries it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use dsp_tck_core::JsonObject;
use serde_json::Value;

use super::create_base_message;
use super::create_context_message;
use super::put;
use crate::access::create_dsp_context;
use crate::catalog::Catalog;
use crate::catalog::DataService;
use crate::catalog::Dataset;
use crate::catalog::Distribution;
use crate::catalog::Offer;
use crate::catalog::Permission;
use crate::constants::CONTEXT;
use crate::constants::DCAT_PROPERTY_ACCESS_SERVICE;
use crate::constants::DCAT_PROPERTY_DATASET;
use crate::constants::DCAT_PROPERTY_DISTRIBUTION;
use crate::constants::DCAT_PROPERTY_ENDPOINT_URL;
use crate::constants::DCAT_PROPERTY_HAS_POLICY;
use crate::constants::DCT_PROPERTY_FORMAT;
use crate::constants::DSPACE_PROPERTY_CODE;
use crate::constants::DSPACE_PROPERTY_PARTICIPANT_ID;
use crate::constants::ID;
use crate::constants::ODRL_PROPERTY_ACTION;
use crate::constants::ODRL_PROPERTY_PERMISSION;
use crate::identifiers::random_uuid;

// ============================================================================
// SECTION: Model Builders
// ============================================================================

/// Action IRI of the sample dataset permission.
pub const ODRL_USE_ACTION: &str = "http://www.w3.org/ns/odrl/2/use";

/// Creates a sample dataset with one `use` offer and one distribution.
#[must_use]
pub fn create_dataset(dataset_id: &str) -> Dataset {
    let offer = Offer {
        id: random_uuid(),
        permissions: vec![Permission { action: ODRL_USE_ACTION.to_string() }],
    };
    let distribution = Distribution {
        format: "format".to_string(),
        data_service: DataService { id: random_uuid(), url: "https://example.com".to_string() },
    };
    Dataset { id: dataset_id.to_string(), offers: vec![offer], distributions: vec![distribution] }
}

// ============================================================================
// SECTION: Message Builders
// ============================================================================

/// Creates a `CatalogRequestMessage`.
#[must_use]
pub fn create_catalog_request() -> JsonObject {
    create_context_message("CatalogRequestMessage")
}

/// Creates a `DatasetRequestMessage` for `dataset_id`.
#[must_use]
pub fn create_dataset_request(dataset_id: &str) -> JsonObject {
    let mut message = create_context_message("DatasetRequestMessage");
    put(&mut message, DCAT_PROPERTY_DATASET, dataset_id);
    message
}

/// Creates a `Catalog` response.
#[must_use]
pub fn create_catalog_response(catalog: &Catalog) -> JsonObject {
    let mut message = create_context_message("Catalog");
    put(&mut message, DSPACE_PROPERTY_PARTICIPANT_ID, catalog.participant_id());
    let datasets = catalog.datasets().values().map(|dataset| Value::Object(from_dataset(dataset)));
    message.insert(DCAT_PROPERTY_DATASET.to_string(), Value::Array(datasets.collect()));
    message
}

/// Creates a `Dataset` response.
#[must_use]
pub fn create_dataset_response(dataset: &Dataset) -> JsonObject {
    let mut message = from_dataset(dataset);
    message.insert(CONTEXT.to_string(), create_dsp_context());
    message
}

/// Creates a `CatalogError` response.
#[must_use]
pub fn create_catalog_error_response(code: &str) -> JsonObject {
    let mut message = create_context_message("CatalogError");
    put(&mut message, DSPACE_PROPERTY_CODE, code);
    message
}

// ============================================================================
// SECTION: Model Rendering
// ============================================================================

/// Renders a dataset without context.
fn from_dataset(dataset: &Dataset) -> JsonObject {
    let mut message = create_base_message("Dataset");
    put(&mut message, ID, &dataset.id);
    let policies = dataset.offers.iter().map(|offer| Value::Object(from_offer(offer)));
    message.insert(DCAT_PROPERTY_HAS_POLICY.to_string(), Value::Array(policies.collect()));
    let distributions = dataset
        .distributions
        .iter()
        .map(|distribution| Value::Object(from_distribution(distribution)));
    message.insert(DCAT_PROPERTY_DISTRIBUTION.to_string(), Value::Array(distributions.collect()));
    message
}

/// Renders an offer policy.
fn from_offer(offer: &Offer) -> JsonObject {
    let mut message = create_base_message("Offer");
    put(&mut message, ID, &offer.id);
    let permissions = offer.permissions.iter().map(|permission| {
        let mut rule = create_base_message("Permission");
        put(&mut rule, ODRL_PROPERTY_ACTION, &permission.action);
        Value::Object(rule)
    });
    message.insert(ODRL_PROPERTY_PERMISSION.to_string(), Value::Array(permissions.collect()));
    message
}

/// Renders a distribution and its access service.
fn from_distribution(distribution: &Distribution) -> JsonObject {
    let mut message = create_base_message("Distribution");
    put(&mut message, DCT_PROPERTY_FORMAT, &distribution.format);
    let mut service = create_base_message("DataService");
    put(&mut service, ID, &distribution.data_service.id);
    put(&mut service, DCAT_PROPERTY_ENDPOINT_URL, &distribution.data_service.url);
    message.insert(DCAT_PROPERTY_ACCESS_SERVICE.to_string(), Value::Object(service));
    message
}
