// crates/dsp-tck-suite/src/catalog.rs
// ============================================================================
// Module: Catalog Scenarios
// Description: CAT_01 scenarios querying the catalog of a provider.
// Purpose: Verify catalog and dataset requests against the connector under test.
// Dependencies: dsp-tck-api, dsp-tck-system, serde_json
// ============================================================================

//! ## Overview
//! Catalog scenarios seed the provider connector of their scope, which only
//! affects a local connector, then inspect the expanded catalog documents
//! returned by the catalog client.

// ============================================================================
// SECTION: Imports
// ============================================================================

use dsp_tck_api::Connector;
use dsp_tck_api::constants::DCAT_PROPERTY_DATASET_EXPANDED;
use dsp_tck_api::constants::DSPACE_CATALOG_ERROR;
use dsp_tck_api::constants::ID;
use dsp_tck_api::constants::TYPE;
use dsp_tck_api::messages::catalog::create_catalog_request;
use dsp_tck_api::messages::catalog::create_dataset;
use dsp_tck_core::JsonObject;
use dsp_tck_core::MessageSerializer;
use serde_json::Value;

use crate::scenario::Scenario;
use crate::scenario::ScenarioContext;
use crate::scenario::ScenarioGroup;
use crate::scenario::VerificationError;
use crate::scenario::ensure;
use crate::scenario::register_validators;

// ============================================================================
// SECTION: Group
// ============================================================================

/// Message types validated during catalog scenarios.
pub const CATALOG_VALIDATORS: [(&str, &str); 4] = [
    ("CatalogRequestMessage", "/catalog/catalog-request-message-schema.json"),
    ("DatasetRequestMessage", "/catalog/dataset-request-message-schema.json"),
    ("Catalog", "/catalog/catalog-schema.json"),
    ("Dataset", "/catalog/dataset-schema.json"),
];

/// Returns the CAT_01 group.
#[must_use]
pub fn catalog_group() -> ScenarioGroup {
    ScenarioGroup {
        name: "CAT_01: Catalog request scenarios",
        setup: register_catalog_validators,
        scenarios: vec![
            Scenario::new("CAT:01-01", "CAT:01-01: Verify catalog request", cat_01_01),
            Scenario::new("CAT:01-02", "CAT:01-02: Verify dataset request", cat_01_02),
            Scenario::new("CAT:01-03", "CAT:01-03: Verify dataset request not found", cat_01_03),
        ],
    }
}

/// Registers the catalog message validators.
fn register_catalog_validators(serializer: &MessageSerializer) -> Result<(), VerificationError> {
    register_validators(serializer, &CATALOG_VALIDATORS)
}

// ============================================================================
// SECTION: Scenarios
// ============================================================================

/// The catalog lists the seeded dataset.
fn cat_01_01(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let launcher = context.dsp_launcher()?;
    let dataset_id = context.catalog_dataset_id();
    let provider = launcher.provider_connector(context.scope())?;
    provider.catalog_manager().add_dataset(create_dataset(&dataset_id));
    let catalog = launcher.catalog_client(context.scope())?.get_catalog(&create_catalog_request())?;
    let datasets = datasets(&catalog)?;
    ensure(!datasets.is_empty(), || "catalog contains no datasets".to_string())?;
    ensure(datasets.iter().any(|dataset| has_id(dataset, &dataset_id)), || {
        format!("catalog does not contain dataset {dataset_id}")
    })
}

/// The seeded dataset can be fetched.
fn cat_01_02(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let launcher = context.dsp_launcher()?;
    let dataset_id = context.catalog_dataset_id();
    let provider = launcher.provider_connector(context.scope())?;
    provider.catalog_manager().add_dataset(create_dataset(&dataset_id));
    let dataset = launcher.catalog_client(context.scope())?.get_dataset(&dataset_id, false)?;
    ensure(dataset.get(ID).and_then(Value::as_str) == Some(dataset_id.as_str()), || {
        format!("dataset response does not carry id {dataset_id}")
    })
}

/// An unknown dataset yields a catalog error.
fn cat_01_03(context: &ScenarioContext<'_>) -> Result<(), VerificationError> {
    let launcher = context.dsp_launcher()?;
    let dataset_id = context.catalog_dataset_id();
    let error = launcher.catalog_client(context.scope())?.get_dataset(&dataset_id, true)?;
    ensure(is_catalog_error(&error), || {
        format!("expected {DSPACE_CATALOG_ERROR}, got {}", Value::Object(error.clone()))
    })
}

// ============================================================================
// SECTION: Document Checks
// ============================================================================

/// Returns the dataset entries of an expanded catalog.
fn datasets(catalog: &JsonObject) -> Result<&Vec<Value>, VerificationError> {
    catalog
        .get(DCAT_PROPERTY_DATASET_EXPANDED)
        .and_then(Value::as_array)
        .ok_or_else(|| {
            VerificationError::Assertion(format!(
                "catalog has no {DCAT_PROPERTY_DATASET_EXPANDED} array"
            ))
        })
}

/// Returns true when `entry` is a node with `@id` equal to `id`.
fn has_id(entry: &Value, id: &str) -> bool {
    entry.get(ID).and_then(Value::as_str) == Some(id)
}

/// Returns true when the expanded `@type` is exactly the catalog error type.
fn is_catalog_error(document: &JsonObject) -> bool {
    document
        .get(TYPE)
        .and_then(Value::as_array)
        .is_some_and(|types| types.len() == 1 && types[0].as_str() == Some(DSPACE_CATALOG_ERROR))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
