// crates/dsp-tck-system/src/client/catalog.rs
// ============================================================================
// Module: Catalog and Metadata Clients
// Description: HTTP and local clients for catalog and version queries.
// Purpose: Fetch the catalog, datasets, and protocol versions of a connector.
// Dependencies: dsp-tck-api, dsp-tck-core, tracing
// ============================================================================

//! ## Overview
//! Catalog clients return expanded documents; the metadata client returns
//! the version document as plain JSON because it carries no JSON-LD context.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use dsp_tck_api::Connector;
use dsp_tck_api::messages::catalog::create_catalog_error_response;
use dsp_tck_api::messages::catalog::create_catalog_response;
use dsp_tck_api::messages::catalog::create_dataset_response;
use dsp_tck_core::JsonObject;
use dsp_tck_core::MessageSerializer;
use tracing::debug;

use super::CatalogClient;
use super::ClientError;
use super::MetadataClient;
use super::http::HttpExecutor;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Catalog request path below the connector URL.
const CATALOG_REQUEST_PATH: &str = "/catalog/request";
/// Dataset path prefix below the connector URL.
const DATASET_REQUEST_PATH: &str = "/catalog/datasets/";
/// Version metadata path below the connector URL.
const METADATA_REQUEST_PATH: &str = "/.well-known/dspace-version";
/// Error code returned by the local catalog for unknown datasets.
const UNKNOWN_DATASET_CODE: &str = "401";

// ============================================================================
// SECTION: HTTP Clients
// ============================================================================

/// Queries a remote catalog.
pub struct HttpCatalogClient {
    /// Connector URL without trailing `/`.
    base: String,
    /// Shared HTTP executor.
    executor: HttpExecutor,
}

impl HttpCatalogClient {
    /// Creates a client for the connector at `base`.
    #[must_use]
    pub fn new(base: &str, executor: HttpExecutor) -> Self {
        Self { base: base.trim_end_matches('/').to_string(), executor }
    }
}

impl CatalogClient for HttpCatalogClient {
    fn get_catalog(&self, message: &JsonObject) -> Result<JsonObject, ClientError> {
        let url = format!("{}{CATALOG_REQUEST_PATH}", self.base);
        let reply = self.executor.post_json_ld(&url, message)?;
        reply.check("catalog request", &url, false)?;
        debug!("received catalog request response");
        Ok(self.executor.serializer().process_json_ld_bytes(&reply.body)?)
    }

    fn get_dataset(&self, dataset_id: &str, expect_error: bool) -> Result<JsonObject, ClientError> {
        let url = format!("{}{DATASET_REQUEST_PATH}{dataset_id}", self.base);
        let reply = self.executor.get(&url)?;
        reply.check("dataset request", dataset_id, expect_error)?;
        debug!(dataset = %dataset_id, "received dataset request response");
        Ok(self.executor.serializer().process_json_ld_bytes(&reply.body)?)
    }
}

/// Queries remote protocol version metadata.
pub struct HttpMetadataClient {
    /// Connector URL without trailing `/`.
    base: String,
    /// Shared HTTP executor.
    executor: HttpExecutor,
}

impl HttpMetadataClient {
    /// Creates a client for the connector at `base`.
    #[must_use]
    pub fn new(base: &str, executor: HttpExecutor) -> Self {
        Self { base: base.trim_end_matches('/').to_string(), executor }
    }
}

impl MetadataClient for HttpMetadataClient {
    fn get_metadata(&self) -> Result<JsonObject, ClientError> {
        let url = format!("{}{METADATA_REQUEST_PATH}", self.base);
        let reply = self.executor.get(&url)?;
        reply.check("metadata request", &url, false)?;
        debug!("received metadata response");
        Ok(MessageSerializer::process_json(&reply.body)?)
    }
}

// ============================================================================
// SECTION: Local Clients
// ============================================================================

/// Answers catalog queries from a local connector.
pub struct LocalCatalogClient {
    /// Connector whose catalog is served.
    connector: Arc<dyn Connector>,
    /// Serializer expanding responses.
    serializer: Arc<MessageSerializer>,
}

impl LocalCatalogClient {
    /// Creates a client for `connector`.
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>, serializer: Arc<MessageSerializer>) -> Self {
        Self { connector, serializer }
    }
}

impl CatalogClient for LocalCatalogClient {
    fn get_catalog(&self, message: &JsonObject) -> Result<JsonObject, ClientError> {
        self.serializer.validate(message)?;
        let catalog = self.connector.catalog_manager().catalog();
        Ok(self.serializer.process_json_ld(&create_catalog_response(&catalog))?)
    }

    fn get_dataset(&self, dataset_id: &str, expect_error: bool) -> Result<JsonObject, ClientError> {
        let response = match self.connector.catalog_manager().dataset(dataset_id) {
            Some(dataset) if !expect_error => create_dataset_response(&dataset),
            _ => create_catalog_error_response(UNKNOWN_DATASET_CODE),
        };
        Ok(self.serializer.process_json_ld(&response)?)
    }
}

/// Answers metadata queries from a local connector.
pub struct LocalMetadataClient {
    /// Connector whose metadata is served.
    connector: Arc<dyn Connector>,
}

impl LocalMetadataClient {
    /// Creates a client for `connector`.
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }
}

impl MetadataClient for LocalMetadataClient {
    fn get_metadata(&self) -> Result<JsonObject, ClientError> {
        Ok(self.connector.metadata())
    }
}
