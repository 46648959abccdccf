// crates/dsp-tck-api/src/constants.rs
// ============================================================================
// Module: Protocol Constants
// Description: Namespaces, keywords, and property names of DSP messages.
// Purpose: Name every compact and expanded term the suite reads or writes.
// Dependencies: dsp-tck-core
// ============================================================================

//! ## Overview
//! Compact names are used when building outgoing messages; expanded IRIs are
//! used when reading messages after JSON-LD expansion.

// ============================================================================
// SECTION: Participants And Contexts
// ============================================================================

/// Participant id the TCK presents to the connector under test.
pub const TCK_PARTICIPANT_ID: &str = "TCK_PARTICIPANT";
/// Dataspace Protocol 2025-1 namespace.
pub const DSPACE_NAMESPACE: &str = "https://w3id.org/dspace/2025/1/";
/// Dataspace Protocol 2025-1 context IRI.
pub const DSPACE_CONTEXT: &str = dsp_tck_core::message::DSP_CONTEXT_IRI;
/// Dataspace Protocol ODRL profile context IRI.
pub const ODRL_PROFILE_CONTEXT: &str = dsp_tck_core::message::ODRL_PROFILE_CONTEXT_IRI;

// ============================================================================
// SECTION: JSON-LD Keywords
// ============================================================================

/// `@context` keyword.
pub const CONTEXT: &str = "@context";
/// `@id` keyword.
pub const ID: &str = "@id";
/// `@value` keyword.
pub const VALUE: &str = "@value";
/// `@type` keyword.
pub const TYPE: &str = "@type";

// ============================================================================
// SECTION: DSP Properties
// ============================================================================

/// Agreement timestamp.
pub const DSPACE_PROPERTY_TIMESTAMP: &str = "timestamp";
/// Provider process id.
pub const DSPACE_PROPERTY_PROVIDER_PID: &str = "providerPid";
/// Consumer process id.
pub const DSPACE_PROPERTY_CONSUMER_PID: &str = "consumerPid";
/// Error or termination code.
pub const DSPACE_PROPERTY_CODE: &str = "code";
/// Termination reasons.
pub const DSPACE_PROPERTY_REASON: &str = "reason";
/// Process state.
pub const DSPACE_PROPERTY_STATE: &str = "state";
/// Negotiation event type.
pub const DSPACE_PROPERTY_EVENT_TYPE: &str = "eventType";
/// Callback address of the sender.
pub const DSPACE_PROPERTY_CALLBACK_ADDRESS: &str = "callbackAddress";
/// Offer policy.
pub const DSPACE_PROPERTY_OFFER: &str = "offer";
/// Agreement policy.
pub const DSPACE_PROPERTY_AGREEMENT: &str = "agreement";
/// Catalog participant id.
pub const DSPACE_PROPERTY_PARTICIPANT_ID: &str = "participantId";

/// Expanded consumer process id.
pub const DSPACE_PROPERTY_CONSUMER_PID_EXPANDED: &str =
    "https://w3id.org/dspace/2025/1/consumerPid";
/// Expanded provider process id.
pub const DSPACE_PROPERTY_PROVIDER_PID_EXPANDED: &str =
    "https://w3id.org/dspace/2025/1/providerPid";
/// Expanded process state.
pub const DSPACE_PROPERTY_STATE_EXPANDED: &str = "https://w3id.org/dspace/2025/1/state";
/// Expanded negotiation event type.
pub const DSPACE_PROPERTY_EVENT_TYPE_EXPANDED: &str = "https://w3id.org/dspace/2025/1/eventType";
/// Expanded callback address.
pub const DSPACE_PROPERTY_CALLBACK_ADDRESS_EXPANDED: &str =
    "https://w3id.org/dspace/2025/1/callbackAddress";
/// Expanded offer policy.
pub const DSPACE_PROPERTY_OFFER_EXPANDED: &str = "https://w3id.org/dspace/2025/1/offer";
/// Expanded agreement policy.
pub const DSPACE_PROPERTY_AGREEMENT_EXPANDED: &str = "https://w3id.org/dspace/2025/1/agreement";
/// Expanded error or termination code.
pub const DSPACE_PROPERTY_CODE_EXPANDED: &str = "https://w3id.org/dspace/2025/1/code";

/// Catalog error message type.
pub const DSPACE_CATALOG_ERROR: &str = "https://w3id.org/dspace/2025/1/CatalogError";

// ============================================================================
// SECTION: Transfer Properties
// ============================================================================

/// Data address of a transfer.
pub const DSPACE_PROPERTY_DATA_ADDRESS: &str = "dataAddress";
/// Data address endpoint type.
pub const DSPACE_PROPERTY_ENDPOINT_TYPE: &str = "endpointType";
/// Data address endpoint.
pub const DSPACE_PROPERTY_ENDPOINT: &str = "endpoint";
/// Data address endpoint properties.
pub const DSPACE_PROPERTY_ENDPOINT_PROPERTIES: &str = "endpointProperties";
/// Agreement a transfer runs under.
pub const DSPACE_PROPERTY_AGREEMENT_ID: &str = "agreementId";
/// Requested transfer format.
pub const DSPACE_PROPERTY_FORMAT: &str = "format";
/// Endpoint property name.
pub const DSPACE_PROPERTY_NAME: &str = "name";
/// Endpoint property value.
pub const DSPACE_PROPERTY_VALUE: &str = "value";

/// Expanded data address.
pub const DSPACE_PROPERTY_DATA_ADDRESS_EXPANDED: &str =
    "https://w3id.org/dspace/2025/1/dataAddress";
/// Expanded data address endpoint type.
pub const DSPACE_PROPERTY_ENDPOINT_TYPE_EXPANDED: &str =
    "https://w3id.org/dspace/2025/1/endpointType";
/// Expanded data address endpoint.
pub const DSPACE_PROPERTY_ENDPOINT_EXPANDED: &str = "https://w3id.org/dspace/2025/1/endpoint";
/// Expanded data address endpoint properties.
pub const DSPACE_PROPERTY_ENDPOINT_PROPERTIES_EXPANDED: &str =
    "https://w3id.org/dspace/2025/1/endpointProperties";
/// Expanded endpoint property name.
pub const DSPACE_PROPERTY_ENDPOINT_PROPERTY_NAME_EXPANDED: &str =
    "https://w3id.org/dspace/2025/1/name";
/// Expanded endpoint property value.
pub const DSPACE_PROPERTY_ENDPOINT_PROPERTY_VALUE_EXPANDED: &str =
    "https://w3id.org/dspace/2025/1/value";
/// Expanded agreement id.
pub const DSPACE_PROPERTY_AGREEMENT_ID_EXPANDED: &str =
    "https://w3id.org/dspace/2025/1/agreementId";
/// Expanded transfer format.
pub const DSPACE_PROPERTY_FORMAT_EXPANDED: &str = "http://purl.org/dc/terms/format";

// ============================================================================
// SECTION: DCAT Properties
// ============================================================================

/// DCAT namespace.
pub const DCAT_NAMESPACE: &str = "http://www.w3.org/ns/dcat#";
/// Dataset distributions.
pub const DCAT_PROPERTY_DISTRIBUTION: &str = "distribution";
/// Distribution format.
pub const DCT_PROPERTY_FORMAT: &str = "format";
/// Catalog datasets, or the requested dataset id.
pub const DCAT_PROPERTY_DATASET: &str = "dataset";
/// Distribution access service.
pub const DCAT_PROPERTY_ACCESS_SERVICE: &str = "accessService";
/// Data service endpoint URL.
pub const DCAT_PROPERTY_ENDPOINT_URL: &str = "endpointURL";
/// Dataset policies.
pub const DCAT_PROPERTY_HAS_POLICY: &str = "hasPolicy";
/// Expanded catalog datasets.
pub const DCAT_PROPERTY_DATASET_EXPANDED: &str = "http://www.w3.org/ns/dcat#dataset";

// ============================================================================
// SECTION: ODRL Properties
// ============================================================================

/// ODRL namespace.
pub const ODRL_NAMESPACE: &str = "http://www.w3.org/ns/odrl/2/";
/// Agreement policy type.
pub const ODRL_AGREEMENT_TYPE: &str = "Agreement";
/// Offer policy type.
pub const ODRL_OFFER_TYPE: &str = "Offer";
/// Rule action.
pub const ODRL_PROPERTY_ACTION: &str = "action";
/// `use` action.
pub const ODRL_USE: &str = "use";
/// Rule constraints.
pub const ODRL_PROPERTY_CONSTRAINTS: &str = "constraints";
/// Policy permissions.
pub const ODRL_PROPERTY_PERMISSION: &str = "permission";
/// Policy assignee.
pub const ODRL_PROPERTY_ASSIGNEE: &str = "assignee";
/// Policy assigner.
pub const ODRL_PROPERTY_ASSIGNER: &str = "assigner";
/// Policy target.
pub const ODRL_PROPERTY_TARGET: &str = "target";
/// Expanded policy target.
pub const ODRL_PROPERTY_TARGET_EXPANDED: &str = "http://www.w3.org/ns/odrl/2/target";
