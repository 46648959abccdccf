// crates/dsp-tck-core/src/jsonld/tests.rs
// ============================================================================
// Module: JSON-LD Expansion Tests
// Description: Unit tests for context processing and expansion.
// Purpose: Validate the expanded shapes protocol accessors rely on.
// Dependencies: dsp-tck-core, serde_json
// ============================================================================

//! ## Overview
//! Expands representative protocol messages against the bundled DSP context
//! and checks the exact expanded forms read by message accessors.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use serde_json::json;

use super::ContextLoader;
use super::JsonLdError;
use super::expand;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const DSP_CONTEXT: &str = "https://w3id.org/dspace/2025/1/context.jsonld";
const NS: &str = "https://w3id.org/dspace/2025/1/";

/// Loader serving only the bundled DSP context.
struct BundledLoader;

impl ContextLoader for BundledLoader {
    fn load(&self, iri: &str) -> Option<Value> {
        (iri == DSP_CONTEXT).then(|| {
            serde_json::from_str(include_str!("../../resources/context/dspace-context.jsonld"))
                .unwrap()
        })
    }
}

fn expand_one(document: &Value) -> Value {
    let mut nodes = expand(document, &BundledLoader).unwrap();
    assert_eq!(nodes.len(), 1);
    nodes.remove(0)
}

// ============================================================================
// SECTION: Message Expansion Tests
// ============================================================================

#[test]
fn negotiation_response_expands_ids_and_vocab_values() {
    let node = expand_one(&json!({
        "@context": [DSP_CONTEXT],
        "@id": "urn:uuid:1",
        "@type": "ContractNegotiation",
        "providerPid": "provider-1",
        "consumerPid": "consumer-1",
        "state": "REQUESTED"
    }));
    assert_eq!(node["@id"], json!("urn:uuid:1"));
    assert_eq!(node["@type"], json!([format!("{NS}ContractNegotiation")]));
    assert_eq!(node[format!("{NS}providerPid")], json!([{ "@id": "provider-1" }]));
    assert_eq!(node[format!("{NS}consumerPid")], json!([{ "@id": "consumer-1" }]));
    assert_eq!(node[format!("{NS}state")], json!([{ "@id": format!("{NS}REQUESTED") }]));
}

#[test]
fn offer_policy_expands_odrl_terms() {
    let node = expand_one(&json!({
        "@context": [DSP_CONTEXT],
        "@type": "ContractRequestMessage",
        "consumerPid": "c1",
        "offer": {
            "@id": "offer-1",
            "@type": "Offer",
            "target": "dataset-1",
            "permission": [{ "action": "use", "constraints": [] }]
        },
        "callbackAddress": "http://localhost:8083"
    }));
    let offer = &node[format!("{NS}offer")][0];
    assert_eq!(offer["@id"], json!("offer-1"));
    assert_eq!(offer["@type"], json!(["http://www.w3.org/ns/odrl/2/Offer"]));
    assert_eq!(offer["http://www.w3.org/ns/odrl/2/target"], json!([{ "@id": "dataset-1" }]));
    let permission = &offer["http://www.w3.org/ns/odrl/2/permission"][0];
    assert_eq!(
        permission["http://www.w3.org/ns/odrl/2/action"],
        json!([{ "@id": "http://www.w3.org/ns/odrl/2/use" }])
    );
    assert_eq!(
        node[format!("{NS}callbackAddress")],
        json!([{
            "@value": "http://localhost:8083",
            "@type": "http://www.w3.org/2001/XMLSchema#anyURI"
        }])
    );
}

#[test]
fn catalog_types_map_to_dcat() {
    let node = expand_one(&json!({
        "@context": [DSP_CONTEXT],
        "@id": "ds-1",
        "@type": "Dataset",
        "distribution": [{
            "@type": "Distribution",
            "format": "HttpData-PULL",
            "accessService": {
                "@id": "svc",
                "@type": "DataService",
                "endpointURL": "https://example.com"
            }
        }]
    }));
    assert_eq!(node["@type"], json!(["http://www.w3.org/ns/dcat#Dataset"]));
    let distribution = &node["http://www.w3.org/ns/dcat#distribution"][0];
    assert_eq!(
        distribution["http://purl.org/dc/terms/format"],
        json!([{ "@id": format!("{NS}HttpData-PULL") }])
    );
    let service = &distribution["http://www.w3.org/ns/dcat#accessService"][0];
    assert_eq!(
        service["http://www.w3.org/ns/dcat#endpointURL"],
        json!([{ "@id": "https://example.com" }])
    );
}

// ============================================================================
// SECTION: Context Tests
// ============================================================================

#[test]
fn inline_prefixes_and_null_values() {
    let node = expand_one(&json!({
        "@context": {
            "ex": "http://example.org/",
            "name": "ex:name",
            "ex:tag": { "@type": "@id" }
        },
        "@id": "ex:thing",
        "name": "value",
        "ex:other": null,
        "unmapped": "dropped"
    }));
    assert_eq!(node["@id"], json!("http://example.org/thing"));
    assert_eq!(node["http://example.org/name"], json!([{ "@value": "value" }]));
    assert!(node.get("http://example.org/other").is_none());
    assert_eq!(node.as_object().unwrap().len(), 2);
}

#[test]
fn unknown_remote_context_fails() {
    let document = json!({ "@context": "https://unknown.example/ctx", "@type": "X" });
    let err = expand(&document, &BundledLoader).expect_err("unknown context");
    assert_eq!(err, JsonLdError::UnknownContext("https://unknown.example/ctx".to_string()));
}

#[test]
fn cyclic_terms_are_rejected() {
    let err = expand(&json!({ "@context": { "a": "b:x", "b": "a:y" }, "a": 1 }), &BundledLoader)
        .expect_err("cycle");
    assert!(matches!(err, JsonLdError::CyclicTermDefinition(_)));
}

#[test]
fn id_only_top_level_nodes_are_dropped() {
    let document = json!({ "@context": [DSP_CONTEXT], "@id": "lonely" });
    let nodes = expand(&document, &BundledLoader).unwrap();
    assert!(nodes.is_empty());
}

#[test]
fn numbers_expand_to_native_values() {
    let node = expand_one(&json!({ "@context": [DSP_CONTEXT], "@type": "Thing", "size": 5 }));
    assert_eq!(node[format!("{NS}size")], json!([{ "@value": 5 }]));
}
