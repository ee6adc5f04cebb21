mod support;

use cross_region_refs_core::contract::{parse_request, ReaderRequest};
use cross_region_refs_lambda::handlers::reader::{handle_reader_request, ReaderHandlerConfig};
use cross_region_refs_lambda::test_helpers::{InMemoryParameterStore, StoreCall};
use serde_json::json;

use support::events::{custom_resource_event, reader_properties};

const TAG_KEY: &str = "aws-cdk:strong-ref:consumer";

fn parse(event: serde_json::Value) -> ReaderRequest {
    parse_request(event).expect("event should parse")
}

#[tokio::test]
async fn create_event_returns_imports_as_data() {
    let store = InMemoryParameterStore::with_parameters(&["r1", "r2"]);
    let request = parse(custom_resource_event(
        "Create",
        reader_properties("consumer", &[("a", "r1"), ("b", "r2")]),
        None,
    ));

    let response = handle_reader_request(&request, &ReaderHandlerConfig::default(), &store)
        .await
        .expect("create should succeed");

    assert_eq!(
        serde_json::to_value(response).expect("response should serialize"),
        json!({"Data": {"a": "r1", "b": "r2"}})
    );
    assert_eq!(store.tagged_with(TAG_KEY), vec!["r1", "r2"]);
}

#[tokio::test]
async fn update_event_removing_import_only_untags() {
    let store = InMemoryParameterStore::with_parameters(&["r1", "r2"]);
    store.seed_tag("r1", TAG_KEY);
    store.seed_tag("r2", TAG_KEY);
    let request = parse(custom_resource_event(
        "Update",
        reader_properties("consumer", &[("a", "r1")]),
        Some(reader_properties("consumer", &[("a", "r1"), ("b", "r2")])),
    ));

    handle_reader_request(&request, &ReaderHandlerConfig::default(), &store)
        .await
        .expect("update should succeed");

    assert_eq!(
        store.calls(),
        vec![StoreCall::RemoveTag {
            parameter: "r2".to_string(),
            key: TAG_KEY.to_string(),
        }]
    );
    assert_eq!(store.tagged_with(TAG_KEY), vec!["r1"]);
}

#[tokio::test]
async fn delete_event_serializes_without_data() {
    let store = InMemoryParameterStore::new();
    let request = parse(custom_resource_event(
        "Delete",
        reader_properties("consumer", &[("a", "r1")]),
        None,
    ));

    let response = handle_reader_request(&request, &ReaderHandlerConfig::default(), &store)
        .await
        .expect("delete of an already-deleted parameter should succeed");

    assert_eq!(
        serde_json::to_value(response).expect("response should serialize"),
        serde_json::Value::Null
    );
}

#[tokio::test]
async fn update_event_without_old_properties_is_rejected() {
    let store = InMemoryParameterStore::new();
    let request = parse(custom_resource_event(
        "Update",
        reader_properties("consumer", &[("a", "r1")]),
        None,
    ));

    let error = handle_reader_request(&request, &ReaderHandlerConfig::default(), &store)
        .await
        .expect_err("update without prior state should fail");

    assert_eq!(
        error.to_string(),
        "OldResourceProperties is required for Update requests"
    );
}

#[test]
fn event_without_reader_props_is_malformed() {
    let error = parse_request::<cross_region_refs_core::contract::ReaderResourceProperties>(
        custom_resource_event("Create", json!({"ServiceToken": "arn"}), None),
    )
    .expect_err("missing ReaderProps should fail");

    assert!(error.message().contains("ReaderProps"));
}
