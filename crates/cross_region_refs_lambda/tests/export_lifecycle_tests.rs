mod support;

use cross_region_refs_core::contract::parse_request;
use cross_region_refs_lambda::handlers::reader::{handle_reader_request, ReaderHandlerConfig};
use cross_region_refs_lambda::handlers::writer::{
    handle_writer_request, WriterError, WriterHandlerConfig,
};
use cross_region_refs_lambda::test_helpers::InMemoryParameterStore;
use serde_json::Value;

use support::events::{custom_resource_event, reader_properties, writer_properties};

const VPC: &str = "/cdk/exports/consumer/producerVpcId";
const SUBNET: &str = "/cdk/exports/consumer/producerSubnetId";

async fn write(store: &InMemoryParameterStore, event: Value) -> Result<(), WriterError> {
    let request = parse_request(event).expect("writer event should parse");
    handle_writer_request(&request, &WriterHandlerConfig::default(), store).await
}

async fn read(store: &InMemoryParameterStore, event: Value) {
    let request = parse_request(event).expect("reader event should parse");
    handle_reader_request(&request, &ReaderHandlerConfig::default(), store)
        .await
        .expect("reader event should succeed");
}

#[tokio::test]
async fn exports_stay_protected_until_every_reader_lets_go() {
    let store = InMemoryParameterStore::new().with_latency_yields(2);
    let exports = [(VPC, "vpc-123"), (SUBNET, "subnet-456")];

    write(
        &store,
        custom_resource_event("Create", writer_properties(&exports), None),
    )
    .await
    .expect("writer create should succeed");

    read(
        &store,
        custom_resource_event(
            "Create",
            reader_properties("consumer", &[("vpc", VPC), ("subnet", SUBNET)]),
            None,
        ),
    )
    .await;

    let error = write(
        &store,
        custom_resource_event("Delete", writer_properties(&exports), None),
    )
    .await
    .expect_err("writer delete should be refused while imports are live");
    assert!(matches!(error, WriterError::InUse { ref usages } if usages.len() == 2));

    read(
        &store,
        custom_resource_event(
            "Update",
            reader_properties("consumer", &[("vpc", VPC)]),
            Some(reader_properties(
                "consumer",
                &[("vpc", VPC), ("subnet", SUBNET)],
            )),
        ),
    )
    .await;

    write(
        &store,
        custom_resource_event(
            "Update",
            writer_properties(&[(VPC, "vpc-123")]),
            Some(writer_properties(&exports)),
        ),
    )
    .await
    .expect("unused export should be removable");
    assert!(!store.parameters().contains_key(SUBNET));

    read(
        &store,
        custom_resource_event(
            "Delete",
            reader_properties("consumer", &[("vpc", VPC)]),
            None,
        ),
    )
    .await;

    write(
        &store,
        custom_resource_event("Delete", writer_properties(&[(VPC, "vpc-123")]), None),
    )
    .await
    .expect("writer delete should succeed once released");
    assert!(store.parameters().is_empty());
}
