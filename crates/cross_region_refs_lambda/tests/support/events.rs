#![allow(dead_code)]

use serde_json::{json, Value};

pub const SERVICE_TOKEN: &str = "arn:aws:lambda:us-east-1:123456789012:function:refs-handler";

/// Raw custom resource event as delivered by the orchestration host.
pub fn custom_resource_event(
    request_type: &str,
    properties: Value,
    old_properties: Option<Value>,
) -> Value {
    let mut event = json!({
        "RequestType": request_type,
        "RequestId": format!("{}-request", request_type.to_lowercase()),
        "StackId": "arn:aws:cloudformation:us-east-1:123456789012:stack/consumer/guid",
        "LogicalResourceId": "ExportsReader",
        "ResourceType": "Custom::CrossRegionExportReader",
        "ServiceToken": SERVICE_TOKEN,
        "ResponseURL": "https://example.invalid/response",
        "ResourceProperties": properties,
    });
    if let Some(old) = old_properties {
        event["OldResourceProperties"] = old;
    }
    event
}

pub fn reader_properties(prefix: &str, imports: &[(&str, &str)]) -> Value {
    let imports: serde_json::Map<String, Value> = imports
        .iter()
        .map(|(name, reference)| (name.to_string(), Value::from(*reference)))
        .collect();
    json!({
        "ServiceToken": SERVICE_TOKEN,
        "ReaderProps": {
            "imports": imports,
            "prefix": prefix,
            "region": "us-east-1",
        }
    })
}

pub fn writer_properties(exports: &[(&str, &str)]) -> Value {
    let exports: serde_json::Map<String, Value> = exports
        .iter()
        .map(|(name, value)| (name.to_string(), Value::from(*value)))
        .collect();
    json!({
        "ServiceToken": SERVICE_TOKEN,
        "WriterProps": {
            "exports": exports,
            "region": "eu-west-1",
        }
    })
}
