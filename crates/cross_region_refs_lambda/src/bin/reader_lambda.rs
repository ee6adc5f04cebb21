use cross_region_refs_core::contract::{parse_request, ReaderRequest, ReaderResponse};
use cross_region_refs_lambda::adapters::ssm::SsmParameterStore;
use cross_region_refs_lambda::config::RuntimeConfig;
use cross_region_refs_lambda::handlers::reader::handle_reader_request;
use cross_region_refs_lambda::logging::init_logging;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

async fn handle_request(
    event: LambdaEvent<Value>,
    config: &RuntimeConfig,
) -> Result<Option<ReaderResponse>, Error> {
    let request: ReaderRequest = parse_request(event.payload).map_err(|error| {
        tracing::error!(component = "reader_lambda", error = %error, "rejected event");
        Error::from(error.to_string())
    })?;

    let store = SsmParameterStore::for_region(
        &request.resource_properties.reader_props.region,
        config.ssm_endpoint_url.as_deref(),
    )
    .await;

    handle_reader_request(&request, &config.reader_config(), &store)
        .await
        .map_err(|error| Error::from(error.to_string()))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = RuntimeConfig::from_env().map_err(|error| Error::from(error.to_string()))?;
    init_logging(&config).map_err(|error| Error::from(error.to_string()))?;

    let config = &config;
    lambda_runtime::run(service_fn(move |event| handle_request(event, config))).await
}
