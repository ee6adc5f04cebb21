//! Writer side of a cross-region reference.
//!
//! Owns the exported parameters in the producing region. Values are
//! immutable once written, and a parameter that still carries a reader's
//! strong-reference tag can be neither removed nor deleted with the stack.

use std::collections::BTreeSet;
use std::num::NonZeroUsize;

use cross_region_refs_core::contract::{
    validate_writer_props, ExportSet, RequestType, ValidationError, WriterRequest,
};
use cross_region_refs_core::diff::{changed_values, keys_except};
use cross_region_refs_core::limiter::{ConcurrencyLimit, ConcurrencyLimiter, LimiterError};
use cross_region_refs_core::tags::{is_export_parameter, referencing_stack};
use thiserror::Error;
use tracing::{error, info};

use crate::adapters::parameters::{ParameterError, ParameterStore};
use crate::handlers::fanout::run_bounded;

pub const WRITER_MAX_IN_FLIGHT: usize = 10;

pub const DEFAULT_WRITER_LIMIT: ConcurrencyLimit = match NonZeroUsize::new(WRITER_MAX_IN_FLIGHT) {
    Some(limit) => ConcurrencyLimit::Bounded(limit),
    None => panic!("writer fan-out cap must be positive"),
};

/// Maximum names accepted by one delete call.
pub const DELETE_BATCH_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterHandlerConfig {
    pub max_in_flight: ConcurrencyLimit,
}

impl Default for WriterHandlerConfig {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_WRITER_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriterError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Some exports have changed!\n{}", .changes.join("\n"))]
    Changed { changes: Vec<String> },
    #[error("Exports cannot be updated: \n{}", .usages.join("\n"))]
    InUse { usages: Vec<String> },
    #[error("Exports cannot be created, parameters already exist: {}", .names.join(", "))]
    AlreadyExists { names: Vec<String> },
    #[error("Error {action} parameter {name}: {message}")]
    Parameter {
        action: &'static str,
        name: String,
        message: String,
    },
    #[error(transparent)]
    Limiter(#[from] LimiterError),
}

pub async fn handle_writer_request(
    request: &WriterRequest,
    config: &WriterHandlerConfig,
    store: &dyn ParameterStore,
) -> Result<(), WriterError> {
    let props = &request.resource_properties.writer_props;
    info!(
        component = "writer_handler",
        event = "invocation_started",
        request_type = %request.request_type,
        request_id = request.request_id.as_deref().unwrap_or_default(),
        region = %props.region,
        exports = props.exports.len(),
        "processing writer request"
    );

    let result = apply(request, config, store).await;
    match &result {
        Ok(()) => info!(
            component = "writer_handler",
            event = "invocation_completed",
            request_type = %request.request_type,
            "writer request completed"
        ),
        Err(failure) => error!(
            component = "writer_handler",
            event = "invocation_failed",
            request_type = %request.request_type,
            parameters = ?props.exports.keys().collect::<Vec<_>>(),
            error = %failure,
            "writer request failed"
        ),
    }
    result
}

async fn apply(
    request: &WriterRequest,
    config: &WriterHandlerConfig,
    store: &dyn ParameterStore,
) -> Result<(), WriterError> {
    let props = &request.resource_properties.writer_props;
    let limiter = ConcurrencyLimiter::with_limit(config.max_in_flight);
    let exports = &props.exports;

    match request.request_type {
        RequestType::Create => {
            validate_writer_props(props)?;
            ensure_absent(&limiter, store, exports).await?;
            put_parameters(&limiter, store, exports).await
        }
        RequestType::Update => {
            validate_writer_props(props)?;
            let prior = &request.prior_properties()?.writer_props.exports;

            let changes = changed_values(prior, exports);
            if !changes.is_empty() {
                return Err(WriterError::Changed {
                    changes: changes.iter().map(ToString::to_string).collect(),
                });
            }

            let removed = keys_except(prior, exports);
            ensure_not_in_use(&limiter, store, &removed).await?;
            delete_parameters(&limiter, store, &removed).await?;

            let added = keys_except(exports, prior);
            ensure_absent(&limiter, store, &added).await?;
            put_parameters(&limiter, store, &added).await
        }
        RequestType::Delete => {
            // Not validated: only names under the export path are touched.
            let owned: ExportSet = exports
                .iter()
                .filter(|(name, _)| is_export_parameter(name))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect();
            ensure_not_in_use(&limiter, store, &owned).await?;
            delete_parameters(&limiter, store, &owned).await
        }
    }
}

async fn ensure_absent(
    limiter: &ConcurrencyLimiter,
    store: &dyn ParameterStore,
    exports: &ExportSet,
) -> Result<(), WriterError> {
    let existing = run_bounded(limiter, exports.keys(), |name| async move {
        store
            .parameter_exists(name)
            .await
            .map(|exists| exists.then(|| name.clone()))
            .map_err(|failure| parameter_error("reading", name, failure))
    })
    .await?;

    let names: Vec<String> = existing.into_iter().flatten().collect();
    if names.is_empty() {
        Ok(())
    } else {
        Err(WriterError::AlreadyExists { names })
    }
}

async fn ensure_not_in_use(
    limiter: &ConcurrencyLimiter,
    store: &dyn ParameterStore,
    exports: &ExportSet,
) -> Result<(), WriterError> {
    let usages = run_bounded(limiter, exports.keys(), |name| async move {
        let stacks: BTreeSet<String> = match store.list_tag_keys(name).await {
            Ok(keys) => keys
                .iter()
                .filter_map(|key| referencing_stack(key))
                .map(str::to_string)
                .collect(),
            Err(ParameterError::AlreadyAbsent) => BTreeSet::new(),
            Err(failure) => return Err(parameter_error("reading tags of", name, failure)),
        };

        Ok((!stacks.is_empty()).then(|| {
            format!(
                "{name} is in use by stack(s) {}",
                stacks.into_iter().collect::<Vec<_>>().join(" ")
            )
        }))
    })
    .await?;

    let usages: Vec<String> = usages.into_iter().flatten().collect();
    if usages.is_empty() {
        Ok(())
    } else {
        Err(WriterError::InUse { usages })
    }
}

async fn put_parameters(
    limiter: &ConcurrencyLimiter,
    store: &dyn ParameterStore,
    exports: &ExportSet,
) -> Result<(), WriterError> {
    if exports.is_empty() {
        return Ok(());
    }
    info!(
        component = "writer_handler",
        event = "put_phase_started",
        parameters = ?exports.keys().collect::<Vec<_>>(),
        max_in_flight = %limiter.limit(),
        "writing exported parameters"
    );

    run_bounded(limiter, exports, |(name, value)| async move {
        store
            .put_parameter(name, value)
            .await
            .map_err(|failure| parameter_error("writing", name, failure))
    })
    .await?;
    Ok(())
}

async fn delete_parameters(
    limiter: &ConcurrencyLimiter,
    store: &dyn ParameterStore,
    exports: &ExportSet,
) -> Result<(), WriterError> {
    if exports.is_empty() {
        return Ok(());
    }
    let names: Vec<String> = exports.keys().cloned().collect();
    info!(
        component = "writer_handler",
        event = "delete_phase_started",
        parameters = ?names,
        max_in_flight = %limiter.limit(),
        "deleting exported parameters"
    );

    run_bounded(limiter, names.chunks(DELETE_BATCH_SIZE), |batch| async move {
        store
            .delete_parameters(batch)
            .await
            .map_err(|failure| parameter_error("deleting", &batch.join(", "), failure))
    })
    .await?;
    Ok(())
}

fn parameter_error(action: &'static str, name: &str, failure: ParameterError) -> WriterError {
    WriterError::Parameter {
        action,
        name: name.to_string(),
        message: failure.to_string(),
    }
}
