//! Reader side of a cross-region reference.
//!
//! Tags every exported parameter the consuming stack imports with a
//! strong-reference tag, so the writer refuses to delete or change it while
//! the import is live. The host supplies the prior import set on Update; the
//! handler keeps no state of its own.

use std::num::NonZeroUsize;

use cross_region_refs_core::contract::{
    validate_reader_props, ReaderRequest, ReaderResponse, RequestType, ValidationError,
};
use cross_region_refs_core::diff::{reference_difference, references};
use cross_region_refs_core::limiter::{ConcurrencyLimit, ConcurrencyLimiter, LimiterError};
use cross_region_refs_core::tags::{strong_ref_tag_key, STRONG_REF_TAG_VALUE};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::adapters::parameters::{ParameterError, ParameterTagger};
use crate::handlers::fanout::run_bounded;

pub const READER_MAX_IN_FLIGHT: usize = 10;

pub const DEFAULT_READER_LIMIT: ConcurrencyLimit = match NonZeroUsize::new(READER_MAX_IN_FLIGHT) {
    Some(limit) => ConcurrencyLimit::Bounded(limit),
    None => panic!("reader fan-out cap must be positive"),
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderHandlerConfig {
    pub max_in_flight: ConcurrencyLimit,
}

impl Default for ReaderHandlerConfig {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_READER_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReaderError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Error importing {reference}: {message}")]
    Tag { reference: String, message: String },
    #[error("Error releasing import {reference}: {message}")]
    Untag { reference: String, message: String },
    #[error(transparent)]
    Limiter(#[from] LimiterError),
}

pub async fn handle_reader_request(
    request: &ReaderRequest,
    config: &ReaderHandlerConfig,
    tagger: &dyn ParameterTagger,
) -> Result<Option<ReaderResponse>, ReaderError> {
    let props = &request.resource_properties.reader_props;
    info!(
        component = "reader_handler",
        event = "invocation_started",
        request_type = %request.request_type,
        request_id = request.request_id.as_deref().unwrap_or_default(),
        region = %props.region,
        imports = props.imports.len(),
        "processing reader request"
    );

    let result = reconcile(request, config, tagger).await;
    match &result {
        Ok(_) => info!(
            component = "reader_handler",
            event = "invocation_completed",
            request_type = %request.request_type,
            "reader request completed"
        ),
        Err(failure) => error!(
            component = "reader_handler",
            event = "invocation_failed",
            request_type = %request.request_type,
            references = ?references(&props.imports),
            error = %failure,
            "reader request failed"
        ),
    }
    result
}

async fn reconcile(
    request: &ReaderRequest,
    config: &ReaderHandlerConfig,
    tagger: &dyn ParameterTagger,
) -> Result<Option<ReaderResponse>, ReaderError> {
    let props = &request.resource_properties.reader_props;
    let limiter = ConcurrencyLimiter::with_limit(config.max_in_flight);
    let tag_key = strong_ref_tag_key(&props.prefix);

    match request.request_type {
        RequestType::Create => {
            validate_reader_props(props)?;
            tag_references(&limiter, tagger, &tag_key, references(&props.imports)).await?;
            Ok(Some(ReaderResponse {
                data: props.imports.clone(),
            }))
        }
        RequestType::Update => {
            validate_reader_props(props)?;
            let prior = &request.prior_properties()?.reader_props;
            let to_untag = reference_difference(&prior.imports, &props.imports);
            let to_tag = reference_difference(&props.imports, &prior.imports);

            untag_references(&limiter, tagger, &tag_key, to_untag).await?;
            tag_references(&limiter, tagger, &tag_key, to_tag).await?;
            Ok(Some(ReaderResponse {
                data: props.imports.clone(),
            }))
        }
        RequestType::Delete => {
            // Not validated: blank references are skipped, the rest released.
            let held: Vec<String> = references(&props.imports)
                .into_iter()
                .filter(|reference| !reference.trim().is_empty())
                .collect();
            untag_references(&limiter, tagger, &tag_key, held).await?;
            Ok(None)
        }
    }
}

async fn tag_references(
    limiter: &ConcurrencyLimiter,
    tagger: &dyn ParameterTagger,
    tag_key: &str,
    to_tag: Vec<String>,
) -> Result<(), ReaderError> {
    if to_tag.is_empty() {
        return Ok(());
    }
    info!(
        component = "reader_handler",
        event = "tag_phase_started",
        references = ?to_tag,
        max_in_flight = %limiter.limit(),
        "tagging imported parameters"
    );

    run_bounded(limiter, to_tag, |reference| async move {
        tagger
            .add_tag(&reference, tag_key, STRONG_REF_TAG_VALUE)
            .await
            .map_err(|failure| ReaderError::Tag {
                message: failure.to_string(),
                reference,
            })
    })
    .await?;
    Ok(())
}

async fn untag_references(
    limiter: &ConcurrencyLimiter,
    tagger: &dyn ParameterTagger,
    tag_key: &str,
    to_untag: Vec<String>,
) -> Result<(), ReaderError> {
    if to_untag.is_empty() {
        return Ok(());
    }
    info!(
        component = "reader_handler",
        event = "untag_phase_started",
        references = ?to_untag,
        max_in_flight = %limiter.limit(),
        "releasing imported parameters"
    );

    run_bounded(limiter, to_untag, |reference| async move {
        match tagger.remove_tag(&reference, tag_key).await {
            Ok(()) => Ok(()),
            Err(ParameterError::AlreadyAbsent) => {
                debug!(
                    component = "reader_handler",
                    event = "untag_skipped",
                    reference = %reference,
                    "parameter already deleted"
                );
                Ok(())
            }
            Err(failure) => Err(ReaderError::Untag {
                message: failure.to_string(),
                reference,
            }),
        }
    })
    .await?;
    Ok(())
}
