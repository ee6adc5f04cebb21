use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, RuntimeConfig};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log level `{level}`: {message}")]
    InvalidLevel { level: String, message: String },
    #[error("failed to install log subscriber: {0}")]
    Install(String),
}

/// Installs the process-wide subscriber. CloudWatch stamps each line, so
/// events carry no timestamp of their own.
pub fn init_logging(config: &RuntimeConfig) -> Result<(), LoggingError> {
    let filter =
        EnvFilter::try_new(&config.log_level).map_err(|error| LoggingError::InvalidLevel {
            level: config.log_level.clone(),
            message: error.to_string(),
        })?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false)
        .without_time();

    match config.log_format {
        LogFormat::Json => builder
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .try_init(),
        LogFormat::Text => builder.try_init(),
    }
    .map_err(|error| LoggingError::Install(error.to_string()))
}
