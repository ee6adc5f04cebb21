//! Runtime configuration read once per cold start.

use std::fmt;
use std::str::FromStr;

use cross_region_refs_core::limiter::{ConcurrencyLimit, LimiterError};
use thiserror::Error;

use crate::handlers::reader::{ReaderHandlerConfig, DEFAULT_READER_LIMIT};
use crate::handlers::writer::WriterHandlerConfig;

pub const LOG_LEVEL_VAR: &str = "LOG_LEVEL";
pub const LOG_FORMAT_VAR: &str = "LOG_FORMAT";
pub const SSM_ENDPOINT_URL_VAR: &str = "SSM_ENDPOINT_URL";
pub const MAX_IN_FLIGHT_VAR: &str = "EXPORTS_MAX_IN_FLIGHT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            _ => Err(ConfigError::InvalidLogFormat {
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Text => "text",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("LOG_FORMAT must be `json` or `text`, got `{value}`")]
    InvalidLogFormat { value: String },
    #[error("EXPORTS_MAX_IN_FLIGHT is invalid: {0}")]
    InvalidMaxInFlight(#[from] LimiterError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub log_level: String,
    pub log_format: LogFormat,
    pub ssm_endpoint_url: Option<String>,
    pub max_in_flight: ConcurrencyLimit,
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let log_format = match non_empty(LOG_FORMAT_VAR) {
            Some(value) => value.parse()?,
            None => LogFormat::Json,
        };
        let max_in_flight = match non_empty(MAX_IN_FLIGHT_VAR) {
            Some(value) => value.parse()?,
            None => DEFAULT_READER_LIMIT,
        };

        Ok(Self {
            log_level: non_empty(LOG_LEVEL_VAR).unwrap_or_else(|| "info".to_string()),
            log_format,
            ssm_endpoint_url: non_empty(SSM_ENDPOINT_URL_VAR),
            max_in_flight,
        })
    }

    pub fn reader_config(&self) -> ReaderHandlerConfig {
        ReaderHandlerConfig {
            max_in_flight: self.max_in_flight,
        }
    }

    pub fn writer_config(&self) -> WriterHandlerConfig {
        WriterHandlerConfig {
            max_in_flight: self.max_in_flight,
        }
    }
}
