use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tags::{is_export_parameter, EXPORT_PATH_PREFIX};

/// Import name -> exported parameter name, as declared by the reading stack.
pub type ImportSet = BTreeMap<String, String>;

/// Parameter name -> value, as declared by the writing stack.
pub type ExportSet = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "Create",
            Self::Update => "Update",
            Self::Delete => "Delete",
        })
    }
}

/// Lifecycle event delivered by the orchestration host to a custom resource
/// handler. Only `RequestType` and the two property bags drive behavior; the
/// remaining envelope fields are kept for logging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceRequest<P> {
    pub request_type: RequestType,
    pub resource_properties: P,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_resource_properties: Option<P>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_token: Option<String>,
    #[serde(
        rename = "ResponseURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub response_url: Option<String>,
}

impl<P> CustomResourceRequest<P> {
    pub fn new(request_type: RequestType, resource_properties: P) -> Self {
        Self {
            request_type,
            resource_properties,
            old_resource_properties: None,
            request_id: None,
            stack_id: None,
            logical_resource_id: None,
            physical_resource_id: None,
            resource_type: None,
            service_token: None,
            response_url: None,
        }
    }

    pub fn with_old_properties(mut self, old_resource_properties: P) -> Self {
        self.old_resource_properties = Some(old_resource_properties);
        self
    }

    /// Properties from before an update.
    pub fn prior_properties(&self) -> Result<&P, ValidationError> {
        self.old_resource_properties.as_ref().ok_or_else(|| {
            ValidationError::new(format!(
                "OldResourceProperties is required for {} requests",
                self.request_type
            ))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReaderResourceProperties {
    #[serde(rename = "ReaderProps")]
    pub reader_props: ReaderProps,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReaderProps {
    pub imports: ImportSet,
    pub prefix: String,
    pub region: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WriterResourceProperties {
    #[serde(rename = "WriterProps")]
    pub writer_props: WriterProps,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WriterProps {
    pub exports: ExportSet,
    pub region: String,
}

pub type ReaderRequest = CustomResourceRequest<ReaderResourceProperties>;
pub type WriterRequest = CustomResourceRequest<WriterResourceProperties>;

/// Output data returned to the host after a reader Create or Update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReaderResponse {
    #[serde(rename = "Data")]
    pub data: ImportSet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

pub fn parse_request<P: DeserializeOwned>(
    event: Value,
) -> Result<CustomResourceRequest<P>, ValidationError> {
    serde_json::from_value(event)
        .map_err(|error| ValidationError::new(format!("Malformed custom resource request: {error}")))
}

pub fn validate_reader_props(props: &ReaderProps) -> Result<(), ValidationError> {
    if props.prefix.trim().is_empty() {
        return Err(ValidationError::new("prefix cannot be empty"));
    }

    if props.region.trim().is_empty() {
        return Err(ValidationError::new("region cannot be empty"));
    }

    for (name, reference) in &props.imports {
        if reference.trim().is_empty() {
            return Err(ValidationError::new(format!(
                "Import '{name}' must reference a non-empty parameter name"
            )));
        }
    }

    Ok(())
}

pub fn validate_writer_props(props: &WriterProps) -> Result<(), ValidationError> {
    if props.region.trim().is_empty() {
        return Err(ValidationError::new("region cannot be empty"));
    }

    for name in props.exports.keys() {
        if !is_export_parameter(name) {
            return Err(ValidationError::new(format!(
                "Export '{name}' must be a parameter name under {EXPORT_PATH_PREFIX}"
            )));
        }
    }

    Ok(())
}
