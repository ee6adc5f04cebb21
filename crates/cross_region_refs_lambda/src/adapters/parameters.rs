use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    /// The parameter no longer exists (the remote "invalid resource id" case).
    #[error("parameter does not exist")]
    AlreadyAbsent,
    #[error("{0}")]
    Remote(String),
}

/// Tagging surface used by readers. One parameter per call.
#[async_trait]
pub trait ParameterTagger: Send + Sync {
    async fn add_tag(&self, parameter_name: &str, key: &str, value: &str)
        -> Result<(), ParameterError>;

    async fn remove_tag(&self, parameter_name: &str, key: &str) -> Result<(), ParameterError>;
}

/// Parameter ownership surface used by writers.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    async fn parameter_exists(&self, name: &str) -> Result<bool, ParameterError>;

    async fn put_parameter(&self, name: &str, value: &str) -> Result<(), ParameterError>;

    /// Deletes up to ten parameters. Names that do not exist are ignored.
    async fn delete_parameters(&self, names: &[String]) -> Result<(), ParameterError>;

    async fn list_tag_keys(&self, name: &str) -> Result<Vec<String>, ParameterError>;
}
