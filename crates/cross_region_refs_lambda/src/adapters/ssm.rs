use async_trait::async_trait;
use aws_sdk_ssm::error::DisplayErrorContext;
use aws_sdk_ssm::operation::get_parameter::GetParameterError;
use aws_sdk_ssm::operation::list_tags_for_resource::ListTagsForResourceError;
use aws_sdk_ssm::operation::remove_tags_from_resource::RemoveTagsFromResourceError;
use aws_sdk_ssm::types::{ParameterType, ResourceTypeForTagging, Tag};

use crate::adapters::parameters::{ParameterError, ParameterStore, ParameterTagger};

/// SSM Parameter Store client scoped to the region named by a request.
#[derive(Debug, Clone)]
pub struct SsmParameterStore {
    client: aws_sdk_ssm::Client,
}

impl SsmParameterStore {
    pub fn new(client: aws_sdk_ssm::Client) -> Self {
        Self { client }
    }

    pub async fn for_region(region: &str, endpoint_url: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()));
        if let Some(url) = endpoint_url {
            loader = loader.endpoint_url(url);
        }
        let aws_config = loader.load().await;
        Self::new(aws_sdk_ssm::Client::new(&aws_config))
    }
}

#[async_trait]
impl ParameterTagger for SsmParameterStore {
    async fn add_tag(
        &self,
        parameter_name: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ParameterError> {
        let tag = Tag::builder()
            .key(key)
            .value(value)
            .build()
            .map_err(|error| ParameterError::Remote(format!("invalid tag: {error}")))?;

        self.client
            .add_tags_to_resource()
            .resource_type(ResourceTypeForTagging::Parameter)
            .resource_id(parameter_name)
            .tags(tag)
            .send()
            .await
            .map(|_| ())
            .map_err(|error| ParameterError::Remote(DisplayErrorContext(&error).to_string()))
    }

    async fn remove_tag(&self, parameter_name: &str, key: &str) -> Result<(), ParameterError> {
        match self
            .client
            .remove_tags_from_resource()
            .resource_type(ResourceTypeForTagging::Parameter)
            .resource_id(parameter_name)
            .tag_keys(key)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(error)
                if matches!(
                    error.as_service_error(),
                    Some(RemoveTagsFromResourceError::InvalidResourceId(_))
                ) =>
            {
                Err(ParameterError::AlreadyAbsent)
            }
            Err(error) => Err(ParameterError::Remote(
                DisplayErrorContext(&error).to_string(),
            )),
        }
    }
}

#[async_trait]
impl ParameterStore for SsmParameterStore {
    async fn parameter_exists(&self, name: &str) -> Result<bool, ParameterError> {
        match self.client.get_parameter().name(name).send().await {
            Ok(_) => Ok(true),
            Err(error)
                if matches!(
                    error.as_service_error(),
                    Some(GetParameterError::ParameterNotFound(_))
                ) =>
            {
                Ok(false)
            }
            Err(error) => Err(ParameterError::Remote(
                DisplayErrorContext(&error).to_string(),
            )),
        }
    }

    async fn put_parameter(&self, name: &str, value: &str) -> Result<(), ParameterError> {
        self.client
            .put_parameter()
            .name(name)
            .value(value)
            .r#type(ParameterType::String)
            .send()
            .await
            .map(|_| ())
            .map_err(|error| ParameterError::Remote(DisplayErrorContext(&error).to_string()))
    }

    async fn delete_parameters(&self, names: &[String]) -> Result<(), ParameterError> {
        if names.is_empty() {
            return Ok(());
        }

        self.client
            .delete_parameters()
            .set_names(Some(names.to_vec()))
            .send()
            .await
            .map(|_| ())
            .map_err(|error| ParameterError::Remote(DisplayErrorContext(&error).to_string()))
    }

    async fn list_tag_keys(&self, name: &str) -> Result<Vec<String>, ParameterError> {
        match self
            .client
            .list_tags_for_resource()
            .resource_type(ResourceTypeForTagging::Parameter)
            .resource_id(name)
            .send()
            .await
        {
            Ok(output) => Ok(output
                .tag_list()
                .iter()
                .map(|tag| tag.key().to_string())
                .collect()),
            Err(error)
                if matches!(
                    error.as_service_error(),
                    Some(ListTagsForResourceError::InvalidResourceId(_))
                ) =>
            {
                Err(ParameterError::AlreadyAbsent)
            }
            Err(error) => Err(ParameterError::Remote(
                DisplayErrorContext(&error).to_string(),
            )),
        }
    }
}
