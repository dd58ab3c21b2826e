//! Republishing of Slack responses to an SNS topic.

use crate::config::SnsConfig;
use crate::errors::TopicPublishError;
use crate::metrics_defs::SNS_PUBLISH_DURATION;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sns::Client;
use aws_sdk_sns::config::retry::RetryConfig;
use aws_sdk_sns::error::DisplayErrorContext;
use aws_sdk_sns::operation::RequestId;
use serde::Serialize;
use shared::histogram;
use shared::retry::{RetryPolicy, retry};
use tokio::time::Instant;

/// Acknowledgment of a topic publish.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct TopicPublishResult {
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<String>,
    pub response_metadata: ResponseMetadata,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ResponseMetadata {
    pub request_id: Option<String>,
}

#[async_trait]
pub trait TopicPublisher: Send + Sync {
    async fn publish(
        &self,
        topic_arn: &str,
        message: String,
    ) -> Result<TopicPublishResult, TopicPublishError>;
}

pub struct SnsPublisher {
    client: Client,
}

impl SnsPublisher {
    /// Builds a client from the default AWS credential chain, with optional
    /// region and endpoint overrides.
    pub async fn new(config: &SnsConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let shared_config = loader.load().await;

        // Retries are driven by the relay's own policy.
        let sns_config = aws_sdk_sns::config::Builder::from(&shared_config)
            .retry_config(RetryConfig::disabled())
            .build();

        SnsPublisher {
            client: Client::from_conf(sns_config),
        }
    }

    pub fn from_client(client: Client) -> Self {
        SnsPublisher { client }
    }
}

#[async_trait]
impl TopicPublisher for SnsPublisher {
    async fn publish(
        &self,
        topic_arn: &str,
        message: String,
    ) -> Result<TopicPublishResult, TopicPublishError> {
        let output = self
            .client
            .publish()
            .topic_arn(topic_arn)
            .message(message)
            .send()
            .await
            .map_err(|e| TopicPublishError::Sdk(DisplayErrorContext(&e).to_string()))?;

        Ok(TopicPublishResult {
            message_id: output.message_id().map(String::from),
            sequence_number: output.sequence_number().map(String::from),
            response_metadata: ResponseMetadata {
                request_id: output.request_id().map(String::from),
            },
        })
    }
}

/// Serializes `payload` as JSON and publishes it to `topic_arn`, retrying
/// publish failures under `policy`.
pub async fn republish<T: Serialize>(
    publisher: &dyn TopicPublisher,
    topic_arn: &str,
    payload: &T,
    policy: &RetryPolicy,
) -> Result<TopicPublishResult, TopicPublishError> {
    let message = serde_json::to_string(payload)?;

    let result = retry(
        policy,
        "sns.publish",
        TopicPublishError::is_retryable,
        move || publish_once(publisher, topic_arn, message.clone()),
    )
    .await?;

    tracing::debug!(?result, "SNS response");
    Ok(result)
}

async fn publish_once(
    publisher: &dyn TopicPublisher,
    topic_arn: &str,
    message: String,
) -> Result<TopicPublishResult, TopicPublishError> {
    let started = Instant::now();
    let result = publisher.publish(topic_arn, message).await;
    histogram!(SNS_PUBLISH_DURATION).record(started.elapsed().as_secs_f64());
    result
}
