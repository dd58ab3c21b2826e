//! The per-event pipeline: extract, validate, check the channel, post, and
//! optionally republish the Slack response.

use crate::channel::normalize_channel_name;
use crate::config::{Config, ValidationError};
use crate::envelope::{InboundEnvelope, extract_message};
use crate::errors::{RelayError, SetupError};
use crate::message::ChatMessage;
use crate::metrics_defs::{ERROR, INVOCATION};
use crate::schema::parse_message;
use crate::slack::{ChatApi, ChatApiResponse, SlackClient, check_channel_exists, publish_message};
use crate::sns::{SnsPublisher, TopicPublishResult, TopicPublisher, republish};
use serde::Serialize;
use shared::counter;
use shared::retry::RetryPolicy;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub enum Status {
    #[serde(rename = "OK")]
    Ok,
}

/// Value returned to the host for a successful invocation.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct InvocationResult {
    pub slack_response: ChatApiResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sns_response: Option<TopicPublishResult>,
    pub status: Status,
}

struct ResponseTopic {
    publisher: Arc<dyn TopicPublisher>,
    topic_arn: String,
}

pub struct Relay {
    chat: Arc<dyn ChatApi>,
    response_topic: Option<ResponseTopic>,
    channel: String,
    retry: RetryPolicy,
}

impl Relay {
    /// `topic` is only used when response republishing is enabled in `config`,
    /// and is required then.
    pub fn new(
        config: &Config,
        chat: Arc<dyn ChatApi>,
        topic: Option<Arc<dyn TopicPublisher>>,
    ) -> Result<Self, ValidationError> {
        let response_topic = if config.sns.publish_response {
            let topic_arn = config
                .sns
                .topic_arn
                .clone()
                .ok_or(ValidationError::MissingTopic)?;
            let publisher = topic.ok_or(ValidationError::MissingTopicPublisher)?;
            Some(ResponseTopic {
                publisher,
                topic_arn,
            })
        } else {
            None
        };

        Ok(Relay {
            chat,
            response_topic,
            channel: normalize_channel_name(&config.slack.default_channel).to_string(),
            retry: config.retry.clone(),
        })
    }

    /// Builds the Slack client and, when republishing is enabled, the SNS client.
    pub async fn from_config(config: &Config) -> Result<Self, SetupError> {
        let chat: Arc<dyn ChatApi> = Arc::new(SlackClient::new(&config.slack)?);

        let topic: Option<Arc<dyn TopicPublisher>> = if config.sns.publish_response {
            Some(Arc::new(SnsPublisher::new(&config.sns).await))
        } else {
            None
        };

        Ok(Relay::new(config, chat, topic)?)
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Runs one invocation for a raw event payload.
    pub async fn handle_raw(&self, event: &[u8]) -> Result<InvocationResult, RelayError> {
        match InboundEnvelope::from_slice(event) {
            Ok(envelope) => self.handle(&envelope).await,
            Err(e) => record_outcome(Err(e.into())),
        }
    }

    /// Runs one invocation. The first failing step aborts the rest.
    pub async fn handle(&self, envelope: &InboundEnvelope) -> Result<InvocationResult, RelayError> {
        record_outcome(self.run(envelope).await)
    }

    async fn run(&self, envelope: &InboundEnvelope) -> Result<InvocationResult, RelayError> {
        let message = prepare_message(envelope)?;

        check_channel_exists(self.chat.as_ref(), &self.channel, &self.retry).await?;

        let slack_response =
            publish_message(self.chat.as_ref(), &self.channel, &message, &self.retry).await?;

        let sns_response = match &self.response_topic {
            Some(topic) => Some(
                republish(
                    topic.publisher.as_ref(),
                    &topic.topic_arn,
                    &slack_response,
                    &self.retry,
                )
                .await?,
            ),
            None => None,
        };

        let result = InvocationResult {
            slack_response,
            sns_response,
            status: Status::Ok,
        };
        tracing::debug!(?result, "invocation complete");

        Ok(result)
    }
}

/// Extracts and validates the message without touching the network.
pub fn prepare_message(envelope: &InboundEnvelope) -> Result<ChatMessage, RelayError> {
    let candidate = extract_message(envelope)?;
    Ok(parse_message(candidate)?)
}

fn record_outcome(
    result: Result<InvocationResult, RelayError>,
) -> Result<InvocationResult, RelayError> {
    match &result {
        Ok(_) => {
            counter!(INVOCATION, "outcome" => "ok").increment(1);
        }
        Err(e) => {
            tracing::error!(kind = e.kind(), error = %e, "invocation failed");
            counter!(INVOCATION, "outcome" => "error").increment(1);
            counter!(ERROR, "kind" => e.kind()).increment(1);
        }
    }
    result
}
