use crate::config::ValidationError;
use thiserror::Error;

/// Failures talking to the chat provider below the API level: the request
/// never produced a decodable API response.
#[derive(Error, Debug)]
pub enum ChatApiError {
    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("unexpected HTTP status: {0}")]
    Status(reqwest::StatusCode),

    #[error("invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("malformed envelope: no records")]
    NoRecords,

    #[error("malformed envelope: {0}")]
    InvalidEnvelope(serde_json::Error),

    #[error("malformed envelope: message is not valid JSON: {0}")]
    InvalidPayload(serde_json::Error),
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("message failed schema validation: {message}")]
pub struct SchemaValidationError {
    pub message: String,
}

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("could not list channels: {0}")]
    ChannelList(String),

    #[error("channel not found: {0}")]
    InvalidChannelName(String),
}

impl ChannelError {
    /// A missing channel is a configuration problem; only listing failures are transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChannelError::ChannelList(_))
    }
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("chat.postMessage returned error: {0}")]
    Api(String),

    #[error("chat.postMessage request failed: {0}")]
    Transport(#[from] ChatApiError),
}

impl PublishError {
    pub fn is_retryable(&self) -> bool {
        true
    }
}

#[derive(Error, Debug)]
pub enum TopicPublishError {
    #[error("could not serialize topic message: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("topic publish failed: {0}")]
    Sdk(String),
}

impl TopicPublishError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, TopicPublishError::Sdk(_))
    }
}

/// Failures building a [`crate::Relay`] before any event is handled.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("could not build Slack client: {0}")]
    Client(#[from] ChatApiError),

    #[error("invalid relay config: {0}")]
    Config(#[from] ValidationError),
}

/// Every way a single relay invocation can fail.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error(transparent)]
    MalformedEnvelope(#[from] EnvelopeError),

    #[error(transparent)]
    SchemaValidation(#[from] SchemaValidationError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    TopicPublish(#[from] TopicPublishError),
}

impl RelayError {
    /// Name of the failure class, used for metrics and the host's failure report.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::MalformedEnvelope(_) => "MalformedEnvelopeError",
            RelayError::SchemaValidation(_) => "SchemaValidationError",
            RelayError::Channel(ChannelError::ChannelList(_)) => "ChannelListError",
            RelayError::Channel(ChannelError::InvalidChannelName(_)) => "InvalidChannelNameError",
            RelayError::Publish(_) => "PublishError",
            RelayError::TopicPublish(_) => "TopicPublishError",
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            RelayError::MalformedEnvelope(_) | RelayError::SchemaValidation(_) => false,
            RelayError::Channel(e) => e.is_retryable(),
            RelayError::Publish(e) => e.is_retryable(),
            RelayError::TopicPublish(e) => e.is_retryable(),
        }
    }
}
