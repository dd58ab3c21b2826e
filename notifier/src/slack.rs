//! Slack Web API client, channel existence check and message publishing.

use crate::config::{SecretToken, SlackConfig};
use crate::errors::{ChannelError, ChatApiError, PublishError};
use crate::message::{ChatMessage, PostMessageRequest};
use crate::metrics_defs::SLACK_POST_DURATION;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared::histogram;
use shared::retry::{RetryPolicy, retry};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::{Instant, timeout_at};
use url::Url;

const CHANNEL_PAGE_LIMIT: &str = "200";
const UNKNOWN_ERROR: &str = "unknown_error";
const DEADLINE_EXCEEDED: &str = "listing exceeded retry deadline";
const REPEATED_CURSOR: &str = "listing returned a repeated cursor";

/// Response of any Slack Web API method. Fields besides `ok` and `error` are
/// kept verbatim so the response can be returned and republished as-is.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatApiResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Direct-message conversations carry no name.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ChannelInfo {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ResponseMetadata {
    #[serde(default)]
    pub next_cursor: String,
}

/// One page of `conversations.list`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ChannelListPage {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub channels: Vec<ChannelInfo>,
    #[serde(default)]
    pub response_metadata: Option<ResponseMetadata>,
}

impl ChannelListPage {
    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().filter_map(|c| c.name.as_deref())
    }

    pub fn next_cursor(&self) -> Option<&str> {
        self.response_metadata
            .as_ref()
            .map(|m| m.next_cursor.as_str())
            .filter(|c| !c.is_empty())
    }
}

/// The two chat provider calls the relay needs.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn list_channels(&self, cursor: Option<&str>) -> Result<ChannelListPage, ChatApiError>;

    async fn post_message(
        &self,
        channel: &str,
        message: &ChatMessage,
    ) -> Result<ChatApiResponse, ChatApiError>;
}

pub struct SlackClient {
    client: reqwest::Client,
    token: SecretToken,
    channel_types: String,
    list_url: Url,
    post_url: Url,
}

impl SlackClient {
    pub fn new(config: &SlackConfig) -> Result<Self, ChatApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        // Url::join replaces the last path segment unless the base ends with a slash.
        let mut base_url = config.api_url.clone();
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        Ok(SlackClient {
            client,
            token: config.api_token.clone(),
            channel_types: config.channel_types.clone(),
            list_url: base_url.join("conversations.list")?,
            post_url: base_url.join("chat.postMessage")?,
        })
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ChatApiError> {
        match response.status() {
            status if status.is_success() => Ok(response.json::<T>().await?),
            status => Err(ChatApiError::Status(status)),
        }
    }
}

#[async_trait]
impl ChatApi for SlackClient {
    async fn list_channels(&self, cursor: Option<&str>) -> Result<ChannelListPage, ChatApiError> {
        let mut query = vec![
            ("types", self.channel_types.as_str()),
            ("exclude_archived", "true"),
            ("limit", CHANNEL_PAGE_LIMIT),
        ];
        if let Some(c) = cursor {
            query.push(("cursor", c));
        }

        let response = self
            .client
            .get(self.list_url.clone())
            .bearer_auth(self.token.expose())
            .query(&query)
            .send()
            .await?;

        Self::read_json(response).await
    }

    async fn post_message(
        &self,
        channel: &str,
        message: &ChatMessage,
    ) -> Result<ChatApiResponse, ChatApiError> {
        let response = self
            .client
            .post(self.post_url.clone())
            .bearer_auth(self.token.expose())
            .json(&PostMessageRequest { channel, message })
            .send()
            .await?;

        Self::read_json(response).await
    }
}

/// Confirms `channel` (canonical form) is visible to the provider credential.
///
/// Listing failures are retried under `policy`; a complete listing without the
/// channel fails immediately with `InvalidChannelName`. The page walk itself is
/// bounded by the same deadline as the retries.
pub async fn check_channel_exists(
    api: &dyn ChatApi,
    channel: &str,
    policy: &RetryPolicy,
) -> Result<(), ChannelError> {
    let deadline = Instant::now() + policy.max_elapsed();

    retry(
        policy,
        "slack.conversations_list",
        ChannelError::is_retryable,
        move || find_channel(api, channel, deadline),
    )
    .await
}

async fn find_channel(
    api: &dyn ChatApi,
    channel: &str,
    deadline: Instant,
) -> Result<(), ChannelError> {
    let mut cursor: Option<String> = None;
    let mut seen_cursors: HashSet<String> = HashSet::new();
    let mut pages = 0;

    loop {
        let page = timeout_at(deadline, api.list_channels(cursor.as_deref()))
            .await
            .map_err(|_| ChannelError::ChannelList(DEADLINE_EXCEEDED.into()))?
            .map_err(|e| ChannelError::ChannelList(e.to_string()))?;

        if !page.ok {
            return Err(ChannelError::ChannelList(
                page.error.unwrap_or_else(|| UNKNOWN_ERROR.into()),
            ));
        }
        pages += 1;

        if page.channel_names().any(|name| name == channel) {
            tracing::debug!(channel, pages, "channel found");
            return Ok(());
        }

        match page.next_cursor() {
            Some(next) if !seen_cursors.insert(next.to_string()) => {
                tracing::warn!(channel, pages, cursor = next, "channel list cursor repeated");
                return Err(ChannelError::ChannelList(REPEATED_CURSOR.into()));
            }
            Some(next) => cursor = Some(next.to_string()),
            None => break,
        }

        if Instant::now() >= deadline {
            return Err(ChannelError::ChannelList(DEADLINE_EXCEEDED.into()));
        }
    }

    tracing::warn!(channel, pages, "channel not found in channel list");
    Err(ChannelError::InvalidChannelName(channel.to_string()))
}

/// Posts `message` to `channel`, retrying transport failures and `ok: false`
/// responses under `policy`.
pub async fn publish_message(
    api: &dyn ChatApi,
    channel: &str,
    message: &ChatMessage,
    policy: &RetryPolicy,
) -> Result<ChatApiResponse, PublishError> {
    retry(
        policy,
        "slack.chat_post_message",
        PublishError::is_retryable,
        move || post_once(api, channel, message),
    )
    .await
}

async fn post_once(
    api: &dyn ChatApi,
    channel: &str,
    message: &ChatMessage,
) -> Result<ChatApiResponse, PublishError> {
    let started = Instant::now();
    let result = api.post_message(channel, message).await;
    histogram!(SLACK_POST_DURATION).record(started.elapsed().as_secs_f64());

    let response = result?;
    tracing::debug!(?response, "Slack response");

    if !response.ok {
        return Err(PublishError::Api(
            response.error.unwrap_or_else(|| UNKNOWN_ERROR.into()),
        ));
    }

    Ok(response)
}
