use crate::errors::{ChatApiError, TopicPublishError};
use crate::message::ChatMessage;
use crate::slack::{ChannelInfo, ChannelListPage, ChatApi, ChatApiResponse, ResponseMetadata};
use crate::sns::{TopicPublishResult, TopicPublisher};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::sync::Mutex;

pub fn sns_event(message: &str) -> Value {
    json!({
        "Records": [{
            "EventSource": "aws:sns",
            "Sns": {
                "MessageId": "95df01b4-ee98-5cb9-9903-4c221d41eb5e",
                "TopicArn": "arn:aws:sns:us-east-1:000000000000:slack-notify",
                "Message": message
            }
        }]
    })
}

pub fn channel_page(names: &[&str], next_cursor: Option<&str>) -> ChannelListPage {
    ChannelListPage {
        ok: true,
        error: None,
        channels: names
            .iter()
            .map(|name| ChannelInfo {
                name: Some(name.to_string()),
            })
            .collect(),
        response_metadata: next_cursor.map(|c| ResponseMetadata {
            next_cursor: c.to_string(),
        }),
    }
}

pub fn failed_page(error: &str) -> ChannelListPage {
    ChannelListPage {
        ok: false,
        error: Some(error.to_string()),
        channels: vec![],
        response_metadata: None,
    }
}

pub fn ok_response() -> ChatApiResponse {
    serde_json::from_value(json!({
        "ok": true,
        "channel": "C0123456789",
        "ts": "1503435956.000247",
        "message": {"text": "hello", "type": "message"}
    }))
    .unwrap()
}

pub fn error_response(error: &str) -> ChatApiResponse {
    serde_json::from_value(json!({"ok": false, "error": error})).unwrap()
}

#[derive(Clone)]
pub enum ListOutcome {
    Page(ChannelListPage),
    Status(StatusCode),
}

#[derive(Clone)]
pub enum PostOutcome {
    Response(ChatApiResponse),
    Status(StatusCode),
}

/// Next scripted outcome; the final one repeats forever.
fn next_outcome<T: Clone>(script: &Mutex<Vec<T>>) -> T {
    let mut script = script.lock().unwrap();
    if script.len() > 1 {
        script.remove(0)
    } else {
        script[0].clone()
    }
}

pub struct FakeChatApi {
    list_script: Mutex<Vec<ListOutcome>>,
    post_script: Mutex<Vec<PostOutcome>>,
    pub list_cursors: Mutex<Vec<Option<String>>>,
    pub posted: Mutex<Vec<(String, ChatMessage)>>,
}

impl FakeChatApi {
    pub fn new(list_script: Vec<ListOutcome>, post_script: Vec<PostOutcome>) -> Self {
        FakeChatApi {
            list_script: Mutex::new(list_script),
            post_script: Mutex::new(post_script),
            list_cursors: Mutex::new(vec![]),
            posted: Mutex::new(vec![]),
        }
    }

    /// Lists `channels` in one page and accepts every post.
    pub fn with_channels(channels: &[&str]) -> Self {
        Self::new(
            vec![ListOutcome::Page(channel_page(channels, None))],
            vec![PostOutcome::Response(ok_response())],
        )
    }

    pub fn list_calls(&self) -> usize {
        self.list_cursors.lock().unwrap().len()
    }

    pub fn post_calls(&self) -> usize {
        self.posted.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatApi for FakeChatApi {
    async fn list_channels(&self, cursor: Option<&str>) -> Result<ChannelListPage, ChatApiError> {
        self.list_cursors
            .lock()
            .unwrap()
            .push(cursor.map(String::from));
        match next_outcome(&self.list_script) {
            ListOutcome::Page(page) => Ok(page),
            ListOutcome::Status(status) => Err(ChatApiError::Status(status)),
        }
    }

    async fn post_message(
        &self,
        channel: &str,
        message: &ChatMessage,
    ) -> Result<ChatApiResponse, ChatApiError> {
        self.posted
            .lock()
            .unwrap()
            .push((channel.to_string(), message.clone()));
        match next_outcome(&self.post_script) {
            PostOutcome::Response(response) => Ok(response),
            PostOutcome::Status(status) => Err(ChatApiError::Status(status)),
        }
    }
}

pub struct FakeTopicPublisher {
    failures_before_success: Mutex<usize>,
    pub published: Mutex<Vec<(String, String)>>,
}

impl FakeTopicPublisher {
    pub fn new(failures_before_success: usize) -> Self {
        FakeTopicPublisher {
            failures_before_success: Mutex::new(failures_before_success),
            published: Mutex::new(vec![]),
        }
    }

    pub fn calls(&self) -> usize {
        self.published.lock().unwrap().len()
    }
}

#[async_trait]
impl TopicPublisher for FakeTopicPublisher {
    async fn publish(
        &self,
        topic_arn: &str,
        message: String,
    ) -> Result<TopicPublishResult, TopicPublishError> {
        self.published
            .lock()
            .unwrap()
            .push((topic_arn.to_string(), message));

        let mut remaining = self.failures_before_success.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(TopicPublishError::Sdk("Throttling: Rate exceeded".into()));
        }

        Ok(TopicPublishResult {
            message_id: Some("1b2e3a4c-0000-0000-0000-000000000000".into()),
            sequence_number: None,
            response_metadata: crate::sns::ResponseMetadata {
                request_id: Some("f187a3c1-376f-11df-8963-01868b7c937a".into()),
            },
        })
    }
}
