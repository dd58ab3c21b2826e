//! Chat message payload types.
//!
//! Only the properties covered by the message schema are modelled; anything
//! else an already-shaped Slack payload carries is kept in `extra` and sent
//! unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Attachment {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<Field>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Field {
    pub title: String,
    pub value: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatMessage {
    pub fn new<S: Into<String>>(text: S) -> Self {
        ChatMessage {
            text: text.into(),
            attachments: None,
            extra: Map::new(),
        }
    }
}

/// Body of a `chat.postMessage` call: the message plus its destination.
#[derive(Serialize, Debug)]
pub struct PostMessageRequest<'a> {
    pub channel: &'a str,
    #[serde(flatten)]
    pub message: &'a ChatMessage,
}
