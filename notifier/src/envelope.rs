//! The SNS event envelope and extraction of the embedded chat message.

use crate::errors::EnvelopeError;
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize, Debug, Clone)]
pub struct InboundEnvelope {
    #[serde(rename = "Records", default)]
    pub records: Vec<Record>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Record {
    #[serde(rename = "Sns")]
    pub sns: SnsNotification,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct SnsNotification {
    pub message: String,
    pub message_id: Option<String>,
    pub topic_arn: Option<String>,
    pub subject: Option<String>,
    pub timestamp: Option<String>,
}

impl InboundEnvelope {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        serde_json::from_slice(bytes).map_err(EnvelopeError::InvalidEnvelope)
    }

    pub fn from_value(value: Value) -> Result<Self, EnvelopeError> {
        serde_json::from_value(value).map_err(EnvelopeError::InvalidEnvelope)
    }

    /// The notification this invocation acts on. Any further records are ignored.
    pub fn first(&self) -> Result<&SnsNotification, EnvelopeError> {
        self.records
            .first()
            .map(|record| &record.sns)
            .ok_or(EnvelopeError::NoRecords)
    }
}

/// Parses the first record's message body as JSON.
pub fn extract_message(envelope: &InboundEnvelope) -> Result<Value, EnvelopeError> {
    let notification = envelope.first()?;
    tracing::debug!(
        message_id = notification.message_id.as_deref(),
        topic_arn = notification.topic_arn.as_deref(),
        records = envelope.records.len(),
        "extracting message from envelope"
    );
    serde_json::from_str(&notification.message).map_err(EnvelopeError::InvalidPayload)
}
