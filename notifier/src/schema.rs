//! Structural validation of inbound chat messages.

use crate::errors::SchemaValidationError;
use crate::message::ChatMessage;
use jsonschema::Validator;
use serde_json::Value;
use std::sync::LazyLock;

/// JSON Schema for the chat messages this relay accepts.
pub const MESSAGE_SCHEMA: &str = r#"{
    "$schema": "https://json-schema.org/draft/2020-12/schema",
    "type": "object",
    "required": ["text"],
    "properties": {
        "text": {"type": "string"},
        "attachments": {
            "type": "array",
            "items": {
                "type": "object",
                "required": ["text"],
                "properties": {
                    "text": {"type": "string"},
                    "fields": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["title", "value"],
                            "properties": {
                                "title": {"type": "string"},
                                "value": {"type": "string"}
                            }
                        }
                    }
                }
            }
        }
    }
}"#;

// Keys the relay sets itself on the outgoing request.
const RESERVED_KEYS: &[&str] = &["channel", "token"];

static VALIDATOR: LazyLock<Validator> = LazyLock::new(|| {
    let schema: Value = serde_json::from_str(MESSAGE_SCHEMA).expect("message schema is valid JSON");
    jsonschema::validator_for(&schema).expect("message schema compiles")
});

/// Checks `candidate` against [`MESSAGE_SCHEMA`], reporting every violation.
pub fn validate(candidate: &Value) -> Result<(), SchemaValidationError> {
    let errors: Vec<String> = VALIDATOR
        .iter_errors(candidate)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if !errors.is_empty() {
        return Err(SchemaValidationError {
            message: errors.join("; "),
        });
    }

    Ok(())
}

/// Validates and converts a candidate into a typed message.
pub fn parse_message(candidate: Value) -> Result<ChatMessage, SchemaValidationError> {
    validate(&candidate)?;

    let mut message: ChatMessage =
        serde_json::from_value(candidate).map_err(|e| SchemaValidationError {
            message: e.to_string(),
        })?;

    for key in RESERVED_KEYS {
        if message.extra.remove(*key).is_some() {
            tracing::debug!(key, "dropping reserved key from message");
        }
    }

    Ok(message)
}
