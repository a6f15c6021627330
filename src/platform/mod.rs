pub mod telegram;

use std::fmt;

use serde::Deserialize;
use teloxide::types::{ChatId, Recipient};

use crate::error::RelayError;

/// Chat identifier as sent by the transport: numeric for users and groups,
/// textual for public channels (`@channel`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ChatIdentifier {
    Id(i64),
    Username(String),
}

impl ChatIdentifier {
    /// Parse a configured identifier. Numeric text becomes an `Id`.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse::<i64>() {
            Ok(id) => ChatIdentifier::Id(id),
            Err(_) => ChatIdentifier::Username(raw.to_string()),
        }
    }
}

impl fmt::Display for ChatIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatIdentifier::Id(id) => write!(f, "{}", id),
            ChatIdentifier::Username(name) => write!(f, "{}", name),
        }
    }
}

impl From<&ChatIdentifier> for Recipient {
    fn from(chat: &ChatIdentifier) -> Self {
        match chat {
            ChatIdentifier::Id(id) => Recipient::Id(ChatId(*id)),
            ChatIdentifier::Username(name) => match name.parse::<i64>() {
                Ok(id) => Recipient::Id(ChatId(id)),
                Err(_) => Recipient::ChannelUsername(name.clone()),
            },
        }
    }
}

/// A message received through the webhook, reduced to what the relay uses.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMessage {
    pub chat_id: ChatIdentifier,
    /// Raw text as received, entities included
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct RawUpdate {
    message: Option<RawMessage>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    chat: Option<RawChat>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawChat {
    id: Option<ChatIdentifier>,
}

impl IncomingMessage {
    /// Extract `message.chat.id` and `message.text` from an update body.
    pub fn from_update_json(body: &[u8]) -> Result<Self, RelayError> {
        let update: RawUpdate = serde_json::from_slice(body)
            .map_err(|e| RelayError::MalformedUpdate(format!("invalid JSON: {}", e)))?;

        let message = update
            .message
            .ok_or_else(|| RelayError::MalformedUpdate("missing message".into()))?;
        let chat_id = message
            .chat
            .and_then(|c| c.id)
            .ok_or_else(|| RelayError::MalformedUpdate("missing message.chat.id".into()))?;
        let text = message
            .text
            .ok_or_else(|| RelayError::MalformedUpdate("missing message.text".into()))?;

        Ok(Self { chat_id, text })
    }
}
