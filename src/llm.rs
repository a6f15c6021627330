use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::config::CompletionConfig;
use crate::sanitize::{escape, sanitize};

/// Prompt sent instead of an empty message.
pub const EMPTY_MESSAGE_PROMPT: &str = "Reply saying that the message is empty";

/// Outcome of one completion call.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionResult {
    /// Generated text. Empty when the response had no usable content.
    Text(String),
    /// The request never produced a response.
    Failure(String),
}

impl CompletionResult {
    /// Text to relay back to the chat. A failure relays nothing.
    pub fn into_reply(self) -> String {
        match self {
            CompletionResult::Text(text) => text,
            CompletionResult::Failure(_) => String::new(),
        }
    }
}

/// Something that turns a user message into a reply.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, message: &str) -> CompletionResult;
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

/// Decode, bound and escape a raw message into the prompt text.
///
/// Empty and oversized messages are replaced by an instruction asking the
/// model to tell the user what went wrong.
pub fn build_prompt(raw: &str, max_chars: usize) -> String {
    let message = sanitize(raw);

    // A lone "0" counts as empty too
    let message = if message.is_empty() || message == "0" {
        EMPTY_MESSAGE_PROMPT.to_string()
    } else if message.chars().count() > max_chars {
        too_long_prompt(max_chars)
    } else {
        message
    };

    escape(&message)
}

/// Prompt sent instead of a message over the length limit.
pub fn too_long_prompt(max_chars: usize) -> String {
    format!("Reply saying that max characters is {}", max_chars)
}

/// Pull `choices[0].message.content` out of a response body.
/// Anything that does not have that shape yields an empty reply.
pub fn extract_reply(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/choices/0/message/content")
                .and_then(|c| c.as_str())
                .map(str::to_string)
        })
        .unwrap_or_default()
}

/// OpenAI-compatible chat completion client.
pub struct LlmClient {
    client: reqwest::Client,
    config: CompletionConfig,
}

impl LlmClient {
    pub fn new(config: CompletionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build completion HTTP client")?;
        Ok(Self { client, config })
    }

    async fn send(&self, prompt: String) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        debug!("Sending completion request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send completion request")?;

        let status = response.status();
        if !status.is_success() {
            // Body is still parsed; an error payload simply has no content
            warn!("Completion API returned status {}", status);
        }

        response
            .text()
            .await
            .context("Failed to read completion response")
    }
}

#[async_trait]
impl CompletionService for LlmClient {
    async fn complete(&self, message: &str) -> CompletionResult {
        let prompt = build_prompt(message, self.config.max_prompt_chars);

        match self.send(prompt).await {
            Ok(body) => {
                let reply = extract_reply(&body);
                if reply.is_empty() {
                    warn!("Completion response had no message content");
                }
                CompletionResult::Text(reply)
            }
            Err(e) => {
                error!("Completion API request failed: {:#}", e);
                CompletionResult::Failure(format!("{:#}", e))
            }
        }
    }
}
