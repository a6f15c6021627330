//! In-process fakes for the completion and chat transport seams.

use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use wiremock::matchers::{path_regex, PathRegexMatcher};

use crate::config::{AllowListSetting, TelegramConfig};
use crate::llm::{build_prompt, CompletionResult, CompletionService};
use crate::platform::telegram::{ChatTransport, TeloxideTransport};
use crate::platform::ChatIdentifier;

/// Records every send; fails the calls whose 1-based numbers are listed.
/// Empty text is refused the way the Bot API refuses it.
#[derive(Default)]
pub struct RecordingTransport {
    fail_on: Vec<usize>,
    attempts: Mutex<usize>,
    sent: Mutex<Vec<(ChatIdentifier, String)>>,
    webhooks: Mutex<Vec<Option<String>>>,
}

impl RecordingTransport {
    pub fn failing_on(calls: &[usize]) -> Self {
        Self {
            fail_on: calls.to_vec(),
            ..Default::default()
        }
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }

    pub fn sent(&self) -> Vec<(ChatIdentifier, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn webhooks(&self) -> Vec<Option<String>> {
        self.webhooks.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_text(&self, chat: &ChatIdentifier, text: &str) -> Result<()> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            *attempts += 1;
            *attempts
        };
        if self.fail_on.contains(&attempt) {
            bail!("simulated send failure on call {}", attempt);
        }
        if text.is_empty() {
            bail!("Bad Request: message text is empty");
        }
        self.sent
            .lock()
            .unwrap()
            .push((chat.clone(), text.to_string()));
        Ok(())
    }

    async fn set_webhook(&self, url: &str) -> Result<()> {
        self.webhooks.lock().unwrap().push(Some(url.to_string()));
        Ok(())
    }

    async fn clear_webhook(&self) -> Result<()> {
        self.webhooks.lock().unwrap().push(None);
        Ok(())
    }
}

/// Completion fake that records the prompt it would have sent.
pub struct ScriptedCompletion {
    result: CompletionResult,
    max_chars: usize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn replying(text: &str) -> Self {
        Self::with_result(CompletionResult::Text(text.to_string()))
    }

    pub fn with_result(result: CompletionResult) -> Self {
        Self {
            result,
            max_chars: 2000,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, message: &str) -> CompletionResult {
        self.prompts
            .lock()
            .unwrap()
            .push(build_prompt(message, self.max_chars));
        self.result.clone()
    }
}

/// Token used when pointing a real transport at a mock Bot API.
pub const TEST_BOT_TOKEN: &str = "123:abc";

/// Teloxide transport talking to the Bot API at `api_url`.
pub fn bot_api_transport(api_url: &str, timeout_secs: u64) -> TeloxideTransport {
    let config = TelegramConfig {
        bot_token: TEST_BOT_TOKEN.to_string(),
        allowed_chat_ids: AllowListSetting::Text("42".into()),
        api_url: Some(api_url.to_string()),
    };
    TeloxideTransport::new(&config, timeout_secs).unwrap()
}

/// Path matcher for a Bot API method. Teloxide capitalises method names.
pub fn bot_method(name: &str) -> PathRegexMatcher {
    path_regex(format!("(?i)^/bot{}/{}$", TEST_BOT_TOKEN, name))
}

/// Bot API reply to a successful sendMessage.
pub fn sent_message_body(chat_id: i64, text: &str) -> serde_json::Value {
    serde_json::json!({
        "ok": true,
        "result": {
            "message_id": 1,
            "date": 1700000000,
            "chat": {"id": chat_id, "type": "private", "first_name": "Jane"},
            "from": {"id": 1, "is_bot": true, "first_name": "relaybot", "username": "relay_bot"},
            "text": text
        }
    })
}

/// Bot API refusal of an empty sendMessage.
pub fn empty_text_error_body() -> serde_json::Value {
    serde_json::json!({
        "ok": false,
        "error_code": 400,
        "description": "Bad Request: message text is empty"
    })
}
