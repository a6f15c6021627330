use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::auth::AllowList;
use crate::error::RelayError;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub completion: CompletionConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub allowed_chat_ids: AllowListSetting,
    /// Bot API host, e.g. a local Bot API server. Defaults to api.telegram.org.
    #[serde(default)]
    pub api_url: Option<String>,
}

/// The allow-list as written by an admin: either one comma-separated string
/// or an array of ids (numbers or strings).
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum AllowListSetting {
    Text(String),
    List(Vec<toml::Value>),
}

impl Default for AllowListSetting {
    fn default() -> Self {
        AllowListSetting::List(Vec::new())
    }
}

impl AllowListSetting {
    pub fn to_allow_list(&self) -> AllowList {
        match self {
            AllowListSetting::Text(text) => AllowList::parse(text),
            AllowListSetting::List(items) => AllowList::from_entries(items.iter().filter_map(
                |v| match v {
                    toml::Value::String(s) => Some(s.clone()),
                    toml::Value::Integer(i) => Some(i.to_string()),
                    // Anything else is not a chat id
                    _ => None,
                },
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_completion_base_url")]
    pub base_url: String,
    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
}

/// What to do when one chunk of a split reply fails to send.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChunkFailurePolicy {
    /// Stop at the first failed chunk and report it.
    #[default]
    Stop,
    /// Log the failure and keep sending the remaining chunks.
    SkipAndContinue,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeliveryConfig {
    #[serde(default)]
    pub chunk_failure_policy: ChunkFailurePolicy,
    /// Skip sending when the completion produced no text.
    #[serde(default)]
    pub suppress_empty_replies: bool,
    #[serde(default = "default_delivery_timeout")]
    pub timeout_secs: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            chunk_failure_policy: ChunkFailurePolicy::default(),
            suppress_empty_replies: false,
            timeout_secs: default_delivery_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Public base URL Telegram uses to reach this server (needed by `activate`).
    #[serde(default)]
    pub public_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            namespace: default_namespace(),
            public_url: None,
        }
    }
}

impl ServerConfig {
    /// Path of the webhook route, e.g. `/relaybot/v1/telegram-webhook`.
    pub fn webhook_path(&self) -> String {
        let namespace = self.namespace.trim_matches('/');
        if namespace.is_empty() {
            "/telegram-webhook".to_string()
        } else {
            format!("/{}/telegram-webhook", namespace)
        }
    }

    /// Full public webhook URL, if a public base URL is configured.
    pub fn webhook_url(&self) -> Option<String> {
        self.public_url
            .as_deref()
            .map(|base| format!("{}{}", base.trim_end_matches('/'), self.webhook_path()))
    }
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_completion_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_completion_timeout() -> u64 {
    60
}

fn default_max_prompt_chars() -> usize {
    2000
}

fn default_delivery_timeout() -> u64 {
    30
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_namespace() -> String {
    "relaybot/v1".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Fail fast on missing credentials rather than sending requests with empty ones.
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(RelayError::ConfigurationMissing("telegram.bot_token"));
        }
        if self.completion.api_key.trim().is_empty() {
            return Err(RelayError::ConfigurationMissing("completion.api_key"));
        }
        if self.allow_list().is_empty() {
            return Err(RelayError::ConfigurationMissing("telegram.allowed_chat_ids"));
        }
        Ok(())
    }

    pub fn allow_list(&self) -> AllowList {
        self.telegram.allowed_chat_ids.to_allow_list()
    }
}
