use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::Recipient;
use tracing::{debug, error, info};

use crate::config::{ChunkFailurePolicy, TelegramConfig};
use crate::error::RelayError;
use crate::platform::ChatIdentifier;
use crate::sanitize::sanitize;

/// Telegram's per-message limit, counted in UTF-16 code units.
pub const TELEGRAM_MAX_MESSAGE_LEN: usize = 4096;

/// Split text into chunks of at most `max_units` UTF-16 code units.
///
/// Chunks concatenate back to the input. A surrogate pair is never split.
/// Empty text yields a single empty chunk.
pub fn split_message(text: &str, max_units: usize) -> Vec<String> {
    debug_assert!(max_units >= 2, "limit must fit a surrogate pair");

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut units = 0;

    for ch in text.chars() {
        let width = ch.len_utf16();
        if units + width > max_units && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            units = 0;
        }
        current.push(ch);
        units += width;
    }

    chunks.push(current);
    chunks
}

/// The chat transport operations the relay needs.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send one message. `text` is already within the transport's limit.
    async fn send_text(&self, chat: &ChatIdentifier, text: &str) -> Result<()>;
    async fn set_webhook(&self, url: &str) -> Result<()>;
    async fn clear_webhook(&self) -> Result<()>;
}

/// Bot API transport backed by teloxide.
pub struct TeloxideTransport {
    bot: Bot,
}

impl TeloxideTransport {
    pub fn new(config: &TelegramConfig, timeout_secs: u64) -> Result<Self> {
        let client = teloxide::net::default_reqwest_settings()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build Telegram HTTP client")?;

        let mut bot = Bot::with_client(&config.bot_token, client);
        if let Some(api_url) = &config.api_url {
            let url = reqwest::Url::parse(api_url)
                .with_context(|| format!("Invalid Telegram API URL: {}", api_url))?;
            bot = bot.set_api_url(url);
        }

        Ok(Self { bot })
    }
}

#[async_trait]
impl ChatTransport for TeloxideTransport {
    async fn send_text(&self, chat: &ChatIdentifier, text: &str) -> Result<()> {
        self.bot
            .send_message(Recipient::from(chat), text)
            .await
            .context("Telegram sendMessage failed")?;
        Ok(())
    }

    async fn set_webhook(&self, url: &str) -> Result<()> {
        let url = reqwest::Url::parse(url)
            .with_context(|| format!("Invalid webhook URL: {}", url))?;
        self.bot
            .set_webhook(url)
            .await
            .context("Telegram setWebhook failed")?;
        Ok(())
    }

    async fn clear_webhook(&self) -> Result<()> {
        self.bot
            .delete_webhook()
            .await
            .context("Telegram deleteWebhook failed")?;
        Ok(())
    }
}

/// Summary of a successful send.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeliveryReport {
    pub chunks: usize,
    pub delivered: usize,
    /// 1-based numbers of chunks that failed and were skipped
    pub skipped: Vec<usize>,
}

/// Sends replies through a [`ChatTransport`], chunking long text.
#[derive(Clone)]
pub struct DeliveryClient {
    transport: Arc<dyn ChatTransport>,
    policy: ChunkFailurePolicy,
}

impl DeliveryClient {
    pub fn new(transport: Arc<dyn ChatTransport>, policy: ChunkFailurePolicy) -> Self {
        Self {
            transport,
            policy,
        }
    }

    /// Send `text` to `chat`, one chunk at a time and in order.
    ///
    /// Under [`ChunkFailurePolicy::Stop`] the first failed chunk ends the send
    /// and is returned. Under [`ChunkFailurePolicy::SkipAndContinue`] the
    /// result is that of the last chunk. Chunks already delivered stay delivered.
    pub async fn send_message(
        &self,
        chat: &ChatIdentifier,
        text: &str,
    ) -> Result<DeliveryReport, RelayError> {
        let text = sanitize(text);
        let chunks = split_message(&text, TELEGRAM_MAX_MESSAGE_LEN);
        let total = chunks.len();

        if total > 1 {
            debug!("Reply to chat {} split into {} chunks", chat, total);
        }

        let mut report = DeliveryReport {
            chunks: total,
            ..Default::default()
        };
        let mut last_error = None;

        for (index, chunk) in chunks.iter().enumerate() {
            let number = index + 1;
            match self.transport.send_text(chat, chunk).await {
                Ok(()) => {
                    report.delivered += 1;
                    last_error = None;
                }
                Err(e) => {
                    error!(
                        "Failed to send chunk {}/{} to chat {}: {:#}",
                        number, total, chat, e
                    );
                    let err = RelayError::Delivery {
                        chunk: number,
                        total,
                        reason: format!("{:#}", e),
                    };
                    match self.policy {
                        ChunkFailurePolicy::Stop => return Err(err),
                        ChunkFailurePolicy::SkipAndContinue => {
                            report.skipped.push(number);
                            last_error = Some(err);
                        }
                    }
                }
            }
        }

        match last_error {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }

    pub async fn set_webhook(&self, url: &str) -> Result<()> {
        self.transport.set_webhook(url).await?;
        info!("Webhook registered: {}", url);
        Ok(())
    }

    pub async fn clear_webhook(&self) -> Result<()> {
        self.transport.clear_webhook().await?;
        info!("Webhook removed");
        Ok(())
    }
}
