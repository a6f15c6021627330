use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::auth::{is_authorized, AllowList};
use crate::error::RelayError;
use crate::llm::{CompletionResult, CompletionService};
use crate::platform::telegram::DeliveryClient;
use crate::platform::IncomingMessage;

/// Where an update ended up in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Authorizing,
    Rejected,
    Processing,
    Completing,
    Delivering,
    Done,
}

/// JSON body returned to the webhook caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WebhookResponse {
    Success,
    Error { message: String },
}

impl WebhookResponse {
    fn error(err: &RelayError) -> Self {
        WebhookResponse::Error {
            message: err.public_message().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub stage: Stage,
    pub response: WebhookResponse,
}

impl Outcome {
    fn rejected(err: &RelayError) -> Self {
        Self {
            stage: Stage::Rejected,
            response: WebhookResponse::error(err),
        }
    }
}

/// Runs one webhook update through gate, completion and delivery.
pub struct Relay {
    allow_list: AllowList,
    completion: Arc<dyn CompletionService>,
    delivery: DeliveryClient,
    suppress_empty_replies: bool,
}

impl Relay {
    pub fn new(
        allow_list: AllowList,
        completion: Arc<dyn CompletionService>,
        delivery: DeliveryClient,
        suppress_empty_replies: bool,
    ) -> Self {
        Self {
            allow_list,
            completion,
            delivery,
            suppress_empty_replies,
        }
    }

    /// Process a raw update body. Every external call happens at most once.
    pub async fn handle_update(&self, body: &[u8]) -> Outcome {
        debug!("{:?}: {} byte update", Stage::Received, body.len());

        let incoming = match IncomingMessage::from_update_json(body) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Rejecting update: {}", e);
                return Outcome::rejected(&e);
            }
        };

        debug!("{:?}: chat {}", Stage::Authorizing, incoming.chat_id);
        if !is_authorized(&incoming.chat_id, &self.allow_list) {
            warn!("Rejecting update from unauthorized chat {}", incoming.chat_id);
            return Outcome::rejected(&RelayError::Unauthorized);
        }

        info!("{:?}: message from chat {}", Stage::Processing, incoming.chat_id);

        debug!("{:?}: requesting completion", Stage::Completing);
        let reply = match self.completion.complete(&incoming.text).await {
            CompletionResult::Text(text) => text,
            failure @ CompletionResult::Failure(_) => {
                warn!("Completion failed for chat {}, relaying empty reply", incoming.chat_id);
                failure.into_reply()
            }
        };

        if reply.is_empty() && self.suppress_empty_replies {
            info!("Empty reply for chat {} not sent", incoming.chat_id);
            return Outcome {
                stage: Stage::Done,
                response: WebhookResponse::Success,
            };
        }

        debug!(
            "{:?}: {} chars to chat {}",
            Stage::Delivering,
            reply.chars().count(),
            incoming.chat_id
        );
        match self.delivery.send_message(&incoming.chat_id, &reply).await {
            Ok(report) => {
                info!(
                    "Reply delivered to chat {} ({}/{} chunks)",
                    incoming.chat_id, report.delivered, report.chunks
                );
                Outcome {
                    stage: Stage::Done,
                    response: WebhookResponse::Success,
                }
            }
            // The Bot API refuses empty text; that send still counts as made
            Err(e) if reply.is_empty() => {
                warn!(
                    "Empty reply to chat {} refused by transport: {}",
                    incoming.chat_id, e
                );
                Outcome {
                    stage: Stage::Done,
                    response: WebhookResponse::Success,
                }
            }
            Err(e) => Outcome {
                stage: Stage::Delivering,
                response: WebhookResponse::error(&e),
            },
        }
    }
}
