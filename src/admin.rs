use anyhow::{Context, Result};
use tracing::{error, info};

use crate::auth::AllowList;
use crate::platform::telegram::DeliveryClient;

/// Test message sent to every allowed chat on activation.
pub const ACTIVATION_MESSAGE: &str = "Relay activated";

/// Register the webhook, then greet every allowed chat.
///
/// Returns the number of chats the greeting reached. A failed greeting is
/// logged and does not stop the others.
pub async fn activate(
    delivery: &DeliveryClient,
    webhook_url: Option<&str>,
    allow_list: &AllowList,
) -> Result<usize> {
    let url = webhook_url.context("server.public_url must be set to register the webhook")?;
    delivery
        .set_webhook(url)
        .await
        .context("Failed to register webhook")?;

    let mut reached = 0;
    for chat in allow_list.chats() {
        match delivery.send_message(&chat, ACTIVATION_MESSAGE).await {
            Ok(_) => reached += 1,
            Err(e) => error!("Activation message to chat {} failed: {}", chat, e),
        }
    }

    info!(
        "Activation message sent to {}/{} chats",
        reached,
        allow_list.entries().len()
    );
    Ok(reached)
}

/// Deregister the webhook.
pub async fn deactivate(delivery: &DeliveryClient) -> Result<()> {
    delivery
        .clear_webhook()
        .await
        .context("Failed to remove webhook")
}
