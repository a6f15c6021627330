use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use tracing::info;

use crate::config::ServerConfig;
use crate::relay::{Relay, WebhookResponse};

/// Build the webhook router. The route lives at `config.webhook_path()`.
pub fn router(config: &ServerConfig, relay: Arc<Relay>) -> Router {
    Router::new()
        .route(&config.webhook_path(), post(telegram_webhook))
        .with_state(relay)
}

// Always 200: Telegram redelivers updates that get an error status,
// which would repeat the completion call.
async fn telegram_webhook(State(relay): State<Arc<Relay>>, body: Bytes) -> Json<WebhookResponse> {
    let outcome = relay.handle_update(&body).await;
    Json(outcome.response)
}

/// Serve the webhook until Ctrl-C.
pub async fn serve(config: &ServerConfig, relay: Arc<Relay>) -> Result<()> {
    let app = router(config, relay);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.listen_addr))?;

    info!(
        "Webhook listening on http://{}{}",
        config.listen_addr,
        config.webhook_path()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("Server error")?;

    Ok(())
}
