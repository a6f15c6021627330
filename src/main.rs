mod admin;
mod auth;
mod config;
mod error;
mod llm;
mod platform;
mod relay;
mod sanitize;
mod server;
#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::llm::LlmClient;
use crate::platform::telegram::{DeliveryClient, TeloxideTransport};
use crate::relay::Relay;

const USAGE: &str = "usage: relaybot [config.toml] [serve|activate|deactivate]";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,relaybot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Arguments: optional config path, optional command
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (config_path, command) = match args.as_slice() {
        [] => (PathBuf::from("config.toml"), "serve"),
        [cmd] if is_command(cmd) => (PathBuf::from("config.toml"), cmd.as_str()),
        [path] => (PathBuf::from(path), "serve"),
        [path, cmd] if is_command(cmd) => (PathBuf::from(path), cmd.as_str()),
        _ => bail!(USAGE),
    };

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Model: {}", config.completion.model);
    info!("  Allowed chats: {:?}", config.allow_list().entries());
    info!(
        "  Chunk failure policy: {:?}",
        config.delivery.chunk_failure_policy
    );

    let transport = TeloxideTransport::new(&config.telegram, config.delivery.timeout_secs)?;
    let delivery = DeliveryClient::new(Arc::new(transport), config.delivery.chunk_failure_policy);

    match command {
        "activate" => {
            admin::activate(
                &delivery,
                config.server.webhook_url().as_deref(),
                &config.allow_list(),
            )
            .await?;
        }
        "deactivate" => admin::deactivate(&delivery).await?,
        _ => {
            let completion = LlmClient::new(config.completion.clone())?;
            let relay = Relay::new(
                config.allow_list(),
                Arc::new(completion),
                delivery,
                config.delivery.suppress_empty_replies,
            );
            server::serve(&config.server, Arc::new(relay)).await?;
        }
    }

    Ok(())
}

fn is_command(arg: &str) -> bool {
    matches!(arg, "serve" | "activate" | "deactivate")
}
