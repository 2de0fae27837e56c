//! Local console transport: type commands, read the bot's replies.
//!
//! Every line read from stdin is handled as a message from `BOT_CONSOLE_CHANNEL`
//! (default `console`). Talks to the registry configured in the environment.

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use isp_chat_intake::config::Config;
use isp_chat_intake::dispatcher::Dispatcher;
use isp_chat_intake::registry_client::RegistryClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays readable.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "isp_chat_intake=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?;
    let channel = std::env::var("BOT_CONSOLE_CHANNEL").unwrap_or_else(|_| "console".to_string());

    let registry = RegistryClient::new(
        config.registry_base_url.clone(),
        config.registry_api_key.clone(),
        config.registry_timeout,
    )?;
    let dispatcher = Arc::new(Dispatcher::new(config.bot.clone(), Arc::new(registry)));

    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(
            format!(
                "Conectado a {}. Escribe {}ayuda para ver los comandos.\n",
                config.registry_base_url, config.bot.prefix
            )
            .as_bytes(),
        )
        .await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(reply) = dispatcher.clone().handle_isolated(line, channel.clone()).await {
            stdout.write_all(format!("{}\n\n", reply).as_bytes()).await?;
            stdout.flush().await?;
        }
    }

    Ok(())
}
