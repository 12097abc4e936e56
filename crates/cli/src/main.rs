//! `spindle` binary: wires config, logging, backends, and the gateway.

use std::sync::Arc;

use {
    anyhow::Context as _,
    clap::Parser,
    secrecy::{ExposeSecret, Secret},
    serenity::Client,
    tracing::info,
    tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    spindle_discord::{DiscordConfig, SpindleHandler},
    spindle_providers::{CompletionBackend, ImageBackend, OpenAiBackend, OpenAiConfig},
};

#[derive(Debug, Parser)]
#[command(name = "spindle", version, about = "Reply-chain storytelling bot for Discord")]
struct Cli {
    /// Discord bot token.
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    discord_token: String,

    /// API key for the generation backend.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: String,

    /// Base URL for the generation backend.
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com")]
    openai_base_url: String,

    /// Channel name archived stories are posted to.
    #[arg(long, env = "SPINDLE_ARCHIVE_CHANNEL", default_value = "bot-stories")]
    archive_channel: String,

    /// Maximum completion length in tokens.
    #[arg(long, env = "SPINDLE_MAX_TOKENS", default_value_t = 64)]
    max_tokens: u32,

    /// Log level when RUST_LOG is unset.
    #[arg(long, env = "SPINDLE_LOG", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, env = "SPINDLE_JSON_LOGS")]
    json_logs: bool,
}

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli);

    let openai = OpenAiConfig {
        api_key: Secret::new(cli.openai_api_key.clone()),
        base_url: cli.openai_base_url.clone(),
        ..OpenAiConfig::default()
    };
    let backend = Arc::new(OpenAiBackend::new(openai));
    let completions: Arc<dyn CompletionBackend> = backend.clone();
    let images: Arc<dyn ImageBackend> = backend;

    let discord = DiscordConfig {
        token: Secret::new(cli.discord_token.clone()),
        archive_channel: cli.archive_channel.clone(),
        max_tokens: cli.max_tokens,
    };

    info!(
        archive_channel = %discord.archive_channel,
        base_url = %cli.openai_base_url,
        "starting spindle"
    );

    let handler = SpindleHandler::new(discord.clone(), completions, images);
    let mut client = Client::builder(discord.token.expose_secret(), SpindleHandler::intents())
        .event_handler(handler)
        .await
        .context("failed to build discord client")?;

    client.start().await.context("gateway terminated")?;
    Ok(())
}
