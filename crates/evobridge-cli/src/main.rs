mod logging;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use evobridge_channels::{EvolutionClient, WEBHOOK_EVENTS};
use evobridge_config::{AppConfig, ConfigLoader};
use evobridge_gateway::debug::mask_secret;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "evobridge",
    version,
    about = "evobridge - answer your own WhatsApp messages with an LLM"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error); overrides `log_level` in config
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Directory holding config.yml / config.toml
    #[arg(long, global = true, env = "EVOBRIDGE_CONFIG_DIR")]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server
    Start {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (defaults to server.port)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Query a running bot's /health endpoint
    Status,

    /// Manage the Evolution API webhook for this instance
    Webhook {
        #[command(subcommand)]
        action: WebhookCommands,
    },

    /// Print the effective configuration with secrets masked
    Config,
}

#[derive(Subcommand)]
enum WebhookCommands {
    /// Register the bot's webhook URL
    Set {
        /// Webhook base URL; Evolution appends the event name (defaults to {server.public_url}/webhook)
        #[arg(long)]
        url: Option<String>,
    },
    /// Show the registered webhook
    Find,
    /// Remove the registered webhook
    Delete,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let loader = match &cli.config_dir {
        Some(dir) => ConfigLoader::with_dir(dir),
        None => ConfigLoader::new(),
    };
    let config = loader.load_with_env()?;

    let level = cli
        .log_level
        .clone()
        .or_else(|| config.log_level.clone())
        .unwrap_or_else(|| "info".to_string());
    logging::init(&level, cli.log_json);
    info!("config directory: {}", loader.config_dir().display());

    match cli.command {
        Commands::Start { host, port } => {
            let mut config = config;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;
            info!(
                "starting server on {}:{}",
                config.server.host, config.server.port
            );

            let server = evobridge_gateway::GatewayServer::new(config);
            server.run().await?;
        }
        Commands::Status => {
            let url = format!("{}/health", config.server.public_url.trim_end_matches('/'));
            info!("checking bot health at {url}");
            let resp = reqwest::get(&url)
                .await
                .map_err(|_| anyhow::anyhow!("bot is not running at {url}"))?;
            let body = resp.json::<serde_json::Value>().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Commands::Webhook { action } => {
            config.validate_evolution()?;
            let client = EvolutionClient::from_config(&config.evolution)
                .context("failed to build Evolution API client")?;
            info!(
                "using Evolution API at {} (instance {})",
                client.base_url(),
                client.instance()
            );

            let result = match action {
                WebhookCommands::Set { url } => {
                    let url = url.unwrap_or_else(|| default_webhook_url(&config));
                    println!("Setting webhook to {url}");
                    client.set_webhook(&url, &WEBHOOK_EVENTS).await
                }
                WebhookCommands::Find => client.find_webhook().await,
                WebhookCommands::Delete => client.delete_webhook().await,
            }
            .context("Evolution API request failed")?;

            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Config => {
            println!("Config directory: {}", loader.config_dir().display());
            println!("{}", serde_json::to_string_pretty(&masked_config(&config))?);
        }
    }

    Ok(())
}

/// Registered with `webhook_by_events`, so Evolution posts each event to
/// `{url}/{event-name}` (e.g. `/webhook/messages-upsert`).
fn default_webhook_url(config: &AppConfig) -> String {
    format!("{}/webhook", config.server.public_url.trim_end_matches('/'))
}

fn masked_config(config: &AppConfig) -> serde_json::Value {
    let mask = |key: &Option<String>| key.as_deref().map(mask_secret);
    serde_json::json!({
        "server": config.server,
        "evolution": {
            "base_url": config.evolution.base_url,
            "api_key": mask(&config.evolution.api_key),
            "instance_name": config.evolution.instance_name,
            "ssl_verify": config.evolution.ssl_verify,
            "send_format": config.evolution.send_format,
        },
        "llm": {
            "model": config.llm.model,
            "base_url": config.llm.base_url,
            "api_key": mask(&config.llm.api_key),
            "timeout_secs": config.llm.timeout_secs,
        },
        "owner": config.owner,
        "log_level": config.log_level,
    })
}
