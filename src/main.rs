mod access;
mod config;
mod dispatch;
mod platform;
mod runtime;
mod store;
mod strings;

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::platform::telegram::TelegramPlatform;
use crate::runtime::{Context, Runtime};

/// Telegram bot that suggests a random restaurant on request.
#[derive(Debug, Parser)]
#[command(name = "eatsnake", version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(default_value = "config.toml")]
    config: PathBuf,

    /// Append logs to this file instead of stdout
    #[arg(short, long)]
    logfile: Option<PathBuf>,
}

fn init_logging(logfile: Option<&PathBuf>) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,eatsnake=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match logfile {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(Arc::new(file))
                        .with_ansi(false),
                )
                .init();
        }
        None => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.logfile.as_ref())?;

    info!("Loading configuration from: {}", cli.config.display());
    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return Err(e);
        }
    };

    info!("Configuration loaded successfully");
    info!("  Strings: {}", config.strings.path.display());
    info!("  Database: {}", config.storage.database_path.display());
    info!("  Admins: {:?}", config.access.admin_ids);
    info!("  Operational chats: {:?}", config.access.operational_chats);
    info!("  Restricted chats: {:?}", config.access.restricted_chats);

    let platform = TelegramPlatform::new(&config.telegram.bot_token);
    let ctx = Context::new(config).context("Failed to initialize bot")?;
    let mut runtime = Runtime::new(platform, ctx);

    info!("Bot is starting...");
    tokio::select! {
        _ = runtime.run() => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for interrupt")?;
            info!("Interrupted, exiting");
        }
    }

    Ok(())
}
