//! Admin Userbot - Main Entry Point
//!
//! A Telegram userbot that maintains a folder of every group you administer
//! and offers a handful of channel management commands.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::{Input, Password};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use admin_userbot::commands::CommandHandler;
use admin_userbot::config::{BotSettings, QuotesConfig, TelegramConfig};
use admin_userbot::folders::{ADMIN_CHATS, ChatRecord, EXCLUDED_CHATS, FolderStores, FolderSync};
use admin_userbot::quotes::{QuoteScheduler, ZenQuotes};
use admin_userbot::store::JsonStore;
use admin_userbot::telegram::{ChatApi, TelegramBot};

/// Telegram userbot keeping an "Admin Chats" folder up to date.
#[derive(Parser, Debug)]
#[command(name = "admin_userbot")]
#[command(about = "Keep a Telegram folder of every group you administer")]
#[command(version)]
struct Args {
    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Directory for the chat records and exports (overrides `DATA_DIR`).
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    // Load configurations
    let tg_config = TelegramConfig::from_env()
        .context("Failed to load Telegram configuration from environment")?;

    let mut bot_settings = BotSettings::from_env_with_defaults();
    if let Some(dir) = args.data_dir {
        bot_settings.data_dir = dir;
    }

    let quotes_config = QuotesConfig::from_env().context("Invalid quotes configuration")?;

    // Connect to Telegram
    let (bot, mut updates) = TelegramBot::connect(&tg_config)
        .await
        .context("Failed to connect to Telegram")?;

    if !bot.is_authorized().await.context("Failed to check authorization")? {
        authenticate(&bot, &tg_config).await?;
    }

    let bot = Arc::new(bot);
    let api: Arc<dyn ChatApi> = bot.clone();

    // Open the record store
    let store = JsonStore::open(&bot_settings.data_dir).with_context(|| {
        format!("Failed to open data directory {}", bot_settings.data_dir.display())
    })?;
    let stores = FolderStores::new(
        Arc::new(store.collection::<ChatRecord>(ADMIN_CHATS)?),
        Arc::new(store.collection::<ChatRecord>(EXCLUDED_CHATS)?),
    );

    let folders = FolderSync::new(Arc::clone(&api), stores, bot_settings.folder_title.clone());
    let mut handler = CommandHandler::new(Arc::clone(&api), folders, &bot_settings);

    match quotes_config {
        Some(config) => {
            let source = ZenQuotes::new(config.api_url.clone())
                .context("Failed to build quotes API client")?;
            info!("Quotes enabled for channel {}", config.channel_id);
            handler = handler.with_quotes(QuoteScheduler::new(
                Arc::clone(&api),
                Arc::new(source),
                config,
            ));
        }
        None => debug!("Quotes not configured"),
    }

    info!("Starting admin userbot...");
    info!("Command prefix: {}", bot_settings.command_prefix);
    info!("Bot is running. Use Ctrl+C to stop.");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
            update = updates.recv() => {
                let Some(update) = update else {
                    warn!("Updates stream closed");
                    break;
                };
                for message in bot.incoming_messages(update).await {
                    handler.handle(&message).await;
                }
            }
        }
    }

    bot.disconnect();
    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Handles Telegram authentication.
async fn authenticate(bot: &TelegramBot, config: &TelegramConfig) -> Result<()> {
    info!("Authentication required");

    let phone: String = Input::new()
        .with_prompt("Enter your phone number (with country code)")
        .interact_text()?;

    let token = bot
        .request_login_code(&phone, &config.api_hash)
        .await
        .context("Failed to request login code")?;

    info!("Login code sent to your Telegram app");

    let code: String = Input::new()
        .with_prompt("Enter the login code")
        .interact_text()?;

    let Some(password_token) = bot
        .sign_in(&token, &code)
        .await
        .context("Authentication failed")?
    else {
        return Ok(());
    };

    info!("Two-factor authentication is enabled");
    info!("Password hint: {}", password_token.hint().unwrap_or("no hint"));

    let password: String = Password::new()
        .with_prompt("Enter your 2FA password")
        .interact()?;

    bot.check_password(password_token, &password)
        .await
        .context("2FA authentication failed")?;

    Ok(())
}
