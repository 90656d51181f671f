//! Configuration module for the admin userbot.
//!
//! Telegram credentials, bot settings and the optional quotes setup, all
//! read from environment variables.

mod settings;

pub use settings::{BotSettings, ConfigError, QuotesConfig, TelegramConfig};
