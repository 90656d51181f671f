//! Application settings and Telegram configuration.
//!
//! Everything is read from environment variables (optionally loaded from a
//! `.env` file first). The `*_from` constructors take a lookup function so
//! the parsing can be exercised without touching the process environment.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Telegram API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Telegram API ID (obtain from <https://my.telegram.org>).
    pub api_id: i32,

    /// Telegram API hash (obtain from <https://my.telegram.org>).
    pub api_hash: String,

    /// Path to the session file.
    #[serde(default = "default_session_path")]
    pub session_path: PathBuf,
}

fn default_session_path() -> PathBuf {
    PathBuf::from("session.db")
}

impl TelegramConfig {
    #[must_use]
    pub fn new(api_id: i32, api_hash: String) -> Self {
        Self {
            api_id,
            api_hash,
            session_path: default_session_path(),
        }
    }

    /// Reads `TG_API_ID`, `TG_API_HASH` and optionally `TG_SESSION_PATH`.
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_id: i32 = var("TG_API_ID")
            .ok_or(ConfigError::MissingEnvVar("TG_API_ID"))?
            .trim()
            .parse()
            .ok()
            .filter(|id| *id > 0)
            .ok_or(ConfigError::InvalidApiId)?;

        let api_hash = var("TG_API_HASH").ok_or(ConfigError::MissingEnvVar("TG_API_HASH"))?;

        let session_path = var("TG_SESSION_PATH").map_or_else(default_session_path, PathBuf::from);

        Ok(Self {
            api_id,
            api_hash,
            session_path,
        })
    }
}

/// Bot-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSettings {
    /// Prefix that marks a message as a command.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,

    /// Users besides the account owner allowed to run commands.
    #[serde(default)]
    pub sudo_users: Vec<i64>,

    /// Chat that receives command errors, if any.
    #[serde(default)]
    pub log_chat_id: Option<i64>,

    /// Directory holding the JSON collections and generated listings.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Title of the managed admin folder.
    #[serde(default = "default_folder_title")]
    pub folder_title: String,
}

fn default_command_prefix() -> String {
    ".".to_owned()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_folder_title() -> String {
    "Admin Chats".to_owned()
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            command_prefix: default_command_prefix(),
            sudo_users: Vec::new(),
            log_chat_id: None,
            data_dir: default_data_dir(),
            folder_title: default_folder_title(),
        }
    }
}

impl BotSettings {
    /// Creates bot settings from environment variables with defaults.
    ///
    /// Unparsable values fall back to the default; malformed entries in
    /// `SUDO_USERS` are skipped.
    #[must_use]
    pub fn from_env_with_defaults() -> Self {
        Self::from_lookup(env_lookup)
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            command_prefix: var("COMMAND_PREFIX")
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(default_command_prefix),
            sudo_users: var("SUDO_USERS")
                .map(|list| parse_id_list(&list))
                .unwrap_or_default(),
            log_chat_id: var("LOG_CHAT_ID").and_then(|s| s.trim().parse().ok()),
            data_dir: var("DATA_DIR").map_or_else(default_data_dir, PathBuf::from),
            folder_title: var("FOLDER_TITLE")
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(default_folder_title),
        }
    }
}

/// Where `.quotes` posts and where it keeps its date cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotesConfig {
    pub channel_id: i64,
    /// Channel username advertised in every post, without `@`.
    pub username: String,
    pub cache_chat_id: i64,
    pub cache_message_id: i32,
    pub api_url: String,
    /// Minimum spacing between quote API requests.
    pub cooldown: Duration,
}

const DEFAULT_QUOTES_API: &str = "https://zenquotes.io/api/random";
const DEFAULT_QUOTES_COOLDOWN_SECS: u64 = 32;

impl QuotesConfig {
    /// Reads the `QUOTES_*` variables.
    ///
    /// Returns `Ok(None)` when `QUOTES_CHANNEL_ID` is unset, which disables
    /// the quotes command.
    ///
    /// # Errors
    ///
    /// Returns an error when the channel is set but the rest is missing or
    /// malformed.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Option<Self>, ConfigError> {
        let Some(channel) = var("QUOTES_CHANNEL_ID") else {
            return Ok(None);
        };

        let channel_id = parse_var("QUOTES_CHANNEL_ID", &channel)?;
        let username = var("QUOTES_USERNAME")
            .ok_or(ConfigError::MissingEnvVar("QUOTES_USERNAME"))?
            .trim()
            .trim_start_matches('@')
            .to_owned();
        let cache_chat_id = var("QUOTES_CACHE_CHAT_ID")
            .ok_or(ConfigError::MissingEnvVar("QUOTES_CACHE_CHAT_ID"))
            .and_then(|v| parse_var("QUOTES_CACHE_CHAT_ID", &v))?;
        let cache_message_id = var("QUOTES_CACHE_MSG_ID")
            .ok_or(ConfigError::MissingEnvVar("QUOTES_CACHE_MSG_ID"))
            .and_then(|v| parse_var("QUOTES_CACHE_MSG_ID", &v))?;
        let api_url = var("QUOTES_API_URL").unwrap_or_else(|| DEFAULT_QUOTES_API.to_owned());
        let cooldown_secs = match var("QUOTES_COOLDOWN_SECS") {
            Some(v) => parse_var("QUOTES_COOLDOWN_SECS", &v)?,
            None => DEFAULT_QUOTES_COOLDOWN_SECS,
        };

        Ok(Some(Self {
            channel_id,
            username,
            cache_chat_id,
            cache_message_id,
            api_url,
            cooldown: Duration::from_secs(cooldown_secs),
        }))
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn parse_var<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(name, value.to_owned()))
}

fn parse_id_list(list: &str) -> Vec<i64> {
    list.split(',')
        .filter_map(|id| id.trim().parse().ok())
        .collect()
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid API ID format (must be a positive integer)")]
    InvalidApiId,

    #[error("Invalid value for {0}: {1:?}")]
    InvalidValue(&'static str, String),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_settings() {
        let settings = BotSettings::from_lookup(env(&[]));
        assert_eq!(settings.command_prefix, ".");
        assert!(settings.sudo_users.is_empty());
        assert_eq!(settings.log_chat_id, None);
        assert_eq!(settings.data_dir, PathBuf::from("data"));
        assert_eq!(settings.folder_title, "Admin Chats");
    }

    #[test]
    fn test_settings_from_env() {
        let settings = BotSettings::from_lookup(env(&[
            ("COMMAND_PREFIX", "!"),
            ("SUDO_USERS", "42, 7,oops,"),
            ("LOG_CHAT_ID", "-100123"),
            ("FOLDER_TITLE", "Mine"),
        ]));
        assert_eq!(settings.command_prefix, "!");
        assert_eq!(settings.sudo_users, vec![42, 7]);
        assert_eq!(settings.log_chat_id, Some(-100_123));
        assert_eq!(settings.folder_title, "Mine");
    }

    #[test]
    fn test_telegram_config_new() {
        let config = TelegramConfig::new(12345, "abc123".to_owned());
        assert_eq!(config.api_id, 12345);
        assert_eq!(config.api_hash, "abc123");
        assert_eq!(config.session_path, PathBuf::from("session.db"));
    }

    #[test]
    fn test_telegram_config_errors() {
        assert!(matches!(
            TelegramConfig::from_lookup(env(&[("TG_API_HASH", "h")])),
            Err(ConfigError::MissingEnvVar("TG_API_ID"))
        ));
        assert!(matches!(
            TelegramConfig::from_lookup(env(&[("TG_API_ID", "-5"), ("TG_API_HASH", "h")])),
            Err(ConfigError::InvalidApiId)
        ));

        let config = TelegramConfig::from_lookup(env(&[
            ("TG_API_ID", "99"),
            ("TG_API_HASH", "h"),
            ("TG_SESSION_PATH", "/tmp/s.db"),
        ]))
        .unwrap();
        assert_eq!(config.session_path, PathBuf::from("/tmp/s.db"));
    }

    #[test]
    fn test_quotes_disabled_without_channel() {
        assert!(QuotesConfig::from_lookup(env(&[])).unwrap().is_none());
    }

    #[test]
    fn test_quotes_config_defaults() {
        let config = QuotesConfig::from_lookup(env(&[
            ("QUOTES_CHANNEL_ID", "-1002665845048"),
            ("QUOTES_USERNAME", "@TheQuotesFeed"),
            ("QUOTES_CACHE_CHAT_ID", "-1002852357421"),
            ("QUOTES_CACHE_MSG_ID", "4"),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(config.username, "TheQuotesFeed");
        assert_eq!(config.cache_message_id, 4);
        assert_eq!(config.api_url, "https://zenquotes.io/api/random");
        assert_eq!(config.cooldown, Duration::from_secs(32));
    }

    #[test]
    fn test_quotes_config_rejects_partial_setup() {
        assert!(matches!(
            QuotesConfig::from_lookup(env(&[("QUOTES_CHANNEL_ID", "-1")])),
            Err(ConfigError::MissingEnvVar("QUOTES_USERNAME"))
        ));
        assert!(matches!(
            QuotesConfig::from_lookup(env(&[
                ("QUOTES_CHANNEL_ID", "-1"),
                ("QUOTES_USERNAME", "x"),
                ("QUOTES_CACHE_CHAT_ID", "-2"),
                ("QUOTES_CACHE_MSG_ID", "four"),
            ])),
            Err(ConfigError::InvalidValue("QUOTES_CACHE_MSG_ID", _))
        ));
    }
}
