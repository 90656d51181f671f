//! Command types and definitions.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::folders::FolderError;
use crate::quotes::QuoteError;
use crate::telegram::TelegramError;

/// Available bot commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    /// Rebuild the admin folder from the full dialog list.
    Folder,

    /// Drop stale members from the admin folder and add new admin groups.
    Reload,

    /// Silently exclude the current chat from the admin folder.
    Exclude,

    /// Show folder and collection counters.
    AdminStatus,

    /// Replace the inline keyboard of a channel post. Holds everything after
    /// the command word, newlines included.
    Buttons(String),

    /// Pin the replied message; silent unless `loud` is set.
    Pin { loud: bool },

    /// Unpin the replied message.
    Unpin,

    /// Show chat and user identifiers.
    Ids(Option<String>),

    /// Join a chat by username or invite link.
    Join(Option<String>),

    /// Leave the given chat, or the current one after a countdown.
    Leave(Option<String>),

    /// Cancel a pending leave of the current chat.
    LeaveCancel,

    /// Export all broadcast channels to a file.
    ListChannels,

    /// Export all supergroups to a file.
    ListGroups,

    /// Schedule quote posts; holds the raw count argument.
    Quotes(Option<String>),

    /// Show help information.
    Help,
}

impl BotCommand {
    /// Parses a command from a message text.
    ///
    /// Returns `None` if the message is not a valid command.
    #[must_use]
    pub fn parse(text: &str, prefix: &str) -> Option<Self> {
        let text = text.trim();

        let after_prefix = text.strip_prefix(prefix)?;
        if after_prefix.starts_with(char::is_whitespace) {
            return None;
        }

        let (cmd, raw_args) = match after_prefix.find(char::is_whitespace) {
            Some(at) => after_prefix.split_at(at),
            None => (after_prefix, ""),
        };
        let cmd = cmd.to_lowercase();
        let args = Some(raw_args.trim()).filter(|a| !a.is_empty());

        match cmd.as_str() {
            "folder" => Some(Self::Folder),
            "reload" => Some(Self::Reload),
            "exc" => Some(Self::Exclude),
            "admstatus" => Some(Self::AdminStatus),
            "buttons" => Some(Self::Buttons(raw_args.trim_start_matches([' ', '\t']).to_owned())),
            "pin" => Some(Self::Pin {
                loud: args.is_some_and(wants_notification),
            }),
            "unpin" => Some(Self::Unpin),
            "ids" => Some(Self::Ids(args.map(str::to_owned))),
            "join" => Some(Self::Join(args.map(str::to_owned))),
            "leave" => Some(Self::Leave(args.map(str::to_owned))),
            "leavec" => Some(Self::LeaveCancel),
            "listchannels" => Some(Self::ListChannels),
            "listgroups" => Some(Self::ListGroups),
            "quotes" => Some(Self::Quotes(args.map(str::to_owned))),
            "help" | "h" | "?" => Some(Self::Help),
            _ => None,
        }
    }

    /// Returns the command name as typed after the prefix.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Folder => "folder",
            Self::Reload => "reload",
            Self::Exclude => "exc",
            Self::AdminStatus => "admstatus",
            Self::Buttons(_) => "buttons",
            Self::Pin { .. } => "pin",
            Self::Unpin => "unpin",
            Self::Ids(_) => "ids",
            Self::Join(_) => "join",
            Self::Leave(_) => "leave",
            Self::LeaveCancel => "leavec",
            Self::ListChannels => "listchannels",
            Self::ListGroups => "listgroups",
            Self::Quotes(_) => "quotes",
            Self::Help => "help",
        }
    }

    /// Returns all available commands with their descriptions.
    #[must_use]
    pub fn all_commands() -> Vec<(&'static str, &'static str)> {
        vec![
            ("folder", "Create or rebuild the admin chats folder"),
            ("reload", "Remove stale chats and add new admin groups"),
            ("exc", "Exclude the current chat from the folder (silent)"),
            ("admstatus", "Show admin folder status"),
            ("buttons <post>", "Set URL buttons on a channel post, one `Text - URL` per line"),
            ("pin [loud]", "Pin the replied message"),
            ("unpin", "Unpin the replied message"),
            ("ids [@user]", "Show chat and user ids"),
            ("join <link>", "Join a chat by username or invite link"),
            ("leave [chat]", "Leave a chat (refused where you are admin)"),
            ("leavec", "Cancel leaving the current chat"),
            ("listchannels", "Export all channels to a file"),
            ("listgroups", "Export all supergroups to a file"),
            ("quotes <n>", "Schedule n daily quotes"),
            ("help", "Show this help message"),
        ]
    }
}

/// `loud`, `notify`, `-loud` or `-notify` anywhere in the arguments.
fn wants_notification(args: &str) -> bool {
    args.split_whitespace()
        .any(|arg| matches!(arg.to_lowercase().trim_start_matches('-'), "loud" | "notify"))
}

impl fmt::Display for BotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pin { loud: true } => write!(f, "pin loud"),
            Self::Ids(Some(arg)) | Self::Join(Some(arg)) | Self::Leave(Some(arg)) | Self::Quotes(Some(arg)) => {
                write!(f, "{} {arg}", self.name())
            }
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// Errors that end a command early.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Malformed arguments; the text is the usage reply.
    #[error("{0}")]
    Usage(String),

    #[error("Message not found")]
    MessageNotFound,

    #[error(transparent)]
    Folder(#[from] FolderError),

    #[error(transparent)]
    Telegram(#[from] TelegramError),

    #[error(transparent)]
    Quote(#[from] QuoteError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result of command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Whether the command was successful.
    pub success: bool,

    /// Response message to show the user.
    pub message: String,

    /// Parse `message` as HTML.
    pub html: bool,

    /// Send nothing to the chat; the message only goes to the log.
    pub silent: bool,

    /// Delete the reply after this long.
    pub delete_after: Option<Duration>,
}

impl CommandResult {
    /// Creates a successful result.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            html: false,
            silent: false,
            delete_after: None,
        }
    }

    /// Creates an error result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            ..Self::success(message)
        }
    }

    #[must_use]
    pub const fn html(mut self) -> Self {
        self.html = true;
        self
    }

    #[must_use]
    pub const fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    #[must_use]
    pub const fn delete_after(mut self, secs: u64) -> Self {
        self.delete_after = Some(Duration::from_secs(secs));
        self
    }
}

impl From<CommandError> for CommandResult {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Usage(usage) => Self::error(usage),
            err => Self::error(format!("❌ Error: {err}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = ".";

    #[test]
    fn test_parse_folder_commands() {
        assert_eq!(BotCommand::parse(".folder", PREFIX), Some(BotCommand::Folder));
        assert_eq!(BotCommand::parse(".reload", PREFIX), Some(BotCommand::Reload));
        assert_eq!(BotCommand::parse(".exc", PREFIX), Some(BotCommand::Exclude));
        assert_eq!(BotCommand::parse(".admstatus", PREFIX), Some(BotCommand::AdminStatus));
    }

    #[test]
    fn test_parse_wrong_prefix() {
        assert_eq!(BotCommand::parse("/folder", PREFIX), None);
        assert_eq!(BotCommand::parse("folder", PREFIX), None);
        assert_eq!(BotCommand::parse(". folder", PREFIX), None);
        assert_eq!(BotCommand::parse(".unknown", PREFIX), None);
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!(BotCommand::parse(".FOLDER", PREFIX), Some(BotCommand::Folder));
        assert_eq!(BotCommand::parse(".ListGroups", PREFIX), Some(BotCommand::ListGroups));
    }

    #[test]
    fn test_parse_with_extra_whitespace() {
        assert_eq!(BotCommand::parse("  .reload  ", PREFIX), Some(BotCommand::Reload));
        assert_eq!(
            BotCommand::parse(".join   @rustlang ", PREFIX),
            Some(BotCommand::Join(Some("@rustlang".to_owned())))
        );
    }

    #[test]
    fn test_parse_custom_prefix() {
        assert_eq!(BotCommand::parse("!!ids", "!!"), Some(BotCommand::Ids(None)));
        assert_eq!(BotCommand::parse(".ids", "!!"), None);
    }

    #[test]
    fn test_parse_pin_flags() {
        assert_eq!(BotCommand::parse(".pin", PREFIX), Some(BotCommand::Pin { loud: false }));
        for text in [".pin loud", ".pin -loud", ".pin notify", ".pin -NOTIFY"] {
            assert_eq!(BotCommand::parse(text, PREFIX), Some(BotCommand::Pin { loud: true }), "{text}");
        }
        assert_eq!(BotCommand::parse(".pin quietly", PREFIX), Some(BotCommand::Pin { loud: false }));
    }

    #[test]
    fn test_parse_buttons_keeps_lines() {
        let text = ".buttons -100123/45\nSite - https://a.b\nDocs - https://c.d :same";
        assert_eq!(
            BotCommand::parse(text, PREFIX),
            Some(BotCommand::Buttons(
                "-100123/45\nSite - https://a.b\nDocs - https://c.d :same".to_owned()
            ))
        );
        assert_eq!(
            BotCommand::parse(".buttons\nSite - https://a.b", PREFIX),
            Some(BotCommand::Buttons("\nSite - https://a.b".to_owned()))
        );
    }

    #[test]
    fn test_parse_optional_args() {
        assert_eq!(BotCommand::parse(".leave", PREFIX), Some(BotCommand::Leave(None)));
        assert_eq!(BotCommand::parse(".leavec", PREFIX), Some(BotCommand::LeaveCancel));
        assert_eq!(
            BotCommand::parse(".quotes 5", PREFIX),
            Some(BotCommand::Quotes(Some("5".to_owned())))
        );
        assert_eq!(BotCommand::parse(".quotes", PREFIX), Some(BotCommand::Quotes(None)));
    }

    #[test]
    fn test_display() {
        assert_eq!(BotCommand::Pin { loud: true }.to_string(), "pin loud");
        assert_eq!(BotCommand::Join(Some("@x".to_owned())).to_string(), "join @x");
        assert_eq!(BotCommand::Exclude.to_string(), "exc");
    }

    #[test]
    fn test_result_from_error() {
        let usage: CommandResult = CommandError::Usage("Usage: .quotes <n>".to_owned()).into();
        assert_eq!(usage.message, "Usage: .quotes <n>");
        assert!(!usage.success);

        let err: CommandResult = CommandError::from(FolderError::NoFreeSlot).into();
        assert_eq!(err.message, "❌ Error: No Folder ID available.");
    }

    #[test]
    fn test_result_builders() {
        let result = CommandResult::success("ok").html().delete_after(5);
        assert!(result.success && result.html && !result.silent);
        assert_eq!(result.delete_after, Some(Duration::from_secs(5)));
    }
}
