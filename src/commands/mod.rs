//! Command handling module.
//!
//! Parses dot-prefixed commands from the owner's (or a sudo user's)
//! messages and runs them against the folder, channel and quote services.

mod buttons;
mod chat_tools;
mod handler;
mod listing;
mod log_sink;
mod types;

pub use buttons::{PostChat, PostRef};
pub use chat_tools::{ChatArg, JoinTarget};
pub use handler::CommandHandler;
pub use listing::ListKind;
pub use log_sink::LogSink;
pub use types::{BotCommand, CommandError, CommandResult};
