//! Telegram client wrapper module.
//!
//! Provides the [`ChatApi`] seam used by every command, the grammers-backed
//! [`TelegramBot`] implementing it, and the transport-neutral chat types.

mod api;
mod client;
mod convert;
pub mod types;

pub use api::{ChatApi, TelegramError};
pub use client::{PwdToken as PasswordToken, RawUpdatesReceiver, TelegramBot, Token as LoginToken};
pub use types::{
    AccessToken, ChatKind, ChatSummary, DialogCursor, DialogEntry, Folder, IncomingMessage,
    Keyboard, MessageInfo, OutgoingMessage, PeerRef, RemoteFilter, Resolution, TopMessage,
    UrlButton, escape_html,
};
