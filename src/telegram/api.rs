//! The `ChatApi` seam between command logic and the Telegram client.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use super::types::{
    ChatSummary, DialogCursor, DialogEntry, Folder, Keyboard, MessageInfo, OutgoingMessage,
    PeerRef, RemoteFilter, Resolution,
};

/// Errors that can occur during Telegram operations.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Not authorized. Please sign in first.")]
    NotAuthorized,

    #[error("Sign in failed: {0}")]
    SignInFailed(String),

    #[error("Flood wait required: {0} seconds")]
    FloodWait(u32),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("API invocation error: {0}")]
    Invocation(String),

    #[error("Peer id {0} is not known to this session")]
    PeerNotFound(i64),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(&'static str),

    #[error("File error: {0}")]
    Io(#[from] std::io::Error),
}

impl TelegramError {
    /// Classifies an RPC error text, recognising flood waits.
    pub(crate) fn from_rpc_text(err_str: String) -> Self {
        if (err_str.contains("FLOOD_WAIT") || err_str.contains("flood"))
            && let Some(seconds) = extract_flood_wait_seconds(&err_str)
        {
            return Self::FloodWait(seconds);
        }

        Self::Invocation(err_str)
    }
}

/// Extracts flood wait seconds from an error message.
fn extract_flood_wait_seconds(err_msg: &str) -> Option<u32> {
    let patterns = ["FLOOD_WAIT_", "flood wait "];
    let lowered = err_msg.to_lowercase();

    for pattern in patterns {
        if let Some(idx) = lowered.find(&pattern.to_lowercase()) {
            let start = idx + pattern.len();
            let num_str: String = err_msg[start..]
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            if let Ok(seconds) = num_str.parse() {
                return Some(seconds);
            }
        }
    }
    None
}

/// Telegram operations the commands rely on.
///
/// Chat identifiers are always marked ids (see [`PeerRef::marked_id`]).
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Fetches one page of the dialog list starting at `cursor`.
    async fn get_dialogs(
        &self,
        cursor: &DialogCursor,
        limit: i32,
    ) -> Result<Vec<DialogEntry>, TelegramError>;

    /// Returns every dialog filter of the account.
    async fn get_dialog_filters(&self) -> Result<Vec<RemoteFilter>, TelegramError>;

    /// Creates or overwrites the folder with `folder.id`.
    async fn update_dialog_filter(&self, folder: &Folder) -> Result<bool, TelegramError>;

    /// Resolves a chat identifier to a peer reference.
    async fn resolve_peer(&self, chat_id: i64) -> Result<PeerRef, TelegramError>;

    /// Fetches the current state of the chat behind `peer`.
    ///
    /// Chats that cannot be reached any more come back as
    /// [`Resolution::Unreachable`]; only transport failures are errors.
    async fn resolve_chat(&self, peer: &PeerRef) -> Result<Resolution, TelegramError>;

    /// Resolves a public username (without `@`).
    async fn resolve_username(&self, username: &str) -> Result<ChatSummary, TelegramError>;

    /// Sends a message and returns its id.
    async fn send_message(
        &self,
        chat_id: i64,
        message: &OutgoingMessage,
    ) -> Result<i32, TelegramError>;

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        html: bool,
    ) -> Result<(), TelegramError>;

    async fn delete_messages(&self, chat_id: i64, message_ids: &[i32])
    -> Result<(), TelegramError>;

    /// Fetches a single message; `None` if it does not exist.
    async fn get_message(
        &self,
        chat_id: i64,
        message_id: i32,
    ) -> Result<Option<MessageInfo>, TelegramError>;

    /// Replaces the inline keyboard of a message.
    async fn edit_reply_markup(
        &self,
        chat_id: i64,
        message_id: i32,
        keyboard: &Keyboard,
    ) -> Result<(), TelegramError>;

    async fn pin_message(
        &self,
        chat_id: i64,
        message_id: i32,
        silent: bool,
    ) -> Result<(), TelegramError>;

    async fn unpin_message(&self, chat_id: i64, message_id: i32) -> Result<(), TelegramError>;

    /// Joins a public chat by username.
    async fn join_public(&self, username: &str) -> Result<(), TelegramError>;

    /// Joins a chat through an invite link hash.
    async fn join_invite(&self, hash: &str) -> Result<(), TelegramError>;

    async fn leave_chat(&self, chat_id: i64) -> Result<(), TelegramError>;

    /// Uploads a file and sends it as a document.
    async fn send_document(
        &self,
        chat_id: i64,
        path: &Path,
        caption: &str,
    ) -> Result<(), TelegramError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_flood_wait() {
        assert_eq!(extract_flood_wait_seconds("FLOOD_WAIT_120"), Some(120));
        assert_eq!(extract_flood_wait_seconds("flood wait 60 seconds"), Some(60));
        assert_eq!(extract_flood_wait_seconds("some other error"), None);
    }

    #[test]
    fn test_rpc_text_classification() {
        assert!(matches!(
            TelegramError::from_rpc_text("rpc error 420: FLOOD_WAIT_30".to_owned()),
            TelegramError::FloodWait(30)
        ));
        assert!(matches!(
            TelegramError::from_rpc_text("rpc error 400: CHANNEL_PRIVATE".to_owned()),
            TelegramError::Invocation(_)
        ));
    }
}
