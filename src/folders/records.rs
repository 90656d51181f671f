//! Tracking and exclusion records.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::store::{Collection, Document, StoreError};
use crate::telegram::{ChatKind, ChatSummary};

/// Collection name of the admin-chat tracking records.
pub const ADMIN_CHATS: &str = "adm_chat";

/// Collection name of the excluded-chat records.
pub const EXCLUDED_CHATS: &str = "exc_chat";

/// A chat remembered by one of the folder collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    #[serde(rename = "_id")]
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ChatKind,
}

impl ChatRecord {
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>, kind: ChatKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
        }
    }
}

impl From<&ChatSummary> for ChatRecord {
    fn from(chat: &ChatSummary) -> Self {
        Self::new(chat.id, chat.title.clone(), chat.kind)
    }
}

impl Document for ChatRecord {
    fn id(&self) -> i64 {
        self.id
    }
}

/// Shared handle to a collection of chat records.
pub type ChatRecords = Arc<dyn Collection<ChatRecord>>;

/// The two collections the folder commands maintain.
#[derive(Clone)]
pub struct FolderStores {
    /// Last known folder membership, for status reporting only.
    pub admin_chats: ChatRecords,
    /// Chats the operator opted out of the folder.
    pub excluded_chats: ChatRecords,
}

impl FolderStores {
    #[must_use]
    pub fn new(admin_chats: ChatRecords, excluded_chats: ChatRecords) -> Self {
        Self {
            admin_chats,
            excluded_chats,
        }
    }

    /// Identifiers of every excluded chat.
    ///
    /// Every folder operation goes through this so that exclusion is
    /// decided the same way everywhere.
    pub async fn excluded_ids(&self) -> Result<HashSet<i64>, StoreError> {
        Ok(self
            .excluded_chats
            .all()
            .await?
            .into_iter()
            .map(|record| record.id)
            .collect())
    }
}

impl std::fmt::Debug for FolderStores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolderStores").finish_non_exhaustive()
    }
}
