//! Transport-neutral chat, peer and folder types.
//!
//! Everything the commands reason about is expressed with these types; the
//! grammers-backed client converts raw TL objects into them at the edge.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Offset added to channel ids when building a "marked" chat identifier.
const CHANNEL_ID_OFFSET: i64 = 1_000_000_000_000;

/// Category of a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Private,
    Bot,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    /// Returns the lowercase name used in records and replies.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Bot => "bot",
            Self::Group => "group",
            Self::Supergroup => "supergroup",
            Self::Channel => "channel",
        }
    }
}

impl fmt::Display for ChatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque token identifying a peer reference (kind, entity id and access hash).
///
/// Two peer references address the same entity iff their tokens are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccessToken(Vec<u8>);

impl AccessToken {
    fn build(tag: u8, id: i64, hash: i64) -> Self {
        let mut bytes = Vec::with_capacity(17);
        bytes.push(tag);
        bytes.extend_from_slice(&id.to_le_bytes());
        bytes.extend_from_slice(&hash.to_le_bytes());
        Self(bytes)
    }

    /// Raw token bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// A resolved reference usable to address a chat in API calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerRef {
    /// The logged-in account itself.
    Myself,
    User { user_id: i64, access_hash: i64 },
    Chat { chat_id: i64 },
    Channel { channel_id: i64, access_hash: i64 },
}

impl PeerRef {
    /// Returns the marked chat identifier this peer points at.
    ///
    /// Users keep their id, basic groups are negated and channels use the
    /// `-100` prefix. `Myself` has no id of its own and maps to 0.
    #[must_use]
    pub const fn marked_id(&self) -> i64 {
        match *self {
            Self::Myself => 0,
            Self::User { user_id, .. } => user_id,
            Self::Chat { chat_id } => -chat_id,
            Self::Channel { channel_id, .. } => -(CHANNEL_ID_OFFSET + channel_id),
        }
    }

    /// Whether API calls can address this peer. Users and channels need a
    /// real access hash; 0 stands for "unknown".
    #[must_use]
    pub const fn is_addressable(&self) -> bool {
        match *self {
            Self::Myself | Self::Chat { .. } => true,
            Self::User { access_hash, .. } | Self::Channel { access_hash, .. } => access_hash != 0,
        }
    }

    #[must_use]
    pub fn access_token(&self) -> AccessToken {
        match *self {
            Self::Myself => AccessToken::build(0, 0, 0),
            Self::User {
                user_id,
                access_hash,
            } => AccessToken::build(1, user_id, access_hash),
            Self::Chat { chat_id } => AccessToken::build(2, chat_id, 0),
            Self::Channel {
                channel_id,
                access_hash,
            } => AccessToken::build(3, channel_id, access_hash),
        }
    }
}

/// Splits a marked chat identifier into the bare entity id and its peer shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkedId {
    User(i64),
    Chat(i64),
    Channel(i64),
}

impl MarkedId {
    #[must_use]
    pub const fn parse(marked: i64) -> Self {
        if marked >= 0 {
            Self::User(marked)
        } else if marked <= -CHANNEL_ID_OFFSET {
            Self::Channel(-marked - CHANNEL_ID_OFFSET)
        } else {
            Self::Chat(-marked)
        }
    }
}

/// Summary of one chat as seen from the account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSummary {
    /// Marked chat identifier.
    pub id: i64,
    /// Title for groups/channels, full name for users.
    pub title: String,
    pub kind: ChatKind,
    /// Whether the account is creator or holds admin rights.
    pub is_admin: bool,
    pub username: Option<String>,
    pub peer: PeerRef,
}

/// Id and date of the latest message in a dialog, used as pagination cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopMessage {
    pub id: i32,
    pub date: i32,
}

/// One row of a dialog page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogEntry {
    pub chat: ChatSummary,
    pub top_message: Option<TopMessage>,
}

/// Cursor for the next dialog page. The default value requests the first page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DialogCursor {
    pub offset_date: i32,
    pub offset_id: i32,
    pub offset_peer: Option<PeerRef>,
}

/// Outcome of looking up the current state of a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(ChatSummary),
    /// The chat is gone, private, or the account was removed from it.
    Unreachable,
}

/// Inclusion flags of a folder that are not peer lists.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FolderFlags {
    pub contacts: bool,
    pub non_contacts: bool,
    pub groups: bool,
    pub broadcasts: bool,
    pub bots: bool,
    pub exclude_muted: bool,
    pub exclude_read: bool,
    pub exclude_archived: bool,
}

/// A chat folder (dialog filter) as stored by Telegram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    pub id: i32,
    pub title: String,
    pub emoticon: Option<String>,
    pub color: Option<i32>,
    pub flags: FolderFlags,
    pub pinned_peers: Vec<PeerRef>,
    pub include_peers: Vec<PeerRef>,
    pub exclude_peers: Vec<PeerRef>,
}

impl Folder {
    /// Creates an empty folder with the given slot and title.
    #[must_use]
    pub fn new(id: i32, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            emoticon: None,
            color: None,
            flags: FolderFlags::default(),
            pinned_peers: Vec::new(),
            include_peers: Vec::new(),
            exclude_peers: Vec::new(),
        }
    }
}

/// Every kind of dialog filter `messages.getDialogFilters` can return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteFilter {
    /// The built-in "All chats" entry.
    Default,
    Folder(Folder),
    /// A shared chat-list folder. Occupies an id but is never edited here.
    Chatlist(Folder),
}

impl RemoteFilter {
    /// Folder id, if the entry occupies a slot.
    #[must_use]
    pub const fn id(&self) -> Option<i32> {
        match self {
            Self::Default => None,
            Self::Folder(folder) | Self::Chatlist(folder) => Some(folder.id),
        }
    }
}

/// A URL button of an inline keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlButton {
    pub text: String,
    pub url: String,
}

/// Inline keyboard, row by row.
pub type Keyboard = Vec<Vec<UrlButton>>;

/// Someone or something a message came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedPeer {
    pub id: i64,
    pub name: String,
}

/// Details of an existing message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageInfo {
    pub id: i32,
    pub text: String,
    pub sender: Option<NamedPeer>,
    pub forward_origin: Option<NamedPeer>,
    /// URL-only view of the inline keyboard; `None` when the message has none.
    pub keyboard: Option<Keyboard>,
}

/// A message received on the updates stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub id: i32,
    pub chat_id: i64,
    pub chat_title: Option<String>,
    pub chat_kind: ChatKind,
    pub sender_id: Option<i64>,
    /// Sent by the logged-in account.
    pub outgoing: bool,
    pub text: String,
    pub reply_to: Option<i32>,
}

/// A message to be sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    /// Parse `text` as HTML.
    pub html: bool,
    pub reply_to: Option<i32>,
    /// Unix timestamp to schedule the message for.
    pub schedule_date: Option<i32>,
    pub silent: bool,
}

impl OutgoingMessage {
    /// An HTML message.
    #[must_use]
    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            html: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn reply_to(mut self, message_id: i32) -> Self {
        self.reply_to = Some(message_id);
        self
    }

    #[must_use]
    pub const fn scheduled_at(mut self, timestamp: i32) -> Self {
        self.schedule_date = Some(timestamp);
        self
    }
}

/// Escapes text for use inside an HTML-formatted message.
#[must_use]
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
