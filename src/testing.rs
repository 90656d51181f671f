//! In-memory `ChatApi` used by unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::telegram::types::MarkedId;
use crate::telegram::{
    ChatApi, ChatKind, ChatSummary, DialogCursor, DialogEntry, Folder, Keyboard, MessageInfo,
    OutgoingMessage, PeerRef, RemoteFilter, Resolution, TelegramError, TopMessage,
};

/// Everything the fake server knows and everything it was asked to do.
#[derive(Debug)]
pub struct FakeState {
    /// Dialog list served page by page in this order.
    pub dialogs: Vec<DialogEntry>,
    /// When non-empty, pages are popped from here instead of `dialogs`.
    pub scripted_pages: VecDeque<Vec<DialogEntry>>,
    pub filters: Vec<RemoteFilter>,
    /// Current chat state overriding the dialog list for `resolve_chat`.
    pub chats: HashMap<i64, ChatSummary>,
    pub unreachable: HashSet<i64>,
    pub usernames: HashMap<String, ChatSummary>,
    pub messages: HashMap<(i64, i32), MessageInfo>,
    pub push_result: bool,
    pub fail_dialogs: bool,
    pub fail_joins: bool,

    pub dialog_calls: Vec<DialogCursor>,
    pub pushes: Vec<Folder>,
    pub sent: Vec<(i64, i32, OutgoingMessage)>,
    pub edits: Vec<(i64, i32, String)>,
    pub deleted: Vec<(i64, Vec<i32>)>,
    pub markups: Vec<(i64, i32, Keyboard)>,
    pub pins: Vec<(i64, i32, bool)>,
    pub unpins: Vec<(i64, i32)>,
    pub joined: Vec<String>,
    pub left: Vec<i64>,
    /// Chat, file name, caption and file content of uploaded documents.
    pub documents: Vec<(i64, String, String, String)>,
    next_message_id: i32,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            dialogs: Vec::new(),
            scripted_pages: VecDeque::new(),
            filters: vec![RemoteFilter::Default],
            chats: HashMap::new(),
            unreachable: HashSet::new(),
            usernames: HashMap::new(),
            messages: HashMap::new(),
            push_result: true,
            fail_dialogs: false,
            fail_joins: false,
            dialog_calls: Vec::new(),
            pushes: Vec::new(),
            sent: Vec::new(),
            edits: Vec::new(),
            deleted: Vec::new(),
            markups: Vec::new(),
            pins: Vec::new(),
            unpins: Vec::new(),
            joined: Vec::new(),
            left: Vec::new(),
            documents: Vec::new(),
            next_message_id: 1000,
        }
    }
}

impl FakeState {
    /// The folder titled `title`, if any.
    pub fn folder(&self, title: &str) -> Option<&Folder> {
        self.filters.iter().find_map(|filter| match filter {
            RemoteFilter::Folder(folder) if folder.title == title => Some(folder),
            _ => None,
        })
    }

    /// Texts of all sent messages, in order.
    pub fn sent_texts(&self) -> Vec<String> {
        self.sent.iter().map(|(_, _, m)| m.text.clone()).collect()
    }
}

#[derive(Debug, Default)]
pub struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dialogs(dialogs: Vec<DialogEntry>) -> Self {
        let api = Self::new();
        api.state().dialogs = dialogs;
        api
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    fn next_id(&self) -> i32 {
        let mut state = self.state();
        state.next_message_id += 1;
        state.next_message_id
    }

    fn lookup(&self, chat_id: i64) -> Option<ChatSummary> {
        let state = self.state();
        state.chats.get(&chat_id).cloned().or_else(|| {
            state
                .dialogs
                .iter()
                .find(|entry| entry.chat.id == chat_id)
                .map(|entry| entry.chat.clone())
        })
    }
}

/// A supergroup backed by a channel peer.
pub fn supergroup(channel_id: i64, title: &str, is_admin: bool) -> ChatSummary {
    channel_like(channel_id, title, ChatKind::Supergroup, is_admin)
}

/// A broadcast channel.
pub fn broadcast(channel_id: i64, title: &str, is_admin: bool) -> ChatSummary {
    channel_like(channel_id, title, ChatKind::Channel, is_admin)
}

fn channel_like(channel_id: i64, title: &str, kind: ChatKind, is_admin: bool) -> ChatSummary {
    let peer = PeerRef::Channel {
        channel_id,
        access_hash: channel_id * 31 + 7,
    };
    ChatSummary {
        id: peer.marked_id(),
        title: title.to_owned(),
        kind,
        is_admin,
        username: None,
        peer,
    }
}

/// A basic group.
pub fn basic_group(chat_id: i64, title: &str, is_admin: bool) -> ChatSummary {
    ChatSummary {
        id: -chat_id,
        title: title.to_owned(),
        kind: ChatKind::Group,
        is_admin,
        username: None,
        peer: PeerRef::Chat { chat_id },
    }
}

/// A private chat.
pub fn private(user_id: i64, name: &str) -> ChatSummary {
    ChatSummary {
        id: user_id,
        title: name.to_owned(),
        kind: ChatKind::Private,
        is_admin: false,
        username: None,
        peer: PeerRef::User {
            user_id,
            access_hash: user_id + 1,
        },
    }
}

/// A dialog row whose top message id is `top`.
pub fn entry(chat: ChatSummary, top: i32) -> DialogEntry {
    DialogEntry {
        chat,
        top_message: Some(TopMessage {
            id: top,
            date: 1_700_000_000 - top,
        }),
    }
}

#[async_trait]
impl ChatApi for FakeApi {
    async fn get_dialogs(
        &self,
        cursor: &DialogCursor,
        limit: i32,
    ) -> Result<Vec<DialogEntry>, TelegramError> {
        let mut state = self.state();
        state.dialog_calls.push(*cursor);
        if state.fail_dialogs {
            return Err(TelegramError::Connection("connection reset".to_owned()));
        }
        if let Some(page) = state.scripted_pages.pop_front() {
            return Ok(page);
        }

        let start = cursor.offset_peer.map_or(0, |peer| {
            state
                .dialogs
                .iter()
                .position(|entry| entry.chat.peer == peer)
                .map_or(state.dialogs.len(), |index| index + 1)
        });
        let limit = usize::try_from(limit).unwrap_or_default();
        Ok(state.dialogs.iter().skip(start).take(limit).cloned().collect())
    }

    async fn get_dialog_filters(&self) -> Result<Vec<RemoteFilter>, TelegramError> {
        Ok(self.state().filters.clone())
    }

    async fn update_dialog_filter(&self, folder: &Folder) -> Result<bool, TelegramError> {
        let mut state = self.state();
        state.pushes.push(folder.clone());
        if !state.push_result {
            return Ok(false);
        }
        state.filters.retain(|filter| filter.id() != Some(folder.id));
        state.filters.push(RemoteFilter::Folder(folder.clone()));
        Ok(true)
    }

    async fn resolve_peer(&self, chat_id: i64) -> Result<PeerRef, TelegramError> {
        if let Some(chat) = self.lookup(chat_id) {
            return Ok(chat.peer);
        }
        match MarkedId::parse(chat_id) {
            MarkedId::Chat(id) => Ok(PeerRef::Chat { chat_id: id }),
            _ => Err(TelegramError::PeerNotFound(chat_id)),
        }
    }

    async fn resolve_chat(&self, peer: &PeerRef) -> Result<Resolution, TelegramError> {
        let id = peer.marked_id();
        if self.state().unreachable.contains(&id) {
            return Ok(Resolution::Unreachable);
        }
        Ok(self
            .lookup(id)
            .map_or(Resolution::Unreachable, Resolution::Found))
    }

    async fn resolve_username(&self, username: &str) -> Result<ChatSummary, TelegramError> {
        self.state()
            .usernames
            .get(username.trim_start_matches('@'))
            .cloned()
            .ok_or_else(|| TelegramError::Invocation("USERNAME_NOT_OCCUPIED".to_owned()))
    }

    async fn send_message(
        &self,
        chat_id: i64,
        message: &OutgoingMessage,
    ) -> Result<i32, TelegramError> {
        let id = self.next_id();
        self.state().sent.push((chat_id, id, message.clone()));
        Ok(id)
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        _html: bool,
    ) -> Result<(), TelegramError> {
        let mut state = self.state();
        state.edits.push((chat_id, message_id, text.to_owned()));
        if let Some(message) = state.messages.get_mut(&(chat_id, message_id)) {
            message.text = text.to_owned();
        }
        Ok(())
    }

    async fn delete_messages(
        &self,
        chat_id: i64,
        message_ids: &[i32],
    ) -> Result<(), TelegramError> {
        self.state().deleted.push((chat_id, message_ids.to_vec()));
        Ok(())
    }

    async fn get_message(
        &self,
        chat_id: i64,
        message_id: i32,
    ) -> Result<Option<MessageInfo>, TelegramError> {
        Ok(self.state().messages.get(&(chat_id, message_id)).cloned())
    }

    async fn edit_reply_markup(
        &self,
        chat_id: i64,
        message_id: i32,
        keyboard: &Keyboard,
    ) -> Result<(), TelegramError> {
        let mut state = self.state();
        state.markups.push((chat_id, message_id, keyboard.clone()));
        if let Some(message) = state.messages.get_mut(&(chat_id, message_id)) {
            message.keyboard = Some(keyboard.clone());
        }
        Ok(())
    }

    async fn pin_message(
        &self,
        chat_id: i64,
        message_id: i32,
        silent: bool,
    ) -> Result<(), TelegramError> {
        self.state().pins.push((chat_id, message_id, silent));
        Ok(())
    }

    async fn unpin_message(&self, chat_id: i64, message_id: i32) -> Result<(), TelegramError> {
        self.state().unpins.push((chat_id, message_id));
        Ok(())
    }

    async fn join_public(&self, username: &str) -> Result<(), TelegramError> {
        let mut state = self.state();
        if state.fail_joins {
            return Err(TelegramError::Invocation("USERNAME_INVALID".to_owned()));
        }
        state.joined.push(username.to_owned());
        Ok(())
    }

    async fn join_invite(&self, hash: &str) -> Result<(), TelegramError> {
        let mut state = self.state();
        if state.fail_joins {
            return Err(TelegramError::Invocation("INVITE_HASH_EXPIRED".to_owned()));
        }
        state.joined.push(format!("+{hash}"));
        Ok(())
    }

    async fn leave_chat(&self, chat_id: i64) -> Result<(), TelegramError> {
        self.state().left.push(chat_id);
        Ok(())
    }

    async fn send_document(
        &self,
        chat_id: i64,
        path: &Path,
        caption: &str,
    ) -> Result<(), TelegramError> {
        let content = std::fs::read_to_string(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.state()
            .documents
            .push((chat_id, name, caption.to_owned(), content));
        Ok(())
    }
}

/// A path inside a fresh temporary directory that lives as long as the guard.
pub fn temp_dir() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().to_path_buf();
    (dir, path)
}
