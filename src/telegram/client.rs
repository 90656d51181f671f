//! Telegram client wrapper backed by grammers.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use grammers_client::client::{LoginToken, PasswordToken};
use grammers_client::parsers::parse_html_message;
use grammers_client::{sender, Client, InvocationError, SenderPool, SignInError};
use grammers_session::storages::SqliteSession;
use grammers_session::updates::UpdatesLike;
use grammers_tl_types as tl;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::api::{ChatApi, TelegramError};
use super::convert::{
    chat_summary, dialog_entries, index_summaries, input_channel, input_peer, markup_from_keyboard,
    message_info, peer_marked_id, remote_filter, raw_filter, user_summary,
};
use super::types::{
    ChatSummary, DialogCursor, DialogEntry, Folder, IncomingMessage, Keyboard, MarkedId,
    MessageInfo, OutgoingMessage, PeerRef, RemoteFilter, Resolution,
};
use crate::config::TelegramConfig;
use crate::folders::DialogIter;

/// Re-export types for external use.
pub use grammers_client::client::{LoginToken as Token, PasswordToken as PwdToken};

/// Raw updates produced by the sender pool.
pub type RawUpdatesReceiver = mpsc::UnboundedReceiver<UpdatesLike>;

/// Size of one `upload.saveFilePart` chunk.
const UPLOAD_PART_SIZE: usize = 512 * 1024;

/// Largest file `upload.saveFilePart` accepts (bigger files need the big-file API).
const MAX_SMALL_FILE_SIZE: usize = 10 * 1024 * 1024;

impl From<InvocationError> for TelegramError {
    fn from(err: InvocationError) -> Self {
        Self::from_rpc_text(err.to_string())
    }
}

/// High-level Telegram client wrapper.
pub struct TelegramBot {
    /// The underlying grammers client.
    client: Client,

    /// Handle to the sender pool for disconnection.
    handle: sender::SenderPoolHandle,

    /// Peers seen in responses and updates, keyed by marked chat id.
    peers: RwLock<HashMap<i64, PeerRef>>,

    /// Background task running the sender pool.
    _pool_task: JoinHandle<()>,
}

impl TelegramBot {
    /// Connects to Telegram with the given configuration.
    ///
    /// Returns the bot together with the raw updates it will receive.
    ///
    /// # Errors
    ///
    /// Returns an error if connection fails.
    pub async fn connect(
        config: &TelegramConfig,
    ) -> Result<(Self, RawUpdatesReceiver), TelegramError> {
        info!("Connecting to Telegram...");

        let session = Arc::new(
            SqliteSession::open(&config.session_path)
                .await
                .map_err(|e| TelegramError::Session(e.to_string()))?,
        );

        let SenderPool {
            runner,
            updates,
            handle,
        } = SenderPool::new(Arc::clone(&session), config.api_id);

        let client = Client::new(handle.clone());

        // Spawn the sender pool runner
        let pool_task = tokio::spawn(async move {
            runner.run().await;
        });

        let is_authorized = client
            .is_authorized()
            .await
            .map_err(|e| TelegramError::Connection(e.to_string()))?;

        info!("Connected to Telegram. Authorized: {}", is_authorized);

        let bot = Self {
            client,
            handle: handle.thin,
            peers: RwLock::new(HashMap::new()),
            _pool_task: pool_task,
        };
        Ok((bot, updates))
    }

    /// Checks if the client is authorized.
    ///
    /// # Errors
    ///
    /// Returns an error if the check fails.
    pub async fn is_authorized(&self) -> Result<bool, TelegramError> {
        self.client
            .is_authorized()
            .await
            .map_err(|e| TelegramError::Connection(e.to_string()))
    }

    /// Requests a login code to be sent to the phone number.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn request_login_code(
        &self,
        phone: &str,
        api_hash: &str,
    ) -> Result<LoginToken, TelegramError> {
        info!("Requesting login code for phone: {}...", mask_phone(phone));

        self.client
            .request_login_code(phone, api_hash)
            .await
            .map_err(|e| TelegramError::SignInFailed(e.to_string()))
    }

    /// Signs in with the login code.
    ///
    /// A 2FA-protected account yields `Ok(Some(token))`; finish with
    /// [`Self::check_password`].
    ///
    /// # Errors
    ///
    /// Returns an error if sign in fails.
    pub async fn sign_in(
        &self,
        token: &LoginToken,
        code: &str,
    ) -> Result<Option<PasswordToken>, TelegramError> {
        info!("Signing in with login code...");

        match self.client.sign_in(token, code).await {
            Ok(_user) => {
                info!("Successfully signed in!");
                Ok(None)
            }
            Err(SignInError::PasswordRequired(password_token)) => {
                debug!("2FA password required, hint: {:?}", password_token.hint());
                Ok(Some(password_token))
            }
            Err(SignInError::InvalidCode) => {
                Err(TelegramError::SignInFailed("Invalid code".to_owned()))
            }
            Err(e) => Err(TelegramError::SignInFailed(e.to_string())),
        }
    }

    /// Checks the 2FA password.
    ///
    /// # Errors
    ///
    /// Returns an error if the password is invalid.
    pub async fn check_password(
        &self,
        password_token: PasswordToken,
        password: &str,
    ) -> Result<(), TelegramError> {
        info!("Checking 2FA password...");

        match self.client.check_password(password_token, password).await {
            Ok(_user) => {
                info!("Successfully authenticated with 2FA!");
                Ok(())
            }
            Err(SignInError::InvalidPassword(_)) => {
                Err(TelegramError::SignInFailed("Invalid password".to_owned()))
            }
            Err(e) => Err(TelegramError::SignInFailed(e.to_string())),
        }
    }

    /// Turns one raw updates batch into command candidates.
    ///
    /// Peers carried by the batch are remembered for later resolution.
    pub async fn incoming_messages(&self, updates: UpdatesLike) -> Vec<IncomingMessage> {
        let UpdatesLike::Updates(updates) = updates else {
            return Vec::new();
        };

        let (messages, summaries) = super::convert::incoming_messages(&updates);
        self.remember(summaries.iter()).await;
        messages
    }

    /// Disconnects from Telegram.
    pub fn disconnect(&self) {
        info!("Disconnecting from Telegram...");
        self.handle.quit();
    }

    async fn remember<'a>(&self, summaries: impl Iterator<Item = &'a ChatSummary>) {
        let mut peers = self.peers.write().await;
        for summary in summaries {
            remember_peer(&mut peers, summary.id, summary.peer);
        }
    }

    /// Walks the dialog list looking for `chat_id`; every page fills the cache.
    async fn scan_dialogs_for(&self, chat_id: i64) -> Result<Option<PeerRef>, TelegramError> {
        info!("Peer {} not cached, scanning dialogs", chat_id);
        let mut dialogs = DialogIter::new(self);
        while let Some(chat) = dialogs.next().await? {
            if chat.id == chat_id && chat.peer.is_addressable() {
                return Ok(Some(chat.peer));
            }
        }
        Ok(None)
    }

    async fn invoke<R: tl::RemoteCall>(&self, request: &R) -> Result<R::Return, TelegramError> {
        let result = self.client.invoke(request).await;
        if let Err(e) = &result {
            debug!("Request failed: {}", e);
        }
        result.map_err(Into::into)
    }

    async fn channel_peer(&self, chat_id: i64) -> Result<tl::enums::InputChannel, TelegramError> {
        match self.resolve_peer(chat_id).await? {
            PeerRef::Channel {
                channel_id,
                access_hash,
            } => Ok(input_channel(channel_id, access_hash)),
            _ => Err(TelegramError::UnexpectedResponse("chat is not a channel")),
        }
    }

    async fn upload_file(&self, path: &Path) -> Result<tl::enums::InputFile, TelegramError> {
        let bytes = tokio::fs::read(path).await?;
        if bytes.len() > MAX_SMALL_FILE_SIZE {
            return Err(TelegramError::UnexpectedResponse("file too large to upload"));
        }

        let file_id: i64 = rand::random();
        let mut parts = 0;
        for (index, chunk) in bytes.chunks(UPLOAD_PART_SIZE).enumerate() {
            let file_part = i32::try_from(index)
                .map_err(|_| TelegramError::UnexpectedResponse("too many upload parts"))?;
            self.invoke(&tl::functions::upload::SaveFilePart {
                file_id,
                file_part,
                bytes: chunk.to_vec(),
            })
            .await?;
            parts = file_part + 1;
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(tl::enums::InputFile::File(tl::types::InputFile {
            id: file_id,
            parts,
            name,
            md5_checksum: String::new(),
        }))
    }
}

/// Finds the id of the message created by a send request.
fn sent_message_id(updates: &tl::enums::Updates, random_id: i64) -> Option<i32> {
    let from_list = |list: &[tl::enums::Update]| {
        list.iter().find_map(|update| match update {
            tl::enums::Update::MessageId(u) if u.random_id == random_id => Some(u.id),
            _ => None,
        })
    };

    match updates {
        tl::enums::Updates::UpdateShortSentMessage(u) => Some(u.id),
        tl::enums::Updates::Updates(u) => from_list(&u.updates),
        tl::enums::Updates::Combined(u) => from_list(&u.updates),
        _ => None,
    }
}

fn messages_of(
    response: tl::enums::messages::Messages,
) -> (Vec<tl::enums::Message>, Vec<tl::enums::Chat>, Vec<tl::enums::User>) {
    match response {
        tl::enums::messages::Messages::Messages(m) => (m.messages, m.chats, m.users),
        tl::enums::messages::Messages::Slice(m) => (m.messages, m.chats, m.users),
        tl::enums::messages::Messages::ChannelMessages(m) => (m.messages, m.chats, m.users),
        tl::enums::messages::Messages::NotModified(_) => (Vec::new(), Vec::new(), Vec::new()),
    }
}

fn first_chat(response: tl::enums::messages::Chats) -> Option<ChatSummary> {
    let chats = match response {
        tl::enums::messages::Chats::Chats(c) => c.chats,
        tl::enums::messages::Chats::Slice(c) => c.chats,
    };
    chats.first().map(chat_summary)
}

#[async_trait]
impl ChatApi for TelegramBot {
    async fn get_dialogs(
        &self,
        cursor: &DialogCursor,
        limit: i32,
    ) -> Result<Vec<DialogEntry>, TelegramError> {
        let request = tl::functions::messages::GetDialogs {
            exclude_pinned: false,
            folder_id: None,
            offset_date: cursor.offset_date,
            offset_id: cursor.offset_id,
            offset_peer: cursor
                .offset_peer
                .as_ref()
                .map_or(tl::enums::InputPeer::Empty, input_peer),
            limit,
            hash: 0,
        };

        let (dialogs, messages, chats, users) = match self.invoke(&request).await? {
            tl::enums::messages::Dialogs::Dialogs(d) => (d.dialogs, d.messages, d.chats, d.users),
            tl::enums::messages::Dialogs::Slice(d) => (d.dialogs, d.messages, d.chats, d.users),
            tl::enums::messages::Dialogs::NotModified(_) => return Ok(Vec::new()),
        };

        let entries = dialog_entries(&dialogs, &messages, &chats, &users);
        self.remember(entries.iter().map(|e| &e.chat)).await;
        debug!("Fetched dialog page with {} entries", entries.len());
        Ok(entries)
    }

    async fn get_dialog_filters(&self) -> Result<Vec<RemoteFilter>, TelegramError> {
        let tl::enums::messages::DialogFilters::Filters(response) = self
            .invoke(&tl::functions::messages::GetDialogFilters {})
            .await?;

        response.filters.iter().map(remote_filter).collect()
    }

    async fn update_dialog_filter(&self, folder: &Folder) -> Result<bool, TelegramError> {
        info!(
            "Pushing folder {} \"{}\" with {} included peers",
            folder.id,
            folder.title,
            folder.include_peers.len()
        );

        let result = self
            .invoke(&tl::functions::messages::UpdateDialogFilter {
                id: folder.id,
                filter: Some(raw_filter(folder)),
            })
            .await?;
        Ok(matches!(result, tl::enums::Bool::True))
    }

    async fn resolve_peer(&self, chat_id: i64) -> Result<PeerRef, TelegramError> {
        if let Some(peer) = self.peers.read().await.get(&chat_id) {
            return Ok(*peer);
        }

        match MarkedId::parse(chat_id) {
            MarkedId::Chat(id) => Ok(PeerRef::Chat { chat_id: id }),
            MarkedId::User(_) | MarkedId::Channel(_) => self
                .scan_dialogs_for(chat_id)
                .await?
                .ok_or(TelegramError::PeerNotFound(chat_id)),
        }
    }

    async fn resolve_chat(&self, peer: &PeerRef) -> Result<Resolution, TelegramError> {
        let result = match *peer {
            PeerRef::Channel {
                channel_id,
                access_hash,
            } => self
                .client
                .invoke(&tl::functions::channels::GetChannels {
                    id: vec![input_channel(channel_id, access_hash)],
                })
                .await
                .map(first_chat),
            PeerRef::Chat { chat_id } => self
                .client
                .invoke(&tl::functions::messages::GetChats { id: vec![chat_id] })
                .await
                .map(first_chat),
            PeerRef::User {
                user_id,
                access_hash,
            } => self
                .client
                .invoke(&tl::functions::users::GetUsers {
                    id: vec![tl::enums::InputUser::User(tl::types::InputUser {
                        user_id,
                        access_hash,
                    })],
                })
                .await
                .map(|users| users.first().map(user_summary)),
            PeerRef::Myself => self
                .client
                .invoke(&tl::functions::users::GetUsers {
                    id: vec![tl::enums::InputUser::UserSelf],
                })
                .await
                .map(|users| users.first().map(user_summary)),
        };

        match result {
            Ok(Some(summary)) => {
                self.remember(std::iter::once(&summary)).await;
                Ok(Resolution::Found(summary))
            }
            Ok(None) => Ok(Resolution::Unreachable),
            Err(InvocationError::Rpc(rpc)) => {
                debug!("Peer {} unreachable: {}", peer.marked_id(), rpc);
                Ok(Resolution::Unreachable)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn resolve_username(&self, username: &str) -> Result<ChatSummary, TelegramError> {
        let tl::enums::contacts::ResolvedPeer::Peer(resolved) = self
            .invoke(&tl::functions::contacts::ResolveUsername {
                username: username.trim_start_matches('@').to_owned(),
                referer: None,
            })
            .await?;

        let summaries = index_summaries(&resolved.chats, &resolved.users);
        self.remember(summaries.values()).await;

        summaries
            .get(&peer_marked_id(&resolved.peer))
            .cloned()
            .ok_or(TelegramError::UnexpectedResponse("resolved peer missing from response"))
    }

    async fn send_message(
        &self,
        chat_id: i64,
        message: &OutgoingMessage,
    ) -> Result<i32, TelegramError> {
        let peer = self.resolve_peer(chat_id).await?;
        let (text, entities) = if message.html {
            parse_html_message(&message.text)
        } else {
            (message.text.clone(), Vec::new())
        };
        let random_id: i64 = rand::random();

        let request = tl::functions::messages::SendMessage {
            no_webpage: true,
            silent: message.silent,
            background: false,
            clear_draft: false,
            noforwards: false,
            update_stickersets_order: false,
            invert_media: false,
            allow_paid_floodskip: false,
            peer: input_peer(&peer),
            reply_to: message.reply_to.map(|reply_to_msg_id| {
                tl::enums::InputReplyTo::Message(tl::types::InputReplyToMessage {
                    reply_to_msg_id,
                    top_msg_id: None,
                    reply_to_peer_id: None,
                    quote_text: None,
                    quote_entities: None,
                    quote_offset: None,
                    monoforum_peer_id: None,
                    todo_item_id: None,
                })
            }),
            message: text,
            random_id,
            reply_markup: None,
            entities: if entities.is_empty() { None } else { Some(entities) },
            schedule_date: message.schedule_date,
            send_as: None,
            quick_reply_shortcut: None,
            effect: None,
            allow_paid_stars: None,
            suggested_post: None,
        };

        let updates = self.invoke(&request).await?;
        sent_message_id(&updates, random_id)
            .ok_or(TelegramError::UnexpectedResponse("sent message id missing"))
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        html: bool,
    ) -> Result<(), TelegramError> {
        let peer = self.resolve_peer(chat_id).await?;
        let (text, entities) = if html {
            parse_html_message(text)
        } else {
            (text.to_owned(), Vec::new())
        };

        self.invoke(&tl::functions::messages::EditMessage {
            no_webpage: true,
            invert_media: false,
            peer: input_peer(&peer),
            id: message_id,
            message: Some(text),
            media: None,
            reply_markup: None,
            entities: if entities.is_empty() { None } else { Some(entities) },
            schedule_date: None,
            quick_reply_shortcut_id: None,
        })
        .await
        .map(drop)
    }

    async fn delete_messages(
        &self,
        chat_id: i64,
        message_ids: &[i32],
    ) -> Result<(), TelegramError> {
        if let MarkedId::Channel(_) = MarkedId::parse(chat_id) {
            let channel = self.channel_peer(chat_id).await?;
            self.invoke(&tl::functions::channels::DeleteMessages {
                channel,
                id: message_ids.to_vec(),
            })
            .await
            .map(drop)
        } else {
            self.invoke(&tl::functions::messages::DeleteMessages {
                revoke: true,
                id: message_ids.to_vec(),
            })
            .await
            .map(drop)
        }
    }

    async fn get_message(
        &self,
        chat_id: i64,
        message_id: i32,
    ) -> Result<Option<MessageInfo>, TelegramError> {
        let id = vec![tl::enums::InputMessage::Id(tl::types::InputMessageId {
            id: message_id,
        })];

        let response = if let MarkedId::Channel(_) = MarkedId::parse(chat_id) {
            let channel = self.channel_peer(chat_id).await?;
            self.invoke(&tl::functions::channels::GetMessages { channel, id })
                .await?
        } else {
            self.invoke(&tl::functions::messages::GetMessages { id }).await?
        };

        let (messages, chats, users) = messages_of(response);
        let summaries = index_summaries(&chats, &users);
        self.remember(summaries.values()).await;

        Ok(messages.iter().find_map(|m| message_info(m, &summaries)))
    }

    async fn edit_reply_markup(
        &self,
        chat_id: i64,
        message_id: i32,
        keyboard: &Keyboard,
    ) -> Result<(), TelegramError> {
        let peer = self.resolve_peer(chat_id).await?;
        self.invoke(&tl::functions::messages::EditMessage {
            no_webpage: false,
            invert_media: false,
            peer: input_peer(&peer),
            id: message_id,
            message: None,
            media: None,
            reply_markup: Some(markup_from_keyboard(keyboard)),
            entities: None,
            schedule_date: None,
            quick_reply_shortcut_id: None,
        })
        .await
        .map(drop)
    }

    async fn pin_message(
        &self,
        chat_id: i64,
        message_id: i32,
        silent: bool,
    ) -> Result<(), TelegramError> {
        let peer = self.resolve_peer(chat_id).await?;
        self.invoke(&tl::functions::messages::UpdatePinnedMessage {
            silent,
            unpin: false,
            pm_oneside: false,
            peer: input_peer(&peer),
            id: message_id,
        })
        .await
        .map(drop)
    }

    async fn unpin_message(&self, chat_id: i64, message_id: i32) -> Result<(), TelegramError> {
        let peer = self.resolve_peer(chat_id).await?;
        self.invoke(&tl::functions::messages::UpdatePinnedMessage {
            silent: true,
            unpin: true,
            pm_oneside: false,
            peer: input_peer(&peer),
            id: message_id,
        })
        .await
        .map(drop)
    }

    async fn join_public(&self, username: &str) -> Result<(), TelegramError> {
        let chat = self.resolve_username(username).await?;
        let PeerRef::Channel {
            channel_id,
            access_hash,
        } = chat.peer
        else {
            return Err(TelegramError::UnexpectedResponse("username is not a public chat"));
        };

        info!("Joining {} ({})", chat.title, chat.id);
        self.invoke(&tl::functions::channels::JoinChannel {
            channel: input_channel(channel_id, access_hash),
        })
        .await
        .map(drop)
    }

    async fn join_invite(&self, hash: &str) -> Result<(), TelegramError> {
        info!("Joining through invite link");
        self.invoke(&tl::functions::messages::ImportChatInvite {
            hash: hash.to_owned(),
        })
        .await
        .map(drop)
    }

    async fn leave_chat(&self, chat_id: i64) -> Result<(), TelegramError> {
        match MarkedId::parse(chat_id) {
            MarkedId::Channel(_) => {
                let channel = self.channel_peer(chat_id).await?;
                self.invoke(&tl::functions::channels::LeaveChannel { channel })
                    .await
                    .map(drop)
            }
            MarkedId::Chat(id) => self
                .invoke(&tl::functions::messages::DeleteChatUser {
                    revoke_history: false,
                    chat_id: id,
                    user_id: tl::enums::InputUser::UserSelf,
                })
                .await
                .map(drop),
            MarkedId::User(_) => {
                warn!("Refusing to leave private chat {}", chat_id);
                Err(TelegramError::UnexpectedResponse("cannot leave a private chat"))
            }
        }
    }

    async fn send_document(
        &self,
        chat_id: i64,
        path: &Path,
        caption: &str,
    ) -> Result<(), TelegramError> {
        let peer = self.resolve_peer(chat_id).await?;
        let file = self.upload_file(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let media = tl::enums::InputMedia::UploadedDocument(tl::types::InputMediaUploadedDocument {
            nosound_video: false,
            force_file: true,
            spoiler: false,
            file,
            thumb: None,
            mime_type: "text/plain".to_owned(),
            attributes: vec![tl::enums::DocumentAttribute::Filename(
                tl::types::DocumentAttributeFilename { file_name },
            )],
            stickers: None,
            video_cover: None,
            video_timestamp: None,
            ttl_seconds: None,
        });

        self.invoke(&tl::functions::messages::SendMedia {
            silent: false,
            background: false,
            clear_draft: false,
            noforwards: false,
            update_stickersets_order: false,
            invert_media: false,
            allow_paid_floodskip: false,
            peer: input_peer(&peer),
            reply_to: None,
            media,
            message: caption.to_owned(),
            random_id: rand::random(),
            reply_markup: None,
            entities: None,
            schedule_date: None,
            send_as: None,
            quick_reply_shortcut: None,
            effect: None,
            allow_paid_stars: None,
            suggested_post: None,
        })
        .await
        .map(drop)
    }
}

impl std::fmt::Debug for TelegramBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBot").finish_non_exhaustive()
    }
}

/// Caches `peer` under `id` unless it cannot be addressed. A usable entry is
/// never replaced by one without an access hash.
fn remember_peer(peers: &mut HashMap<i64, PeerRef>, id: i64, peer: PeerRef) {
    if peer.is_addressable() {
        peers.insert(id, peer);
    }
}

/// Masks a phone number for logging (shows last 4 digits).
fn mask_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.len() > 4 {
        format!("***{}", &digits[digits.len() - 4..])
    } else {
        "****".to_owned()
    }
}
