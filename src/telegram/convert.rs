//! Conversions between raw TL objects and the crate's chat types.

use std::collections::HashMap;

use grammers_tl_types as tl;

use super::TelegramError;
use super::types::{
    ChatKind, ChatSummary, DialogEntry, Folder, FolderFlags, IncomingMessage, Keyboard,
    MessageInfo, NamedPeer, PeerRef, RemoteFilter, TopMessage, UrlButton,
};

/// Marked chat identifier of a raw peer.
pub(crate) fn peer_marked_id(peer: &tl::enums::Peer) -> i64 {
    match peer {
        tl::enums::Peer::User(p) => PeerRef::User {
            user_id: p.user_id,
            access_hash: 0,
        }
        .marked_id(),
        tl::enums::Peer::Chat(p) => PeerRef::Chat { chat_id: p.chat_id }.marked_id(),
        tl::enums::Peer::Channel(p) => PeerRef::Channel {
            channel_id: p.channel_id,
            access_hash: 0,
        }
        .marked_id(),
    }
}

fn channel_kind(broadcast: bool) -> ChatKind {
    if broadcast {
        ChatKind::Channel
    } else {
        ChatKind::Supergroup
    }
}

/// Converts a raw chat into a summary.
pub(crate) fn chat_summary(chat: &tl::enums::Chat) -> ChatSummary {
    match chat {
        tl::enums::Chat::Empty(c) => ChatSummary {
            id: -c.id,
            title: String::new(),
            kind: ChatKind::Group,
            is_admin: false,
            username: None,
            peer: PeerRef::Chat { chat_id: c.id },
        },
        tl::enums::Chat::Chat(c) => ChatSummary {
            id: -c.id,
            title: c.title.clone(),
            kind: ChatKind::Group,
            is_admin: c.creator || c.admin_rights.is_some(),
            username: None,
            peer: PeerRef::Chat { chat_id: c.id },
        },
        tl::enums::Chat::Forbidden(c) => ChatSummary {
            id: -c.id,
            title: c.title.clone(),
            kind: ChatKind::Group,
            is_admin: false,
            username: None,
            peer: PeerRef::Chat { chat_id: c.id },
        },
        tl::enums::Chat::Channel(c) => {
            // Hashes of min constructors only work inside the update they came in.
            let peer = PeerRef::Channel {
                channel_id: c.id,
                access_hash: if c.min { 0 } else { c.access_hash.unwrap_or_default() },
            };
            ChatSummary {
                id: peer.marked_id(),
                title: c.title.clone(),
                kind: channel_kind(c.broadcast),
                is_admin: c.creator || c.admin_rights.is_some(),
                username: c.username.clone(),
                peer,
            }
        }
        tl::enums::Chat::ChannelForbidden(c) => {
            let peer = PeerRef::Channel {
                channel_id: c.id,
                access_hash: c.access_hash,
            };
            ChatSummary {
                id: peer.marked_id(),
                title: c.title.clone(),
                kind: channel_kind(c.broadcast),
                is_admin: false,
                username: None,
                peer,
            }
        }
    }
}

/// Converts a raw user into a private-chat summary.
pub(crate) fn user_summary(user: &tl::enums::User) -> ChatSummary {
    match user {
        tl::enums::User::Empty(u) => ChatSummary {
            id: u.id,
            title: String::new(),
            kind: ChatKind::Private,
            is_admin: false,
            username: None,
            peer: PeerRef::User {
                user_id: u.id,
                access_hash: 0,
            },
        },
        tl::enums::User::User(u) => {
            let title = [u.first_name.as_deref(), u.last_name.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            ChatSummary {
                id: u.id,
                title,
                kind: if u.bot { ChatKind::Bot } else { ChatKind::Private },
                is_admin: false,
                username: u.username.clone(),
                peer: PeerRef::User {
                    user_id: u.id,
                    access_hash: if u.min { 0 } else { u.access_hash.unwrap_or_default() },
                },
            }
        }
    }
}

/// Indexes the chats and users of a response by marked id.
pub(crate) fn index_summaries(
    chats: &[tl::enums::Chat],
    users: &[tl::enums::User],
) -> HashMap<i64, ChatSummary> {
    chats
        .iter()
        .map(chat_summary)
        .chain(users.iter().map(user_summary))
        .map(|summary| (summary.id, summary))
        .collect()
}

pub(crate) fn input_peer(peer: &PeerRef) -> tl::enums::InputPeer {
    match *peer {
        PeerRef::Myself => tl::enums::InputPeer::PeerSelf,
        PeerRef::User {
            user_id,
            access_hash,
        } => tl::enums::InputPeer::User(tl::types::InputPeerUser {
            user_id,
            access_hash,
        }),
        PeerRef::Chat { chat_id } => tl::enums::InputPeer::Chat(tl::types::InputPeerChat { chat_id }),
        PeerRef::Channel {
            channel_id,
            access_hash,
        } => tl::enums::InputPeer::Channel(tl::types::InputPeerChannel {
            channel_id,
            access_hash,
        }),
    }
}

pub(crate) fn input_channel(channel_id: i64, access_hash: i64) -> tl::enums::InputChannel {
    tl::enums::InputChannel::Channel(tl::types::InputChannel {
        channel_id,
        access_hash,
    })
}

/// Converts a raw input peer from a folder back into a peer reference.
///
/// Message-scoped peers cannot be stored in a folder and are rejected.
pub(crate) fn peer_from_input(peer: &tl::enums::InputPeer) -> Result<PeerRef, TelegramError> {
    match peer {
        tl::enums::InputPeer::PeerSelf => Ok(PeerRef::Myself),
        tl::enums::InputPeer::User(p) => Ok(PeerRef::User {
            user_id: p.user_id,
            access_hash: p.access_hash,
        }),
        tl::enums::InputPeer::Chat(p) => Ok(PeerRef::Chat { chat_id: p.chat_id }),
        tl::enums::InputPeer::Channel(p) => Ok(PeerRef::Channel {
            channel_id: p.channel_id,
            access_hash: p.access_hash,
        }),
        tl::enums::InputPeer::Empty
        | tl::enums::InputPeer::UserFromMessage(_)
        | tl::enums::InputPeer::ChannelFromMessage(_) => {
            Err(TelegramError::UnexpectedResponse("unsupported peer in folder"))
        }
    }
}

fn peers_from_input(peers: &[tl::enums::InputPeer]) -> Result<Vec<PeerRef>, TelegramError> {
    peers.iter().map(peer_from_input).collect()
}

fn title_text(title: &tl::enums::TextWithEntities) -> String {
    match title {
        tl::enums::TextWithEntities::Entities(t) => t.text.clone(),
    }
}

/// Converts one entry of `messages.getDialogFilters`.
pub(crate) fn remote_filter(filter: &tl::enums::DialogFilter) -> Result<RemoteFilter, TelegramError> {
    match filter {
        tl::enums::DialogFilter::Default => Ok(RemoteFilter::Default),
        tl::enums::DialogFilter::Filter(f) => Ok(RemoteFilter::Folder(Folder {
            id: f.id,
            title: title_text(&f.title),
            emoticon: f.emoticon.clone(),
            color: f.color,
            flags: FolderFlags {
                contacts: f.contacts,
                non_contacts: f.non_contacts,
                groups: f.groups,
                broadcasts: f.broadcasts,
                bots: f.bots,
                exclude_muted: f.exclude_muted,
                exclude_read: f.exclude_read,
                exclude_archived: f.exclude_archived,
            },
            pinned_peers: peers_from_input(&f.pinned_peers)?,
            include_peers: peers_from_input(&f.include_peers)?,
            exclude_peers: peers_from_input(&f.exclude_peers)?,
        })),
        tl::enums::DialogFilter::Chatlist(f) => Ok(RemoteFilter::Chatlist(Folder {
            id: f.id,
            title: title_text(&f.title),
            emoticon: f.emoticon.clone(),
            color: f.color,
            flags: FolderFlags::default(),
            pinned_peers: peers_from_input(&f.pinned_peers)?,
            include_peers: peers_from_input(&f.include_peers)?,
            exclude_peers: Vec::new(),
        })),
    }
}

/// Builds the raw filter pushed by `messages.updateDialogFilter`.
pub(crate) fn raw_filter(folder: &Folder) -> tl::enums::DialogFilter {
    let flags = folder.flags;
    tl::enums::DialogFilter::Filter(tl::types::DialogFilter {
        contacts: flags.contacts,
        non_contacts: flags.non_contacts,
        groups: flags.groups,
        broadcasts: flags.broadcasts,
        bots: flags.bots,
        exclude_muted: flags.exclude_muted,
        exclude_read: flags.exclude_read,
        exclude_archived: flags.exclude_archived,
        title_noanimate: false,
        id: folder.id,
        title: tl::enums::TextWithEntities::Entities(tl::types::TextWithEntities {
            text: folder.title.clone(),
            entities: Vec::new(),
        }),
        emoticon: folder.emoticon.clone(),
        color: folder.color,
        pinned_peers: folder.pinned_peers.iter().map(input_peer).collect(),
        include_peers: folder.include_peers.iter().map(input_peer).collect(),
        exclude_peers: folder.exclude_peers.iter().map(input_peer).collect(),
    })
}

fn message_peer(message: &tl::enums::Message) -> Option<&tl::enums::Peer> {
    match message {
        tl::enums::Message::Empty(m) => m.peer_id.as_ref(),
        tl::enums::Message::Message(m) => Some(&m.peer_id),
        tl::enums::Message::Service(m) => Some(&m.peer_id),
    }
}

fn top_message(message: &tl::enums::Message) -> Option<TopMessage> {
    match message {
        tl::enums::Message::Empty(_) => None,
        tl::enums::Message::Message(m) => Some(TopMessage {
            id: m.id,
            date: m.date,
        }),
        tl::enums::Message::Service(m) => Some(TopMessage {
            id: m.id,
            date: m.date,
        }),
    }
}

/// Joins a dialogs response into entries, in server order.
///
/// Folder dialogs and dialogs whose chat is missing from the response are
/// dropped.
pub(crate) fn dialog_entries(
    dialogs: &[tl::enums::Dialog],
    messages: &[tl::enums::Message],
    chats: &[tl::enums::Chat],
    users: &[tl::enums::User],
) -> Vec<DialogEntry> {
    let summaries = index_summaries(chats, users);
    let tops: HashMap<i64, TopMessage> = messages
        .iter()
        .filter_map(|m| Some((peer_marked_id(message_peer(m)?), top_message(m)?)))
        .collect();

    dialogs
        .iter()
        .filter_map(|dialog| match dialog {
            tl::enums::Dialog::Dialog(d) => Some(peer_marked_id(&d.peer)),
            tl::enums::Dialog::Folder(_) => None,
        })
        .filter_map(|id| {
            summaries.get(&id).map(|chat| DialogEntry {
                chat: chat.clone(),
                top_message: tops.get(&id).copied(),
            })
        })
        .collect()
}

/// URL-only view of a reply markup.
///
/// Non-URL buttons are kept with an empty URL so that a comparison against
/// a URL keyboard never reports a false match.
pub(crate) fn keyboard_from_markup(markup: &tl::enums::ReplyMarkup) -> Option<Keyboard> {
    let tl::enums::ReplyMarkup::ReplyInlineMarkup(inline) = markup else {
        return None;
    };

    let rows = inline
        .rows
        .iter()
        .map(|row| {
            let tl::enums::KeyboardButtonRow::Row(row) = row;
            row.buttons
                .iter()
                .map(|button| match button {
                    tl::enums::KeyboardButton::Url(b) => UrlButton {
                        text: b.text.clone(),
                        url: b.url.clone(),
                    },
                    _ => UrlButton {
                        text: String::new(),
                        url: String::new(),
                    },
                })
                .collect()
        })
        .collect();
    Some(rows)
}

pub(crate) fn markup_from_keyboard(keyboard: &Keyboard) -> tl::enums::ReplyMarkup {
    tl::enums::ReplyMarkup::ReplyInlineMarkup(tl::types::ReplyInlineMarkup {
        rows: keyboard
            .iter()
            .map(|row| {
                tl::enums::KeyboardButtonRow::Row(tl::types::KeyboardButtonRow {
                    buttons: row
                        .iter()
                        .map(|b| {
                            tl::enums::KeyboardButton::Url(tl::types::KeyboardButtonUrl {
                                text: b.text.clone(),
                                url: b.url.clone(),
                            })
                        })
                        .collect(),
                })
            })
            .collect(),
    })
}

fn reply_to_id(header: Option<&tl::enums::MessageReplyHeader>) -> Option<i32> {
    match header? {
        tl::enums::MessageReplyHeader::Header(h) => h.reply_to_msg_id,
        _ => None,
    }
}

fn named(id: i64, summaries: &HashMap<i64, ChatSummary>) -> NamedPeer {
    NamedPeer {
        id,
        name: summaries
            .get(&id)
            .map(|s| s.title.clone())
            .unwrap_or_default(),
    }
}

/// Extracts message details from a `getMessages` style response.
pub(crate) fn message_info(
    message: &tl::enums::Message,
    summaries: &HashMap<i64, ChatSummary>,
) -> Option<MessageInfo> {
    let tl::enums::Message::Message(m) = message else {
        return None;
    };

    let forward_origin = m.fwd_from.as_ref().and_then(|fwd| {
        let tl::enums::MessageFwdHeader::Header(h) = fwd;
        match (&h.from_id, &h.from_name) {
            (Some(peer), _) => Some(named(peer_marked_id(peer), summaries)),
            (None, Some(name)) => Some(NamedPeer {
                id: 0,
                name: name.clone(),
            }),
            (None, None) => None,
        }
    });

    Some(MessageInfo {
        id: m.id,
        text: m.message.clone(),
        sender: m
            .from_id
            .as_ref()
            .map(|peer| named(peer_marked_id(peer), summaries)),
        forward_origin,
        keyboard: m.reply_markup.as_ref().and_then(keyboard_from_markup),
    })
}

fn incoming_from_message(
    message: &tl::enums::Message,
    summaries: &HashMap<i64, ChatSummary>,
) -> Option<IncomingMessage> {
    let tl::enums::Message::Message(m) = message else {
        return None;
    };

    let chat_id = peer_marked_id(&m.peer_id);
    let chat = summaries.get(&chat_id);
    let sender_id = m.from_id.as_ref().map(peer_marked_id).or(
        // Private chats carry no `from_id` for the other side.
        if chat_id > 0 && !m.out { Some(chat_id) } else { None },
    );

    Some(IncomingMessage {
        id: m.id,
        chat_id,
        chat_title: chat.map(|c| c.title.clone()),
        chat_kind: chat.map_or(
            if chat_id > 0 {
                ChatKind::Private
            } else {
                ChatKind::Group
            },
            |c| c.kind,
        ),
        sender_id,
        outgoing: m.out,
        text: m.message.clone(),
        reply_to: reply_to_id(m.reply_to.as_ref()),
    })
}

fn incoming_from_update(
    update: &tl::enums::Update,
    summaries: &HashMap<i64, ChatSummary>,
) -> Option<IncomingMessage> {
    match update {
        tl::enums::Update::NewMessage(u) => incoming_from_message(&u.message, summaries),
        tl::enums::Update::NewChannelMessage(u) => incoming_from_message(&u.message, summaries),
        _ => None,
    }
}

/// Extracts new text messages from an updates container.
///
/// Also returns every chat and user summary the container carried so the
/// caller can warm its peer cache.
pub(crate) fn incoming_messages(
    updates: &tl::enums::Updates,
) -> (Vec<IncomingMessage>, Vec<ChatSummary>) {
    match updates {
        tl::enums::Updates::UpdateShortMessage(u) => {
            let message = IncomingMessage {
                id: u.id,
                chat_id: u.user_id,
                chat_title: None,
                chat_kind: ChatKind::Private,
                sender_id: if u.out { None } else { Some(u.user_id) },
                outgoing: u.out,
                text: u.message.clone(),
                reply_to: reply_to_id(u.reply_to.as_ref()),
            };
            (vec![message], Vec::new())
        }
        tl::enums::Updates::UpdateShortChatMessage(u) => {
            let message = IncomingMessage {
                id: u.id,
                chat_id: -u.chat_id,
                chat_title: None,
                chat_kind: ChatKind::Group,
                sender_id: Some(u.from_id),
                outgoing: u.out,
                text: u.message.clone(),
                reply_to: reply_to_id(u.reply_to.as_ref()),
            };
            (vec![message], Vec::new())
        }
        tl::enums::Updates::UpdateShort(u) => (
            incoming_from_update(&u.update, &HashMap::new())
                .into_iter()
                .collect(),
            Vec::new(),
        ),
        tl::enums::Updates::Combined(u) => collect_updates(&u.updates, &u.chats, &u.users),
        tl::enums::Updates::Updates(u) => collect_updates(&u.updates, &u.chats, &u.users),
        _ => (Vec::new(), Vec::new()),
    }
}

fn collect_updates(
    updates: &[tl::enums::Update],
    chats: &[tl::enums::Chat],
    users: &[tl::enums::User],
) -> (Vec<IncomingMessage>, Vec<ChatSummary>) {
    let summaries = index_summaries(chats, users);
    let messages = updates
        .iter()
        .filter_map(|update| incoming_from_update(update, &summaries))
        .collect();
    (messages, summaries.into_values().collect())
}
