//! Argument handling for `.ids`, `.join` and `.leave`.

use crate::telegram::{IncomingMessage, MessageInfo, escape_html};

/// What `.join` was pointed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinTarget {
    /// A public username, without `@`.
    Public(String),
    /// The hash of a private invite link.
    Invite(String),
}

impl JoinTarget {
    /// Understands `@name`, `name`, `t.me/name`, `t.me/+hash` and
    /// `t.me/joinchat/hash`, with or without scheme.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim().trim_end_matches('/');

        let path = ["https://", "http://"]
            .iter()
            .find_map(|scheme| input.strip_prefix(scheme))
            .unwrap_or(input);
        let path = ["t.me/", "telegram.me/", "telegram.dog/"]
            .iter()
            .find_map(|host| path.strip_prefix(host))
            .unwrap_or(path);

        let target = if let Some(hash) = path.strip_prefix('+') {
            Self::Invite(hash.to_owned())
        } else if let Some(hash) = path.strip_prefix("joinchat/") {
            Self::Invite(hash.to_owned())
        } else {
            Self::Public(path.trim_start_matches('@').to_owned())
        };

        match &target {
            Self::Public(name) | Self::Invite(name) if name.is_empty() => None,
            _ => Some(target),
        }
    }

    /// Retry target built from the last path segment of the input.
    #[must_use]
    pub fn basename(input: &str) -> Option<Self> {
        let last = input.trim().trim_end_matches('/').rsplit('/').next()?.trim();
        (!last.is_empty()).then(|| Self::Public(last.trim_start_matches('@').to_owned()))
    }
}

/// A chat given as argument: numeric id or username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatArg {
    Id(i64),
    Username(String),
}

impl ChatArg {
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        input.parse().map_or_else(
            |_| {
                let name = input.rsplit('/').next().unwrap_or(input);
                Self::Username(name.trim_start_matches('@').to_owned())
            },
            Self::Id,
        )
    }
}

fn id_line(name: &str, id: i64) -> String {
    format!("<b>{}</b>: <code>{id}</code>", escape_html(name))
}

/// Identifier lines of the current chat.
#[must_use]
pub fn format_chat_ids(message: &IncomingMessage) -> String {
    id_line(message.chat_title.as_deref().unwrap_or("Unknown"), message.chat_id)
}

/// Identifier lines of the current chat, the replied message's sender and
/// the chat it was forwarded from.
#[must_use]
pub fn format_reply_ids(message: &IncomingMessage, replied: &MessageInfo) -> String {
    let mut lines = vec![format_chat_ids(message)];
    if let Some(sender) = &replied.sender {
        lines.push(id_line(&sender.name, sender.id));
    }
    if let Some(origin) = &replied.forward_origin {
        lines.push(id_line(&origin.name, origin.id));
    }
    lines.join("\n")
}
