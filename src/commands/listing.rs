//! Channel and supergroup exports for `.listchannels` / `.listgroups`.

use crate::telegram::{ChatKind, ChatSummary};

/// Which chats an export collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Channels,
    Supergroups,
}

impl ListKind {
    #[must_use]
    pub const fn chat_kind(self) -> ChatKind {
        match self {
            Self::Channels => ChatKind::Channel,
            Self::Supergroups => ChatKind::Supergroup,
        }
    }

    /// Plural noun used in replies.
    #[must_use]
    pub const fn noun(self) -> &'static str {
        match self {
            Self::Channels => "channels",
            Self::Supergroups => "supergroups",
        }
    }

    #[must_use]
    pub fn file_name(self) -> String {
        format!("{}.txt", self.noun())
    }

    #[must_use]
    pub const fn progress(self) -> &'static str {
        match self {
            Self::Channels => "🔍 Fetching channels... please wait.",
            Self::Supergroups => "🔍 Fetching groups... please wait.",
        }
    }

    #[must_use]
    pub fn caption(self, count: usize) -> String {
        format!("📜 Found {count} {}.", self.noun())
    }

    #[must_use]
    pub fn empty_reply(self) -> String {
        format!("⚠️ No {} found.", self.noun())
    }
}

/// Public link when the chat has a username, a client deep link otherwise.
#[must_use]
pub fn chat_link(chat: &ChatSummary) -> String {
    match &chat.username {
        Some(username) => format!("https://t.me/{username}"),
        None => format!("tg://openmessage?chat_id={}", chat.id),
    }
}

/// Renders the export file: one block per chat, separated by blank lines.
#[must_use]
pub fn render(chats: &[ChatSummary]) -> String {
    chats
        .iter()
        .map(|chat| {
            format!(
                "**Name:** {}\n**ID:** `{}`\n**Link:** {}\n",
                chat.title,
                chat.id,
                chat_link(chat)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{broadcast, supergroup};

    #[test]
    fn test_links() {
        let mut chat = broadcast(5, "News", true);
        assert_eq!(chat_link(&chat), "tg://openmessage?chat_id=-1000000000005");
        chat.username = Some("news".to_owned());
        assert_eq!(chat_link(&chat), "https://t.me/news");
    }

    #[test]
    fn test_render_blocks() {
        let mut a = supergroup(1, "Alpha", false);
        a.username = Some("alpha".to_owned());
        let b = supergroup(2, "Beta", true);

        assert_eq!(
            render(&[a, b]),
            "**Name:** Alpha\n**ID:** `-1000000000001`\n**Link:** https://t.me/alpha\n\
             \n**Name:** Beta\n**ID:** `-1000000000002`\n**Link:** tg://openmessage?chat_id=-1000000000002\n"
        );
    }

    #[test]
    fn test_kind_texts() {
        assert_eq!(ListKind::Channels.file_name(), "channels.txt");
        assert_eq!(ListKind::Supergroups.caption(3), "📜 Found 3 supergroups.");
        assert_eq!(ListKind::Channels.empty_reply(), "⚠️ No channels found.");
    }
}
