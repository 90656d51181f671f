//! Admin-group predicate.

use crate::telegram::{ChatKind, ChatSummary};

/// True iff the account administers `chat` and it is a group or supergroup.
///
/// Broadcast channels never qualify, even with admin rights.
#[must_use]
pub fn is_admin_group(chat: &ChatSummary) -> bool {
    chat.is_admin && matches!(chat.kind, ChatKind::Group | ChatKind::Supergroup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::PeerRef;

    fn chat(kind: ChatKind, is_admin: bool) -> ChatSummary {
        ChatSummary {
            id: -1,
            title: "t".to_owned(),
            kind,
            is_admin,
            username: None,
            peer: PeerRef::Chat { chat_id: 1 },
        }
    }

    #[test]
    fn test_admin_groups_pass() {
        assert!(is_admin_group(&chat(ChatKind::Group, true)));
        assert!(is_admin_group(&chat(ChatKind::Supergroup, true)));
    }

    #[test]
    fn test_channels_never_pass() {
        assert!(!is_admin_group(&chat(ChatKind::Channel, true)));
        assert!(!is_admin_group(&chat(ChatKind::Channel, false)));
    }

    #[test]
    fn test_requires_admin_and_group_kind() {
        assert!(!is_admin_group(&chat(ChatKind::Supergroup, false)));
        assert!(!is_admin_group(&chat(ChatKind::Private, true)));
        assert!(!is_admin_group(&chat(ChatKind::Bot, true)));
    }
}
