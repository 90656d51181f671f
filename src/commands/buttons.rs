//! Parsing for the inline keyboard editor.
//!
//! ```text
//! .buttons https://t.me/c/2665845048/12
//! Website - https://example.com
//! Docs - https://docs.example.com :same
//! ```
//!
//! Each `Text - URL` line starts a new row unless it ends with `:same`, which
//! appends the button to the previous row.

use std::sync::LazyLock;

use regex::Regex;

use crate::telegram::{Keyboard, UrlButton};

#[allow(clippy::expect_used, reason = "constant pattern, checked by tests")]
static POST_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https://t\.me/(c/)?([\w_]+)/(\d+)").expect("post link pattern is valid")
});

const SAME_ROW: &str = ":same";

/// The chat part of a post reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostChat {
    Id(i64),
    /// A public username that still needs resolving.
    Username(String),
}

/// A channel post addressed by the command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRef {
    pub chat: PostChat,
    pub message_id: i32,
}

impl PostRef {
    /// Parses `<chat_id>/<message_id>` or a `t.me` post link.
    ///
    /// Private links (`t.me/c/<n>/<m>`) address chat `-100<n>`.
    #[must_use]
    pub fn parse(reference: &str) -> Option<Self> {
        if let Some(caps) = POST_LINK.captures(reference) {
            let message_id = caps[3].parse().ok()?;
            let chat = if caps.get(1).is_some() {
                PostChat::Id(format!("-100{}", &caps[2]).parse().ok()?)
            } else {
                PostChat::Username(caps[2].to_owned())
            };
            return Some(Self { chat, message_id });
        }

        let (chat_id, message_id) = reference.trim().split_once('/')?;
        Some(Self {
            chat: PostChat::Id(chat_id.trim().parse().ok()?),
            message_id: message_id.trim().parse().ok()?,
        })
    }
}

/// Splits the command body into the post reference line and button lines.
///
/// Returns `None` when there are no button lines at all.
#[must_use]
pub fn split_request(body: &str) -> Option<(&str, Vec<&str>)> {
    let mut lines = body.split('\n');
    let reference = lines.next()?.trim();
    let buttons: Vec<&str> = lines.collect();
    if buttons.is_empty() {
        return None;
    }
    Some((reference, buttons))
}

/// Builds the keyboard from `Text - URL` lines; other lines are skipped.
#[must_use]
pub fn parse_keyboard(lines: &[&str]) -> Keyboard {
    let mut keyboard = Vec::new();
    let mut row: Vec<UrlButton> = Vec::new();

    for line in lines {
        let Some((text, rest)) = line.split_once(" - ") else {
            continue;
        };

        let (url, same_row) = match rest.split_once(SAME_ROW) {
            Some((url, _)) => (url, true),
            None => (rest, false),
        };

        let button = UrlButton {
            text: text.trim().to_owned(),
            url: url.trim().to_owned(),
        };

        if !same_row && !row.is_empty() {
            keyboard.push(std::mem::take(&mut row));
        }
        row.push(button);
    }

    if !row.is_empty() {
        keyboard.push(row);
    }
    keyboard
}
