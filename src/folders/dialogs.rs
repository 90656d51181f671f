//! Paginated walk over the account's dialog list.

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use crate::telegram::{ChatApi, ChatSummary, DialogCursor, TelegramError};

/// Largest page `messages.getDialogs` serves.
pub const DIALOG_PAGE_SIZE: i32 = 100;

/// Lazy, forward-only iterator over every dialog, most recent first.
///
/// Each chat is yielded at most once even when pages overlap. The walk ends
/// on an empty page or after a page whose last entry has no top message.
pub struct DialogIter<'a> {
    api: &'a dyn ChatApi,
    cursor: DialogCursor,
    buffer: VecDeque<ChatSummary>,
    seen: HashSet<i64>,
    exhausted: bool,
}

impl<'a> DialogIter<'a> {
    #[must_use]
    pub fn new(api: &'a dyn ChatApi) -> Self {
        Self {
            api,
            cursor: DialogCursor::default(),
            buffer: VecDeque::new(),
            seen: HashSet::new(),
            exhausted: false,
        }
    }

    /// Returns the next chat, fetching another page when the buffer runs dry.
    ///
    /// # Errors
    ///
    /// Transport errors from the page request are returned as-is; the
    /// iterator should not be polled again afterwards.
    pub async fn next(&mut self) -> Result<Option<ChatSummary>, TelegramError> {
        loop {
            if let Some(chat) = self.buffer.pop_front() {
                tokio::task::yield_now().await;
                return Ok(Some(chat));
            }
            if self.exhausted {
                return Ok(None);
            }
            self.fetch_page().await?;
        }
    }

    /// Drains the iterator into a vector.
    pub async fn collect(mut self) -> Result<Vec<ChatSummary>, TelegramError> {
        let mut chats = Vec::new();
        while let Some(chat) = self.next().await? {
            chats.push(chat);
        }
        Ok(chats)
    }

    async fn fetch_page(&mut self) -> Result<(), TelegramError> {
        let page = self.api.get_dialogs(&self.cursor, DIALOG_PAGE_SIZE).await?;

        let fresh: Vec<_> = page
            .into_iter()
            .filter(|entry| self.seen.insert(entry.chat.id))
            .collect();

        debug!("Dialog page: {} new chats", fresh.len());

        let Some(last) = fresh.last() else {
            self.exhausted = true;
            return Ok(());
        };

        match last.top_message {
            Some(top) => {
                self.cursor = DialogCursor {
                    offset_date: top.date,
                    offset_id: top.id,
                    offset_peer: Some(last.chat.peer),
                };
            }
            None => self.exhausted = true,
        }

        self.buffer.extend(fresh.into_iter().map(|entry| entry.chat));
        Ok(())
    }
}
