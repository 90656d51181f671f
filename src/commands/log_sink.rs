//! Operator log: tracing, mirrored into a Telegram chat when configured.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::telegram::{ChatApi, OutgoingMessage};

#[derive(Clone)]
pub struct LogSink {
    api: Arc<dyn ChatApi>,
    chat_id: Option<i64>,
}

impl LogSink {
    #[must_use]
    pub fn new(api: Arc<dyn ChatApi>, chat_id: Option<i64>) -> Self {
        Self { api, chat_id }
    }

    pub async fn info(&self, text: &str) {
        info!("{}", text);
        self.post(text, false).await;
    }

    /// Like [`Self::info`], for HTML-formatted reports.
    pub async fn report(&self, html: &str) {
        info!("{}", html);
        self.post(html, true).await;
    }

    pub async fn error(&self, text: &str) {
        error!("{}", text);
        self.post(text, false).await;
    }

    async fn post(&self, text: &str, html: bool) {
        let Some(chat_id) = self.chat_id else {
            return;
        };
        let message = OutgoingMessage {
            text: text.to_owned(),
            html,
            ..OutgoingMessage::default()
        };
        if let Err(e) = self.api.send_message(chat_id, &message).await {
            warn!("Failed to post to log chat {}: {}", chat_id, e);
        }
    }
}
