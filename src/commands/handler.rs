//! Command handler implementation.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use super::buttons::{PostChat, PostRef, parse_keyboard, split_request};
use super::chat_tools::{ChatArg, JoinTarget, format_chat_ids, format_reply_ids};
use super::listing::{ListKind, render};
use super::log_sink::LogSink;
use super::types::{BotCommand, CommandError, CommandResult};
use crate::config::BotSettings;
use crate::folders::{DialogIter, ExcludeTarget, FolderError, FolderSync, ReloadOutcome};
use crate::quotes::QuoteScheduler;
use crate::telegram::{
    ChatApi, ChatSummary, IncomingMessage, OutgoingMessage, Resolution, TelegramError, escape_html,
};

/// Grace period before `.leave` leaves the current chat.
const LEAVE_COUNTDOWN: Duration = Duration::from_secs(5);

/// Handles bot commands sent by the owner or sudo users.
pub struct CommandHandler {
    api: Arc<dyn ChatApi>,
    folders: FolderSync,
    quotes: Option<QuoteScheduler>,
    log: LogSink,

    /// Command prefix (e.g. ".").
    prefix: String,

    /// Users other than the owner allowed to run commands.
    sudo_users: HashSet<i64>,

    /// Where generated listings are written before upload.
    data_dir: PathBuf,

    /// Countdown tasks of `.leave`, keyed by chat.
    pending_leaves: Arc<Mutex<HashMap<i64, AbortHandle>>>,
    leave_delay: Duration,
}

impl CommandHandler {
    #[must_use]
    pub fn new(api: Arc<dyn ChatApi>, folders: FolderSync, settings: &BotSettings) -> Self {
        Self {
            log: LogSink::new(Arc::clone(&api), settings.log_chat_id),
            api,
            folders,
            quotes: None,
            prefix: settings.command_prefix.clone(),
            sudo_users: settings.sudo_users.iter().copied().collect(),
            data_dir: settings.data_dir.clone(),
            pending_leaves: Arc::default(),
            leave_delay: LEAVE_COUNTDOWN,
        }
    }

    /// Enables the quotes command.
    #[must_use]
    pub fn with_quotes(mut self, quotes: QuoteScheduler) -> Self {
        self.quotes = Some(quotes);
        self
    }

    #[cfg(test)]
    fn set_leave_delay(&mut self, delay: Duration) {
        self.leave_delay = delay;
    }

    /// Whether the author of `message` may run commands.
    #[must_use]
    pub fn is_authorized(&self, message: &IncomingMessage) -> bool {
        message.outgoing
            || message
                .sender_id
                .is_some_and(|id| self.sudo_users.contains(&id))
    }

    /// Tries to parse and execute a command from a message, then delivers
    /// the result to the chat (or to the log for silent commands).
    ///
    /// Returns `None` if the message is not a command or its author is not
    /// allowed to run commands.
    pub async fn handle(&self, message: &IncomingMessage) -> Option<CommandResult> {
        let command = BotCommand::parse(&message.text, &self.prefix)?;

        if !self.is_authorized(message) {
            debug!("Ignoring {} from unauthorized sender {:?}", command, message.sender_id);
            return None;
        }

        debug!("Handling command: {}", command);
        let progress = match self.progress_text(&command) {
            Some(text) => self.send_progress(message, &text).await,
            None => None,
        };

        let name = command.name();
        let result = self
            .execute(command, message)
            .await
            .unwrap_or_else(CommandResult::from);
        info!("Command {} finished: success={}", name, result.success);

        self.deliver(message, progress, &result).await;
        Some(result)
    }

    /// Executes a parsed command.
    async fn execute(
        &self,
        command: BotCommand,
        message: &IncomingMessage,
    ) -> Result<CommandResult, CommandError> {
        match command {
            BotCommand::Folder => Ok(self.handle_folder().await),
            BotCommand::Reload => Ok(self.handle_reload().await),
            BotCommand::Exclude => Ok(self.handle_exclude(message).await),
            BotCommand::AdminStatus => Ok(self.handle_admin_status().await),
            BotCommand::Buttons(body) => self.handle_buttons(&body).await,
            BotCommand::Pin { loud } => Ok(self.handle_pin(message, loud).await),
            BotCommand::Unpin => Ok(self.handle_unpin(message).await),
            BotCommand::Ids(arg) => self.handle_ids(message, arg.as_deref()).await,
            BotCommand::Join(arg) => self.handle_join(arg.as_deref()).await,
            BotCommand::Leave(arg) => self.handle_leave(message, arg.as_deref()).await,
            BotCommand::LeaveCancel => Ok(self.handle_leave_cancel(message).await),
            BotCommand::ListChannels => self.handle_list(message, ListKind::Channels).await,
            BotCommand::ListGroups => self.handle_list(message, ListKind::Supergroups).await,
            BotCommand::Quotes(arg) => self.handle_quotes(arg.as_deref()).await,
            BotCommand::Help => Ok(self.handle_help()),
        }
    }

    /// Text shown while a long-running command works; replaced by the result.
    fn progress_text(&self, command: &BotCommand) -> Option<String> {
        match command {
            BotCommand::Folder => Some(format!("Creating {} folder...", self.folders.title())),
            BotCommand::Reload => Some(format!("Reloading {} folder...", self.folders.title())),
            BotCommand::ListChannels => Some(ListKind::Channels.progress().to_owned()),
            BotCommand::ListGroups => Some(ListKind::Supergroups.progress().to_owned()),
            BotCommand::Quotes(arg) if self.quotes.is_some() => {
                quote_count(arg.as_deref()).map(|n| format!("Scheduling {n} quotes..."))
            }
            _ => None,
        }
    }

    async fn send_progress(&self, message: &IncomingMessage, text: &str) -> Option<i32> {
        let progress =
            OutgoingMessage::html(format!("<code>{}</code>", escape_html(text))).reply_to(message.id);
        match self.api.send_message(message.chat_id, &progress).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Failed to send progress message: {}", e);
                None
            }
        }
    }

    async fn deliver(&self, message: &IncomingMessage, progress: Option<i32>, result: &CommandResult) {
        if result.silent {
            if result.success {
                self.log.info(&result.message).await;
            } else {
                self.log.error(&result.message).await;
            }
            return;
        }

        if !result.success {
            warn!("Command failed: {}", result.message);
        }

        let sent = match progress {
            Some(id) => self
                .api
                .edit_message(message.chat_id, id, &result.message, result.html)
                .await
                .map(|()| id),
            None => {
                let reply = OutgoingMessage {
                    text: result.message.clone(),
                    html: result.html,
                    reply_to: Some(message.id),
                    ..OutgoingMessage::default()
                };
                self.api.send_message(message.chat_id, &reply).await
            }
        };

        match sent {
            Ok(id) => {
                if let Some(delay) = result.delete_after {
                    self.delete_later(message.chat_id, id, delay);
                }
            }
            Err(e) => warn!("Failed to deliver reply: {}", e),
        }
    }

    fn delete_later(&self, chat_id: i64, message_id: i32, delay: Duration) {
        let api = Arc::clone(&self.api);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = api.delete_messages(chat_id, &[message_id]).await {
                debug!("Failed to delete message {}: {}", message_id, e);
            }
        });
    }

    /// Replies with the rebuild report and mirrors it (or the error) to the log.
    async fn handle_folder(&self) -> CommandResult {
        match self.folders.rebuild().await {
            Ok(report) => {
                let text = report.to_string();
                self.log.report(&text).await;
                outcome(report.pushed, text).html()
            }
            Err(e) => self.folder_failure("folder", e).await,
        }
    }

    async fn handle_reload(&self) -> CommandResult {
        match self.folders.reload().await {
            Ok(ReloadOutcome::Reloaded(report)) => {
                let text = report.to_string();
                self.log.report(&text).await;
                outcome(report.pushed, text).html()
            }
            Ok(ReloadOutcome::FolderMissing) => CommandResult::error(format!(
                "❌ {} folder not found. Use {}folder to create it first.",
                self.folders.title(),
                self.prefix
            )),
            Err(e) => self.folder_failure("reload", e).await,
        }
    }

    async fn folder_failure(&self, command: &str, err: FolderError) -> CommandResult {
        self.log
            .error(&format!("Error in {command} command: {err}"))
            .await;
        CommandError::from(err).into()
    }

    /// Never replies in the chat; the outcome goes to the log only.
    async fn handle_exclude(&self, message: &IncomingMessage) -> CommandResult {
        let target = ExcludeTarget {
            chat_id: message.chat_id,
            title: message
                .chat_title
                .clone()
                .unwrap_or_else(|| "Unknown".to_owned()),
            kind: message.chat_kind,
        };

        let result = match self.folders.exclude(&target).await {
            Ok(_) => CommandResult::success(format!(
                "🚫 Excluded chat: {} ({}) from {} folder",
                target.title,
                target.chat_id,
                self.folders.title()
            )),
            Err(e) => CommandResult::error(format!("Error in exc command: {e}")),
        };
        result.silent()
    }

    async fn handle_admin_status(&self) -> CommandResult {
        match self.folders.status().await {
            Ok(status) => CommandResult::success(status.to_string())
                .html()
                .delete_after(15),
            Err(e) => CommandResult::error(format!("❌ Error: {e}")).delete_after(10),
        }
    }

    async fn handle_buttons(&self, body: &str) -> Result<CommandResult, CommandError> {
        let Some((reference, lines)) = split_request(body) else {
            return Err(CommandError::Usage(format!(
                "❌ Usage: `{p}buttons <channel_id>/<message_id>` OR `{p}buttons <post_url>` followed by buttons.",
                p = self.prefix
            )));
        };

        let Some(post) = PostRef::parse(reference) else {
            return Ok(CommandResult::error("❌ Invalid format."));
        };

        let chat_id = match post.chat {
            PostChat::Id(id) => id,
            PostChat::Username(name) => self.api.resolve_username(&name).await?.id,
        };

        let keyboard = parse_keyboard(&lines);
        let existing = self
            .api
            .get_message(chat_id, post.message_id)
            .await?
            .ok_or(CommandError::MessageNotFound)?;

        if existing.keyboard.as_ref() == Some(&keyboard) {
            return Ok(CommandResult::success("⚠️ Same buttons already exist."));
        }

        self.api
            .edit_reply_markup(chat_id, post.message_id, &keyboard)
            .await?;
        Ok(CommandResult::success("✅ Buttons added successfully!"))
    }

    async fn handle_pin(&self, message: &IncomingMessage, loud: bool) -> CommandResult {
        let Some(target) = message.reply_to else {
            return CommandResult::error("Reply to a message to pin it.").delete_after(5);
        };

        match self.api.pin_message(message.chat_id, target, !loud).await {
            Ok(()) if loud => CommandResult::success("Pinned (with notification).").delete_after(5),
            Ok(()) => CommandResult::success("Pinned (silent).").delete_after(5),
            Err(e) => failure_reason("Failed to pin message.", &e),
        }
    }

    async fn handle_unpin(&self, message: &IncomingMessage) -> CommandResult {
        let Some(target) = message.reply_to else {
            return CommandResult::error("Reply to a pinned message to unpin it.").delete_after(5);
        };

        match self.api.unpin_message(message.chat_id, target).await {
            Ok(()) => CommandResult::success("Unpinned.").delete_after(5),
            Err(e) => failure_reason("Failed to unpin message.", &e),
        }
    }

    async fn handle_ids(
        &self,
        message: &IncomingMessage,
        arg: Option<&str>,
    ) -> Result<CommandResult, CommandError> {
        if let Some(reply_id) = message.reply_to {
            let replied = self
                .api
                .get_message(message.chat_id, reply_id)
                .await?
                .ok_or(CommandError::MessageNotFound)?;
            return Ok(CommandResult::success(format_reply_ids(message, &replied)).html());
        }

        if let Some(arg) = arg {
            let id = match ChatArg::parse(arg) {
                ChatArg::Id(id) => id,
                ChatArg::Username(name) => self.api.resolve_username(&name).await?.id,
            };
            return Ok(CommandResult::success(format!("<code>{id}</code>")).html());
        }

        Ok(CommandResult::success(format_chat_ids(message)).html())
    }

    async fn handle_join(&self, arg: Option<&str>) -> Result<CommandResult, CommandError> {
        let usage = || CommandError::Usage(format!("Usage: {}join <link|username>", self.prefix));
        let input = arg.ok_or_else(usage)?;
        let target = JoinTarget::parse(input).ok_or_else(usage)?;

        if let Err(first) = self.join(&target).await {
            let Some(fallback) = JoinTarget::basename(input).filter(|f| *f != target) else {
                return Ok(CommandResult::error(first.to_string()));
            };
            debug!("Join failed ({}), retrying with {:?}", first, fallback);
            if let Err(e) = self.join(&fallback).await {
                return Ok(CommandResult::error(e.to_string()));
            }
        }

        Ok(CommandResult::success("Joined"))
    }

    async fn join(&self, target: &JoinTarget) -> Result<(), TelegramError> {
        match target {
            JoinTarget::Public(username) => self.api.join_public(username).await,
            JoinTarget::Invite(hash) => self.api.join_invite(hash).await,
        }
    }

    /// Refuses where the account is admin. A named chat is left at once;
    /// the current chat only after a countdown that `.leavec` cancels.
    async fn handle_leave(
        &self,
        message: &IncomingMessage,
        arg: Option<&str>,
    ) -> Result<CommandResult, CommandError> {
        let (chat_id, known) = match arg.map(ChatArg::parse) {
            None => (message.chat_id, None),
            Some(ChatArg::Id(id)) => (id, None),
            Some(ChatArg::Username(name)) => {
                let chat = self.api.resolve_username(&name).await?;
                (chat.id, Some(chat))
            }
        };

        let chat = match known {
            Some(chat) => Some(chat),
            None => self.current_state(chat_id).await,
        };
        if chat.is_some_and(|chat| chat.is_admin) {
            return Ok(CommandResult::error("❌ Leave blocked: you are admin in this chat."));
        }

        if arg.is_none() {
            self.schedule_leave(chat_id).await;
            return Ok(CommandResult::success(format!(
                "Leaving current chat in {} seconds...\nReply with `{}leavec` to cancel.",
                LEAVE_COUNTDOWN.as_secs(),
                self.prefix
            ))
            .delete_after(LEAVE_COUNTDOWN.as_secs()));
        }

        self.api.leave_chat(chat_id).await?;

        // The current chat can no longer be written to.
        if chat_id == message.chat_id {
            return Ok(CommandResult::success(format!("✅ Left chat {chat_id}.")).silent());
        }
        Ok(CommandResult::success("✅ Left chat."))
    }

    async fn schedule_leave(&self, chat_id: i64) {
        let api = Arc::clone(&self.api);
        let log = self.log.clone();
        let pending = Arc::clone(&self.pending_leaves);
        let delay = self.leave_delay;

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            pending.lock().await.remove(&chat_id);
            match api.leave_chat(chat_id).await {
                Ok(()) => log.info(&format!("✅ Left chat {chat_id}.")).await,
                Err(e) => log.error(&format!("Error in leave command: {e}")).await,
            }
        });

        let previous = self
            .pending_leaves
            .lock()
            .await
            .insert(chat_id, task.abort_handle());
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    async fn handle_leave_cancel(&self, message: &IncomingMessage) -> CommandResult {
        match self.pending_leaves.lock().await.remove(&message.chat_id) {
            Some(task) => {
                task.abort();
                CommandResult::success("Leave cancelled.").delete_after(5)
            }
            None => CommandResult::error("No pending leave in this chat.").delete_after(5),
        }
    }

    /// Best-effort lookup; failures mean "unknown", not "not admin".
    async fn current_state(&self, chat_id: i64) -> Option<ChatSummary> {
        let peer = self.api.resolve_peer(chat_id).await.ok()?;
        match self.api.resolve_chat(&peer).await {
            Ok(Resolution::Found(chat)) => Some(chat),
            Ok(Resolution::Unreachable) | Err(_) => None,
        }
    }

    async fn handle_list(
        &self,
        message: &IncomingMessage,
        kind: ListKind,
    ) -> Result<CommandResult, CommandError> {
        let chats: Vec<ChatSummary> = DialogIter::new(self.api.as_ref())
            .collect()
            .await?
            .into_iter()
            .filter(|chat| chat.kind == kind.chat_kind())
            .collect();

        if chats.is_empty() {
            return Ok(CommandResult::success(kind.empty_reply()));
        }

        tokio::fs::create_dir_all(&self.data_dir).await?;
        let path = self.data_dir.join(kind.file_name());
        tokio::fs::write(&path, render(&chats)).await?;

        let caption = kind.caption(chats.len());
        self.api
            .send_document(message.chat_id, &path, &caption)
            .await?;
        Ok(CommandResult::success(caption))
    }

    async fn handle_quotes(&self, arg: Option<&str>) -> Result<CommandResult, CommandError> {
        let Some(quotes) = &self.quotes else {
            return Ok(CommandResult::error("❌ Quotes are not configured."));
        };
        let count = quote_count(arg).ok_or_else(|| {
            CommandError::Usage(format!("Usage: {}quotes <number_of_quotes>", self.prefix))
        })?;

        match quotes.schedule(count, Local::now().date_naive()).await {
            Ok(report) if report.failures.is_empty() => Ok(CommandResult::success(report.to_string())),
            Ok(report) => Ok(CommandResult::error(report.to_string())),
            Err(e) => Ok(CommandResult::error(format!("❌ {e}"))),
        }
    }

    fn handle_help(&self) -> CommandResult {
        let mut lines = vec![
            format!("Admin Userbot Commands (prefix: {})", self.prefix),
            String::new(),
        ];

        for (cmd, desc) in BotCommand::all_commands() {
            lines.push(format!("  {}{cmd} - {desc}", self.prefix));
        }

        CommandResult::success(lines.join("\n"))
    }
}

fn outcome(success: bool, message: String) -> CommandResult {
    if success {
        CommandResult::success(message)
    } else {
        CommandResult::error(message)
    }
}

fn failure_reason(headline: &str, err: &TelegramError) -> CommandResult {
    CommandResult::error(format!(
        "{headline}\n<b>Reason:</b> <code>{}</code>",
        escape_html(&err.to_string())
    ))
    .html()
    .delete_after(8)
}

/// A positive quote count.
fn quote_count(arg: Option<&str>) -> Option<usize> {
    arg?.parse().ok().filter(|n| *n > 0)
}
