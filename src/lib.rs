//! Admin Userbot Library
//!
//! A Telegram userbot that keeps a folder of every group the account
//! administers.
//!
//! This crate provides the core functionality for:
//! - Syncing the admin chats folder and its exclusion list
//! - Connecting to Telegram via `MTProto`
//! - Channel post tools (inline buttons, pins, chat exports)
//! - Scheduling quote posts
//! - Handling user commands via chat messages

pub mod commands;
pub mod config;
pub mod folders;
pub mod quotes;
pub mod store;
pub mod telegram;

#[cfg(test)]
pub(crate) mod testing;
