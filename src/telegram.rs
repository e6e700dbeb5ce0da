//! Telegram Bot API client
//!
//! A thin hand-rolled client over the HTTP Bot API: long-poll `getUpdates`,
//! `sendMessage`, and `getFile` plus file download. Only the fields this bot
//! reads are modeled.

mod api;
mod types;

pub use api::{ChatError, ChatErrorKind, TelegramApi};
pub use types::{Chat, ChatId, Document, Message, TelegramFile, Update};
