//! Telegram Bot API access.

pub mod client;
pub mod types;

pub use client::{TelegramClient, DEFAULT_API_BASE};
pub use types::{Envelope, Update, WebhookInfo};
