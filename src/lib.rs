//! tgbot library root.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod polling;
pub mod telegram;

pub use cli::Commands;
pub use config::{resolve_token, TokenOptions};
pub use error::{Error, Result};
pub use polling::{list_recent, OutputFormat, PollOptions, PollOutcome, Poller, UpdateSource};
pub use telegram::{TelegramClient, Update, WebhookInfo};
