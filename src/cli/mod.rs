//! CLI commands for tgbot using clap.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};

use crate::config::{resolve_token, TokenOptions};
use crate::polling::format::pretty_json;
use crate::polling::{
    cancel_channel, list_recent, write_updates, ListOptions, OutputFormat, PollOptions, PollOutcome, Poller,
};
use crate::telegram::{TelegramClient, DEFAULT_API_BASE};

const TOKEN_HELP: &str = "\
Token resolution order:
  1) --token
  2) TG_BOT_TOKEN
  3) config file (~/.tgbot-cli/config.json)

Examples:
  tgbot updates listen --interval 3s --timeout 20 --format pretty
  tgbot updates list --limit 20 --format jsonl
  tgbot bot me
  tgbot message send --chat-id 12345 --text \"hello\"";

/// tgbot - Telegram Bot CLI.
#[derive(Parser, Debug)]
#[command(name = "tgbot")]
#[command(version)]
#[command(about = "tgbot - Telegram Bot CLI", long_about = None, after_help = TOKEN_HELP)]
pub struct Commands {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Poll or list bot updates
    #[command(subcommand)]
    Updates(UpdatesCommand),

    /// Bot identity
    #[command(subcommand)]
    Bot(BotCommand),

    /// Send messages
    #[command(subcommand)]
    Message(MessageCommand),

    /// Inspect or change the webhook
    #[command(subcommand)]
    Webhook(WebhookCommand),
}

/// Flags shared by every command that talks to the Bot API.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Telegram bot token
    #[arg(long)]
    pub token: Option<String>,

    /// Config path (default ~/.tgbot-cli/config.json)
    #[arg(long = "config")]
    pub config_path: Option<PathBuf>,

    /// Config profile name (defaults to active_profile)
    #[arg(long)]
    pub profile: Option<String>,

    /// Telegram API base
    #[arg(long, default_value = DEFAULT_API_BASE)]
    pub api_base: String,
}

#[derive(Subcommand, Debug)]
pub enum UpdatesCommand {
    /// Long-poll for updates and print them as they arrive
    Listen {
        /// Pause between requests (e.g. 500ms, 2s, 1m)
        #[arg(long, default_value = "2s", value_parser = parse_interval, allow_hyphen_values = true)]
        interval: Duration,

        /// getUpdates long-poll timeout in seconds
        #[arg(long, default_value_t = 20, allow_hyphen_values = true)]
        timeout: i64,

        /// Initial update offset
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        offset: i64,

        /// Run only one polling cycle
        #[arg(long)]
        once: bool,

        /// Delete the webhook before polling
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        delete_webhook: bool,

        /// Output format: pretty|jsonl
        #[arg(long, default_value = "pretty")]
        format: OutputFormat,

        #[command(flatten)]
        conn: ConnectionArgs,
    },

    /// Print the most recent pending updates
    List {
        /// Max number of latest updates to print
        #[arg(long, default_value_t = 10, allow_hyphen_values = true)]
        limit: i64,

        /// getUpdates timeout in seconds
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        timeout: i64,

        /// Initial update offset
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        offset: i64,

        /// Delete the webhook before listing
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        delete_webhook: bool,

        /// Output format: pretty|jsonl
        #[arg(long, default_value = "pretty")]
        format: OutputFormat,

        #[command(flatten)]
        conn: ConnectionArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum BotCommand {
    /// Show the bot's own user record
    Me {
        #[command(flatten)]
        conn: ConnectionArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum MessageCommand {
    /// Send a text message
    Send {
        /// Target chat id
        #[arg(long)]
        chat_id: String,

        /// Message text
        #[arg(long)]
        text: String,

        #[command(flatten)]
        conn: ConnectionArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum WebhookCommand {
    /// Show the current webhook configuration
    Info {
        #[command(flatten)]
        conn: ConnectionArgs,
    },

    /// Point the bot at a webhook URL
    Set {
        /// Webhook URL
        #[arg(long)]
        url: String,

        #[command(flatten)]
        conn: ConnectionArgs,
    },

    /// Remove the webhook
    Delete {
        #[command(flatten)]
        conn: ConnectionArgs,
    },
}

impl Commands {
    /// Run the command.
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Command::Updates(cmd) => cmd_updates(cmd).await,
            Command::Bot(BotCommand::Me { conn }) => cmd_bot_me(conn).await,
            Command::Message(MessageCommand::Send { chat_id, text, conn }) => {
                cmd_message_send(chat_id, text, conn).await
            }
            Command::Webhook(cmd) => cmd_webhook(cmd).await,
        }
    }
}

/// Parse an interval such as `500ms`, `2s`, `1.5m`, `1m30s` or `1h15m`, or a
/// bare number of seconds. Negative intervals mean no delay.
pub fn parse_interval(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if let Some(rest) = s.strip_prefix('-') {
        parse_interval(rest)?;
        return Ok(Duration::ZERO);
    }
    let body = s.strip_prefix('+').unwrap_or(s);
    if body.is_empty() {
        return Err(format!("invalid interval {:?}", s));
    }

    let is_number = |c: char| c.is_ascii_digit() || c == '.';
    let mut nanos = 0f64;
    let mut rest = body;
    while !rest.is_empty() {
        let (number, tail) = rest.split_at(rest.find(|c: char| !is_number(c)).unwrap_or(rest.len()));
        let value: f64 = number
            .parse()
            .map_err(|_| format!("invalid interval {:?}", s))?;
        let (unit, tail) = tail.split_at(tail.find(is_number).unwrap_or(tail.len()));

        let scale = match unit {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            // A unitless number is only allowed on its own.
            "" if number.len() == body.len() => 1e9,
            "" => return Err(format!("missing unit in interval {:?}", s)),
            other => {
                return Err(format!(
                    "invalid interval unit {:?} in {:?} (use ns, us, ms, s, m or h)",
                    other, s
                ))
            }
        };
        nanos += value * scale;
        rest = tail;
    }

    if !nanos.is_finite() || nanos > u64::MAX as f64 {
        return Err(format!("invalid interval {:?}: out of range", s));
    }
    Ok(Duration::from_nanos(nanos.round() as u64))
}

fn connect(conn: &ConnectionArgs) -> Result<TelegramClient> {
    let token = resolve_token(&TokenOptions {
        token: conn.token.clone(),
        config_path: conn.config_path.clone(),
        profile: conn.profile.clone(),
    })
    .context("resolve token")?;

    Ok(TelegramClient::new(&conn.api_base, token)?)
}

// Command implementations

async fn cmd_updates(cmd: &UpdatesCommand) -> Result<()> {
    match cmd {
        UpdatesCommand::Listen {
            interval,
            timeout,
            offset,
            once,
            delete_webhook,
            format,
            conn,
        } => {
            let options = PollOptions {
                interval: *interval,
                timeout_secs: *timeout,
                initial_offset: *offset,
                delete_webhook: *delete_webhook,
                once: *once,
                format: *format,
            };
            cmd_updates_listen(options, conn).await
        }
        UpdatesCommand::List {
            limit,
            timeout,
            offset,
            delete_webhook,
            format,
            conn,
        } => {
            let options = ListOptions {
                limit: *limit,
                timeout_secs: *timeout,
                initial_offset: *offset,
                delete_webhook: *delete_webhook,
            };
            cmd_updates_list(options, *format, conn).await
        }
    }
}

async fn cmd_updates_listen(options: PollOptions, conn: &ConnectionArgs) -> Result<()> {
    let client = connect(conn)?;
    let mut poller = Poller::new(&client, options);

    let (cancel_tx, mut cancel_rx) = cancel_channel();
    tokio::spawn(async move {
        wait_for_shutdown().await;
        tracing::info!("shutdown requested");
        let _ = cancel_tx.send(true);
    });

    let mut stdout = std::io::stdout();
    match poller
        .run(&mut stdout, &mut cancel_rx)
        .await
        .context("polling failed")?
    {
        PollOutcome::Completed => tracing::debug!(offset = poller.offset(), "polling finished"),
        PollOutcome::Cancelled => tracing::info!(offset = poller.offset(), "polling stopped"),
    }
    Ok(())
}

async fn cmd_updates_list(options: ListOptions, format: OutputFormat, conn: &ConnectionArgs) -> Result<()> {
    // Reject a bad limit before touching credentials or the network.
    options.capacity()?;

    let client = connect(conn)?;
    let recent = list_recent(&client, &options)
        .await
        .context("updates list failed")?;

    let mut stdout = std::io::stdout().lock();
    write_updates(&mut stdout, &recent, format).context("write output failed")?;
    Ok(())
}

async fn cmd_bot_me(conn: &ConnectionArgs) -> Result<()> {
    let client = connect(conn)?;
    let me = client.get_me().await.context("bot me failed")?;
    print_result(me.get())
}

async fn cmd_message_send(chat_id: &str, text: &str, conn: &ConnectionArgs) -> Result<()> {
    if chat_id.is_empty() || text.is_empty() {
        anyhow::bail!("--chat-id and --text are required");
    }

    let client = connect(conn)?;
    let sent = client
        .send_message(chat_id, text)
        .await
        .context("message send failed")?;
    print_result(sent.get())
}

async fn cmd_webhook(cmd: &WebhookCommand) -> Result<()> {
    match cmd {
        WebhookCommand::Info { conn } => {
            let client = connect(conn)?;
            let info = client
                .get_webhook_info()
                .await
                .context("webhook info failed")?;
            print_result(&serde_json::to_string(&info)?)
        }
        WebhookCommand::Set { url, conn } => {
            if url.is_empty() {
                anyhow::bail!("--url is required");
            }
            let client = connect(conn)?;
            client.set_webhook(url).await.context("webhook set failed")?;
            tracing::info!("webhook set to {}", url);
            Ok(())
        }
        WebhookCommand::Delete { conn } => {
            let client = connect(conn)?;
            client.delete_webhook().await.context("webhook delete failed")?;
            tracing::info!("webhook deleted");
            Ok(())
        }
    }
}

fn print_result(raw: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", pretty_json(raw))?;
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
