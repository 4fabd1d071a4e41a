//! Logging setup for tgbot using tracing.
//!
//! Diagnostics go to stderr so stdout stays clean for update records. When
//! the platform data directory is writable, a daily rolling log file is kept
//! there as well.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_FILTER: &str = "warn,tgbot=info";

/// Initialize logging. The returned guard must be held until exit so the
/// file writer flushes.
pub fn init() -> anyhow::Result<Option<WorkerGuard>> {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .without_time()
        .with_filter(filter());

    let (file_layer, guard) = match get_log_dir().and_then(|dir| {
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }) {
        Ok(log_dir) => {
            let file_appender = tracing_appender::rolling::daily(&log_dir, "tgbot.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter());
            (Some(layer), Some(guard))
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

/// Get the log directory path.
fn get_log_dir() -> anyhow::Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("com", "tgbot", "tgbot")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;

    Ok(dirs.data_dir().join("logs"))
}
