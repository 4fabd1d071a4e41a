//! The `getUpdates` long-polling loop.

use std::io::Write;
use std::time::Duration;

use super::format::{format_update, OutputFormat};
use super::{advance_cursor, cancelled, CancelSignal, UpdateSource};
use crate::error::Result;
use crate::telegram::Update;

/// Poller settings.
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Pause between fetches in continuous mode. Zero polls back to back.
    pub interval: Duration,
    /// Long-poll timeout passed to the server. Negative values become 0.
    pub timeout_secs: i64,
    pub initial_offset: i64,
    pub delete_webhook: bool,
    /// Stop after a single fetch.
    pub once: bool,
    pub format: OutputFormat,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            timeout_secs: 20,
            initial_offset: 0,
            delete_webhook: true,
            once: false,
            format: OutputFormat::Pretty,
        }
    }
}

/// How a run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Completed,
    Cancelled,
}

/// Drives `getUpdates` and owns the offset cursor for one run.
pub struct Poller<S> {
    source: S,
    options: PollOptions,
    offset: i64,
}

impl<S: UpdateSource> Poller<S> {
    pub fn new(source: S, mut options: PollOptions) -> Self {
        if options.timeout_secs < 0 {
            options.timeout_secs = 0;
        }
        let offset = options.initial_offset;
        Self {
            source,
            options,
            offset,
        }
    }

    /// The next update id the poller will ask for.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Poll until cancelled, until a fetch fails, or after one batch in
    /// single-shot mode. Records are written to `out` in arrival order.
    pub async fn run<W: Write>(&mut self, out: &mut W, cancel: &mut CancelSignal) -> Result<PollOutcome> {
        if self.options.delete_webhook {
            tracing::info!("deleting webhook before polling...");
            tokio::select! {
                biased;
                _ = cancelled(cancel) => return Ok(PollOutcome::Cancelled),
                res = self.source.delete_webhook() => res?,
            }
        }

        loop {
            let batch = tokio::select! {
                biased;
                _ = cancelled(cancel) => {
                    tracing::info!(offset = self.offset, "polling cancelled");
                    return Ok(PollOutcome::Cancelled);
                }
                res = self.source.get_updates(self.offset, self.options.timeout_secs, None) => res?,
            };

            tracing::debug!(count = batch.len(), offset = self.offset, "fetched updates");
            self.process_batch(&batch, out)?;

            if self.options.once {
                return Ok(PollOutcome::Completed);
            }

            if !self.options.interval.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancelled(cancel) => {
                        tracing::info!(offset = self.offset, "polling cancelled");
                        return Ok(PollOutcome::Cancelled);
                    }
                    _ = tokio::time::sleep(self.options.interval) => {}
                }
            }
        }
    }

    fn process_batch<W: Write>(&mut self, batch: &[Update], out: &mut W) -> Result<()> {
        for update in batch {
            let formatted = format_update(&update.raw, self.options.format)?;
            out.write_all(&formatted)?;
            self.offset = advance_cursor(self.offset, update.update_id);
        }
        out.flush()?;
        Ok(())
    }
}
