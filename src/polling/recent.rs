//! "Last N updates" on top of a forward-only `getUpdates`.
//!
//! The Bot API has no tail operation, so the whole pending backlog is paged
//! through with the usual offset cursor while a fixed-size window keeps only
//! the newest records.

use super::{advance_cursor, UpdateSource};
use crate::error::{Error, Result};
use crate::telegram::Update;

/// Page size for each `getUpdates` call while draining the backlog.
pub const LIST_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone)]
pub struct ListOptions {
    /// How many of the most recent updates to keep. Must be positive.
    pub limit: i64,
    pub timeout_secs: i64,
    pub initial_offset: i64,
    pub delete_webhook: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            timeout_secs: 0,
            initial_offset: 0,
            delete_webhook: true,
        }
    }
}

impl ListOptions {
    /// Window size, rejecting a non-positive limit.
    pub fn capacity(&self) -> Result<usize> {
        usize::try_from(self.limit)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| Error::config("--limit must be greater than 0"))
    }
}

/// Fixed-capacity FIFO that overwrites its oldest entry when full.
#[derive(Debug)]
pub struct RecentWindow {
    items: Vec<Update>,
    capacity: usize,
    // Index of the oldest entry once the buffer has wrapped.
    start: usize,
}

impl RecentWindow {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "window capacity must be positive");
        Self {
            items: Vec::new(),
            capacity,
            start: 0,
        }
    }

    pub fn push(&mut self, update: Update) {
        if self.items.len() < self.capacity {
            self.items.push(update);
        } else {
            self.items[self.start] = update;
            self.start = (self.start + 1) % self.capacity;
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Contents oldest first.
    pub fn into_vec(mut self) -> Vec<Update> {
        self.items.rotate_left(self.start);
        self.items
    }
}

/// Drain the backlog and return its newest `limit` updates in arrival order.
pub async fn list_recent<S: UpdateSource + ?Sized>(source: &S, options: &ListOptions) -> Result<Vec<Update>> {
    let capacity = options.capacity()?;

    if options.delete_webhook {
        tracing::info!("deleting webhook before listing...");
        source.delete_webhook().await?;
    }

    let timeout_secs = options.timeout_secs.max(0);
    let mut window = RecentWindow::new(capacity);
    let mut offset = options.initial_offset;
    let mut pages = 0usize;

    loop {
        let batch = source
            .get_updates(offset, timeout_secs, Some(LIST_PAGE_SIZE))
            .await?;
        pages += 1;
        if batch.is_empty() {
            break;
        }

        for update in batch {
            offset = advance_cursor(offset, update.update_id);
            window.push(update);
        }
    }

    tracing::debug!(pages, kept = window.len(), next_offset = offset, "backlog exhausted");
    Ok(window.into_vec())
}
