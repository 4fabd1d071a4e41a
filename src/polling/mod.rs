//! Long-polling over `getUpdates`: the update loop, the bounded "last N"
//! listing, and record formatting.

pub mod format;
pub mod poller;
pub mod recent;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::Result;
use crate::telegram::Update;

pub use format::{format_update, write_updates, OutputFormat};
pub use poller::{PollOptions, PollOutcome, Poller};
pub use recent::{list_recent, ListOptions, RecentWindow, LIST_PAGE_SIZE};

/// The remote calls the polling code depends on.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Remove any configured webhook so `getUpdates` is allowed.
    async fn delete_webhook(&self) -> Result<()>;

    /// Fetch updates with id >= `offset`, waiting up to `timeout_secs` for
    /// new data when none is pending.
    async fn get_updates(&self, offset: i64, timeout_secs: i64, limit: Option<u32>) -> Result<Vec<Update>>;
}

#[async_trait]
impl<T: UpdateSource + ?Sized> UpdateSource for &T {
    async fn delete_webhook(&self) -> Result<()> {
        (**self).delete_webhook().await
    }

    async fn get_updates(&self, offset: i64, timeout_secs: i64, limit: Option<u32>) -> Result<Vec<Update>> {
        (**self).get_updates(offset, timeout_secs, limit).await
    }
}

/// Receiving side of a cancellation flag. Flipping the sender to `true`
/// stops a running poll.
pub type CancelSignal = watch::Receiver<bool>;

pub fn cancel_channel() -> (watch::Sender<bool>, CancelSignal) {
    watch::channel(false)
}

/// Resolves once cancellation is requested. A dropped sender can never
/// cancel, so the future then stays pending.
pub(crate) async fn cancelled(signal: &mut CancelSignal) {
    let closed = signal.wait_for(|cancel| *cancel).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}

/// Next cursor value after seeing `update_id`. Never moves backwards, and
/// pins at `i64::MAX` instead of wrapping.
pub(crate) fn advance_cursor(offset: i64, update_id: i64) -> i64 {
    if update_id >= offset {
        update_id.saturating_add(1)
    } else {
        offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_cursor() {
        assert_eq!(advance_cursor(0, 10), 11);
        assert_eq!(advance_cursor(11, 11), 12);
        assert_eq!(advance_cursor(20, 5), 20);
        assert_eq!(advance_cursor(5, i64::MAX), i64::MAX);
        assert_eq!(advance_cursor(i64::MAX, i64::MAX), i64::MAX);
    }

    #[tokio::test]
    async fn test_cancelled_resolves_when_already_set() {
        let (tx, mut rx) = cancel_channel();
        tx.send(true).unwrap();
        cancelled(&mut rx).await;
    }

    #[tokio::test]
    async fn test_dropped_sender_never_cancels() {
        let (tx, mut rx) = cancel_channel();
        drop(tx);
        let waited = tokio::time::timeout(std::time::Duration::from_millis(20), cancelled(&mut rx)).await;
        assert!(waited.is_err());
    }
}
