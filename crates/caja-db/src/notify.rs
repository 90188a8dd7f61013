//! # Change Feed
//!
//! Row-change notifications for cash sessions.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SessionRepository::insert / close ──► ChangeFeed::publish             │
//! │  MovementRepository::insert        ──┘        │                         │
//! │                                               ▼                         │
//! │                          broadcast::channel(256)                        │
//! │                     ┌─────────────┼─────────────┐                       │
//! │                     ▼             ▼             ▼                       │
//! │               dashboard A   dashboard B   admin monitor                 │
//! │              (branch filter on the receiving side)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Publishing never fails: with no subscribers the change is dropped.
//! Closing the feed (done by `Database::close`) ends every subscription.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, trace};

use caja_core::{ChangeKind, SessionChange};

/// Capacity of the change channel. Slow receivers past this see `Lagged`.
pub const CHANGE_FEED_CAPACITY: usize = 256;

/// Broadcast feed of session changes.
///
/// Clones share one channel. Once closed, the sender is gone and
/// receivers see `RecvError::Closed` after the queued changes.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: Arc<Mutex<Option<broadcast::Sender<SessionChange>>>>,
}

impl ChangeFeed {
    /// Creates a new feed with [`CHANGE_FEED_CAPACITY`].
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        ChangeFeed {
            tx: Arc::new(Mutex::new(Some(tx))),
        }
    }

    fn sender(&self) -> Option<broadcast::Sender<SessionChange>> {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Publishes a change to every current subscriber.
    pub fn publish(&self, kind: ChangeKind, session_id: &str, branch_id: &str) {
        let change = SessionChange {
            kind,
            session_id: session_id.to_string(),
            branch_id: branch_id.to_string(),
        };
        let receivers = self
            .sender()
            .map_or(0, |tx| tx.send(change).unwrap_or(0));
        trace!(session_id, branch_id, ?kind, receivers, "Published session change");
    }

    /// Subscribes to changes published after this call.
    ///
    /// On a closed feed the receiver is already closed.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        match self.sender() {
            Some(tx) => tx.subscribe(),
            None => broadcast::channel(1).1,
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender().map_or(0, |tx| tx.receiver_count())
    }

    /// Drops the sender so every subscription ends.
    pub fn close(&self) {
        if self.tx.lock().unwrap_or_else(PoisonError::into_inner).take().is_some() {
            debug!("Change feed closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender().is_none()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        ChangeFeed::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let feed = ChangeFeed::new();
        let mut rx = feed.subscribe();

        feed.publish(ChangeKind::Insert, "s-1", "branch-1");

        let change = rx.recv().await.unwrap();
        assert_eq!(change.kind, ChangeKind::Insert);
        assert_eq!(change.session_id, "s-1");
        assert_eq!(change.branch_id, "branch-1");
    }

    #[tokio::test]
    async fn test_close_ends_subscriptions() {
        let feed = ChangeFeed::new();
        let mut rx = feed.subscribe();
        feed.publish(ChangeKind::Update, "s-1", "branch-1");

        feed.clone().close();
        assert!(feed.is_closed());

        // Queued changes are still delivered before the close.
        assert_eq!(rx.recv().await.unwrap().session_id, "s-1");
        assert!(matches!(rx.recv().await, Err(broadcast::error::RecvError::Closed)));

        let mut late = feed.subscribe();
        assert!(matches!(late.recv().await, Err(broadcast::error::RecvError::Closed)));
        feed.publish(ChangeKind::Insert, "s-2", "branch-1");
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let feed = ChangeFeed::new();
        assert_eq!(feed.subscriber_count(), 0);
        feed.publish(ChangeKind::Update, "s-1", "branch-1");
    }
}
