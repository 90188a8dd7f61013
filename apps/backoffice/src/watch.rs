//! # Open Sessions Feed
//!
//! Keeps a branch's list of open sessions current.
//!
//! ```text
//! ChangeFeed ──► recv() ──► branch matches? ──no──► keep waiting
//!                              │
//!                             yes
//!                              ▼
//!                 drain queued changes, re-fetch list_open_sessions(branch)
//! ```
//!
//! Every relevant change triggers a full re-fetch. Changes that pile up
//! while a caller is busy collapse into a single re-fetch.

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};

use caja_core::{CashSession, SessionChange};

use crate::manager::{CashSessionManager, ManagerResult};

/// Subscription to the open sessions of one branch.
///
/// Created by [`CashSessionManager::watch_open_sessions`].
#[derive(Debug)]
pub struct OpenSessionsFeed {
    manager: CashSessionManager,
    branch_id: String,
    rx: broadcast::Receiver<SessionChange>,
}

impl OpenSessionsFeed {
    pub(crate) fn new(
        manager: CashSessionManager,
        branch_id: String,
        rx: broadcast::Receiver<SessionChange>,
    ) -> Self {
        OpenSessionsFeed {
            manager,
            branch_id,
            rx,
        }
    }

    /// Branch this feed watches.
    pub fn branch_id(&self) -> &str {
        &self.branch_id
    }

    /// Fetches the current open sessions without waiting for a change.
    pub async fn current(&self) -> ManagerResult<Vec<CashSession>> {
        self.manager.list_open_sessions(&self.branch_id).await
    }

    /// Waits for the next change in the branch and returns the re-fetched
    /// open sessions.
    ///
    /// Returns `None` once the store has been closed
    /// ([`caja_db::Database::close`]).
    pub async fn next(&mut self) -> Option<ManagerResult<Vec<CashSession>>> {
        loop {
            match self.rx.recv().await {
                Ok(change) if change.branch_id == self.branch_id => {
                    debug!(branch_id = %self.branch_id, session_id = %change.session_id, kind = ?change.kind, "Open sessions changed");
                    self.drain();
                    return Some(self.current().await);
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(branch_id = %self.branch_id, skipped, "Change feed lagged, re-fetching");
                    self.drain();
                    return Some(self.current().await);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Discards changes already queued; the re-fetch that follows covers them.
    fn drain(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caja_core::{ChangeKind, Money};
    use caja_db::{Database, DbConfig};
    use std::time::Duration;
    use uuid::Uuid;

    async fn manager() -> CashSessionManager {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        CashSessionManager::new(db)
    }

    #[tokio::test]
    async fn test_refetches_on_open_and_close() {
        let manager = manager().await;
        let register = manager.create_register("branch-1", "Caja 1").await.unwrap();
        let mut feed = manager.watch_open_sessions("branch-1").unwrap();
        assert!(feed.current().await.unwrap().is_empty());

        let session = manager
            .open_session(&register.id, &Uuid::new_v4().to_string(), Money::zero(), None)
            .await
            .unwrap();
        let open = feed.next().await.unwrap().unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, session.id);

        manager.close_session(&session.id, Money::zero(), None).await.unwrap();
        let open = feed.next().await.unwrap().unwrap();
        assert!(open.is_empty());
    }

    #[tokio::test]
    async fn test_ignores_other_branches() {
        let manager = manager().await;
        let mut feed = manager.watch_open_sessions("branch-1").unwrap();

        manager
            .database()
            .changes()
            .publish(ChangeKind::Insert, "s-x", "branch-2");

        let waited = tokio::time::timeout(Duration::from_millis(50), feed.next()).await;
        assert!(waited.is_err(), "a change in another branch must not wake the feed");
    }

    #[tokio::test]
    async fn test_burst_collapses_into_one_refetch() {
        let manager = manager().await;
        let mut feed = manager.watch_open_sessions("branch-1").unwrap();
        let changes = manager.database().changes();

        for _ in 0..5 {
            changes.publish(ChangeKind::Update, "s-1", "branch-1");
        }

        assert!(feed.next().await.unwrap().unwrap().is_empty());
        let waited = tokio::time::timeout(Duration::from_millis(50), feed.next()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_ends_when_store_closes() {
        let manager = manager().await;
        let mut feed = manager.watch_open_sessions("branch-1").unwrap();

        manager.database().close().await;

        let next = tokio::time::timeout(Duration::from_millis(500), feed.next())
            .await
            .expect("closing the store must wake the feed");
        assert!(next.is_none());
        assert!(manager.watch_open_sessions("branch-1").unwrap().next().await.is_none());
    }
}
