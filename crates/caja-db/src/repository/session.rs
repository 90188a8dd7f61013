//! # Cash Session Repository
//!
//! Rows of the `cash_sessions` table.
//!
//! ## Write Rules
//! - Sessions are inserted `open` and updated exactly once, to `closed`
//! - The close UPDATE is guarded with `state = 'open'`, so a lost race
//!   surfaces as `NotFound` instead of overwriting a closed row
//! - The partial unique indexes reject a second open session per register
//!   or per operator; callers map those violations to conflicts
//!
//! Every successful write publishes on the [`ChangeFeed`].

use sqlx::SqlitePool;
use tracing::debug;

use super::SESSION_COLUMNS;
use crate::error::{DbError, DbResult};
use crate::notify::ChangeFeed;
use caja_core::{CashSession, ChangeKind};

/// Repository for cash session database operations.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl SessionRepository {
    /// Creates a new SessionRepository.
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        SessionRepository { pool, feed }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a session by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CashSession>> {
        let sql = format!("SELECT {} FROM cash_sessions WHERE id = ?1", SESSION_COLUMNS);

        let session = sqlx::query_as::<_, CashSession>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(session)
    }

    /// Gets the open session held by an operator, if any.
    pub async fn find_open_by_operator(&self, operator_id: &str) -> DbResult<Option<CashSession>> {
        let sql = format!(
            "SELECT {} FROM cash_sessions WHERE operator_id = ?1 AND state = 'open'",
            SESSION_COLUMNS
        );

        let session = sqlx::query_as::<_, CashSession>(&sql)
            .bind(operator_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(session)
    }

    /// Gets the open session on a register, if any.
    pub async fn find_open_by_register(&self, register_id: &str) -> DbResult<Option<CashSession>> {
        let sql = format!(
            "SELECT {} FROM cash_sessions WHERE register_id = ?1 AND state = 'open'",
            SESSION_COLUMNS
        );

        let session = sqlx::query_as::<_, CashSession>(&sql)
            .bind(register_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(session)
    }

    /// Lists open sessions in a branch, most recently opened first.
    ///
    /// Ties on `opened_at` fall back to insertion order (newest first).
    pub async fn list_open_by_branch(&self, branch_id: &str) -> DbResult<Vec<CashSession>> {
        let sql = format!(
            r#"
            SELECT {} FROM cash_sessions
            WHERE branch_id = ?1 AND state = 'open'
            ORDER BY opened_at DESC, rowid DESC
            "#,
            SESSION_COLUMNS
        );

        let sessions = sqlx::query_as::<_, CashSession>(&sql)
            .bind(branch_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(sessions)
    }

    /// Lists closed sessions in a branch, most recently closed first.
    pub async fn list_closed_by_branch(
        &self,
        branch_id: &str,
        limit: i64,
    ) -> DbResult<Vec<CashSession>> {
        let sql = format!(
            r#"
            SELECT {} FROM cash_sessions
            WHERE branch_id = ?1 AND state = 'closed'
            ORDER BY closed_at DESC, rowid DESC
            LIMIT ?2
            "#,
            SESSION_COLUMNS
        );

        let sessions = sqlx::query_as::<_, CashSession>(&sql)
            .bind(branch_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(sessions)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Inserts a new open session.
    ///
    /// ## Errors
    /// - `UniqueViolation` on `cash_sessions.register_id` or
    ///   `cash_sessions.operator_id` when an open session already exists
    /// - `ForeignKeyViolation` when the register doesn't exist
    pub async fn insert(&self, session: &CashSession) -> DbResult<()> {
        debug!(
            id = %session.id,
            register_id = %session.register_id,
            operator_id = %session.operator_id,
            "Inserting cash session"
        );

        sqlx::query(
            r#"
            INSERT INTO cash_sessions (
                id, register_id, operator_id, branch_id, state,
                opening_balance, closing_balance, opened_at, closed_at,
                notes, force_closed
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&session.id)
        .bind(&session.register_id)
        .bind(&session.operator_id)
        .bind(&session.branch_id)
        .bind(session.state)
        .bind(session.opening_balance)
        .bind(session.closing_balance)
        .bind(session.opened_at)
        .bind(session.closed_at)
        .bind(&session.notes)
        .bind(session.force_closed)
        .execute(&self.pool)
        .await?;

        self.feed
            .publish(ChangeKind::Insert, &session.id, &session.branch_id);

        Ok(())
    }

    /// Writes the closing fields of a session that is still open.
    ///
    /// `closed` is the full row as produced by the lifecycle functions; only
    /// the fields a close may change are written.
    ///
    /// ## Errors
    /// `NotFound` when no open session with that ID exists (missing, or
    /// closed concurrently).
    pub async fn close(&self, closed: &CashSession) -> DbResult<()> {
        debug!(id = %closed.id, force = closed.force_closed, "Closing cash session");

        let result = sqlx::query(
            r#"
            UPDATE cash_sessions SET
                state = ?2,
                closing_balance = ?3,
                closed_at = ?4,
                notes = ?5,
                force_closed = ?6
            WHERE id = ?1 AND state = 'open'
            "#,
        )
        .bind(&closed.id)
        .bind(closed.state)
        .bind(closed.closing_balance)
        .bind(closed.closed_at)
        .bind(&closed.notes)
        .bind(closed.force_closed)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Open cash session", &closed.id));
        }

        self.feed
            .publish(ChangeKind::Update, &closed.id, &closed.branch_id);

        Ok(())
    }

    /// Counts open sessions in a branch.
    pub async fn count_open_by_branch(&self, branch_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM cash_sessions WHERE branch_id = ?1 AND state = 'open'",
        )
        .bind(branch_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use caja_core::{Money, Register, SessionState};
    use chrono::{Duration, Utc};

    async fn setup() -> (Database, Register, Register) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let r1 = Register::new("branch-1", "Caja 1", Utc::now());
        let r2 = Register::new("branch-1", "Caja 2", Utc::now());
        db.registers().insert(&r1).await.unwrap();
        db.registers().insert(&r2).await.unwrap();
        (db, r1, r2)
    }

    fn open(register: &Register, operator: &str) -> CashSession {
        CashSession::open(register, operator, Money::from_minor(10_000), None, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_find_open() {
        let (db, r1, _) = setup().await;
        let repo = db.sessions();
        let session = open(&r1, "op-a");

        repo.insert(&session).await.unwrap();

        let by_operator = repo.find_open_by_operator("op-a").await.unwrap().unwrap();
        let by_register = repo.find_open_by_register(&r1.id).await.unwrap().unwrap();
        assert_eq!(by_operator, session);
        assert_eq!(by_register.id, session.id);
        assert!(repo.find_open_by_operator("op-b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_second_open_on_register_rejected() {
        let (db, r1, _) = setup().await;
        let repo = db.sessions();

        repo.insert(&open(&r1, "op-a")).await.unwrap();
        let err = repo.insert(&open(&r1, "op-b")).await.unwrap_err();

        assert!(err.is_unique_violation_on("cash_sessions.register_id"));
    }

    #[tokio::test]
    async fn test_second_open_for_operator_rejected() {
        let (db, r1, r2) = setup().await;
        let repo = db.sessions();

        repo.insert(&open(&r1, "op-a")).await.unwrap();
        let err = repo.insert(&open(&r2, "op-a")).await.unwrap_err();

        assert!(err.is_unique_violation_on("cash_sessions.operator_id"));
    }

    #[tokio::test]
    async fn test_unknown_register_rejected() {
        let (db, _, _) = setup().await;
        let ghost = Register::new("branch-1", "Ghost", Utc::now());

        let err = db.sessions().insert(&open(&ghost, "op-a")).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_close_frees_register_and_operator() {
        let (db, r1, r2) = setup().await;
        let repo = db.sessions();
        let session = open(&r1, "op-a");
        repo.insert(&session).await.unwrap();

        let closed = session
            .close(Money::from_minor(12_000), Some("ok"), Utc::now())
            .unwrap();
        repo.close(&closed).await.unwrap();

        let stored = repo.get_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.state, SessionState::Closed);
        assert_eq!(stored.closing_balance, Some(12_000));
        assert_eq!(stored.notes.as_deref(), Some("ok"));
        assert!(stored.closed_at.is_some());

        repo.insert(&open(&r1, "op-b")).await.unwrap();
        repo.insert(&open(&r2, "op-a")).await.unwrap();
    }

    #[tokio::test]
    async fn test_close_twice_is_not_found() {
        let (db, r1, _) = setup().await;
        let repo = db.sessions();
        let session = open(&r1, "op-a");
        repo.insert(&session).await.unwrap();

        let closed = session.close(Money::zero(), None, Utc::now()).unwrap();
        repo.close(&closed).await.unwrap();

        let err = repo.close(&closed).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_store_rejects_closed_without_balance() {
        let (db, r1, _) = setup().await;
        let repo = db.sessions();
        let session = open(&r1, "op-a");
        repo.insert(&session).await.unwrap();

        let broken = CashSession {
            state: SessionState::Closed,
            closed_at: Some(Utc::now()),
            closing_balance: None,
            ..session
        };

        let err = repo.close(&broken).await.unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }

    #[tokio::test]
    async fn test_list_open_orders_newest_first() {
        let (db, r1, r2) = setup().await;
        let repo = db.sessions();
        let now = Utc::now();

        let mut older = open(&r1, "op-a");
        older.opened_at = now - Duration::minutes(5);
        let mut newer = open(&r2, "op-b");
        newer.opened_at = now;
        repo.insert(&older).await.unwrap();
        repo.insert(&newer).await.unwrap();

        let listed = repo.list_open_by_branch("branch-1").await.unwrap();
        let ids: Vec<_> = listed.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec![newer.id.as_str(), older.id.as_str()]);
        assert!(repo.list_open_by_branch("branch-2").await.unwrap().is_empty());
        assert_eq!(repo.count_open_by_branch("branch-1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_list_closed_respects_limit() {
        let (db, r1, _) = setup().await;
        let repo = db.sessions();

        for _ in 0..3 {
            let session = open(&r1, "op-a");
            repo.insert(&session).await.unwrap();
            let closed = session.close(Money::zero(), None, Utc::now()).unwrap();
            repo.close(&closed).await.unwrap();
        }

        assert_eq!(repo.list_closed_by_branch("branch-1", 2).await.unwrap().len(), 2);
        assert_eq!(repo.list_closed_by_branch("branch-1", 10).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_writes_publish_changes() {
        let (db, r1, _) = setup().await;
        let mut rx = db.changes().subscribe();
        let repo = db.sessions();
        let session = open(&r1, "op-a");

        repo.insert(&session).await.unwrap();
        let closed = session.close(Money::zero(), None, Utc::now()).unwrap();
        repo.close(&closed).await.unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.kind, ChangeKind::Insert);
        assert_eq!(second.kind, ChangeKind::Update);
        assert_eq!(second.session_id, session.id);
        assert_eq!(second.branch_id, "branch-1");
    }
}
