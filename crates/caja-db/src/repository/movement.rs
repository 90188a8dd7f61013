//! # Cash Movement Repository
//!
//! Deposits, withdrawals and cash sales/refunds recorded against a session.
//! The store refuses movements on sessions that are not open.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::notify::ChangeFeed;
use caja_core::{CashMovement, ChangeKind};

/// Repository for cash movement database operations.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl MovementRepository {
    /// Creates a new MovementRepository.
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        MovementRepository { pool, feed }
    }

    /// Inserts a movement and publishes an update for its session.
    ///
    /// `branch_id` is the branch of the owning session, used to scope the
    /// change notification.
    pub async fn insert(&self, movement: &CashMovement, branch_id: &str) -> DbResult<()> {
        debug!(
            id = %movement.id,
            session_id = %movement.session_id,
            kind = ?movement.kind,
            amount = movement.amount,
            "Inserting cash movement"
        );

        sqlx::query(
            r#"
            INSERT INTO cash_movements (id, session_id, kind, amount, note, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.session_id)
        .bind(movement.kind)
        .bind(movement.amount)
        .bind(&movement.note)
        .bind(movement.created_at)
        .execute(&self.pool)
        .await?;

        self.feed
            .publish(ChangeKind::Update, &movement.session_id, branch_id);

        Ok(())
    }

    /// Lists the movements of a session in recording order.
    pub async fn list_for_session(&self, session_id: &str) -> DbResult<Vec<CashMovement>> {
        let movements = sqlx::query_as::<_, CashMovement>(
            r#"
            SELECT id, session_id, kind, amount, note, created_at
            FROM cash_movements
            WHERE session_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }
}
