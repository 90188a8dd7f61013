//! # Store Handle
//!
//! Opens the SQLite file behind the cash-session store and hands out
//! repositories that share one pool and one change feed.
//!
//! ```text
//! DbConfig ──► Database::new ──► WAL pool + schema ──► registers()
//!                                                 ├──► sessions()   ─┐
//!                                                 └──► movements()  ─┴─► ChangeFeed
//! ```
//!
//! Register opens and closes are short writes; WAL keeps the dashboard's
//! open-session reads from waiting on them.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::notify::ChangeFeed;
use crate::repository::movement::MovementRepository;
use crate::repository::register::RegisterRepository;
use crate::repository::session::SessionRepository;

/// How long a writer waits on SQLite's lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the store lives and how many connections it may hold.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
    pub max_connections: u32,
    /// Wait for a free connection before reporting `PoolExhausted`.
    pub acquire_timeout: Duration,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            path: path.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    /// A private in-memory store. Used by tests.
    ///
    /// Held on a single connection: every SQLite `:memory:` connection is
    /// its own database.
    pub fn in_memory() -> Self {
        DbConfig {
            path: PathBuf::from(":memory:"),
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// The cash-session store.
///
/// Clones share the pool and the change feed.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl Database {
    /// Opens (creating if needed) the store and applies pending migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.path.display(), "Opening cash session store");

        // The URL form lets sqlx give each `:memory:` store its own name
        let url = format!("sqlite://{}?mode=rwc", config.path.display());
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT)
            // Registers, sessions and movements reference each other
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        migrations::run_migrations(&pool).await?;

        info!(max_connections = config.max_connections, "Cash session store ready");

        Ok(Database {
            pool,
            feed: ChangeFeed::new(),
        })
    }

    /// Change notifications for sessions and movements.
    pub fn changes(&self) -> &ChangeFeed {
        &self.feed
    }

    pub fn registers(&self) -> RegisterRepository {
        RegisterRepository::new(self.pool.clone())
    }

    pub fn sessions(&self) -> SessionRepository {
        SessionRepository::new(self.pool.clone(), self.feed.clone())
    }

    pub fn movements(&self) -> MovementRepository {
        MovementRepository::new(self.pool.clone(), self.feed.clone())
    }

    /// Closes the pool and the change feed. Later calls fail with
    /// `ConnectionFailed`; subscriptions end.
    pub async fn close(&self) {
        info!("Closing cash session store");
        self.feed.close();
        self.pool.close().await;
    }
}
