//! # Database State
//!
//! Wraps the `Database` connection and the session manager built on it.
//!
//! ## Thread Safety
//! The `Database` struct from `caja-db` contains a `SqlitePool` which
//! is inherently thread-safe. Multiple commands can execute queries
//! concurrently without explicit locking.
//!
//! ## Usage in Commands
//! ```rust,ignore
//! pub async fn refresh_open_sessions(
//!     db: &DbState,
//!     screen: &CajaScreen,
//!     user: &UserContext,
//! ) -> Result<Vec<CashSession>, ApiError> {
//!     let sessions = db.manager().list_open_sessions(&user.branch_id).await?;
//!     ...
//! }
//! ```

use caja_db::Database;

use crate::manager::CashSessionManager;

/// Shared handle given to every command.
#[derive(Debug, Clone)]
pub struct DbState {
    manager: CashSessionManager,
}

impl DbState {
    /// Creates a new DbState wrapping the database connection.
    pub fn new(db: Database) -> Self {
        DbState {
            manager: CashSessionManager::new(db),
        }
    }

    /// Returns the cash session manager.
    pub fn manager(&self) -> &CashSessionManager {
        &self.manager
    }

    /// Returns a reference to the inner Database.
    pub fn inner(&self) -> &Database {
        self.manager.database()
    }
}
