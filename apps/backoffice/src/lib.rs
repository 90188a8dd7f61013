//! # Caja Back-Office Library
//!
//! Cash session manager, dashboard commands and the admin monitor.
//!
//! ## Module Organization
//! ```text
//! caja_backoffice/
//! ├── lib.rs          ◄─── You are here (startup & monitor loop)
//! ├── manager.rs      ◄─── CashSessionManager + ManagerError
//! ├── watch.rs        ◄─── OpenSessionsFeed (re-fetch on change)
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── db.rs       ◄─── Database + manager wrapper
//! │   ├── caja.rs     ◄─── Caja screen view state
//! │   ├── config.rs   ◄─── Configuration state
//! │   └── user.rs     ◄─── Caller identity and role
//! ├── commands/
//! │   ├── mod.rs      ◄─── Command exports
//! │   ├── caja.rs     ◄─── Open/close/force-close, movements
//! │   └── register.rs ◄─── Register administration
//! └── error.rs        ◄─── API error type for commands
//! ```

pub mod commands;
pub mod error;
pub mod manager;
pub mod state;
pub mod watch;

use anyhow::Context;
use directories::ProjectDirs;
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use caja_core::CashSession;
use caja_db::{Database, DbConfig};
use state::{ConfigState, DbState};

pub use error::{ApiError, ErrorCode};
pub use manager::{CashSessionManager, ManagerError, ManagerResult};
pub use watch::OpenSessionsFeed;

/// Runs the admin monitor.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                       Monitor Startup                                   │
/// │                                                                         │
/// │  1. Initialize Logging ───────────────────────────────────────────────► │
/// │     • tracing-subscriber with env filter                                │
/// │     • Default: info,caja=debug,sqlx=warn; override with RUST_LOG        │
/// │                                                                         │
/// │  2. Load Configuration (CAJA_* environment variables) ────────────────► │
/// │                                                                         │
/// │  3. Determine Database Path ──────────────────────────────────────────► │
/// │     • CAJA_DB_PATH, or the platform data directory                      │
/// │                                                                         │
/// │  4. Connect to Database ──────────────────────────────────────────────► │
/// │     • SQLite with WAL mode                                              │
/// │     • Run pending migrations                                            │
/// │                                                                         │
/// │  5. Watch Open Sessions ──────────────────────────────────────────────► │
/// │     • Log the list now and after every change, until Ctrl-C             │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting Caja back-office monitor");

    let config = ConfigState::from_env();
    let db_path = get_database_path(&config)?;
    info!(?db_path, branch_id = %config.branch_id, "Configuration loaded");

    let db = Database::new(DbConfig::new(db_path))
        .await
        .context("failed to open the cash session database")?;
    info!("Database connected and migrations applied");

    let db_state = DbState::new(db);
    let mut feed = db_state.manager().watch_open_sessions(&config.branch_id)?;

    log_open_sessions(&config, &feed.current().await?);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
            next = feed.next() => match next {
                Some(Ok(sessions)) => log_open_sessions(&config, &sessions),
                Some(Err(e)) if e.is_transient() => warn!(error = %e, "Store unavailable, waiting for the next change"),
                Some(Err(e)) => return Err(e.into()),
                None => {
                    warn!("Store closed, stopping monitor");
                    break;
                }
            },
        }
    }

    db_state.inner().close().await;
    Ok(())
}

fn log_open_sessions(config: &ConfigState, sessions: &[CashSession]) {
    info!(
        store = %config.store_name,
        branch_id = %config.branch_id,
        open = sessions.len(),
        "Open cash sessions"
    );

    for session in sessions {
        info!(
            session_id = %session.id,
            register_id = %session.register_id,
            operator_id = %session.operator_id,
            opened_at = %session.opened_at,
            opening = %config.format_currency(session.opening_balance),
            "  open"
        );
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=caja=trace` - Show trace for caja crates only
/// - Default: `info,caja=debug,sqlx=warn`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,caja=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::TRACE)
        .init();
}

/// Determines the database file path.
///
/// ## Platform-Specific Paths
/// - **macOS**: `~/Library/Application Support/com.caja.backoffice/caja.db`
/// - **Windows**: `%APPDATA%\caja\backoffice\data\caja.db`
/// - **Linux**: `~/.local/share/backoffice/caja.db`
///
/// `CAJA_DB_PATH` (via [`ConfigState::db_path`]) overrides the default.
pub fn get_database_path(config: &ConfigState) -> anyhow::Result<PathBuf> {
    if let Some(path) = &config.db_path {
        return Ok(path.clone());
    }

    let proj_dirs = ProjectDirs::from("com", "caja", "backoffice")
        .context("could not determine app data directory")?;

    let data_dir = proj_dirs.data_dir();
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("could not create {}", data_dir.display()))?;

    Ok(data_dir.join("caja.db"))
}
