//! # State Module
//!
//! Application state for the back-office.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌─────────────┐ │
//! │  │   DbState    │  │  CajaScreen  │  │ ConfigState  │  │ UserContext │ │
//! │  │              │  │              │  │              │  │             │ │
//! │  │  Manager +   │  │  Arc<Mutex<  │  │  branch_id   │  │  user_id    │ │
//! │  │  Database    │  │   CajaView   │  │  currency    │  │  branch_id  │ │
//! │  │  (pool)      │  │  >>          │  │  history     │  │  role       │ │
//! │  └──────────────┘  └──────────────┘  └──────────────┘  └─────────────┘ │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • DbState: Database has internal connection pool (thread-safe)        │
//! │  • CajaScreen: one per screen, protected by Arc<Mutex<T>>              │
//! │  • ConfigState, UserContext: read-only                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod caja;
mod config;
mod db;
mod user;

pub use caja::{CajaAction, CajaScreen, CajaView, PendingGuard};
pub use config::ConfigState;
pub use db::DbState;
pub use user::{Role, UserContext};
