//! # Repository Module
//!
//! Database repository implementations for the cash-session store.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CashSessionManager                                                    │
//! │       │                                                                 │
//! │       │  db.sessions().find_open_by_operator("user-uuid")              │
//! │       ▼                                                                 │
//! │  SessionRepository                                                     │
//! │  ├── insert(&self, session)         → publishes Insert                 │
//! │  ├── close(&self, closed_session)   → publishes Update                 │
//! │  ├── list_open_by_branch(&self, branch)                                │
//! │  └── ...                                                               │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database (constraints are the final authority)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`register::RegisterRepository`] - Register CRUD and activation
//! - [`session::SessionRepository`] - Cash session lifecycle rows
//! - [`movement::MovementRepository`] - Cash movements of a session

pub mod movement;
pub mod register;
pub mod session;

/// Column list shared by every `cash_sessions` SELECT.
pub(crate) const SESSION_COLUMNS: &str = "id, register_id, operator_id, branch_id, state, \
     opening_balance, closing_balance, opened_at, closed_at, notes, force_closed";
