//! # Commands Module
//!
//! Everything the back-office dashboard can invoke.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs       ◄─── You are here (exports)
//! ├── caja.rs      ◄─── Open/close/force-close, movements, summaries
//! └── register.rs  ◄─── Register administration
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Command Flow                                         │
//! │                                                                         │
//! │  Dashboard                                                              │
//! │  ─────────                                                              │
//! │  await backoffice.closeRegister({ sessionId, closingBalance: 152000 })  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Rust Backend                                                           │
//! │  ────────────                                                           │
//! │  async fn close_register(                                               │
//! │      db: &DbState,            ◄── Shared manager                       │
//! │      screen: &CajaScreen,     ◄── This screen's view state             │
//! │      user: &UserContext,      ◄── From the auth collaborator           │
//! │      session_id: String,      ◄── From the request                     │
//! │      ...                                                                │
//! │  ) -> Result<CashSession, ApiError>                                     │
//! │         │                                                               │
//! │         │ (JSON serialization)                                          │
//! │         ▼                                                               │
//! │  Dashboard receives: CashSession or { code, message }                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## State Injection
//! Each command declares only the state it needs:
//! ```rust,ignore
//! // Only needs the store
//! async fn list_registers(db: &DbState, user: &UserContext)
//!
//! // Updates the screen
//! async fn open_register(db: &DbState, screen: &CajaScreen, user: &UserContext, ...)
//!
//! // Formats amounts
//! async fn get_session_summary(db: &DbState, config: &ConfigState, user: &UserContext, ...)
//! ```

pub mod caja;
pub mod register;
