//! # caja-core: Pure Cash-Session Logic
//!
//! This crate holds the rules of the cash-register (caja) session lifecycle
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Caja Architecture                                │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Back-office dashboard (web)                     │   │
//! │  │      Open register ──► Cash movements ──► Close register        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │       caja-backoffice (commands + CashSessionManager)           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ caja-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌────────────┐  │   │
//! │  │   │   types   │  │ lifecycle │  │ validation│  │ reconcile  │  │   │
//! │  │   │ Register  │  │ open      │  │ balances  │  │ expected   │  │   │
//! │  │   │ Session   │  │ close     │  │ notes     │  │ vs counted │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    caja-db (Database Layer)                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Register, CashSession, CashMovement, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//! - [`lifecycle`] - Session state transitions and preconditions
//! - [`reconciliation`] - Expected vs declared cash
//!
//! ## Example Usage
//!
//! ```rust
//! use caja_core::money::Money;
//! use caja_core::reconciliation::reconcile;
//! use caja_core::{CashSession, Register};
//! use chrono::Utc;
//!
//! let register = Register::new("branch-1", "Caja 1", Utc::now());
//! let session = CashSession::open(&register, "operator-1", Money::from_minor(10_000), None, Utc::now())
//!     .unwrap();
//!
//! let summary = reconcile(&session, &[]).unwrap();
//! assert_eq!(summary.expected.minor(), 10_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod lifecycle;
pub mod money;
pub mod reconciliation;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of free-text notes on a session or movement.
pub const MAX_NOTES_LEN: usize = 500;

/// Largest declared drawer balance, in minor units.
pub const MAX_BALANCE: i64 = 1_000_000_000_000;

/// Largest single cash movement, in minor units.
pub const MAX_MOVEMENT: i64 = 1_000_000_000_000;

/// Maximum length of a register display name.
pub const MAX_REGISTER_NAME_LEN: usize = 100;

/// Marker written into the notes of a force-closed session.
pub const FORCE_CLOSE_MARKER: &str = "[ADMIN FORCE CLOSE]";
