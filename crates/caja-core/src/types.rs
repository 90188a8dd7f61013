//! # Domain Types
//!
//! Core domain types for cash-register sessions.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Register     │   │   CashSession   │   │  CashMovement   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  register_id    │◄──│  session_id     │       │
//! │  │  branch_id      │   │  operator_id    │   │  kind           │       │
//! │  │  name           │   │  state          │   │  amount         │       │
//! │  │  is_active      │   │  balances       │   │  note           │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  SessionState   │   │  MovementKind   │   │  SessionChange  │       │
//! │  │  Open           │   │  Deposit        │   │  Insert/Update  │       │
//! │  │  Closed         │   │  Withdrawal     │   │  + branch_id    │       │
//! │  │  PendingApproval│   │  CashSale/Refund│   │                 │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::money::Money;

// =============================================================================
// Register
// =============================================================================

/// A physical or logical point-of-sale cash drawer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Register {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Branch that owns the register.
    pub branch_id: String,

    /// Display name ("Caja 1").
    pub name: String,

    /// Inactive registers cannot be opened.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Register {
    /// Creates a new active register with a fresh id.
    pub fn new(branch_id: impl Into<String>, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Register {
            id: Uuid::new_v4().to_string(),
            branch_id: branch_id.into(),
            name: name.into(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

// =============================================================================
// Session State
// =============================================================================

/// The state of a cash session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Register is in use by the operator.
    Open,
    /// Terminal: balances written, only read afterwards.
    Closed,
    /// Stored by external review flows; never produced by this service.
    PendingApproval,
}

impl SessionState {
    /// Returns the value stored in the `state` column.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SessionState::Open => "open",
            SessionState::Closed => "closed",
            SessionState::PendingApproval => "pending_approval",
        }
    }
}

// =============================================================================
// Cash Session
// =============================================================================

/// One open-to-close lifecycle of a register used by one operator.
///
/// Balances are stored in minor currency units; use [`CashSession::opening`]
/// and [`CashSession::closing`] for `Money` views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashSession {
    pub id: String,
    pub register_id: String,
    pub operator_id: String,
    pub branch_id: String,
    pub state: SessionState,
    /// Declared cash at opening. Never mutated after creation.
    pub opening_balance: i64,
    /// Declared cash at closing. Set if and only if `state` is `Closed`.
    pub closing_balance: Option<i64>,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    /// Null if and only if `state` is `Open`.
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    /// Closed by an administrator without an operator count.
    pub force_closed: bool,
}

impl CashSession {
    /// Returns the opening balance as Money.
    #[inline]
    pub fn opening(&self) -> Money {
        Money::from_minor(self.opening_balance)
    }

    /// Returns the closing balance as Money, if closed.
    #[inline]
    pub fn closing(&self) -> Option<Money> {
        self.closing_balance.map(Money::from_minor)
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }
}

// =============================================================================
// Cash Movement
// =============================================================================

/// Kind of cash entering or leaving the drawer during a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Cash added to the drawer (change float top-up).
    Deposit,
    /// Cash taken out of the drawer (bank drop, petty cash).
    Withdrawal,
    /// Cash received for a sale.
    CashSale,
    /// Cash returned to a customer.
    CashRefund,
}

impl MovementKind {
    /// Whether this movement increases the cash in the drawer.
    pub const fn is_inflow(&self) -> bool {
        matches!(self, MovementKind::Deposit | MovementKind::CashSale)
    }
}

/// A cash movement recorded against an open session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashMovement {
    pub id: String,
    pub session_id: String,
    pub kind: MovementKind,
    /// Always positive; the direction comes from `kind`.
    pub amount: i64,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl CashMovement {
    /// Signed effect of the movement on the drawer.
    pub fn signed_amount(&self) -> Money {
        let amount = Money::from_minor(self.amount);
        if self.kind.is_inflow() {
            amount
        } else {
            -amount
        }
    }
}

// =============================================================================
// Change Notifications
// =============================================================================

/// Kind of row change published by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
}

/// A change to a session (or to its movements) scoped by branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionChange {
    pub kind: ChangeKind,
    pub session_id: String,
    pub branch_id: String,
}

// =============================================================================
// Unit Tests
// =============================================================================
