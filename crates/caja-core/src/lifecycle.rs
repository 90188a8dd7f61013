//! # Session Lifecycle
//!
//! State transitions of a cash session, as pure functions.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  [no session] ──open──► [Open] ──close──────────► [Closed] (terminal)   │
//! │                            │                                            │
//! │                            └────force_close─────► [Closed] (terminal)   │
//! │                                                                         │
//! │  Nothing leaves Closed. Re-opening a register creates a new session.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The manager loads the current rows, calls these functions to decide and
//! build the next row, and only then writes to the store.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{CashMovement, CashSession, MovementKind, Register, SessionState};
use crate::validation::{validate_balance, validate_movement_amount, validate_notes, validate_reason};
use crate::FORCE_CLOSE_MARKER;

/// Checks the open preconditions in the order the operator sees them.
///
/// ## Order
/// 1. Operator already holds an open session → `OperatorHasOpenSession`
/// 2. Register inactive → `RegisterInactive`
/// 3. Register has an open session → `RegisterInUse`
pub fn check_can_open(
    operator_id: &str,
    operator_active: Option<&CashSession>,
    register: &Register,
    register_active: Option<&CashSession>,
) -> CoreResult<()> {
    check_operator_free(operator_id, operator_active)?;

    if !register.is_active {
        return Err(CoreError::RegisterInactive(register.id.clone()));
    }

    if register_active.is_some() {
        return Err(CoreError::RegisterInUse {
            register_id: register.id.clone(),
        });
    }

    Ok(())
}

/// Fails when the operator already holds an open session.
///
/// Checked before the register is even looked up.
pub fn check_operator_free(operator_id: &str, operator_active: Option<&CashSession>) -> CoreResult<()> {
    match operator_active {
        Some(session) => Err(CoreError::OperatorHasOpenSession {
            operator_id: operator_id.to_string(),
            session_id: Some(session.id.clone()),
        }),
        None => Ok(()),
    }
}

/// Builds the notes of a force-closed session: existing notes are kept and
/// the marker line is appended.
pub fn force_close_notes(existing: Option<&str>, reason: &str) -> String {
    let line = format!("{} {}", FORCE_CLOSE_MARKER, reason);
    match existing {
        Some(notes) if !notes.trim().is_empty() => format!("{}\n{}", notes, line),
        _ => line,
    }
}

impl CashSession {
    /// Creates a new open session on `register`.
    ///
    /// The branch is taken from the register.
    pub fn open(
        register: &Register,
        operator_id: &str,
        opening_balance: Money,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        validate_balance("opening_balance", opening_balance)?;
        let notes = validate_notes(notes)?;

        if !register.is_active {
            return Err(CoreError::RegisterInactive(register.id.clone()));
        }

        Ok(CashSession {
            id: Uuid::new_v4().to_string(),
            register_id: register.id.clone(),
            operator_id: operator_id.to_string(),
            branch_id: register.branch_id.clone(),
            state: SessionState::Open,
            opening_balance: opening_balance.minor(),
            closing_balance: None,
            opened_at: now,
            closed_at: None,
            notes,
            force_closed: false,
        })
    }

    /// Closes the session with the operator's counted balance.
    ///
    /// Given notes replace the existing ones; `None` keeps them.
    pub fn close(
        &self,
        closing_balance: Money,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        validate_balance("closing_balance", closing_balance)?;
        let notes = validate_notes(notes)?;
        self.ensure_open("close")?;

        Ok(CashSession {
            state: SessionState::Closed,
            closing_balance: Some(closing_balance.minor()),
            closed_at: Some(now),
            notes: notes.or_else(|| self.notes.clone()),
            force_closed: false,
            ..self.clone()
        })
    }

    /// Closes the session as an administrative override.
    ///
    /// No operator count exists, so the closing balance is the system's
    /// expected balance (floored at zero) and `force_closed` is set.
    pub fn force_close(
        &self,
        expected_balance: Money,
        reason: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        let reason = validate_reason(reason)?;
        self.ensure_open("force close")?;

        Ok(CashSession {
            state: SessionState::Closed,
            closing_balance: Some(expected_balance.max(Money::zero()).minor()),
            closed_at: Some(now),
            notes: Some(force_close_notes(self.notes.as_deref(), &reason)),
            force_closed: true,
            ..self.clone()
        })
    }

    /// Builds a cash movement against this session.
    ///
    /// `amount` is the unsigned size of the movement; direction comes from
    /// `kind`.
    pub fn movement(
        &self,
        kind: MovementKind,
        amount: Money,
        note: Option<&str>,
        now: DateTime<Utc>,
    ) -> CoreResult<CashMovement> {
        validate_movement_amount(amount)?;
        let note = validate_notes(note)?;
        self.ensure_open("record a movement")?;

        Ok(CashMovement {
            id: Uuid::new_v4().to_string(),
            session_id: self.id.clone(),
            kind,
            amount: amount.minor(),
            note,
            created_at: now,
        })
    }

    /// Fails unless the session is `Open`.
    pub fn ensure_open(&self, operation: &'static str) -> CoreResult<()> {
        if self.state != SessionState::Open {
            return Err(CoreError::not_open(&self.id, self.state, operation));
        }
        Ok(())
    }

    /// Verifies the row-level invariants.
    ///
    /// - `closed_at` is null iff the state is `Open`
    /// - `closing_balance` is set iff the state is `Closed`
    /// - balances are non-negative
    pub fn check_invariants(&self) -> CoreResult<()> {
        let violated = |reason: &str| CoreError::InvariantViolated {
            session_id: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.closed_at.is_none() != (self.state == SessionState::Open) {
            return Err(violated("closed_at must be null exactly while open"));
        }

        if self.closing_balance.is_some() != (self.state == SessionState::Closed) {
            return Err(violated("closing_balance must be set exactly when closed"));
        }

        if self.opening_balance < 0 || self.closing_balance.is_some_and(|b| b < 0) {
            return Err(violated("balances must not be negative"));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
