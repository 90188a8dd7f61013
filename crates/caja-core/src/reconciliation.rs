//! # Reconciliation
//!
//! Compares the cash the system expects in the drawer with the cash the
//! operator declared at closing.
//!
//! ```text
//! expected   = opening + (deposits + cash sales) - (withdrawals + cash refunds)
//! difference = declared - expected       (> 0 over, < 0 short)
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{CashMovement, CashSession, SessionState};

/// Outcome of a reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationStatus {
    /// Session still open (or awaiting approval); nothing declared yet.
    Pending,
    /// Declared matches expected.
    Balanced,
    /// More cash than expected.
    Over,
    /// Less cash than expected.
    Short,
    /// Force-closed: the closing figure is the system's, not a count.
    Unverified,
}

/// Expected vs declared balance of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Reconciliation {
    pub session_id: String,
    pub opening: Money,
    pub total_in: Money,
    pub total_out: Money,
    pub expected: Money,
    pub declared: Option<Money>,
    pub difference: Option<Money>,
    pub status: ReconciliationStatus,
    pub movement_count: usize,
}

fn overflow(field: &str) -> ValidationError {
    ValidationError::Overflow {
        field: field.to_string(),
    }
}

/// Sums inflows and outflows separately.
fn totals(movements: &[CashMovement]) -> CoreResult<(Money, Money)> {
    let mut total_in = Money::zero();
    let mut total_out = Money::zero();

    for m in movements {
        let amount = Money::from_minor(m.amount);
        if m.kind.is_inflow() {
            total_in = total_in.checked_add(amount).ok_or_else(|| overflow("total_in"))?;
        } else {
            total_out = total_out.checked_add(amount).ok_or_else(|| overflow("total_out"))?;
        }
    }

    Ok((total_in, total_out))
}

fn expected_from(opening: Money, total_in: Money, total_out: Money) -> CoreResult<Money> {
    opening
        .checked_add(total_in)
        .and_then(|m| m.checked_sub(total_out))
        .ok_or_else(|| overflow("expected_balance").into())
}

/// Expected drawer balance after the given movements.
///
/// Fails with [`ValidationError::Overflow`] instead of wrapping.
pub fn expected_balance(session: &CashSession, movements: &[CashMovement]) -> CoreResult<Money> {
    let (total_in, total_out) = totals(movements)?;
    expected_from(session.opening(), total_in, total_out)
}

/// Reconciles a session against its movements.
pub fn reconcile(session: &CashSession, movements: &[CashMovement]) -> CoreResult<Reconciliation> {
    let (total_in, total_out) = totals(movements)?;
    let expected = expected_from(session.opening(), total_in, total_out)?;

    let (declared, difference, status) = match (session.state, session.closing()) {
        (SessionState::Closed, Some(declared)) if session.force_closed => {
            (Some(declared), None, ReconciliationStatus::Unverified)
        }
        (SessionState::Closed, Some(declared)) => {
            let difference = declared
                .checked_sub(expected)
                .ok_or_else(|| overflow("difference"))?;
            let status = if difference.is_zero() {
                ReconciliationStatus::Balanced
            } else if difference.is_positive() {
                ReconciliationStatus::Over
            } else {
                ReconciliationStatus::Short
            };
            (Some(declared), Some(difference), status)
        }
        _ => (None, None, ReconciliationStatus::Pending),
    };

    Ok(Reconciliation {
        session_id: session.id.clone(),
        opening: session.opening(),
        total_in,
        total_out,
        expected,
        declared,
        difference,
        status,
        movement_count: movements.len(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
