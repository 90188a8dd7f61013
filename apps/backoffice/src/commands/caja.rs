//! # Caja Commands
//!
//! Commands behind the cash-register screen.
//!
//! ## Command Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  open_register(register_id, opening_balance, notes)                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  screen.begin(Open) ───── already pending ──► BUSY                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  role / branch checks ─── denied ───────────► FORBIDDEN                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CashSessionManager ───── rule / store error ► ApiError (last_error)    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  update my_session, re-fetch open sessions, clear last_error            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tracing::{debug, info, warn};

use caja_core::reconciliation::Reconciliation;
use caja_core::{CashMovement, CashSession, Money, MovementKind};

use crate::error::ApiError;
use crate::state::{CajaAction, CajaScreen, ConfigState, DbState, UserContext};

/// Session detail with its reconciliation, formatted for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session: CashSession,
    pub movements: Vec<CashMovement>,
    pub reconciliation: Reconciliation,
    pub opening_display: String,
    pub expected_display: String,
    pub declared_display: Option<String>,
    pub difference_display: Option<String>,
}

/// Re-fetches the open sessions of the caller's branch into the screen.
pub async fn refresh_open_sessions(
    db: &DbState,
    screen: &CajaScreen,
    user: &UserContext,
) -> Result<Vec<CashSession>, ApiError> {
    debug!(branch_id = %user.branch_id, "refresh_open_sessions command");
    let _pending = screen.begin(CajaAction::Refresh)?;

    let result = db
        .manager()
        .list_open_sessions(&user.branch_id)
        .await
        .map_err(ApiError::from);

    if let Ok(sessions) = &result {
        screen.set_open_sessions(sessions.clone());
    }
    screen.settle(result)
}

/// Loads the caller's own open session into the screen.
pub async fn load_my_session(
    db: &DbState,
    screen: &CajaScreen,
    user: &UserContext,
) -> Result<Option<CashSession>, ApiError> {
    debug!(user_id = %user.user_id, "load_my_session command");
    let _pending = screen.begin(CajaAction::LoadMySession)?;

    let result = db
        .manager()
        .get_active_session_for_user(&user.user_id)
        .await
        .map_err(ApiError::from);

    if let Ok(session) = &result {
        screen.set_my_session(session.clone());
    }
    screen.settle(result)
}

/// Opens a register for the caller.
///
/// The register must belong to the caller's branch. A missing register is
/// left to the manager so its precondition order is kept.
pub async fn open_register(
    db: &DbState,
    screen: &CajaScreen,
    user: &UserContext,
    register_id: String,
    opening_balance: i64,
    notes: Option<String>,
) -> Result<CashSession, ApiError> {
    debug!(%register_id, opening_balance, "open_register command");
    let _pending = screen.begin(CajaAction::Open)?;

    let result = async {
        if let Some(register) = db.manager().get_register(&register_id).await? {
            if register.branch_id != user.branch_id {
                warn!(%register_id, user_id = %user.user_id, "Open rejected: register of another branch");
                return Err(ApiError::forbidden("Register belongs to another branch"));
            }
        }

        let session = db
            .manager()
            .open_session(
                &register_id,
                &user.user_id,
                Money::from_minor(opening_balance),
                notes.as_deref(),
            )
            .await?;
        Ok::<_, ApiError>(session)
    }
    .await;

    if let Ok(session) = &result {
        info!(session_id = %session.id, user_id = %user.user_id, "Register opened from screen");
        screen.set_my_session(Some(session.clone()));
        refresh_cache(db, screen, user).await;
    }
    screen.settle(result)
}

/// Closes a session with the counted balance.
///
/// Only the session's operator or an administrator may close it.
pub async fn close_register(
    db: &DbState,
    screen: &CajaScreen,
    user: &UserContext,
    session_id: String,
    closing_balance: i64,
    notes: Option<String>,
) -> Result<CashSession, ApiError> {
    debug!(%session_id, closing_balance, "close_register command");
    let _pending = screen.begin(CajaAction::Close)?;

    let result = async {
        let session = load_in_branch(db, user, &session_id).await?;
        user.require_owner_or_admin(&session.operator_id, "close this register")?;

        let closed = db
            .manager()
            .close_session(&session_id, Money::from_minor(closing_balance), notes.as_deref())
            .await?;
        Ok::<_, ApiError>(closed)
    }
    .await;

    if let Ok(closed) = &result {
        forget_if_mine(screen, closed);
        refresh_cache(db, screen, user).await;
    }
    screen.settle(result)
}

/// Administrative close of a session whose operator did not close it.
pub async fn force_close_register(
    db: &DbState,
    screen: &CajaScreen,
    user: &UserContext,
    session_id: String,
    reason: String,
) -> Result<CashSession, ApiError> {
    debug!(%session_id, "force_close_register command");
    let _pending = screen.begin(CajaAction::ForceClose)?;

    let result = async {
        user.require_admin("force close a register")?;
        load_in_branch(db, user, &session_id).await?;

        let closed = db
            .manager()
            .force_close_session(&session_id, &reason)
            .await?;
        Ok::<_, ApiError>(closed)
    }
    .await;

    if let Ok(closed) = &result {
        info!(session_id = %closed.id, admin_id = %user.user_id, "Register force-closed from screen");
        forget_if_mine(screen, closed);
        refresh_cache(db, screen, user).await;
    }
    screen.settle(result)
}

/// Records a deposit, withdrawal or cash sale/refund on an open session.
pub async fn record_cash_movement(
    db: &DbState,
    screen: &CajaScreen,
    user: &UserContext,
    session_id: String,
    kind: MovementKind,
    amount: i64,
    note: Option<String>,
) -> Result<CashMovement, ApiError> {
    debug!(%session_id, ?kind, amount, "record_cash_movement command");
    let _pending = screen.begin(CajaAction::RecordMovement)?;

    let result = async {
        let session = load_in_branch(db, user, &session_id).await?;
        user.require_owner_or_admin(&session.operator_id, "record cash movements")?;

        let movement = db
            .manager()
            .record_movement(&session_id, kind, Money::from_minor(amount), note.as_deref())
            .await?;
        Ok::<_, ApiError>(movement)
    }
    .await;

    screen.settle(result)
}

/// Session detail with movements and reconciliation.
pub async fn get_session_summary(
    db: &DbState,
    config: &ConfigState,
    user: &UserContext,
    session_id: String,
) -> Result<SessionSummary, ApiError> {
    debug!(%session_id, "get_session_summary command");

    let session = load_in_branch(db, user, &session_id).await?;
    let movements = db.manager().list_movements(&session_id).await?;
    let reconciliation = db.manager().reconcile(&session_id).await?;

    Ok(SessionSummary {
        opening_display: config.format_currency(reconciliation.opening.minor()),
        expected_display: config.format_currency(reconciliation.expected.minor()),
        declared_display: reconciliation
            .declared
            .map(|m| config.format_currency(m.minor())),
        difference_display: reconciliation
            .difference
            .map(|m| config.format_currency(m.minor())),
        session,
        movements,
        reconciliation,
    })
}

/// Closed sessions of the caller's branch, newest first.
///
/// `limit` defaults to the configured history size.
pub async fn list_session_history(
    db: &DbState,
    config: &ConfigState,
    user: &UserContext,
    limit: Option<i64>,
) -> Result<Vec<CashSession>, ApiError> {
    debug!(branch_id = %user.branch_id, ?limit, "list_session_history command");

    let sessions = db
        .manager()
        .list_session_history(&user.branch_id, limit.unwrap_or(config.history_limit))
        .await?;
    Ok(sessions)
}

// =============================================================================
// Helpers
// =============================================================================

/// Loads a session of the caller's branch.
async fn load_in_branch(
    db: &DbState,
    user: &UserContext,
    session_id: &str,
) -> Result<CashSession, ApiError> {
    let session = db
        .manager()
        .get_session(session_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Cash session", session_id))?;

    if session.branch_id != user.branch_id {
        return Err(ApiError::forbidden("Cash session belongs to another branch"));
    }

    Ok(session)
}

fn forget_if_mine(screen: &CajaScreen, closed: &CashSession) {
    screen.with_view_mut(|view| {
        if view.my_session.as_ref().is_some_and(|s| s.id == closed.id) {
            view.my_session = None;
        }
    });
}

/// Best-effort re-fetch after a successful write. The write already
/// happened, so a failed refresh is logged and not reported.
async fn refresh_cache(db: &DbState, screen: &CajaScreen, user: &UserContext) {
    match db.manager().list_open_sessions(&user.branch_id).await {
        Ok(sessions) => screen.set_open_sessions(sessions),
        Err(e) => warn!(error = %e, "Could not refresh open sessions after a change"),
    }
}
