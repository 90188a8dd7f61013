//! # Cash Session Manager
//!
//! Owns the lifecycle of a register's open/closed state for a user and a
//! branch.
//!
//! ## Operation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  open_session(register, operator, balance, notes)                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. Local validation ───── fails ──► Validation error, no store call    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  2. Read current rows (operator's session, register, register session)  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. caja_core::lifecycle decides ── fails ──► Rule error                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  4. Store write ── unique index rejects ──► same Rule error (race lost) │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ChangeFeed publishes ──► OpenSessionsFeed watchers re-fetch            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The manager holds no state of its own. There is no lock around open or
//! close: two concurrent opens are serialized by the store's unique indexes
//! and the loser gets an ordinary conflict error.

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use caja_core::lifecycle::{check_can_open, check_operator_free};
use caja_core::reconciliation::{expected_balance, reconcile, Reconciliation};
use caja_core::validation::{
    clamp_limit, validate_balance, validate_id, validate_movement_amount, validate_notes,
    validate_reason, validate_register_name,
};
use caja_core::{
    CashMovement, CashSession, CoreError, Money, MovementKind, Register, ValidationError,
};
use caja_db::{Database, DbError};

use crate::watch::OpenSessionsFeed;

// =============================================================================
// Errors
// =============================================================================

/// Errors returned by [`CashSessionManager`].
#[derive(Debug, Error)]
pub enum ManagerError {
    /// A lifecycle rule or validation rejected the operation.
    #[error(transparent)]
    Rule(#[from] CoreError),

    /// The store failed for a reason that is not a rule violation.
    #[error(transparent)]
    Store(#[from] DbError),
}

impl From<ValidationError> for ManagerError {
    fn from(err: ValidationError) -> Self {
        ManagerError::Rule(CoreError::Validation(err))
    }
}

impl ManagerError {
    /// Whether a later manual retry may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ManagerError::Store(e) if e.is_transient())
    }
}

/// Result type for manager operations.
pub type ManagerResult<T> = Result<T, ManagerError>;

// =============================================================================
// Manager
// =============================================================================

/// Stateless service over the cash-session store.
///
/// Cheap to clone; every clone shares the same pool and change feed.
#[derive(Debug, Clone)]
pub struct CashSessionManager {
    db: Database,
}

impl CashSessionManager {
    /// Creates a manager over an open database.
    pub fn new(db: Database) -> Self {
        CashSessionManager { db }
    }

    /// Returns the underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// All open sessions of a branch, most recently opened first.
    pub async fn list_open_sessions(&self, branch_id: &str) -> ManagerResult<Vec<CashSession>> {
        require_branch(branch_id)?;

        let sessions = self.db.sessions().list_open_by_branch(branch_id).await?;
        debug!(branch_id, count = sessions.len(), "Listed open sessions");
        Ok(sessions)
    }

    /// The open session held by a user, if any.
    ///
    /// "No active session" is `Ok(None)`; every other failure is an error.
    pub async fn get_active_session_for_user(
        &self,
        user_id: &str,
    ) -> ManagerResult<Option<CashSession>> {
        validate_id("user_id", user_id)?;

        Ok(self.db.sessions().find_open_by_operator(user_id).await?)
    }

    /// A session by ID, in any state.
    pub async fn get_session(&self, session_id: &str) -> ManagerResult<Option<CashSession>> {
        validate_id("session_id", session_id)?;

        Ok(self.db.sessions().get_by_id(session_id).await?)
    }

    /// Closed sessions of a branch, most recently closed first.
    ///
    /// `limit` is clamped to 1..=200.
    pub async fn list_session_history(
        &self,
        branch_id: &str,
        limit: i64,
    ) -> ManagerResult<Vec<CashSession>> {
        require_branch(branch_id)?;

        Ok(self
            .db
            .sessions()
            .list_closed_by_branch(branch_id, clamp_limit(limit))
            .await?)
    }

    /// Movements recorded against a session.
    pub async fn list_movements(&self, session_id: &str) -> ManagerResult<Vec<CashMovement>> {
        validate_id("session_id", session_id)?;

        Ok(self.db.movements().list_for_session(session_id).await?)
    }

    /// Expected vs declared balance of a session.
    pub async fn reconcile(&self, session_id: &str) -> ManagerResult<Reconciliation> {
        let session = self.load_session(session_id).await?;
        let movements = self.db.movements().list_for_session(session_id).await?;

        Ok(reconcile(&session, &movements)?)
    }

    /// Subscribes to the open sessions of a branch.
    ///
    /// The subscription starts before this returns, so no change made after
    /// the call is missed.
    pub fn watch_open_sessions(&self, branch_id: &str) -> ManagerResult<OpenSessionsFeed> {
        require_branch(branch_id)?;

        Ok(OpenSessionsFeed::new(
            self.clone(),
            branch_id.to_string(),
            self.db.changes().subscribe(),
        ))
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Opens a register for an operator.
    ///
    /// ## Errors (in check order)
    /// - `Validation`: bad ids, negative balance, notes too long (no store call)
    /// - `OperatorHasOpenSession`
    /// - `RegisterNotFound`
    /// - `RegisterInactive`
    /// - `RegisterInUse`
    pub async fn open_session(
        &self,
        register_id: &str,
        operator_id: &str,
        opening_balance: Money,
        notes: Option<&str>,
    ) -> ManagerResult<CashSession> {
        validate_id("register_id", register_id)?;
        validate_id("operator_id", operator_id)?;
        validate_balance("opening_balance", opening_balance)?;
        let notes = validate_notes(notes)?;

        let sessions = self.db.sessions();

        let operator_active = sessions.find_open_by_operator(operator_id).await?;
        check_operator_free(operator_id, operator_active.as_ref())?;

        let register = self
            .db
            .registers()
            .get_by_id(register_id)
            .await?
            .ok_or_else(|| CoreError::RegisterNotFound(register_id.to_string()))?;

        let register_active = sessions.find_open_by_register(register_id).await?;
        check_can_open(
            operator_id,
            operator_active.as_ref(),
            &register,
            register_active.as_ref(),
        )?;

        let session = CashSession::open(
            &register,
            operator_id,
            opening_balance,
            notes.as_deref(),
            Utc::now(),
        )?;

        sessions
            .insert(&session)
            .await
            .map_err(|e| open_conflict(e, register_id, operator_id))?;

        info!(
            session_id = %session.id,
            register_id,
            operator_id,
            branch_id = %session.branch_id,
            opening_balance = session.opening_balance,
            "Cash session opened"
        );

        Ok(session)
    }

    /// Closes an open session with the operator's counted balance.
    ///
    /// Given notes replace the existing notes; `None` keeps them.
    ///
    /// ## Errors
    /// - `Validation` (no store call)
    /// - `SessionNotFound`
    /// - `SessionAlreadyClosed` / `SessionNotOpen`
    pub async fn close_session(
        &self,
        session_id: &str,
        closing_balance: Money,
        notes: Option<&str>,
    ) -> ManagerResult<CashSession> {
        validate_id("session_id", session_id)?;
        validate_balance("closing_balance", closing_balance)?;
        let notes = validate_notes(notes)?;

        let session = self.load_session(session_id).await?;
        let closed = session.close(closing_balance, notes.as_deref(), Utc::now())?;

        self.write_close(&closed, "close").await?;

        info!(
            session_id,
            register_id = %closed.register_id,
            operator_id = %closed.operator_id,
            closing_balance = closing_balance.minor(),
            "Cash session closed"
        );

        Ok(closed)
    }

    /// Closes an open session as an administrative override.
    ///
    /// The closing balance is the expected balance (opening plus net
    /// movements, floored at zero) and the reason is appended to the notes.
    pub async fn force_close_session(
        &self,
        session_id: &str,
        reason: &str,
    ) -> ManagerResult<CashSession> {
        validate_id("session_id", session_id)?;
        let reason = validate_reason(reason)?;

        let session = self.load_session(session_id).await?;
        session.ensure_open("force close")?;

        let movements = self.db.movements().list_for_session(session_id).await?;
        let expected = expected_balance(&session, &movements)?;
        let closed = session.force_close(expected, &reason, Utc::now())?;

        self.write_close(&closed, "force close").await?;

        warn!(
            session_id,
            register_id = %closed.register_id,
            operator_id = %closed.operator_id,
            expected = expected.minor(),
            %reason,
            "Cash session force-closed"
        );

        Ok(closed)
    }

    /// Records a cash movement against an open session.
    pub async fn record_movement(
        &self,
        session_id: &str,
        kind: MovementKind,
        amount: Money,
        note: Option<&str>,
    ) -> ManagerResult<CashMovement> {
        validate_id("session_id", session_id)?;
        validate_movement_amount(amount)?;
        let note = validate_notes(note)?;

        let session = self.load_session(session_id).await?;
        let movement = session.movement(kind, amount, note.as_deref(), Utc::now())?;

        if let Err(e) = self.db.movements().insert(&movement, &session.branch_id).await {
            // The trigger rejects movements on a session closed meanwhile.
            return Err(self.not_open_or(e, session_id, "record a movement").await);
        }

        info!(
            session_id,
            movement_id = %movement.id,
            kind = ?kind,
            amount = movement.amount,
            "Cash movement recorded"
        );

        Ok(movement)
    }

    // =========================================================================
    // Registers
    // =========================================================================

    /// Registers of a branch, by name.
    pub async fn list_registers(&self, branch_id: &str) -> ManagerResult<Vec<Register>> {
        require_branch(branch_id)?;

        Ok(self.db.registers().list_by_branch(branch_id).await?)
    }

    /// Register by id, or `None`.
    pub async fn get_register(&self, register_id: &str) -> ManagerResult<Option<Register>> {
        validate_id("register_id", register_id)?;

        Ok(self.db.registers().get_by_id(register_id).await?)
    }

    /// Creates an active register in a branch.
    pub async fn create_register(&self, branch_id: &str, name: &str) -> ManagerResult<Register> {
        require_branch(branch_id)?;
        let name = validate_register_name(name)?;

        let register = Register::new(branch_id, name, Utc::now());
        self.db.registers().insert(&register).await?;

        info!(register_id = %register.id, branch_id, name = %register.name, "Register created");
        Ok(register)
    }

    /// Activates or deactivates a register.
    ///
    /// Deactivation only blocks new opens; an open session on the register
    /// stays open until closed.
    pub async fn set_register_active(
        &self,
        register_id: &str,
        is_active: bool,
    ) -> ManagerResult<Register> {
        validate_id("register_id", register_id)?;

        let register = self
            .db
            .registers()
            .set_active(register_id, is_active)
            .await
            .map_err(|e| match e {
                DbError::NotFound { .. } => {
                    ManagerError::Rule(CoreError::RegisterNotFound(register_id.to_string()))
                }
                other => ManagerError::Store(other),
            })?;

        info!(register_id, is_active, "Register activation changed");
        Ok(register)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn load_session(&self, session_id: &str) -> ManagerResult<CashSession> {
        self.db
            .sessions()
            .get_by_id(session_id)
            .await?
            .ok_or_else(|| CoreError::SessionNotFound(session_id.to_string()).into())
    }

    /// Writes a close, turning a lost race into the matching rule error.
    async fn write_close(&self, closed: &CashSession, operation: &'static str) -> ManagerResult<()> {
        match self.db.sessions().close(closed).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.not_open_or(e, &closed.id, operation).await),
        }
    }

    /// Re-reads the session after a rejected write: if it is no longer open
    /// that is the error to report, otherwise the store error stands.
    async fn not_open_or(
        &self,
        err: DbError,
        session_id: &str,
        operation: &'static str,
    ) -> ManagerError {
        match self.db.sessions().get_by_id(session_id).await {
            Ok(Some(current)) if !current.is_open() => {
                warn!(session_id, state = current.state.as_str(), operation, "Session changed concurrently");
                CoreError::not_open(session_id, current.state, operation).into()
            }
            Ok(None) => CoreError::SessionNotFound(session_id.to_string()).into(),
            _ => err.into(),
        }
    }
}

fn require_branch(branch_id: &str) -> Result<(), ValidationError> {
    if branch_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "branch_id".to_string(),
        });
    }
    Ok(())
}

/// Maps a rejected session insert to the conflict it stands for.
fn open_conflict(err: DbError, register_id: &str, operator_id: &str) -> ManagerError {
    if err.is_unique_violation_on("cash_sessions.register_id") {
        warn!(register_id, operator_id, "Open rejected by store: register in use");
        CoreError::RegisterInUse {
            register_id: register_id.to_string(),
        }
        .into()
    } else if err.is_unique_violation_on("cash_sessions.operator_id") {
        warn!(register_id, operator_id, "Open rejected by store: operator has open session");
        CoreError::OperatorHasOpenSession {
            operator_id: operator_id.to_string(),
            session_id: None,
        }
        .into()
    } else if matches!(err, DbError::ForeignKeyViolation { .. }) {
        CoreError::RegisterNotFound(register_id.to_string()).into()
    } else {
        err.into()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
