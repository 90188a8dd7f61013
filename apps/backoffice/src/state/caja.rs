//! # Caja Screen State
//!
//! View state of the cash-register screen: cached open sessions, the
//! caller's own session, actions in flight and the last error.
//!
//! ## Thread Safety
//! The view is wrapped in `Arc<Mutex<T>>` because:
//! 1. Several commands read and update it
//! 2. Commands can run concurrently
//! 3. The lock is only held for plain field updates, never across an await
//!
//! ## Double-Submit Guard
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  click "Abrir caja" ──► begin(Open) ──► Ok(guard) ──► manager call     │
//! │  click again        ──► begin(Open) ──► Err(BUSY)      │                │
//! │                                                         ▼                │
//! │                                    guard dropped ──► Open cleared        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use caja_core::CashSession;

use crate::error::{ApiError, ErrorCode};

/// A user action on the caja screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CajaAction {
    Refresh,
    LoadMySession,
    Open,
    Close,
    ForceClose,
    RecordMovement,
}

/// Snapshot of the caja screen.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CajaView {
    /// Open sessions of the caller's branch, newest first.
    pub open_sessions: Vec<CashSession>,

    /// The caller's own open session.
    pub my_session: Option<CashSession>,

    /// Actions currently in flight.
    pub pending: BTreeSet<CajaAction>,

    /// Error of the last failed action, cleared by the next success.
    pub last_error: Option<ApiError>,

    /// When `open_sessions` was last fetched.
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl CajaView {
    pub fn is_pending(&self, action: CajaAction) -> bool {
        self.pending.contains(&action)
    }
}

/// Shared, per-screen view state.
#[derive(Debug, Clone, Default)]
pub struct CajaScreen {
    view: Arc<Mutex<CajaView>>,
}

impl CajaScreen {
    /// Creates an empty screen state.
    pub fn new() -> Self {
        CajaScreen::default()
    }

    fn lock(&self) -> MutexGuard<'_, CajaView> {
        // The view holds no invariants a panicking writer could break.
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks `action` as in flight.
    ///
    /// ## Errors
    /// `BUSY` when the same action is already in flight.
    pub fn begin(&self, action: CajaAction) -> Result<PendingGuard, ApiError> {
        let mut view = self.lock();
        if !view.pending.insert(action) {
            return Err(ApiError::new(
                ErrorCode::Busy,
                format!("{:?} is already in progress", action),
            ));
        }

        Ok(PendingGuard {
            view: Arc::clone(&self.view),
            action,
        })
    }

    /// Executes a function with read access to the view.
    pub fn with_view<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&CajaView) -> R,
    {
        f(&self.lock())
    }

    /// Executes a function with write access to the view.
    pub fn with_view_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut CajaView) -> R,
    {
        f(&mut self.lock())
    }

    /// Returns a copy of the current view.
    pub fn snapshot(&self) -> CajaView {
        self.with_view(CajaView::clone)
    }

    /// Replaces the cached open sessions.
    pub fn set_open_sessions(&self, sessions: Vec<CashSession>) {
        self.with_view_mut(|view| {
            view.open_sessions = sessions;
            view.refreshed_at = Some(Utc::now());
        });
    }

    /// Replaces the caller's own session.
    pub fn set_my_session(&self, session: Option<CashSession>) {
        self.with_view_mut(|view| view.my_session = session);
    }

    /// Applies the outcome of an action: success clears the last error,
    /// failure stores it.
    pub fn settle<T>(&self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        match result {
            Ok(value) => {
                self.with_view_mut(|view| view.last_error = None);
                Ok(value)
            }
            Err(err) => {
                self.with_view_mut(|view| view.last_error = Some(err.clone()));
                Err(err)
            }
        }
    }
}

/// Clears its action from the pending set when dropped.
#[derive(Debug)]
pub struct PendingGuard {
    view: Arc<Mutex<CajaView>>,
    action: CajaAction,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let mut view = self.view.lock().unwrap_or_else(PoisonError::into_inner);
        view.pending.remove(&self.action);
    }
}
