//! # Error Types
//!
//! Domain-specific error types for caja-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  caja-core errors (this file)                                          │
//! │  ├── CoreError        - Lifecycle rule violations                      │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  caja-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  caja-backoffice errors                                                │
//! │  ├── ManagerError     - CoreError | DbError                            │
//! │  └── ApiError         - What the dashboard sees (serialized)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::SessionState;

// =============================================================================
// Core Error
// =============================================================================

/// Cash-session rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The operator already holds an open session on some register.
    ///
    /// ## When This Occurs
    /// - Operator A holds "Caja 1" and tries to open "Caja 2"
    /// - Operator A double-opens "Caja 1" from two devices
    #[error("Operator {operator_id} already has an open session")]
    OperatorHasOpenSession {
        operator_id: String,
        session_id: Option<String>,
    },

    /// Another session is open on the register.
    #[error("Register {register_id} is already in use")]
    RegisterInUse { register_id: String },

    /// Register cannot be found.
    #[error("Register not found: {0}")]
    RegisterNotFound(String),

    /// Register is deactivated and cannot be opened.
    #[error("Register {0} is not active")]
    RegisterInactive(String),

    /// Session cannot be found.
    #[error("Cash session not found: {0}")]
    SessionNotFound(String),

    /// Session is already closed (closed sessions are terminal).
    #[error("Cash session {0} is already closed")]
    SessionAlreadyClosed(String),

    /// Session is in a state that does not allow the operation.
    #[error("Cash session {session_id} is {state:?}, cannot {operation}")]
    SessionNotOpen {
        session_id: String,
        state: SessionState,
        operation: &'static str,
    },

    /// A stored row breaks a lifecycle invariant.
    #[error("Cash session {session_id} violates invariant: {reason}")]
    InvariantViolated { session_id: String, reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Builds the error for a session that is not `open`.
    pub fn not_open(session_id: &str, state: SessionState, operation: &'static str) -> Self {
        match state {
            SessionState::Closed => CoreError::SessionAlreadyClosed(session_id.to_string()),
            _ => CoreError::SessionNotOpen {
                session_id: session_id.to_string(),
                state,
                operation,
            },
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any store call is made.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Arithmetic on amounts left the representable range.
    #[error("{field} exceeds the supported amount range")]
    Overflow { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_messages_are_distinct() {
        let operator = CoreError::OperatorHasOpenSession {
            operator_id: "u-1".to_string(),
            session_id: None,
        };
        let register = CoreError::RegisterInUse {
            register_id: "r-1".to_string(),
        };

        assert_eq!(operator.to_string(), "Operator u-1 already has an open session");
        assert_eq!(register.to_string(), "Register r-1 is already in use");
    }

    #[test]
    fn test_not_open_maps_closed_to_already_closed() {
        let err = CoreError::not_open("s-1", SessionState::Closed, "close");
        assert!(matches!(err, CoreError::SessionAlreadyClosed(id) if id == "s-1"));

        let err = CoreError::not_open("s-2", SessionState::PendingApproval, "close");
        assert!(matches!(err, CoreError::SessionNotOpen { .. }));
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Negative {
            field: "opening_balance".to_string(),
        };
        assert_eq!(validation_err.to_string(), "opening_balance must not be negative");

        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
