//! # API Error Type
//!
//! Unified error type for back-office commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Caja                                   │
//! │                                                                         │
//! │  Dashboard                   Rust Backend                               │
//! │  ─────────                   ────────────                               │
//! │                                                                         │
//! │  open_register(...)                                                     │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  Result<T, ApiError>                                             │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Store Error? ──── DbError::PoolExhausted ─────────┐            │  │
//! │  │         │                                          │            │  │
//! │  │         ▼                                          ▼            │  │
//! │  │  Rule Error? ───── CoreError::RegisterInUse ───── ApiError ────►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  e.code = "REGISTER_IN_USE"                                             │
//! │  e.message = "Register ... is already in use"                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Raw store messages are logged, never shown. Transient store failures all
//! surface as `UNAVAILABLE`, which the dashboard offers to retry manually.

use serde::Serialize;

use caja_core::CoreError;
use caja_db::DbError;

use crate::manager::ManagerError;

/// API error returned from commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "OPERATOR_HAS_OPEN_SESSION",
///   "message": "Operator 6b1f... already has an open session"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Register or session not found
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Operator already holds an open session
    OperatorHasOpenSession,

    /// Register already has an open session
    RegisterInUse,

    /// Session is not in a state that allows the operation
    InvalidState,

    /// Caller's role does not allow the operation
    Forbidden,

    /// Same action already in progress on this screen
    Busy,

    /// Store temporarily unreachable; a manual retry may succeed
    Unavailable,

    /// Database operation failed
    DatabaseError,

    /// Internal error
    Internal,
}

impl ErrorCode {
    /// Whether the dashboard should offer a manual retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCode::Unavailable)
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Forbidden, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => {
                tracing::warn!(%field, "Unique violation");
                ApiError::validation(format!("'{}' already exists", value))
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            DbError::CheckViolation { message } => {
                tracing::error!("Check constraint violation: {}", message);
                ApiError::new(ErrorCode::InvalidState, "Operation violates a cash session rule")
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::Unavailable, "Store unavailable, please retry")
            }
            DbError::PoolExhausted => {
                tracing::warn!("Database pool exhausted");
                ApiError::new(ErrorCode::Unavailable, "Store busy, please retry")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Migration failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::OperatorHasOpenSession { .. } => {
                ApiError::new(ErrorCode::OperatorHasOpenSession, message)
            }
            CoreError::RegisterInUse { .. } => ApiError::new(ErrorCode::RegisterInUse, message),
            CoreError::RegisterNotFound(id) => ApiError::not_found("Register", &id),
            CoreError::SessionNotFound(id) => ApiError::not_found("Cash session", &id),
            CoreError::RegisterInactive(_)
            | CoreError::SessionAlreadyClosed(_)
            | CoreError::SessionNotOpen { .. } => ApiError::new(ErrorCode::InvalidState, message),
            CoreError::InvariantViolated { .. } => {
                tracing::error!("{}", message);
                ApiError::internal("Cash session data is inconsistent")
            }
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
        }
    }
}

impl From<ManagerError> for ApiError {
    fn from(err: ManagerError) -> Self {
        match err {
            ManagerError::Rule(e) => e.into(),
            ManagerError::Store(e) => e.into(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
