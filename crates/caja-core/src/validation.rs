//! # Validation Module
//!
//! Input validation for cash-session operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Dashboard form                                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: CashSessionManager (Rust)                                    │
//! │  └── THIS MODULE: rejected before any store call                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Store (SQLite)                                               │
//! │  ├── CHECK constraints (balances, state/closed_at)                     │
//! │  └── Partial UNIQUE indexes (one open session per register/operator)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use caja_core::money::Money;
//! use caja_core::validation::validate_balance;
//!
//! assert!(validate_balance("opening_balance", Money::from_minor(10_000)).is_ok());
//! assert!(validate_balance("opening_balance", Money::from_minor(-1)).is_err());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_BALANCE, MAX_MOVEMENT, MAX_NOTES_LEN, MAX_REGISTER_NAME_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Amount Validators
// =============================================================================

/// Validates a declared drawer balance (opening or closing).
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (empty drawer)
/// - At most MAX_BALANCE
pub fn validate_balance(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }

    if amount.minor() > MAX_BALANCE {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_BALANCE,
        });
    }

    Ok(())
}

/// Validates a cash movement amount.
///
/// ## Rules
/// - Must be positive (> 0); direction comes from the movement kind
/// - At most MAX_MOVEMENT
pub fn validate_movement_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    if amount.minor() > MAX_MOVEMENT {
        return Err(ValidationError::OutOfRange {
            field: "amount".to_string(),
            min: 1,
            max: MAX_MOVEMENT,
        });
    }

    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates optional free-text notes.
///
/// ## Returns
/// The trimmed notes, or `None` when blank.
pub fn validate_notes(notes: Option<&str>) -> ValidationResult<Option<String>> {
    let notes = match notes.map(str::trim) {
        Some(n) if !n.is_empty() => n,
        _ => return Ok(None),
    };

    if notes.chars().count() > MAX_NOTES_LEN {
        return Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: MAX_NOTES_LEN,
        });
    }

    Ok(Some(notes.to_string()))
}

/// Validates the reason given for an administrative force close.
///
/// ## Rules
/// - Must not be blank
/// - At most MAX_NOTES_LEN characters
pub fn validate_reason(reason: &str) -> ValidationResult<String> {
    let reason = reason.trim();

    if reason.is_empty() {
        return Err(ValidationError::Required {
            field: "reason".to_string(),
        });
    }

    if reason.chars().count() > MAX_NOTES_LEN {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: MAX_NOTES_LEN,
        });
    }

    Ok(reason.to_string())
}

/// Validates a register display name.
pub fn validate_register_name(name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > MAX_REGISTER_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_REGISTER_NAME_LEN,
        });
    }

    Ok(name.to_string())
}

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates an identifier (UUID string).
///
/// ## Example
/// ```rust
/// use caja_core::validation::validate_id;
///
/// assert!(validate_id("session_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_id("session_id", "not-a-uuid").is_err());
/// ```
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

/// Clamps a history page size to 1..=200.
pub fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, 200)
}

// =============================================================================
// Unit Tests
// =============================================================================
