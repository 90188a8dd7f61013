//! # User Context
//!
//! Who is calling, as resolved by the auth collaborator. Commands use it to
//! scope reads to a branch and to check roles.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Back-office role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Opens and closes registers for themselves.
    Operator,
    /// Manages registers and may close any session.
    Admin,
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    pub user_id: String,
    pub branch_id: String,
    pub role: Role,
}

impl UserContext {
    pub fn new(user_id: impl Into<String>, branch_id: impl Into<String>, role: Role) -> Self {
        UserContext {
            user_id: user_id.into(),
            branch_id: branch_id.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fails with `FORBIDDEN` unless the caller is an administrator.
    pub fn require_admin(&self, action: &str) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!(
                "Only administrators can {}",
                action
            )))
        }
    }

    /// Fails with `FORBIDDEN` unless the caller is `owner_id` or an administrator.
    pub fn require_owner_or_admin(&self, owner_id: &str, action: &str) -> Result<(), ApiError> {
        if self.is_admin() || self.user_id == owner_id {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!(
                "Only the session's operator or an administrator can {}",
                action
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_role_checks() {
        let operator = UserContext::new("u-1", "branch-1", Role::Operator);
        let admin = UserContext::new("u-2", "branch-1", Role::Admin);

        assert_eq!(
            operator.require_admin("force close").unwrap_err().code,
            ErrorCode::Forbidden
        );
        assert!(admin.require_admin("force close").is_ok());

        assert!(operator.require_owner_or_admin("u-1", "close").is_ok());
        assert!(operator.require_owner_or_admin("u-9", "close").is_err());
        assert!(admin.require_owner_or_admin("u-9", "close").is_ok());
    }
}
