//! # Register Commands
//!
//! Register administration for the caller's branch.

use tracing::debug;

use caja_core::Register;

use crate::error::ApiError;
use crate::state::{DbState, UserContext};

/// Registers of the caller's branch, by name.
pub async fn list_registers(db: &DbState, user: &UserContext) -> Result<Vec<Register>, ApiError> {
    debug!(branch_id = %user.branch_id, "list_registers command");

    Ok(db.manager().list_registers(&user.branch_id).await?)
}

/// Creates a register in the caller's branch. Administrators only.
///
/// ## Errors
/// - `FORBIDDEN` for operators
/// - `VALIDATION_ERROR` for a blank, too long or duplicate name
pub async fn create_register(
    db: &DbState,
    user: &UserContext,
    name: String,
) -> Result<Register, ApiError> {
    debug!(%name, "create_register command");
    user.require_admin("create registers")?;

    Ok(db.manager().create_register(&user.branch_id, &name).await?)
}

/// Activates or deactivates a register. Administrators only.
pub async fn set_register_active(
    db: &DbState,
    user: &UserContext,
    register_id: String,
    is_active: bool,
) -> Result<Register, ApiError> {
    debug!(%register_id, is_active, "set_register_active command");
    user.require_admin("change register activation")?;

    let register = db
        .manager()
        .get_register(&register_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Register", &register_id))?;
    if register.branch_id != user.branch_id {
        return Err(ApiError::forbidden("Register belongs to another branch"));
    }

    Ok(db
        .manager()
        .set_register_active(&register_id, is_active)
        .await?)
}
