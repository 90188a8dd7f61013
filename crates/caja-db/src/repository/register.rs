//! # Register Repository
//!
//! Database operations for registers (cajas).
//!
//! Registers are created by administrators. After creation only the
//! activation flag changes; deactivated registers keep their history.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use caja_core::Register;

/// Repository for register database operations.
#[derive(Debug, Clone)]
pub struct RegisterRepository {
    pool: SqlitePool,
}

impl RegisterRepository {
    /// Creates a new RegisterRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RegisterRepository { pool }
    }

    /// Gets a register by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Register>> {
        let register = sqlx::query_as::<_, Register>(
            r#"
            SELECT id, branch_id, name, is_active, created_at, updated_at
            FROM registers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(register)
    }

    /// Lists the registers of a branch, by name.
    pub async fn list_by_branch(&self, branch_id: &str) -> DbResult<Vec<Register>> {
        let registers = sqlx::query_as::<_, Register>(
            r#"
            SELECT id, branch_id, name, is_active, created_at, updated_at
            FROM registers
            WHERE branch_id = ?1
            ORDER BY name
            "#,
        )
        .bind(branch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(registers)
    }

    /// Inserts a register.
    ///
    /// ## Errors
    /// `DbError::UniqueViolation` when the branch already has a register
    /// with the same name.
    pub async fn insert(&self, register: &Register) -> DbResult<()> {
        debug!(id = %register.id, branch_id = %register.branch_id, name = %register.name, "Inserting register");

        sqlx::query(
            r#"
            INSERT INTO registers (id, branch_id, name, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&register.id)
        .bind(&register.branch_id)
        .bind(&register.name)
        .bind(register.is_active)
        .bind(register.created_at)
        .bind(register.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: register.name.clone(),
            },
            other => other,
        })?;

        Ok(())
    }

    /// Toggles the activation flag.
    pub async fn set_active(&self, id: &str, is_active: bool) -> DbResult<Register> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE registers SET
                is_active = ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(is_active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Register", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Register", id))
    }

    /// Counts registers in a branch.
    pub async fn count_by_branch(&self, branch_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM registers WHERE branch_id = ?1")
            .bind(branch_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
