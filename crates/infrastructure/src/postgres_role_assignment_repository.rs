//! PostgreSQL-backed user-role assignment store.
//!
//! Mutations that could strip the last active administrator run inside a
//! transaction serialized by an advisory lock, so two concurrent removals
//! cannot both pass the admin count check.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use nutrack_application::RoleAssignmentRepository;
use nutrack_core::{AppError, AppResult};
use nutrack_domain::{ADMIN_ROLE_NAME, AssignOutcome, RemoveOutcome, RoleAssignment, RoleId, UserId};

/// Advisory lock key serializing every admin-affecting mutation.
pub(crate) const ADMIN_GUARD_LOCK_KEY: i64 = 0x6e74_726b_5f61_646d;

/// Takes the admin-guard advisory lock for the current transaction.
pub(crate) async fn lock_admin_guard(tx: &mut Transaction<'_, Postgres>) -> AppResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(ADMIN_GUARD_LOCK_KEY)
        .execute(&mut **tx)
        .await
        .map_err(|error| AppError::Internal(format!("failed to take admin guard lock: {error}")))?;

    Ok(())
}

/// Counts active users other than `user_id` holding the admin role, inside
/// the caller's transaction.
pub(crate) async fn count_other_active_admins(
    tx: &mut Transaction<'_, Postgres>,
    user_id: UserId,
) -> AppResult<u64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM user_roles ur
        JOIN users u ON u.id = ur.user_id
        JOIN roles r ON r.id = ur.role_id
        WHERE r.name = $1
          AND u.is_active
          AND ur.user_id <> $2
        "#,
    )
    .bind(ADMIN_ROLE_NAME)
    .bind(user_id.as_uuid())
    .fetch_one(&mut **tx)
    .await
    .map_err(|error| AppError::Internal(format!("failed to count active admins: {error}")))?;

    Ok(count.unsigned_abs())
}

/// Whether `user_id` is an active user currently holding the admin role,
/// inside the caller's transaction.
pub(crate) async fn is_active_admin(
    tx: &mut Transaction<'_, Postgres>,
    user_id: UserId,
) -> AppResult<bool> {
    let holds = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1
            FROM user_roles ur
            JOIN users u ON u.id = ur.user_id
            JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = $2
              AND r.name = $1
              AND u.is_active
        )
        "#,
    )
    .bind(ADMIN_ROLE_NAME)
    .bind(user_id.as_uuid())
    .fetch_one(&mut **tx)
    .await
    .map_err(|error| AppError::Internal(format!("failed to check admin role: {error}")))?;

    Ok(holds)
}

fn last_admin_error() -> AppError {
    AppError::LastAdminProtection(
        "at least one other active user must hold the Admin role".to_owned(),
    )
}

/// PostgreSQL implementation of the role assignment repository port.
#[derive(Clone)]
pub struct PostgresRoleAssignmentRepository {
    pool: PgPool,
}

impl PostgresRoleAssignmentRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn role_name(
        tx: &mut Transaction<'_, Postgres>,
        role_id: RoleId,
    ) -> AppResult<String> {
        sqlx::query_scalar::<_, String>("SELECT name FROM roles WHERE id = $1")
            .bind(role_id.as_uuid())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|error| AppError::Internal(format!("failed to load role: {error}")))?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))
    }

    async fn require_user_exists(
        tx: &mut Transaction<'_, Postgres>,
        user_id: UserId,
    ) -> AppResult<()> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)",
        )
        .bind(user_id.as_uuid())
        .fetch_one(&mut **tx)
        .await
        .map_err(|error| AppError::Internal(format!("failed to check user: {error}")))?;

        if exists {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("user '{user_id}' was not found")))
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AssignmentRow {
    user_id: uuid::Uuid,
    role_id: uuid::Uuid,
    assigned_at: chrono::DateTime<chrono::Utc>,
}

impl From<AssignmentRow> for RoleAssignment {
    fn from(row: AssignmentRow) -> Self {
        Self {
            user_id: UserId::from_uuid(row.user_id),
            role_id: RoleId::from_uuid(row.role_id),
            assigned_at: row.assigned_at,
        }
    }
}

#[async_trait]
impl RoleAssignmentRepository for PostgresRoleAssignmentRepository {
    async fn assign_role(&self, user_id: UserId, role_id: RoleId) -> AppResult<AssignOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, role_id) DO NOTHING
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(role_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| foreign_key_not_found_or_internal(error, "assign role"))?;

        if result.rows_affected() == 0 {
            return Ok(AssignOutcome::AlreadyAssigned);
        }

        Ok(AssignOutcome::Assigned)
    }

    async fn remove_role(&self, user_id: UserId, role_id: RoleId) -> AppResult<RemoveOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|error| AppError::Internal(format!("failed to begin transaction: {error}")))?;

        lock_admin_guard(&mut tx).await?;
        Self::require_user_exists(&mut tx, user_id).await?;
        let role_name = Self::role_name(&mut tx, role_id).await?;

        if role_name == ADMIN_ROLE_NAME
            && is_active_admin(&mut tx, user_id).await?
            && count_other_active_admins(&mut tx, user_id).await? == 0
        {
            return Err(last_admin_error());
        }

        let result = sqlx::query(
            r#"
            DELETE FROM user_roles
            WHERE user_id = $1 AND role_id = $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(role_id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|error| AppError::Internal(format!("failed to remove role: {error}")))?;

        tx.commit()
            .await
            .map_err(|error| AppError::Internal(format!("failed to commit removal: {error}")))?;

        if result.rows_affected() == 0 {
            return Ok(RemoveOutcome::NotAssigned);
        }

        Ok(RemoveOutcome::Removed)
    }

    async fn replace_roles(&self, user_id: UserId, new_role_id: RoleId) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|error| AppError::Internal(format!("failed to begin transaction: {error}")))?;

        lock_admin_guard(&mut tx).await?;
        Self::require_user_exists(&mut tx, user_id).await?;
        let new_role_name = Self::role_name(&mut tx, new_role_id).await?;

        if new_role_name != ADMIN_ROLE_NAME
            && is_active_admin(&mut tx, user_id).await?
            && count_other_active_admins(&mut tx, user_id).await? == 0
        {
            return Err(last_admin_error());
        }

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|error| AppError::Internal(format!("failed to clear roles: {error}")))?;

        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            VALUES ($1, $2)
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(new_role_id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|error| AppError::Internal(format!("failed to insert replacement: {error}")))?;

        tx.commit()
            .await
            .map_err(|error| AppError::Internal(format!("failed to commit replacement: {error}")))
    }

    async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<RoleAssignment>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT user_id, role_id, assigned_at
            FROM user_roles
            WHERE user_id = $1
            ORDER BY assigned_at
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list assignments: {error}")))?;

        Ok(rows.into_iter().map(RoleAssignment::from).collect())
    }

    async fn count_active_admins_excluding(&self, user_id: UserId) -> AppResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM user_roles ur
            JOIN users u ON u.id = ur.user_id
            JOIN roles r ON r.id = ur.role_id
            WHERE r.name = $1
              AND u.is_active
              AND ur.user_id <> $2
            "#,
        )
        .bind(ADMIN_ROLE_NAME)
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to count active admins: {error}")))?;

        Ok(count.unsigned_abs())
    }
}

fn foreign_key_not_found_or_internal(error: sqlx::Error, operation: &str) -> AppError {
    if let sqlx::Error::Database(ref database_error) = error
        && database_error.code().as_deref() == Some("23503")
    {
        return AppError::NotFound("user or role was not found".to_owned());
    }

    AppError::Internal(format!("failed to {operation}: {error}"))
}
