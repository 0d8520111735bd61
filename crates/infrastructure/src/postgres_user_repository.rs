//! PostgreSQL-backed user account repository.

use async_trait::async_trait;
use sqlx::PgPool;

use nutrack_application::UserAccountRepository;
use nutrack_core::{AppError, AppResult};
use nutrack_domain::{EmailAddress, UserAccount, UserId};

use crate::postgres_role_assignment_repository::{
    count_other_active_admins, is_active_admin, lock_admin_guard,
};

/// PostgreSQL implementation of the user account repository port.
#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: uuid::Uuid,
    email: String,
    is_active: bool,
    created_at: chrono::DateTime<chrono::Utc>,
    last_login_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl TryFrom<UserRow> for UserAccount {
    type Error = AppError;

    fn try_from(row: UserRow) -> AppResult<Self> {
        Ok(Self {
            id: UserId::from_uuid(row.id),
            email: EmailAddress::new(row.email)?,
            is_active: row.is_active,
            created_at: row.created_at,
            last_login_at: row.last_login_at,
        })
    }
}

#[async_trait]
impl UserAccountRepository for PostgresUserRepository {
    async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserAccount>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, is_active, created_at, last_login_at
            FROM users
            WHERE id = $1
            LIMIT 1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find user by id: {error}")))?;

        row.map(UserAccount::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserAccount>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, is_active, created_at, last_login_at
            FROM users
            WHERE LOWER(email) = LOWER($1)
            LIMIT 1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find user by email: {error}")))?;

        row.map(UserAccount::try_from).transpose()
    }

    async fn create(&self, email: &EmailAddress, password_hash: &str) -> AppResult<UserId> {
        let id = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(email.as_str())
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| email_conflict_or_internal(error, "create user"))?;

        Ok(UserId::from_uuid(id))
    }

    async fn password_hash(&self, user_id: UserId) -> AppResult<Option<String>> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT password_hash
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load password hash: {error}")))
    }

    async fn set_active(&self, user_id: UserId, is_active: bool) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|error| AppError::Internal(format!("failed to begin transaction: {error}")))?;

        // Deactivation can strip the last admin; take the same guard the
        // assignment store uses and re-check under it.
        if !is_active {
            lock_admin_guard(&mut tx).await?;
            if is_active_admin(&mut tx, user_id).await?
                && count_other_active_admins(&mut tx, user_id).await? == 0
            {
                return Err(AppError::LastAdminProtection(
                    "at least one other active user must hold the Admin role".to_owned(),
                ));
            }
        }

        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_active = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(is_active)
        .execute(&mut *tx)
        .await
        .map_err(|error| AppError::Internal(format!("failed to set active flag: {error}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("user '{user_id}' was not found")));
        }

        tx.commit()
            .await
            .map_err(|error| AppError::Internal(format!("failed to commit active flag: {error}")))
    }

    async fn record_login(&self, user_id: UserId) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET last_login_at = now(), updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to record login: {error}")))?;

        Ok(())
    }
}

fn email_conflict_or_internal(error: sqlx::Error, operation: &str) -> AppError {
    if let sqlx::Error::Database(ref database_error) = error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict("an account with this email already exists".to_owned());
    }

    AppError::Internal(format!("failed to {operation}: {error}"))
}
