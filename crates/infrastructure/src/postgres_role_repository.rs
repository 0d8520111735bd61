//! PostgreSQL-backed role and permission catalog lookups.

use std::collections::BTreeSet;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::PgPool;

use nutrack_application::{PermissionCatalog, RoleRepository};
use nutrack_core::{AppError, AppResult};
use nutrack_domain::{Permission, Role, RoleId};

/// PostgreSQL implementation of the role repository and permission catalog
/// ports.
#[derive(Clone)]
pub struct PostgresRoleRepository {
    pool: PgPool,
}

impl PostgresRoleRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RoleRow {
    id: uuid::Uuid,
    name: String,
    description: String,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Self {
            id: RoleId::from_uuid(row.id),
            name: row.name,
            description: row.description,
        }
    }
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn find_by_id(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, description
            FROM roles
            WHERE id = $1
            LIMIT 1
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find role by id: {error}")))?;

        Ok(row.map(Role::from))
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, description
            FROM roles
            WHERE name = $1
            LIMIT 1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find role by name: {error}")))?;

        Ok(row.map(Role::from))
    }

    async fn list(&self) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, description
            FROM roles
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list roles: {error}")))?;

        Ok(rows.into_iter().map(Role::from).collect())
    }
}

#[async_trait]
impl PermissionCatalog for PostgresRoleRepository {
    async fn permissions_granted_to(&self, role_id: RoleId) -> AppResult<BTreeSet<Permission>> {
        let codes = sqlx::query_scalar::<_, String>(
            r#"
            SELECT permission
            FROM role_permissions
            WHERE role_id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load permission grants: {error}"))
        })?;

        let mut permissions = BTreeSet::new();
        for code in codes {
            match Permission::from_str(&code) {
                Ok(permission) => {
                    permissions.insert(permission);
                }
                // A grant for a retired code must not fail resolution for
                // the role's remaining permissions.
                Err(_) => {
                    tracing::warn!(%code, role_id = %role_id, "ignoring unknown permission code");
                }
            }
        }

        Ok(permissions)
    }
}
