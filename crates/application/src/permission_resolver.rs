//! Effective permission and role resolution.

use std::collections::BTreeSet;
use std::sync::Arc;

use nutrack_core::{AppError, AppResult};
use nutrack_domain::{Permission, UserId};

use crate::{PermissionCatalog, RoleAssignmentRepository, RoleRepository};

/// Resolves a user's effective permission set from current database truth.
#[derive(Clone)]
pub struct PermissionResolver {
    assignments: Arc<dyn RoleAssignmentRepository>,
    roles: Arc<dyn RoleRepository>,
    catalog: Arc<dyn PermissionCatalog>,
}

impl PermissionResolver {
    /// Creates a resolver from the relation and catalog ports.
    #[must_use]
    pub fn new(
        assignments: Arc<dyn RoleAssignmentRepository>,
        roles: Arc<dyn RoleRepository>,
        catalog: Arc<dyn PermissionCatalog>,
    ) -> Self {
        Self {
            assignments,
            roles,
            catalog,
        }
    }

    /// Returns the distinct union of permissions across all assigned roles.
    ///
    /// A permission granted by two roles appears once. A user with no roles
    /// resolves to the empty set, which is a valid state: authorization will
    /// then deny everything.
    pub async fn effective_permissions(&self, user_id: UserId) -> AppResult<BTreeSet<Permission>> {
        let mut effective = BTreeSet::new();

        for assignment in self.assignments.list_for_user(user_id).await? {
            let granted = self
                .catalog
                .permissions_granted_to(assignment.role_id)
                .await?;
            effective.extend(granted);
        }

        Ok(effective)
    }

    /// Returns the names of all roles held by the user.
    pub async fn effective_role_names(&self, user_id: UserId) -> AppResult<BTreeSet<String>> {
        let mut names = BTreeSet::new();

        for assignment in self.assignments.list_for_user(user_id).await? {
            let role = self
                .roles
                .find_by_id(assignment.role_id)
                .await?
                .ok_or_else(|| {
                    AppError::Internal(format!(
                        "assignment references missing role '{}'",
                        assignment.role_id
                    ))
                })?;
            names.insert(role.name);
        }

        Ok(names)
    }
}
