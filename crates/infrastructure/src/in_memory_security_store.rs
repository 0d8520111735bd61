//! In-memory implementation of the security ports.
//!
//! Backs unit tests and local development without a database. Enforces the
//! same contracts as the Postgres adapters: idempotent assignment
//! mutations, atomic role replacement, and last-admin protection checked
//! under the store lock.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use nutrack_application::{
    AuditEvent, AuditRepository, PermissionCatalog, RoleAssignmentRepository, RoleRepository,
    UserAccountRepository,
};
use nutrack_core::{AppError, AppResult};
use nutrack_domain::{
    ADMIN_ROLE_NAME, AssignOutcome, EmailAddress, Permission, RemoveOutcome, Role, RoleAssignment,
    RoleId, UserAccount, UserId,
};

#[derive(Debug, Default)]
struct StoreState {
    users: HashMap<UserId, UserAccount>,
    password_hashes: HashMap<UserId, String>,
    roles: HashMap<RoleId, Role>,
    grants: HashMap<RoleId, BTreeSet<Permission>>,
    assignments: Vec<RoleAssignment>,
    audit_events: Vec<AuditEvent>,
}

impl StoreState {
    fn is_assigned(&self, user_id: UserId, role_id: RoleId) -> bool {
        self.assignments
            .iter()
            .any(|row| row.user_id == user_id && row.role_id == role_id)
    }

    fn admin_role_id(&self) -> Option<RoleId> {
        self.roles
            .values()
            .find(|role| role.name == ADMIN_ROLE_NAME)
            .map(|role| role.id)
    }

    fn is_active_admin(&self, user_id: UserId) -> bool {
        let Some(admin_role_id) = self.admin_role_id() else {
            return false;
        };
        self.users.get(&user_id).is_some_and(|user| user.is_active)
            && self.is_assigned(user_id, admin_role_id)
    }

    fn other_active_admins(&self, user_id: UserId) -> u64 {
        let Some(admin_role_id) = self.admin_role_id() else {
            return 0;
        };
        self.assignments
            .iter()
            .filter(|row| row.role_id == admin_role_id && row.user_id != user_id)
            .filter(|row| {
                self.users
                    .get(&row.user_id)
                    .is_some_and(|user| user.is_active)
            })
            .count() as u64
    }

    fn require_user(&self, user_id: UserId) -> AppResult<&UserAccount> {
        self.users
            .get(&user_id)
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' was not found")))
    }

    fn require_role(&self, role_id: RoleId) -> AppResult<&Role> {
        self.roles
            .get(&role_id)
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))
    }
}

fn last_admin_error() -> AppError {
    AppError::LastAdminProtection(
        "at least one other active user must hold the Admin role".to_owned(),
    )
}

/// In-memory store implementing every security port behind one lock.
#[derive(Debug, Default)]
pub struct InMemorySecurityStore {
    state: RwLock<StoreState>,
}

impl InMemorySecurityStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a role with the given grants, returning its id.
    pub async fn seed_role(&self, name: &str, permissions: &[Permission]) -> Role {
        let role = Role {
            id: RoleId::new(),
            name: name.to_owned(),
            description: String::new(),
        };

        let mut state = self.state.write().await;
        state.roles.insert(role.id, role.clone());
        state
            .grants
            .insert(role.id, permissions.iter().copied().collect());
        role
    }

    /// Returns all recorded audit events, oldest first.
    pub async fn audit_events(&self) -> Vec<AuditEvent> {
        self.state.read().await.audit_events.clone()
    }
}

#[async_trait]
impl UserAccountRepository for InMemorySecurityStore {
    async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserAccount>> {
        Ok(self.state.read().await.users.get(&user_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserAccount>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|user| user.email.as_str().eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create(&self, email: &EmailAddress, password_hash: &str) -> AppResult<UserId> {
        let mut state = self.state.write().await;

        if state
            .users
            .values()
            .any(|user| user.email.as_str() == email.as_str())
        {
            return Err(AppError::Conflict(
                "an account with this email already exists".to_owned(),
            ));
        }

        let user_id = UserId::new();
        state.users.insert(
            user_id,
            UserAccount {
                id: user_id,
                email: email.clone(),
                is_active: true,
                created_at: Utc::now(),
                last_login_at: None,
            },
        );
        state
            .password_hashes
            .insert(user_id, password_hash.to_owned());

        Ok(user_id)
    }

    async fn password_hash(&self, user_id: UserId) -> AppResult<Option<String>> {
        Ok(self
            .state
            .read()
            .await
            .password_hashes
            .get(&user_id)
            .cloned())
    }

    async fn set_active(&self, user_id: UserId, is_active: bool) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.require_user(user_id)?;

        if !is_active
            && state.is_active_admin(user_id)
            && state.other_active_admins(user_id) == 0
        {
            return Err(last_admin_error());
        }

        if let Some(user) = state.users.get_mut(&user_id) {
            user.is_active = is_active;
        }
        Ok(())
    }

    async fn record_login(&self, user_id: UserId) -> AppResult<()> {
        let mut state = self.state.write().await;
        if let Some(user) = state.users.get_mut(&user_id) {
            user.last_login_at = Some(Utc::now());
        }
        Ok(())
    }
}

#[async_trait]
impl RoleRepository for InMemorySecurityStore {
    async fn find_by_id(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self.state.read().await.roles.get(&role_id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        Ok(self
            .state
            .read()
            .await
            .roles
            .values()
            .find(|role| role.name == name)
            .cloned())
    }

    async fn list(&self) -> AppResult<Vec<Role>> {
        let mut roles: Vec<Role> = self.state.read().await.roles.values().cloned().collect();
        roles.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(roles)
    }
}

#[async_trait]
impl PermissionCatalog for InMemorySecurityStore {
    async fn permissions_granted_to(&self, role_id: RoleId) -> AppResult<BTreeSet<Permission>> {
        Ok(self
            .state
            .read()
            .await
            .grants
            .get(&role_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl RoleAssignmentRepository for InMemorySecurityStore {
    async fn assign_role(&self, user_id: UserId, role_id: RoleId) -> AppResult<AssignOutcome> {
        let mut state = self.state.write().await;
        state.require_user(user_id)?;
        state.require_role(role_id)?;

        if state.is_assigned(user_id, role_id) {
            return Ok(AssignOutcome::AlreadyAssigned);
        }

        state.assignments.push(RoleAssignment {
            user_id,
            role_id,
            assigned_at: Utc::now(),
        });
        Ok(AssignOutcome::Assigned)
    }

    async fn remove_role(&self, user_id: UserId, role_id: RoleId) -> AppResult<RemoveOutcome> {
        let mut state = self.state.write().await;
        state.require_user(user_id)?;
        let role_name = state.require_role(role_id)?.name.clone();

        if role_name == ADMIN_ROLE_NAME
            && state.is_active_admin(user_id)
            && state.other_active_admins(user_id) == 0
        {
            return Err(last_admin_error());
        }

        let before = state.assignments.len();
        state
            .assignments
            .retain(|row| !(row.user_id == user_id && row.role_id == role_id));

        if state.assignments.len() == before {
            return Ok(RemoveOutcome::NotAssigned);
        }
        Ok(RemoveOutcome::Removed)
    }

    async fn replace_roles(&self, user_id: UserId, new_role_id: RoleId) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.require_user(user_id)?;
        let new_role_name = state.require_role(new_role_id)?.name.clone();

        if new_role_name != ADMIN_ROLE_NAME
            && state.is_active_admin(user_id)
            && state.other_active_admins(user_id) == 0
        {
            return Err(last_admin_error());
        }

        state.assignments.retain(|row| row.user_id != user_id);
        state.assignments.push(RoleAssignment {
            user_id,
            role_id: new_role_id,
            assigned_at: Utc::now(),
        });
        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<RoleAssignment>> {
        Ok(self
            .state
            .read()
            .await
            .assignments
            .iter()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn count_active_admins_excluding(&self, user_id: UserId) -> AppResult<u64> {
        Ok(self.state.read().await.other_active_admins(user_id))
    }
}

#[async_trait]
impl AuditRepository for InMemorySecurityStore {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.state.write().await.audit_events.push(event);
        Ok(())
    }
}
