//! Role and account administration use-cases.
//!
//! Layers two self-protection invariants over the role assignment store:
//! an actor may never target their own account with an access-reducing
//! operation, and no operation may leave the system without an active
//! administrator. Both checks run before any write; the persistence
//! adapters repeat the last-admin check inside their mutating transactions
//! to close the concurrent-removal race.

use std::collections::BTreeSet;
use std::sync::Arc;

use nutrack_core::{AppError, AppResult};
use nutrack_domain::{
    ADMIN_ROLE_NAME, AccessRequirement, AssignOutcome, AuditAction, CredentialClaims, Permission,
    RemoveOutcome, Role, RoleId, UserAccount, UserId,
};

use crate::{
    AuditEvent, AuditRepository, AuthorizationGate, PermissionResolver, RoleAssignmentRepository,
    RoleRepository, UserAccountRepository,
};

/// Projection of a user returned by administrative commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    /// The user's identifier.
    pub user_id: UserId,
    /// Canonical email address.
    pub email: String,
    /// Whether the account is active.
    pub is_active: bool,
    /// Names of all held roles.
    pub roles: BTreeSet<String>,
}

/// Application service for role assignment and account administration.
#[derive(Clone)]
pub struct RoleAdminService {
    gate: AuthorizationGate,
    roles: Arc<dyn RoleRepository>,
    assignments: Arc<dyn RoleAssignmentRepository>,
    users: Arc<dyn UserAccountRepository>,
    resolver: PermissionResolver,
    audit_repository: Arc<dyn AuditRepository>,
}

impl RoleAdminService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        gate: AuthorizationGate,
        roles: Arc<dyn RoleRepository>,
        assignments: Arc<dyn RoleAssignmentRepository>,
        users: Arc<dyn UserAccountRepository>,
        resolver: PermissionResolver,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            gate,
            roles,
            assignments,
            users,
            resolver,
            audit_repository,
        }
    }

    /// Assigns a role to a user; re-assigning an existing pair is a no-op.
    pub async fn assign_role(
        &self,
        actor: &CredentialClaims,
        user_id: UserId,
        role_id: RoleId,
    ) -> AppResult<AssignOutcome> {
        self.gate
            .require_current_permission(actor, Permission::SecurityRoleManage)
            .await?;

        let role = self.require_role(role_id).await?;
        let outcome = self.assignments.assign_role(user_id, role_id).await?;

        if outcome == AssignOutcome::Assigned {
            self.audit_repository
                .append_event(AuditEvent {
                    actor: Some(actor.sub),
                    action: AuditAction::SecurityRoleAssigned,
                    resource_type: "role_assignment".to_owned(),
                    resource_id: format!("{user_id}:{role_id}"),
                    detail: Some(format!("assigned role '{}' to '{user_id}'", role.name)),
                })
                .await?;
        }

        Ok(outcome)
    }

    /// Removes a role from a user; removing an absent pair is a no-op.
    pub async fn remove_role(
        &self,
        actor: &CredentialClaims,
        user_id: UserId,
        role_id: RoleId,
    ) -> AppResult<RemoveOutcome> {
        self.gate
            .require_current_permission(actor, Permission::SecurityRoleManage)
            .await?;

        if user_id == actor.sub {
            return Err(AppError::SelfModificationDenied(
                "cannot remove a role from your own account".to_owned(),
            ));
        }

        let role = self.require_role(role_id).await?;
        if role.name == ADMIN_ROLE_NAME {
            self.ensure_other_active_admin_remains(user_id).await?;
        }

        let outcome = self.assignments.remove_role(user_id, role_id).await?;

        if outcome == RemoveOutcome::Removed {
            self.audit_repository
                .append_event(AuditEvent {
                    actor: Some(actor.sub),
                    action: AuditAction::SecurityRoleUnassigned,
                    resource_type: "role_assignment".to_owned(),
                    resource_id: format!("{user_id}:{role_id}"),
                    detail: Some(format!("removed role '{}' from '{user_id}'", role.name)),
                })
                .await?;
        }

        Ok(outcome)
    }

    /// Replaces all of a user's roles with a single new role.
    ///
    /// Used where a user is meant to hold exactly one role. The store
    /// performs the swap as one transactional unit so no reader observes a
    /// role-less gap.
    pub async fn replace_role(
        &self,
        actor: &CredentialClaims,
        user_id: UserId,
        new_role_id: RoleId,
    ) -> AppResult<UserSummary> {
        self.gate
            .require_current_permission(actor, Permission::SecurityRoleManage)
            .await?;

        if user_id == actor.sub {
            return Err(AppError::SelfModificationDenied(
                "cannot replace your own role".to_owned(),
            ));
        }

        let new_role = self.require_role(new_role_id).await?;
        if new_role.name != ADMIN_ROLE_NAME {
            self.ensure_other_active_admin_remains(user_id).await?;
        }

        let account = self.require_user(user_id).await?;
        self.assignments.replace_roles(user_id, new_role_id).await?;

        self.audit_repository
            .append_event(AuditEvent {
                actor: Some(actor.sub),
                action: AuditAction::SecurityRoleReplaced,
                resource_type: "role_assignment".to_owned(),
                resource_id: format!("{user_id}:{new_role_id}"),
                detail: Some(format!(
                    "replaced roles of '{user_id}' with '{}'",
                    new_role.name
                )),
            })
            .await?;

        Ok(UserSummary {
            user_id,
            email: account.email.as_str().to_owned(),
            is_active: account.is_active,
            roles: self.resolver.effective_role_names(user_id).await?,
        })
    }

    /// Activates or deactivates a user account.
    ///
    /// Returns the new active state. Self-targeting is always rejected: an
    /// administrator cannot lock themselves out.
    pub async fn toggle_active(
        &self,
        actor: &CredentialClaims,
        user_id: UserId,
        is_active: bool,
    ) -> AppResult<bool> {
        self.gate
            .require_current_permission(actor, Permission::UsersManage)
            .await?;

        if user_id == actor.sub {
            return Err(AppError::SelfModificationDenied(
                "cannot change the active state of your own account".to_owned(),
            ));
        }

        self.require_user(user_id).await?;

        if !is_active {
            self.ensure_other_active_admin_remains(user_id).await?;
        }

        self.users.set_active(user_id, is_active).await?;

        self.audit_repository
            .append_event(AuditEvent {
                actor: Some(actor.sub),
                action: AuditAction::SecurityUserActiveToggled,
                resource_type: "user_account".to_owned(),
                resource_id: user_id.to_string(),
                detail: Some(format!(
                    "set active flag of '{user_id}' to {is_active}"
                )),
            })
            .await?;

        Ok(is_active)
    }

    /// Returns a user's effective permission codes.
    pub async fn effective_permissions(
        &self,
        actor: &CredentialClaims,
        user_id: UserId,
    ) -> AppResult<BTreeSet<Permission>> {
        self.gate
            .require(actor, &AccessRequirement::permission(Permission::UsersView))?;
        self.require_user(user_id).await?;
        self.resolver.effective_permissions(user_id).await
    }

    /// Returns a user's role names.
    pub async fn effective_roles(
        &self,
        actor: &CredentialClaims,
        user_id: UserId,
    ) -> AppResult<BTreeSet<String>> {
        self.gate
            .require(actor, &AccessRequirement::permission(Permission::UsersView))?;
        self.require_user(user_id).await?;
        self.resolver.effective_role_names(user_id).await
    }

    /// Lists all roles for administrative views.
    pub async fn list_roles(&self, actor: &CredentialClaims) -> AppResult<Vec<Role>> {
        self.gate.require(
            actor,
            &AccessRequirement::permission(Permission::SecurityRoleManage),
        )?;
        self.roles.list().await
    }

    async fn require_role(&self, role_id: RoleId) -> AppResult<Role> {
        self.roles
            .find_by_id(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))
    }

    async fn require_user(&self, user_id: UserId) -> AppResult<UserAccount> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' was not found")))
    }

    /// Rejects the operation when the target is the last active admin.
    ///
    /// Advisory: the count read here is only as strong as the surrounding
    /// isolation, so the stores re-run it inside the mutating transaction.
    async fn ensure_other_active_admin_remains(&self, target: UserId) -> AppResult<()> {
        let account = self.require_user(target).await?;
        if !account.is_active {
            return Ok(());
        }

        let role_names = self.resolver.effective_role_names(target).await?;
        if !role_names.contains(ADMIN_ROLE_NAME) {
            return Ok(());
        }

        if self
            .assignments
            .count_active_admins_excluding(target)
            .await?
            == 0
        {
            return Err(AppError::LastAdminProtection(
                "at least one other active user must hold the Admin role".to_owned(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashMap};
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use tokio::sync::Mutex;

    use nutrack_core::{AppError, AppResult};
    use nutrack_domain::{
        ADMIN_ROLE_NAME, AssignOutcome, CredentialClaims, EmailAddress, Permission, RemoveOutcome,
        Role, RoleAssignment, RoleId, UserAccount, UserId,
    };

    use crate::{
        AuditEvent, AuditRepository, AuthorizationGate, CredentialSigner, PermissionCatalog,
        PermissionResolver, RoleAssignmentRepository, RoleRepository, UserAccountRepository,
    };

    use super::RoleAdminService;

    /// In-memory store backing every port the service touches.
    #[derive(Default)]
    struct FakeStore {
        users: Mutex<HashMap<UserId, UserAccount>>,
        roles: Mutex<HashMap<RoleId, Role>>,
        grants: Mutex<HashMap<RoleId, BTreeSet<Permission>>>,
        assignments: Mutex<Vec<RoleAssignment>>,
    }

    impl FakeStore {
        async fn add_user(&self, is_active: bool) -> AppResult<UserId> {
            let user_id = UserId::new();
            let email = EmailAddress::new(format!("{user_id}@example.com"))?;
            self.users.lock().await.insert(
                user_id,
                UserAccount {
                    id: user_id,
                    email,
                    is_active,
                    created_at: Utc::now(),
                    last_login_at: None,
                },
            );
            Ok(user_id)
        }

        async fn add_role(&self, name: &str, permissions: &[Permission]) -> RoleId {
            let role_id = RoleId::new();
            self.roles.lock().await.insert(
                role_id,
                Role {
                    id: role_id,
                    name: name.to_owned(),
                    description: String::new(),
                },
            );
            self.grants
                .lock()
                .await
                .insert(role_id, permissions.iter().copied().collect());
            role_id
        }

        async fn link(&self, user_id: UserId, role_id: RoleId) {
            self.assignments.lock().await.push(RoleAssignment {
                user_id,
                role_id,
                assigned_at: Utc::now(),
            });
        }

        async fn admin_role_id(&self) -> Option<RoleId> {
            self.roles
                .lock()
                .await
                .values()
                .find(|role| role.name == ADMIN_ROLE_NAME)
                .map(|role| role.id)
        }
    }

    #[async_trait]
    impl UserAccountRepository for FakeStore {
        async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserAccount>> {
            Ok(self.users.lock().await.get(&user_id).cloned())
        }

        async fn find_by_email(&self, email: &str) -> AppResult<Option<UserAccount>> {
            Ok(self
                .users
                .lock()
                .await
                .values()
                .find(|user| user.email.as_str() == email)
                .cloned())
        }

        async fn create(&self, _: &EmailAddress, _: &str) -> AppResult<UserId> {
            Ok(UserId::new())
        }

        async fn password_hash(&self, _: UserId) -> AppResult<Option<String>> {
            Ok(None)
        }

        async fn set_active(&self, user_id: UserId, is_active: bool) -> AppResult<()> {
            let mut users = self.users.lock().await;
            let user = users
                .get_mut(&user_id)
                .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' was not found")))?;
            user.is_active = is_active;
            Ok(())
        }

        async fn record_login(&self, _: UserId) -> AppResult<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl RoleAssignmentRepository for FakeStore {
        async fn assign_role(&self, user_id: UserId, role_id: RoleId) -> AppResult<AssignOutcome> {
            if !self.users.lock().await.contains_key(&user_id) {
                return Err(AppError::NotFound(format!("user '{user_id}' was not found")));
            }
            if !self.roles.lock().await.contains_key(&role_id) {
                return Err(AppError::NotFound(format!("role '{role_id}' was not found")));
            }

            let mut assignments = self.assignments.lock().await;
            let exists = assignments
                .iter()
                .any(|row| row.user_id == user_id && row.role_id == role_id);
            if exists {
                return Ok(AssignOutcome::AlreadyAssigned);
            }

            assignments.push(RoleAssignment {
                user_id,
                role_id,
                assigned_at: Utc::now(),
            });
            Ok(AssignOutcome::Assigned)
        }

        async fn remove_role(&self, user_id: UserId, role_id: RoleId) -> AppResult<RemoveOutcome> {
            let mut assignments = self.assignments.lock().await;
            let before = assignments.len();
            assignments.retain(|row| !(row.user_id == user_id && row.role_id == role_id));
            if assignments.len() == before {
                return Ok(RemoveOutcome::NotAssigned);
            }
            Ok(RemoveOutcome::Removed)
        }

        async fn replace_roles(&self, user_id: UserId, new_role_id: RoleId) -> AppResult<()> {
            let mut assignments = self.assignments.lock().await;
            assignments.retain(|row| row.user_id != user_id);
            assignments.push(RoleAssignment {
                user_id,
                role_id: new_role_id,
                assigned_at: Utc::now(),
            });
            Ok(())
        }

        async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<RoleAssignment>> {
            Ok(self
                .assignments
                .lock()
                .await
                .iter()
                .filter(|row| row.user_id == user_id)
                .cloned()
                .collect())
        }

        async fn count_active_admins_excluding(&self, user_id: UserId) -> AppResult<u64> {
            let Some(admin_role_id) = self.admin_role_id().await else {
                return Ok(0);
            };

            let users = self.users.lock().await;
            let count = self
                .assignments
                .lock()
                .await
                .iter()
                .filter(|row| row.role_id == admin_role_id && row.user_id != user_id)
                .filter(|row| users.get(&row.user_id).is_some_and(|user| user.is_active))
                .count();
            Ok(count as u64)
        }
    }

    #[async_trait]
    impl RoleRepository for FakeStore {
        async fn find_by_id(&self, role_id: RoleId) -> AppResult<Option<Role>> {
            Ok(self.roles.lock().await.get(&role_id).cloned())
        }

        async fn find_by_name(&self, name: &str) -> AppResult<Option<Role>> {
            Ok(self
                .roles
                .lock()
                .await
                .values()
                .find(|role| role.name == name)
                .cloned())
        }

        async fn list(&self) -> AppResult<Vec<Role>> {
            Ok(self.roles.lock().await.values().cloned().collect())
        }
    }

    #[async_trait]
    impl PermissionCatalog for FakeStore {
        async fn permissions_granted_to(
            &self,
            role_id: RoleId,
        ) -> AppResult<BTreeSet<Permission>> {
            Ok(self
                .grants
                .lock()
                .await
                .get(&role_id)
                .cloned()
                .unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct FakeAuditRepository {
        events: Mutex<Vec<AuditEvent>>,
    }

    #[async_trait]
    impl AuditRepository for FakeAuditRepository {
        async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
            self.events.lock().await.push(event);
            Ok(())
        }
    }

    struct NoopSigner;

    impl CredentialSigner for NoopSigner {
        fn sign(&self, _: &CredentialClaims) -> AppResult<String> {
            Ok(String::new())
        }

        fn verify(&self, _: &str) -> AppResult<CredentialClaims> {
            Err(AppError::Unauthorized("unused".to_owned()))
        }
    }

    fn claims_for(user_id: UserId) -> CredentialClaims {
        CredentialClaims::new(
            user_id,
            "actor@example.com".to_owned(),
            BTreeSet::new(),
            BTreeSet::new(),
            Utc::now() + Duration::hours(1),
        )
    }

    struct Fixture {
        store: Arc<FakeStore>,
        service: RoleAdminService,
        audit: Arc<FakeAuditRepository>,
        actor_id: UserId,
        admin_role_id: RoleId,
    }

    /// Builds a store with one privileged actor holding the Admin role.
    async fn fixture() -> AppResult<Fixture> {
        let store = Arc::new(FakeStore::default());
        let actor_id = store.add_user(true).await?;
        let admin_role_id = store
            .add_role(
                ADMIN_ROLE_NAME,
                &[
                    Permission::SecurityRoleManage,
                    Permission::UsersManage,
                    Permission::UsersView,
                ],
            )
            .await;
        store.link(actor_id, admin_role_id).await;

        let resolver = PermissionResolver::new(store.clone(), store.clone(), store.clone());
        let gate = AuthorizationGate::new(Arc::new(NoopSigner), resolver.clone());
        let audit = Arc::new(FakeAuditRepository::default());
        let service = RoleAdminService::new(
            gate,
            store.clone(),
            store.clone(),
            store.clone(),
            resolver,
            audit.clone(),
        );

        Ok(Fixture {
            store,
            service,
            audit,
            actor_id,
            admin_role_id,
        })
    }

    #[tokio::test]
    async fn assigning_twice_reports_already_assigned_and_keeps_one_row() -> AppResult<()> {
        let fixture = fixture().await?;
        let target = fixture.store.add_user(true).await?;
        let role_id = fixture
            .store
            .add_role("Coach", &[Permission::ReportView])
            .await;
        let actor = claims_for(fixture.actor_id);

        let first = fixture.service.assign_role(&actor, target, role_id).await?;
        let second = fixture.service.assign_role(&actor, target, role_id).await?;

        assert_eq!(first, AssignOutcome::Assigned);
        assert_eq!(second, AssignOutcome::AlreadyAssigned);
        assert_eq!(fixture.store.list_for_user(target).await?.len(), 1);
        // Only the effective write is audited.
        assert_eq!(fixture.audit.events.lock().await.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn removing_absent_pair_reports_not_assigned_without_mutation() -> AppResult<()> {
        let fixture = fixture().await?;
        let target = fixture.store.add_user(true).await?;
        let role_id = fixture.store.add_role("Coach", &[]).await;
        let actor = claims_for(fixture.actor_id);

        let outcome = fixture.service.remove_role(&actor, target, role_id).await?;

        assert_eq!(outcome, RemoveOutcome::NotAssigned);
        assert!(fixture.audit.events.lock().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn actor_without_manage_permission_is_forbidden() -> AppResult<()> {
        let fixture = fixture().await?;
        let unprivileged = fixture.store.add_user(true).await?;
        let target = fixture.store.add_user(true).await?;
        let role_id = fixture.store.add_role("Coach", &[]).await;

        let result = fixture
            .service
            .assign_role(&claims_for(unprivileged), target, role_id)
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_role_is_not_found() -> AppResult<()> {
        let fixture = fixture().await?;
        let target = fixture.store.add_user(true).await?;

        let result = fixture
            .service
            .assign_role(&claims_for(fixture.actor_id), target, RoleId::new())
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn removing_own_role_is_rejected_before_any_write() -> AppResult<()> {
        let fixture = fixture().await?;
        let actor = claims_for(fixture.actor_id);

        let result = fixture
            .service
            .remove_role(&actor, fixture.actor_id, fixture.admin_role_id)
            .await;

        assert!(matches!(result, Err(AppError::SelfModificationDenied(_))));
        assert_eq!(fixture.store.list_for_user(fixture.actor_id).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn deactivating_own_account_is_rejected_even_for_admins() -> AppResult<()> {
        let fixture = fixture().await?;
        let actor = claims_for(fixture.actor_id);

        let result = fixture
            .service
            .toggle_active(&actor, fixture.actor_id, false)
            .await;

        assert!(matches!(result, Err(AppError::SelfModificationDenied(_))));
        Ok(())
    }

    #[tokio::test]
    async fn removing_admin_role_from_last_active_admin_is_rejected() -> AppResult<()> {
        let fixture = fixture().await?;
        // Second actor holds manage rights through a non-admin role so the
        // sole Admin can be targeted without self-modification.
        let operator = fixture.store.add_user(true).await?;
        let operator_role = fixture
            .store
            .add_role(
                "Operator",
                &[Permission::SecurityRoleManage, Permission::UsersManage],
            )
            .await;
        fixture.store.link(operator, operator_role).await;

        let result = fixture
            .service
            .remove_role(&claims_for(operator), fixture.actor_id, fixture.admin_role_id)
            .await;

        assert!(matches!(result, Err(AppError::LastAdminProtection(_))));
        Ok(())
    }

    #[tokio::test]
    async fn deactivating_last_active_admin_is_rejected() -> AppResult<()> {
        let fixture = fixture().await?;
        let operator = fixture.store.add_user(true).await?;
        let operator_role = fixture
            .store
            .add_role("Operator", &[Permission::UsersManage])
            .await;
        fixture.store.link(operator, operator_role).await;

        let result = fixture
            .service
            .toggle_active(&claims_for(operator), fixture.actor_id, false)
            .await;

        assert!(matches!(result, Err(AppError::LastAdminProtection(_))));
        Ok(())
    }

    #[tokio::test]
    async fn admin_role_can_be_removed_when_another_active_admin_remains() -> AppResult<()> {
        let fixture = fixture().await?;
        let second_admin = fixture.store.add_user(true).await?;
        fixture.store.link(second_admin, fixture.admin_role_id).await;

        let outcome = fixture
            .service
            .remove_role(
                &claims_for(fixture.actor_id),
                second_admin,
                fixture.admin_role_id,
            )
            .await?;

        assert_eq!(outcome, RemoveOutcome::Removed);
        Ok(())
    }

    #[tokio::test]
    async fn inactive_admin_does_not_count_towards_the_invariant() -> AppResult<()> {
        let fixture = fixture().await?;
        // An inactive user holding Admin must not satisfy the protection.
        let dormant = fixture.store.add_user(false).await?;
        fixture.store.link(dormant, fixture.admin_role_id).await;

        let operator = fixture.store.add_user(true).await?;
        let operator_role = fixture
            .store
            .add_role("Operator", &[Permission::SecurityRoleManage])
            .await;
        fixture.store.link(operator, operator_role).await;

        let result = fixture
            .service
            .remove_role(&claims_for(operator), fixture.actor_id, fixture.admin_role_id)
            .await;

        assert!(matches!(result, Err(AppError::LastAdminProtection(_))));
        Ok(())
    }

    #[tokio::test]
    async fn replace_role_leaves_exactly_the_new_role() -> AppResult<()> {
        let fixture = fixture().await?;
        let target = fixture.store.add_user(true).await?;
        let coach = fixture.store.add_role("Coach", &[]).await;
        let customer = fixture.store.add_role("Customer", &[]).await;
        fixture.store.link(target, coach).await;

        let summary = fixture
            .service
            .replace_role(&claims_for(fixture.actor_id), target, customer)
            .await?;

        let expected: BTreeSet<String> = ["Customer".to_owned()].into_iter().collect();
        assert_eq!(summary.roles, expected);
        assert_eq!(fixture.store.list_for_user(target).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn toggle_active_returns_new_state_and_audits() -> AppResult<()> {
        let fixture = fixture().await?;
        let target = fixture.store.add_user(true).await?;

        let state = fixture
            .service
            .toggle_active(&claims_for(fixture.actor_id), target, false)
            .await?;

        assert!(!state);
        let stored = UserAccountRepository::find_by_id(fixture.store.as_ref(), target).await?;
        assert_eq!(stored.map(|user| user.is_active), Some(false));
        assert_eq!(fixture.audit.events.lock().await.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn effective_queries_require_users_view_claim() -> AppResult<()> {
        let fixture = fixture().await?;
        let target = fixture.store.add_user(true).await?;
        // Claims deliberately carry no permissions.
        let bare = claims_for(fixture.actor_id);

        let result = fixture.service.effective_permissions(&bare, target).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
        Ok(())
    }
}
