//! Account registration and login.

use std::sync::Arc;

use nutrack_core::{AppError, AppResult};
use nutrack_domain::{DEFAULT_ROLE_NAME, EmailAddress, UserId, validate_password};

use crate::{
    CredentialService, IssuedCredential, PasswordHasher, RoleAssignmentRepository, RoleRepository,
    UserAccountRepository,
};

/// Application service for self-service account flows.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserAccountRepository>,
    roles: Arc<dyn RoleRepository>,
    assignments: Arc<dyn RoleAssignmentRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
    credentials: CredentialService,
}

impl UserService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        users: Arc<dyn UserAccountRepository>,
        roles: Arc<dyn RoleRepository>,
        assignments: Arc<dyn RoleAssignmentRepository>,
        password_hasher: Arc<dyn PasswordHasher>,
        credentials: CredentialService,
    ) -> Self {
        Self {
            users,
            roles,
            assignments,
            password_hasher,
            credentials,
        }
    }

    /// Registers a new account and grants it the default role.
    pub async fn register(&self, email: &str, password: &str) -> AppResult<UserId> {
        let email = EmailAddress::new(email.to_owned())?;
        validate_password(password)?;

        if self.users.find_by_email(email.as_str()).await?.is_some() {
            return Err(AppError::Conflict(
                "an account with this email already exists".to_owned(),
            ));
        }

        let password_hash = self.password_hasher.hash_password(password)?;
        let user_id = self.users.create(&email, &password_hash).await?;

        let default_role = self
            .roles
            .find_by_name(DEFAULT_ROLE_NAME)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!("default role '{DEFAULT_ROLE_NAME}' is not seeded"))
            })?;
        self.assignments.assign_role(user_id, default_role.id).await?;

        Ok(user_id)
    }

    /// Authenticates by email and password and issues a credential.
    ///
    /// Unknown email, wrong password, and deactivated account all fail with
    /// the same `Unauthorized` message so the endpoint cannot be used to
    /// enumerate accounts.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<IssuedCredential> {
        let denied = || AppError::Unauthorized("invalid email or password".to_owned());

        let Some(user) = self.users.find_by_email(email.trim().to_lowercase().as_str()).await?
        else {
            return Err(denied());
        };

        let Some(stored_hash) = self.users.password_hash(user.id).await? else {
            return Err(denied());
        };
        if !self.password_hasher.verify_password(password, &stored_hash)? {
            return Err(denied());
        }

        if !user.is_active {
            return Err(denied());
        }

        self.users.record_login(user.id).await?;
        self.credentials.issue(user.id).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashMap};
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::Mutex;

    use nutrack_core::{AppError, AppResult};
    use nutrack_domain::{
        AssignOutcome, CredentialClaims, DEFAULT_ROLE_NAME, EmailAddress, Permission,
        RemoveOutcome, Role, RoleAssignment, RoleId, UserAccount, UserId,
    };

    use crate::{
        AuditEvent, AuditRepository, CredentialService, CredentialSigner, PasswordHasher,
        PermissionCatalog, PermissionResolver, RoleAssignmentRepository, RoleRepository,
        UserAccountRepository,
    };

    use super::UserService;

    #[derive(Default)]
    struct FakeStore {
        users: Mutex<HashMap<UserId, (UserAccount, String)>>,
        roles: Mutex<HashMap<RoleId, Role>>,
        assignments: Mutex<Vec<RoleAssignment>>,
    }

    impl FakeStore {
        async fn seed_default_role(&self) -> RoleId {
            let role_id = RoleId::new();
            self.roles.lock().await.insert(
                role_id,
                Role {
                    id: role_id,
                    name: DEFAULT_ROLE_NAME.to_owned(),
                    description: String::new(),
                },
            );
            role_id
        }
    }

    #[async_trait]
    impl UserAccountRepository for FakeStore {
        async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserAccount>> {
            Ok(self
                .users
                .lock()
                .await
                .get(&user_id)
                .map(|(user, _)| user.clone()))
        }

        async fn find_by_email(&self, email: &str) -> AppResult<Option<UserAccount>> {
            Ok(self
                .users
                .lock()
                .await
                .values()
                .find(|(user, _)| user.email.as_str() == email)
                .map(|(user, _)| user.clone()))
        }

        async fn create(&self, email: &EmailAddress, password_hash: &str) -> AppResult<UserId> {
            let user_id = UserId::new();
            self.users.lock().await.insert(
                user_id,
                (
                    UserAccount {
                        id: user_id,
                        email: email.clone(),
                        is_active: true,
                        created_at: Utc::now(),
                        last_login_at: None,
                    },
                    password_hash.to_owned(),
                ),
            );
            Ok(user_id)
        }

        async fn password_hash(&self, user_id: UserId) -> AppResult<Option<String>> {
            Ok(self
                .users
                .lock()
                .await
                .get(&user_id)
                .map(|(_, hash)| hash.clone()))
        }

        async fn set_active(&self, user_id: UserId, is_active: bool) -> AppResult<()> {
            let mut users = self.users.lock().await;
            let (user, _) = users
                .get_mut(&user_id)
                .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' was not found")))?;
            user.is_active = is_active;
            Ok(())
        }

        async fn record_login(&self, user_id: UserId) -> AppResult<()> {
            let mut users = self.users.lock().await;
            if let Some((user, _)) = users.get_mut(&user_id) {
                user.last_login_at = Some(Utc::now());
            }
            Ok(())
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
    impl RoleAssignmentRepository for FakeStore {
        async fn assign_role(&self, user_id: UserId, role_id: RoleId) -> AppResult<AssignOutcome> {
            self.assignments.lock().await.push(RoleAssignment {
                user_id,
                role_id,
                assigned_at: Utc::now(),
            });
            Ok(AssignOutcome::Assigned)
        }

        async fn remove_role(&self, _: UserId, _: RoleId) -> AppResult<RemoveOutcome> {
            Ok(RemoveOutcome::Removed)
        }

        async fn replace_roles(&self, _: UserId, _: RoleId) -> AppResult<()> {
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

        async fn count_active_admins_excluding(&self, _: UserId) -> AppResult<u64> {
            Ok(0)
        }
    }

    #[async_trait]
    impl PermissionCatalog for FakeStore {
        async fn permissions_granted_to(&self, _: RoleId) -> AppResult<BTreeSet<Permission>> {
            Ok(BTreeSet::new())
        }
    }

    #[async_trait]
    impl AuditRepository for FakeStore {
        async fn append_event(&self, _: AuditEvent) -> AppResult<()> {
            Ok(())
        }
    }

    /// Reversible fake; tests assert flow logic, not hash strength.
    struct PlainHasher;

    impl PasswordHasher for PlainHasher {
        fn hash_password(&self, password: &str) -> AppResult<String> {
            Ok(format!("hashed:{password}"))
        }

        fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
            Ok(hash == format!("hashed:{password}"))
        }
    }

    struct JsonSigner;

    impl CredentialSigner for JsonSigner {
        fn sign(&self, claims: &CredentialClaims) -> AppResult<String> {
            serde_json::to_string(claims).map_err(|err| AppError::Internal(err.to_string()))
        }

        fn verify(&self, token: &str) -> AppResult<CredentialClaims> {
            serde_json::from_str(token).map_err(|err| AppError::Unauthorized(err.to_string()))
        }
    }

    fn service(store: Arc<FakeStore>) -> AppResult<UserService> {
        let resolver = PermissionResolver::new(store.clone(), store.clone(), store.clone());
        let credentials = CredentialService::new(
            store.clone(),
            resolver,
            Arc::new(JsonSigner),
            store.clone(),
            3600,
        )?;
        Ok(UserService::new(
            store.clone(),
            store.clone(),
            store,
            Arc::new(PlainHasher),
            credentials,
        ))
    }

    #[tokio::test]
    async fn registration_grants_the_default_role() -> AppResult<()> {
        let store = Arc::new(FakeStore::default());
        let role_id = store.seed_default_role().await;
        let service = service(store.clone())?;

        let user_id = service
            .register("new.user@example.com", "correct-horse-battery")
            .await?;

        let held = store.list_for_user(user_id).await?;
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].role_id, role_id);
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() -> AppResult<()> {
        let store = Arc::new(FakeStore::default());
        store.seed_default_role().await;
        let service = service(store)?;

        service
            .register("taken@example.com", "correct-horse-battery")
            .await?;
        let result = service
            .register("taken@example.com", "another-long-password")
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        Ok(())
    }

    #[tokio::test]
    async fn weak_password_is_rejected_before_any_write() -> AppResult<()> {
        let store = Arc::new(FakeStore::default());
        store.seed_default_role().await;
        let service = service(store.clone())?;

        let result = service.register("short@example.com", "short").await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(store.users.lock().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn login_issues_a_credential_for_valid_password() -> AppResult<()> {
        let store = Arc::new(FakeStore::default());
        store.seed_default_role().await;
        let service = service(store)?;

        let user_id = service
            .register("login@example.com", "correct-horse-battery")
            .await?;
        let issued = service
            .login("login@example.com", "correct-horse-battery")
            .await?;

        assert_eq!(issued.claims.sub, user_id);
        assert_eq!(issued.claims.email, "login@example.com");
        Ok(())
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_fail_identically() -> AppResult<()> {
        let store = Arc::new(FakeStore::default());
        store.seed_default_role().await;
        let service = service(store)?;

        service
            .register("present@example.com", "correct-horse-battery")
            .await?;

        let wrong_password = service
            .login("present@example.com", "not-the-password")
            .await;
        let unknown_email = service
            .login("absent@example.com", "correct-horse-battery")
            .await;

        let messages: Vec<String> = [wrong_password, unknown_email]
            .into_iter()
            .map(|result| match result {
                Err(AppError::Unauthorized(message)) => message,
                other => panic!("expected Unauthorized, got {other:?}"),
            })
            .collect();
        assert_eq!(messages[0], messages[1]);
        Ok(())
    }

    #[tokio::test]
    async fn deactivated_account_cannot_log_in() -> AppResult<()> {
        let store = Arc::new(FakeStore::default());
        store.seed_default_role().await;
        let service = service(store.clone())?;

        let user_id = service
            .register("dormant@example.com", "correct-horse-battery")
            .await?;
        store.set_active(user_id, false).await?;

        let result = service
            .login("dormant@example.com", "correct-horse-battery")
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
        Ok(())
    }
}
