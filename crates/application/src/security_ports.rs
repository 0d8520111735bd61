//! Ports consumed by the authorization services.
//!
//! Relations are explicit tables queried by id; no port returns a
//! traversable object graph, which keeps User, Role, and Permission free of
//! cyclic references and accidental deep loads.

use std::collections::BTreeSet;

use async_trait::async_trait;

use nutrack_core::AppResult;
use nutrack_domain::{
    AssignOutcome, AuditAction, CredentialClaims, EmailAddress, Permission, RemoveOutcome, Role,
    RoleAssignment, RoleId, UserAccount, UserId,
};

/// Audit event emitted by application use-cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// Acting user, or `None` for unauthenticated flows.
    pub actor: Option<UserId>,
    /// Stable action identifier.
    pub action: AuditAction,
    /// Event resource type.
    pub resource_type: String,
    /// Event resource identifier.
    pub resource_id: String,
    /// Optional event detail.
    pub detail: Option<String>,
}

/// Repository port for appending audit events.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Appends one event to the audit trail.
    async fn append_event(&self, event: AuditEvent) -> AppResult<()>;
}

/// Repository port for role lookups.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Finds a role by its identifier.
    async fn find_by_id(&self, role_id: RoleId) -> AppResult<Option<Role>>;

    /// Finds a role by its unique name.
    async fn find_by_name(&self, name: &str) -> AppResult<Option<Role>>;

    /// Lists all roles.
    async fn list(&self) -> AppResult<Vec<Role>>;
}

/// Read-only lookup of the static permission catalog.
#[async_trait]
pub trait PermissionCatalog: Send + Sync {
    /// Returns the permissions granted by a role.
    ///
    /// A role with no grants yields an empty set, not an error.
    async fn permissions_granted_to(&self, role_id: RoleId) -> AppResult<BTreeSet<Permission>>;
}

/// Repository port for the user-role relation.
///
/// Mutations are idempotent: re-assigning an existing pair or removing an
/// absent one reports a distinct outcome instead of failing.
#[async_trait]
pub trait RoleAssignmentRepository: Send + Sync {
    /// Creates an assignment, or reports `AlreadyAssigned` without writing.
    ///
    /// Fails with `NotFound` when the user or role id does not resolve.
    async fn assign_role(&self, user_id: UserId, role_id: RoleId) -> AppResult<AssignOutcome>;

    /// Deletes an assignment, or reports `NotAssigned` without writing.
    ///
    /// Fails with `NotFound` when the user or role id does not resolve, and
    /// with `LastAdminProtection` when deleting the pair would leave no
    /// active administrator (re-checked inside the mutating transaction).
    async fn remove_role(&self, user_id: UserId, role_id: RoleId) -> AppResult<RemoveOutcome>;

    /// Atomically replaces all of a user's assignments with the given role.
    ///
    /// No concurrent reader may observe the user role-less or holding both
    /// the old and new role. Fails with `LastAdminProtection` when the
    /// replacement would leave no active administrator.
    async fn replace_roles(&self, user_id: UserId, new_role_id: RoleId) -> AppResult<()>;

    /// Lists all assignments held by a user.
    async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<RoleAssignment>>;

    /// Counts active users other than `user_id` holding the admin role.
    ///
    /// Advisory read used by the application-level invariant check; the
    /// store repeats the count inside its mutating transactions.
    async fn count_active_admins_excluding(&self, user_id: UserId) -> AppResult<u64>;
}

/// Repository port for user account persistence.
#[async_trait]
pub trait UserAccountRepository: Send + Sync {
    /// Finds a user by their unique identifier.
    async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserAccount>>;

    /// Finds a user by email (case-insensitive).
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserAccount>>;

    /// Creates a new active user record. Returns the assigned id.
    async fn create(&self, email: &EmailAddress, password_hash: &str) -> AppResult<UserId>;

    /// Returns the stored password hash for a user.
    async fn password_hash(&self, user_id: UserId) -> AppResult<Option<String>>;

    /// Sets the active flag.
    ///
    /// Fails with `NotFound` when the user does not exist, and with
    /// `LastAdminProtection` when deactivation would leave no active
    /// administrator (re-checked inside the mutating transaction).
    async fn set_active(&self, user_id: UserId, is_active: bool) -> AppResult<()>;

    /// Stamps the last successful login.
    async fn record_login(&self, user_id: UserId) -> AppResult<()>;
}

/// Port for password hashing operations. Keeps application code free of
/// direct cryptographic library coupling.
pub trait PasswordHasher: Send + Sync {
    /// Hashes a plaintext password.
    fn hash_password(&self, password: &str) -> AppResult<String>;

    /// Verifies a plaintext password against a stored hash.
    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool>;
}

/// Port for signing and verifying credentials.
///
/// Implementations must be stateless and safe to call from concurrent
/// request handlers. The signature guarantees integrity, not
/// confidentiality; the payload is non-secret.
pub trait CredentialSigner: Send + Sync {
    /// Signs a claim set into an opaque bearer token.
    fn sign(&self, claims: &CredentialClaims) -> AppResult<String>;

    /// Verifies signature and expiry, returning the embedded claims.
    ///
    /// Fails with `Unauthorized` for an expired, malformed, or tampered
    /// token regardless of claim content.
    fn verify(&self, token: &str) -> AppResult<CredentialClaims>;
}
