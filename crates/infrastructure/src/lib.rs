//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod argon2_password_hasher;
mod in_memory_security_store;
mod jwt_credential_signer;
mod postgres_audit_repository;
mod postgres_role_assignment_repository;
mod postgres_role_repository;
mod postgres_user_repository;

pub use argon2_password_hasher::Argon2PasswordHasher;
pub use in_memory_security_store::InMemorySecurityStore;
pub use jwt_credential_signer::JwtCredentialSigner;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_role_assignment_repository::PostgresRoleAssignmentRepository;
pub use postgres_role_repository::PostgresRoleRepository;
pub use postgres_user_repository::PostgresUserRepository;
