//! Application services for Nutrack.
//!
//! Use-cases are expressed against repository ports; adapters live in the
//! infrastructure crate. Authorization decisions made here are the
//! authoritative ones: client-side claim checks exist purely to shape UI.

#![forbid(unsafe_code)]

mod authorization_gate;
mod credential_service;
mod permission_resolver;
mod role_admin_service;
mod security_ports;
mod user_service;

pub use authorization_gate::AuthorizationGate;
pub use credential_service::{
    CredentialService, DEFAULT_CREDENTIAL_TTL_SECONDS, IssuedCredential,
};
pub use permission_resolver::PermissionResolver;
pub use role_admin_service::{RoleAdminService, UserSummary};
pub use security_ports::{
    AuditEvent, AuditRepository, CredentialSigner, PasswordHasher, PermissionCatalog,
    RoleAssignmentRepository, RoleRepository, UserAccountRepository,
};
pub use user_service::UserService;
