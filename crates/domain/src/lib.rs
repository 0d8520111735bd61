//! Domain types for the Nutrack authorization core.

#![forbid(unsafe_code)]

mod credential;
mod role;
mod security;
mod user;

pub use credential::CredentialClaims;
pub use role::{AssignOutcome, RemoveOutcome, Role, RoleAssignment, RoleId};
pub use security::{
    ADMIN_ROLE_NAME, AccessRequirement, AuditAction, DEFAULT_ROLE_NAME, Permission,
};
pub use user::{EmailAddress, UserAccount, UserId, validate_password};
