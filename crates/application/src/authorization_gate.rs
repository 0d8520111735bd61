//! Authoritative server-side authorization checks.
//!
//! The gate and the client-side claim check
//! ([`CredentialClaims::satisfies`]) consume the same vocabulary of role
//! names and permission codes; only the gate is a security boundary.
//! Operations are deny-by-default: a declared requirement denies every
//! principal lacking it, and authorization failures never masquerade as
//! missing resources.

use std::sync::Arc;

use nutrack_core::{AppError, AppResult};
use nutrack_domain::{AccessRequirement, CredentialClaims, Permission};

use crate::{CredentialSigner, PermissionResolver};

/// Server-side guard verifying credentials and enforcing requirements.
#[derive(Clone)]
pub struct AuthorizationGate {
    signer: Arc<dyn CredentialSigner>,
    resolver: PermissionResolver,
}

impl AuthorizationGate {
    /// Creates a gate from the signer and resolver.
    #[must_use]
    pub fn new(signer: Arc<dyn CredentialSigner>, resolver: PermissionResolver) -> Self {
        Self { signer, resolver }
    }

    /// Verifies a presented bearer token's signature and expiry.
    ///
    /// Failure here is an authentication problem (`Unauthorized`), distinct
    /// from a missing permission (`Forbidden`); the transport layer may
    /// collapse the two, but audit logs keep them apart.
    pub fn authenticate(&self, token: &str) -> AppResult<CredentialClaims> {
        self.signer.verify(token)
    }

    /// Enforces a declared requirement against the credential's snapshot.
    ///
    /// An empty requirement admits any authenticated principal.
    pub fn require(
        &self,
        claims: &CredentialClaims,
        requirement: &AccessRequirement,
    ) -> AppResult<()> {
        if claims.satisfies(requirement) {
            return Ok(());
        }

        if requirement.require_admin && !claims.is_admin() {
            return Err(AppError::Forbidden(
                "administrator role required".to_owned(),
            ));
        }

        let permission = requirement
            .required_permission
            .map(|value| value.as_str())
            .unwrap_or_default();
        Err(AppError::Forbidden(format!(
            "missing permission '{permission}'"
        )))
    }

    /// Enforces a permission against current database truth, ignoring the
    /// credential's snapshot.
    ///
    /// Security-sensitive mutations use this so a stale credential cannot
    /// exercise a permission that has since been revoked.
    pub async fn require_current_permission(
        &self,
        claims: &CredentialClaims,
        permission: Permission,
    ) -> AppResult<()> {
        let current = self.resolver.effective_permissions(claims.sub).await?;

        if current.contains(&permission) {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "user '{}' is missing permission '{}'",
            claims.sub,
            permission.as_str()
        )))
    }
}
