//! Credential issuance, verification, and refresh.
//!
//! A credential snapshots the holder's roles and permissions at issuance
//! time. Later role or grant changes do not alter an outstanding
//! credential; callers observe them only after the next login or refresh.

use std::sync::Arc;

use chrono::{Duration, Utc};

use nutrack_core::{AppError, AppResult};
use nutrack_domain::{AuditAction, CredentialClaims, UserId};

use crate::{AuditEvent, AuditRepository, CredentialSigner, PermissionResolver,
    UserAccountRepository};

/// Default credential lifetime in seconds.
pub const DEFAULT_CREDENTIAL_TTL_SECONDS: i64 = 3600;

/// A freshly signed credential together with its claim set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCredential {
    /// Opaque bearer token.
    pub token: String,
    /// The claims embedded in the token.
    pub claims: CredentialClaims,
}

/// Application service issuing and verifying signed credentials.
#[derive(Clone)]
pub struct CredentialService {
    users: Arc<dyn UserAccountRepository>,
    resolver: PermissionResolver,
    signer: Arc<dyn CredentialSigner>,
    audit_repository: Arc<dyn AuditRepository>,
    ttl: Duration,
}

impl CredentialService {
    /// Creates a service with a fixed credential lifetime.
    pub fn new(
        users: Arc<dyn UserAccountRepository>,
        resolver: PermissionResolver,
        signer: Arc<dyn CredentialSigner>,
        audit_repository: Arc<dyn AuditRepository>,
        ttl_seconds: i64,
    ) -> AppResult<Self> {
        if ttl_seconds <= 0 {
            return Err(AppError::Validation(
                "credential lifetime must be positive".to_owned(),
            ));
        }

        Ok(Self {
            users,
            resolver,
            signer,
            audit_repository,
            ttl: Duration::seconds(ttl_seconds),
        })
    }

    /// Issues a credential snapshotting the user's current roles and
    /// permissions.
    pub async fn issue(&self, user_id: UserId) -> AppResult<IssuedCredential> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' was not found")))?;

        if !user.is_active {
            return Err(AppError::Unauthorized(
                "account is deactivated".to_owned(),
            ));
        }

        let roles = self.resolver.effective_role_names(user_id).await?;
        let permissions = self.resolver.effective_permissions(user_id).await?;

        let claims = CredentialClaims::new(
            user.id,
            user.email.as_str().to_owned(),
            roles,
            permissions,
            Utc::now() + self.ttl,
        );
        let token = self.signer.sign(&claims)?;

        self.audit_repository
            .append_event(AuditEvent {
                actor: Some(user_id),
                action: AuditAction::SecurityCredentialIssued,
                resource_type: "credential".to_owned(),
                resource_id: user_id.to_string(),
                detail: Some(format!(
                    "issued credential with {} role(s) and {} permission(s)",
                    claims.roles.len(),
                    claims.permissions.len()
                )),
            })
            .await?;

        Ok(IssuedCredential { token, claims })
    }

    /// Verifies signature and expiry, returning the embedded claim set.
    pub fn verify(&self, token: &str) -> AppResult<CredentialClaims> {
        self.signer.verify(token)
    }

    /// Re-issues a credential from current database truth.
    ///
    /// The presented credential must still verify; refresh is the explicit
    /// path by which a holder picks up role and grant changes.
    pub async fn refresh(&self, token: &str) -> AppResult<IssuedCredential> {
        let claims = self.signer.verify(token)?;
        self.issue(claims.sub).await
    }
}
