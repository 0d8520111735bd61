//! Signed credential payload.
//!
//! A credential is a snapshot of a user's roles and permissions taken at
//! issuance time. If assignments or grants change afterwards, the holder's
//! claims do not change until the credential is reissued; this trades
//! perfect consistency for skipping a database round-trip per request.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::security::{ADMIN_ROLE_NAME, AccessRequirement, Permission};
use crate::user::UserId;

/// Claim set embedded in a signed credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialClaims {
    /// Subject: the authenticated user's identifier.
    pub sub: UserId,
    /// Canonical email address at issuance.
    pub email: String,
    /// Role names held at issuance; ordering is irrelevant.
    pub roles: BTreeSet<String>,
    /// Distinct permission codes held at issuance; ordering is irrelevant.
    pub permissions: BTreeSet<Permission>,
    /// Expiry as Unix timestamp seconds.
    pub exp: i64,
}

impl CredentialClaims {
    /// Builds a claim set expiring at the given instant.
    #[must_use]
    pub fn new(
        sub: UserId,
        email: String,
        roles: BTreeSet<String>,
        permissions: BTreeSet<Permission>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sub,
            email,
            roles,
            permissions,
            exp: expires_at.timestamp(),
        }
    }

    /// Returns whether the snapshot contains the permission.
    #[must_use]
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    /// Returns whether the snapshot contains the administrator role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.roles.contains(ADMIN_ROLE_NAME)
    }

    /// Returns the expiry instant.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Returns whether the credential has expired at the given instant.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    /// Checks the declared requirement against this snapshot.
    ///
    /// This is the non-authoritative client-side check: it exists so the UI
    /// can avoid rendering forbidden surfaces. The holder controls the
    /// environment this runs in, so it must never be treated as a security
    /// boundary; the server guard independently verifies signature, expiry,
    /// and claims on every privileged operation.
    #[must_use]
    pub fn satisfies(&self, requirement: &AccessRequirement) -> bool {
        if requirement.require_admin && !self.is_admin() {
            return false;
        }

        match requirement.required_permission {
            Some(permission) => self.has_permission(permission),
            None => true,
        }
    }
}
