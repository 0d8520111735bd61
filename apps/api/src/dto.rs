//! Request and response payloads.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use nutrack_application::{IssuedCredential, UserSummary};
use nutrack_domain::{CredentialClaims, Role};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct CredentialResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub roles: BTreeSet<String>,
    pub permissions: BTreeSet<String>,
}

impl From<IssuedCredential> for CredentialResponse {
    fn from(issued: IssuedCredential) -> Self {
        Self {
            token: issued.token,
            expires_at: issued.claims.expires_at(),
            roles: issued.claims.roles,
            permissions: issued
                .claims
                .permissions
                .iter()
                .map(|permission| permission.as_str().to_owned())
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: Uuid,
    pub email: String,
    pub roles: BTreeSet<String>,
    pub permissions: BTreeSet<String>,
    pub expires_at: DateTime<Utc>,
}

impl From<CredentialClaims> for MeResponse {
    fn from(claims: CredentialClaims) -> Self {
        Self {
            user_id: claims.sub.as_uuid(),
            expires_at: claims.expires_at(),
            email: claims.email,
            roles: claims.roles,
            permissions: claims
                .permissions
                .iter()
                .map(|permission| permission.as_str().to_owned())
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub user_id: Uuid,
    pub role_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct RemoveRoleRequest {
    pub user_id: Uuid,
    pub role_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceRoleRequest {
    pub role_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct OutcomeResponse {
    pub outcome: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ActiveStateResponse {
    pub user_id: Uuid,
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

impl From<Role> for RoleResponse {
    fn from(role: Role) -> Self {
        Self {
            id: role.id.as_uuid(),
            name: role.name,
            description: role.description,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserSummaryResponse {
    pub user_id: Uuid,
    pub email: String,
    pub is_active: bool,
    pub roles: BTreeSet<String>,
}

impl From<UserSummary> for UserSummaryResponse {
    fn from(summary: UserSummary) -> Self {
        Self {
            user_id: summary.user_id.as_uuid(),
            email: summary.email,
            is_active: summary.is_active,
            roles: summary.roles,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EffectivePermissionsResponse {
    pub user_id: Uuid,
    pub permissions: BTreeSet<String>,
}

#[derive(Debug, Serialize)]
pub struct EffectiveRolesResponse {
    pub user_id: Uuid,
    pub roles: BTreeSet<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisteredResponse {
    pub user_id: Uuid,
}
