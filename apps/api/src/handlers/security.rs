//! Role and account administration endpoints.

use axum::Json;
use axum::extract::{Extension, Path, State};
use uuid::Uuid;

use nutrack_domain::{CredentialClaims, RoleId, UserId};

use crate::dto::{
    ActiveStateResponse, AssignRoleRequest, EffectivePermissionsResponse, EffectiveRolesResponse,
    OutcomeResponse, RemoveRoleRequest, ReplaceRoleRequest, RoleResponse, SetActiveRequest,
    UserSummaryResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_roles_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<CredentialClaims>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state
        .role_admin_service
        .list_roles(&claims)
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

pub async fn assign_role_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<CredentialClaims>,
    Json(payload): Json<AssignRoleRequest>,
) -> ApiResult<Json<OutcomeResponse>> {
    let outcome = state
        .role_admin_service
        .assign_role(
            &claims,
            UserId::from_uuid(payload.user_id),
            RoleId::from_uuid(payload.role_id),
        )
        .await?;

    Ok(Json(OutcomeResponse {
        outcome: outcome.as_str(),
    }))
}

pub async fn unassign_role_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<CredentialClaims>,
    Json(payload): Json<RemoveRoleRequest>,
) -> ApiResult<Json<OutcomeResponse>> {
    let outcome = state
        .role_admin_service
        .remove_role(
            &claims,
            UserId::from_uuid(payload.user_id),
            RoleId::from_uuid(payload.role_id),
        )
        .await?;

    Ok(Json(OutcomeResponse {
        outcome: outcome.as_str(),
    }))
}

pub async fn replace_role_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<CredentialClaims>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<ReplaceRoleRequest>,
) -> ApiResult<Json<UserSummaryResponse>> {
    let summary = state
        .role_admin_service
        .replace_role(
            &claims,
            UserId::from_uuid(user_id),
            RoleId::from_uuid(payload.role_id),
        )
        .await?;

    Ok(Json(UserSummaryResponse::from(summary)))
}

pub async fn set_active_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<CredentialClaims>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<SetActiveRequest>,
) -> ApiResult<Json<ActiveStateResponse>> {
    let is_active = state
        .role_admin_service
        .toggle_active(&claims, UserId::from_uuid(user_id), payload.is_active)
        .await?;

    Ok(Json(ActiveStateResponse { user_id, is_active }))
}

pub async fn effective_permissions_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<CredentialClaims>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<EffectivePermissionsResponse>> {
    let permissions = state
        .role_admin_service
        .effective_permissions(&claims, UserId::from_uuid(user_id))
        .await?;

    Ok(Json(EffectivePermissionsResponse {
        user_id,
        permissions: permissions
            .iter()
            .map(|permission| permission.as_str().to_owned())
            .collect(),
    }))
}

pub async fn effective_roles_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<CredentialClaims>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<EffectiveRolesResponse>> {
    let roles = state
        .role_admin_service
        .effective_roles(&claims, UserId::from_uuid(user_id))
        .await?;

    Ok(Json(EffectiveRolesResponse { user_id, roles }))
}
