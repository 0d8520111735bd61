//! Authentication endpoints.

use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;

use nutrack_domain::CredentialClaims;

use crate::dto::{
    CredentialResponse, LoginRequest, MeResponse, RefreshRequest, RegisterRequest,
    RegisteredResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn register_handler(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisteredResponse>)> {
    let user_id = state
        .user_service
        .register(payload.email.as_str(), payload.password.as_str())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisteredResponse {
            user_id: user_id.as_uuid(),
        }),
    ))
}

pub async fn login_handler(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<CredentialResponse>> {
    let issued = state
        .user_service
        .login(payload.email.as_str(), payload.password.as_str())
        .await?;

    Ok(Json(CredentialResponse::from(issued)))
}

pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<Json<CredentialResponse>> {
    let issued = state
        .credential_service
        .refresh(payload.token.as_str())
        .await?;

    Ok(Json(CredentialResponse::from(issued)))
}

pub async fn me_handler(
    Extension(claims): Extension<CredentialClaims>,
) -> ApiResult<Json<MeResponse>> {
    Ok(Json(MeResponse::from(claims)))
}
