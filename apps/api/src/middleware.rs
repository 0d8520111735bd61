use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use nutrack_core::AppError;

use crate::error::ApiResult;
use crate::state::AppState;

/// Verifies the bearer credential and attaches its claims to the request.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;

    let claims = state.authorization_gate.authenticate(token)?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
