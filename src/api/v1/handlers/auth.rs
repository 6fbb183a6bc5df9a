use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};

use crate::api::v1::dto::auth::{LoginRequest, MessageResponse, TokenResponse};
use crate::api::v1::extractors::CurrentContext;
use crate::error::AppError;
use crate::state::AppState;

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    CurrentContext(mut ctx): CurrentContext,
    Json(req): Json<LoginRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), AppError> {
    req.validate()
        .map_err(|msg| AppError::bad_request("VALIDATION_ERROR", msg))?;

    let pair = state
        .auth
        .login(&mut ctx, &req.username, &req.password)
        .await?;

    Ok((StatusCode::OK, Json(pair.into())))
}

/// POST /api/v1/auth/refresh
///
/// The refresh token travels in the same header (and with the same prefix)
/// as access tokens.
pub async fn refresh(
    State(state): State<AppState>,
    CurrentContext(mut ctx): CurrentContext,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<TokenResponse>), AppError> {
    let header_value = headers
        .get(&state.bearer.header_name)
        .and_then(|v| v.to_str().ok());

    let pair = state.auth.refresh(&mut ctx, header_value).await?;

    Ok((StatusCode::OK, Json(pair.into())))
}

/// POST /api/v1/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    CurrentContext(mut ctx): CurrentContext,
) -> (StatusCode, Json<MessageResponse>) {
    state.auth.logout(&mut ctx);
    (
        StatusCode::OK,
        Json(MessageResponse::new("Logout successfully.")),
    )
}
