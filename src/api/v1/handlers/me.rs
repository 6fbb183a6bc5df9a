use axum::{Json, extract::OriginalUri};
use serde_json::{Value, json};

use crate::api::v1::dto::auth::PrincipalResponse;
use crate::api::v1::extractors::Authenticated;
use crate::error::AppError;

pub const ADMIN_AUTHORITY: &str = "ROLE_ADMIN";

/// GET /api/v1/me: the principal the filter installed.
pub async fn me(Authenticated(principal): Authenticated) -> Json<PrincipalResponse> {
    Json(principal.into())
}

/// GET /api/v1/admin/ping: requires ROLE_ADMIN.
pub async fn admin_ping(
    user: Authenticated,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<Value>, AppError> {
    user.require(ADMIN_AUTHORITY, uri.path())?;
    Ok(Json(json!({ "status": "pong" })))
}
