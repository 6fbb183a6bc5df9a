/*
 * Responsibility
 * - v1 の URL 構造を定義 (/health は app.rs 側)
 * - /auth/{login,refresh,logout} は public (principal 不要)
 * - /me, /admin/ping は handler 側の extractor で 401/403
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::v1::handlers::{
    auth::{login, logout, refresh},
    me::{admin_ping, me},
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/me", get(me))
        .route("/admin/ping", get(admin_ping))
}
