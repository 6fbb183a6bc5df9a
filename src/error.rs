/*
 * Responsibility
 * - アプリ共通の AppError 定義
 * - IntoResponse 実装 (HTTP status / JSON error body)
 * - AuthError を HTTP の契約に合わせて変換
 *   - MissingBearer / Malformed / BadSignature / InvalidToken -> 400
 *   - UnknownSubject -> 404
 *   - InvalidCredentials -> 401
 *   - Expired -> 403 { "token": "expired" }
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::services::auth::AuthError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

/// Body of the 403 returned when an authenticated principal lacks an authority.
#[derive(Debug, Serialize)]
pub struct AccessDeniedBody {
    pub timestamp: String,
    #[serde(rename = "statusValue")]
    pub status_value: u16,
    pub message: &'static str,
    pub path: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{code}: {message}")]
    BadRequest { code: &'static str, message: String },
    #[error("Unauthorized")]
    Unauthorized,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("access denied: {path}")]
    AccessDenied { path: String },
    #[error("token expired")]
    TokenExpired,
    #[error("not found: {resource}")]
    NotFound { resource: &'static str },
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &'static str) -> Self {
        Self::NotFound { resource }
    }

    pub fn access_denied(path: impl Into<String>) -> Self {
        Self::AccessDenied { path: path.into() }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::BadRequest { code, message } => (StatusCode::BAD_REQUEST, code, message),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Unauthorized".into(),
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "invalid username or password".into(),
            ),
            AppError::AccessDenied { path } => {
                let body = AccessDeniedBody {
                    timestamp: Utc::now().to_rfc3339(),
                    status_value: StatusCode::FORBIDDEN.as_u16(),
                    message: "Access Denied, login again!",
                    path,
                };
                return (StatusCode::FORBIDDEN, Json(body)).into_response();
            }
            AppError::TokenExpired => {
                return (StatusCode::FORBIDDEN, Json(json!({ "token": "expired" })))
                    .into_response();
            }
            AppError::NotFound { resource } => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("{resource} not found."),
            ),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "internal server error".into(),
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => AppError::InvalidCredentials,
            AuthError::MissingBearer => AppError::bad_request("MISSING_BEARER", e.to_string()),
            AuthError::Malformed(_) => AppError::bad_request("MALFORMED_TOKEN", e.to_string()),
            AuthError::BadSignature => AppError::bad_request("BAD_SIGNATURE", e.to_string()),
            AuthError::InvalidToken => AppError::bad_request("INVALID_TOKEN", e.to_string()),
            AuthError::UnknownSubject => AppError::not_found("user"),
            AuthError::Expired => AppError::TokenExpired,
            AuthError::Signing(_) | AuthError::Directory(_) => {
                error!(error = ?e, "auth flow failed");
                AppError::Internal
            }
        }
    }
}
