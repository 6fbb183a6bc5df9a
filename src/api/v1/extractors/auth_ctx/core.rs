use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::services::auth::{Principal, SecurityContext};

/// The request's SecurityContext, taken out of the extensions.
///
/// Empty when the filter did not authenticate anyone (or did not run).
/// Taking it (rather than cloning) leaves exactly one copy for this request.
pub struct CurrentContext(pub SecurityContext);

impl<S> FromRequestParts<S> for CurrentContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentContext(
            parts
                .extensions
                .remove::<SecurityContext>()
                .unwrap_or_default(),
        ))
    }
}

/// Principal of an authenticated request; 401 otherwise.
pub struct Authenticated(pub Principal);

impl Authenticated {
    /// 403 with the access-denied body when `authority` is missing.
    pub fn require(&self, authority: &str, path: &str) -> Result<(), AppError> {
        if self.0.has_authority(authority) {
            Ok(())
        } else {
            tracing::warn!(
                username = %self.0.username,
                authority = %authority,
                path = %path,
                "access denied"
            );
            Err(AppError::access_denied(path))
        }
    }
}

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SecurityContext>()
            .and_then(SecurityContext::principal)
            .cloned()
            .map(Authenticated)
            .ok_or(AppError::Unauthorized)
    }
}
