use thiserror::Error;

use crate::repos::error::RepoError;

/// Failures of the login / refresh / token flows.
///
/// Everything here is recoverable per request; the HTTP mapping lives in
/// `crate::error`.
#[derive(Debug, Error)]
pub enum AuthError {
    // Same text for unknown user and wrong password.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("couldn't find bearer string")]
    MissingBearer,

    #[error("malformed token: {0}")]
    Malformed(&'static str),

    #[error("token signature does not match")]
    BadSignature,

    #[error("token has expired")]
    Expired,

    #[error("token subject is unknown")]
    UnknownSubject,

    #[error("this is not a valid token")]
    InvalidToken,

    #[error("failed to sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("user directory unavailable")]
    Directory(#[from] RepoError),
}
