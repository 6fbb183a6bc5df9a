use std::sync::Arc;

use tracing::{info, warn};

use crate::repos::user_directory::UserDirectory;
use crate::services::auth::{
    authenticator::Authenticator, context::SecurityContext, error::AuthError,
    token_issuer::TokenIssuer, token_validator::TokenValidator,
};

/// Service that orchestrates login, refresh and logout.
///
/// - Authenticator checks credentials (directory + password hash).
/// - TokenIssuer mints access/refresh tokens.
/// - TokenValidator checks presented refresh tokens.
///
/// Nothing is stored server-side; the SecurityContext is owned by the request.
#[derive(Clone)]
pub struct TokenService {
    issuer: TokenIssuer,
    validator: Arc<TokenValidator>,
    authenticator: Arc<dyn Authenticator>,
    directory: Arc<dyn UserDirectory>,
    token_prefix: String,
}

impl TokenService {
    pub fn new(
        issuer: TokenIssuer,
        validator: Arc<TokenValidator>,
        authenticator: Arc<dyn Authenticator>,
        directory: Arc<dyn UserDirectory>,
        token_prefix: impl Into<String>,
    ) -> Self {
        Self {
            issuer,
            validator,
            authenticator,
            directory,
            token_prefix: token_prefix.into(),
        }
    }

    /// Verify credentials, install the principal and issue both tokens.
    pub async fn login(
        &self,
        ctx: &mut SecurityContext,
        username: &str,
        password: &str,
    ) -> Result<IssuedTokenPair, AuthError> {
        let principal = self
            .authenticator
            .verify(username, password)
            .await
            .inspect_err(|e| warn!(error = %e, "login failed"))?;

        let access_token = self.issuer.issue_access_token(&principal)?;
        let refresh_token = self.issuer.issue_refresh_token(&principal)?;

        info!(username = %principal.username, "login succeeded");
        ctx.set(principal);

        Ok(IssuedTokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Refresh an access token using the refresh token in `header_value`.
    ///
    /// - `header_value` must be `<prefix><refresh token>`
    /// - the token's subject must still exist in the directory
    /// - the token must be valid now and name that user
    /// - returns a new access token and the SAME refresh token (no rotation)
    pub async fn refresh(
        &self,
        ctx: &mut SecurityContext,
        header_value: Option<&str>,
    ) -> Result<IssuedTokenPair, AuthError> {
        let refresh_token = header_value
            .and_then(|v| v.strip_prefix(self.token_prefix.as_str()))
            .ok_or(AuthError::MissingBearer)?;

        let username = self
            .validator
            .username_of(refresh_token)
            .inspect_err(|e| warn!(error = %e, "refresh token rejected"))?;

        let current = self
            .directory
            .find_by_username(&username)
            .await?
            .ok_or_else(|| {
                warn!(username = %username, "refresh token subject not found in directory");
                AuthError::UnknownSubject
            })?
            .principal();

        if !self
            .validator
            .validate_against_principal(refresh_token, &current)
        {
            warn!(username = %username, "refresh token failed validation");
            return Err(AuthError::InvalidToken);
        }

        // The filter normally installed the principal from this same token.
        let principal = match ctx.principal() {
            Some(p) => p.clone(),
            None => current,
        };
        ctx.install(principal.clone());

        let access_token = self.issuer.issue_access_token(&principal)?;
        info!(username = %principal.username, "access token refreshed");

        Ok(IssuedTokenPair {
            access_token,
            refresh_token: refresh_token.to_string(),
        })
    }

    /// Clear the request's security context. Always succeeds.
    pub fn logout(&self, ctx: &mut SecurityContext) {
        if let Some(p) = ctx.principal() {
            info!(username = %p.username, "logout");
        }
        ctx.clear();
    }
}

/// Service-level return type to keep handlers thin.
///
/// Handlers map this into the HTTP DTO (TokenResponse).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedTokenPair {
    pub access_token: String,
    pub refresh_token: String,
}
