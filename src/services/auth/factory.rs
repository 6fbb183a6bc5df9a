/// Factory: build the token layer and the login/refresh/logout service from `JwtSettings`.
use std::sync::Arc;

use crate::config::JwtSettings;
use crate::repos::user_directory::UserDirectory;
use crate::services::auth::{
    authenticator::DirectoryAuthenticator, jwt::JwtKeys, password::PasswordHasher,
    token_codec::TokenCodec, token_issuer::TokenIssuer, token_service::TokenService,
    token_validator::TokenValidator,
};
use crate::services::clock::Clock;

/// Shared, read-only auth components handed to `AppState`.
#[derive(Clone)]
pub struct AuthComponents {
    pub service: Arc<TokenService>,
    pub validator: Arc<TokenValidator>,
}

pub fn build_auth_components(
    settings: &JwtSettings,
    directory: Arc<dyn UserDirectory>,
    hasher: Arc<dyn PasswordHasher>,
    clock: Arc<dyn Clock>,
) -> AuthComponents {
    let keys = Arc::new(JwtKeys::from_secret(&settings.signing_key));
    let codec = TokenCodec::new(settings.payload_key.clone());

    let issuer = TokenIssuer::new(
        keys.clone(),
        codec.clone(),
        clock.clone(),
        settings.authorities_key.clone(),
        settings.access_ttl,
        settings.refresh_ttl,
    );
    let validator = Arc::new(TokenValidator::new(
        keys,
        codec,
        clock,
        &settings.authorities_key,
    ));
    let authenticator = Arc::new(DirectoryAuthenticator::new(directory.clone(), hasher));

    let service = Arc::new(TokenService::new(
        issuer,
        validator.clone(),
        authenticator,
        directory,
        settings.token_prefix.clone(),
    ));

    AuthComponents { service, validator }
}
