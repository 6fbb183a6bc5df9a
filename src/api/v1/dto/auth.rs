/*
 * Responsibility
 * - /auth 系の request/response DTO
 * - validation (形式チェック) 用の validate()
 */
use serde::{Deserialize, Serialize};

use crate::services::auth::{IssuedTokenPair, Principal};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.username.trim().is_empty() {
            return Err("username is required");
        }
        if self.password.trim().is_empty() {
            return Err("password is required");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

impl From<IssuedTokenPair> for TokenResponse {
    fn from(pair: IssuedTokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PrincipalResponse {
    pub username: String,
    pub authorities: Vec<String>,
}

impl From<Principal> for PrincipalResponse {
    fn from(p: Principal) -> Self {
        Self {
            username: p.username,
            authorities: p.authorities.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_fail_validation() {
        let ok = LoginRequest {
            username: "elio".into(),
            password: "Elio2023".into(),
        };
        assert!(ok.validate().is_ok());

        let no_user = LoginRequest {
            username: "  ".into(),
            password: "x".into(),
        };
        assert_eq!(no_user.validate(), Err("username is required"));

        let no_password = LoginRequest {
            username: "elio".into(),
            password: String::new(),
        };
        assert_eq!(no_password.validate(), Err("password is required"));
    }

    #[test]
    fn debug_never_prints_the_password() {
        let req = LoginRequest {
            username: "elio".into(),
            password: "Elio2023".into(),
        };
        assert!(!format!("{req:?}").contains("Elio2023"));
    }
}
