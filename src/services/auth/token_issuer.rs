use std::{collections::BTreeMap, sync::Arc};

use chrono::Duration;
use tracing::debug;

use crate::services::auth::error::AuthError;
use crate::services::auth::jwt::{JwtKeys, TokenClaims};
use crate::services::auth::principal::Principal;
use crate::services::auth::token_codec::TokenCodec;
use crate::services::clock::Clock;

/// Builds and signs access / refresh tokens.
///
/// Both flavors carry the same claims; only `exp - iat` differs. No `jti` or
/// other random input is added, so the output depends only on the principal
/// and the clock.
#[derive(Clone)]
pub struct TokenIssuer {
    keys: Arc<JwtKeys>,
    codec: TokenCodec,
    clock: Arc<dyn Clock>,
    authorities_key: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(
        keys: Arc<JwtKeys>,
        codec: TokenCodec,
        clock: Arc<dyn Clock>,
        authorities_key: impl Into<String>,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            keys,
            codec,
            clock,
            authorities_key: authorities_key.into(),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn issue_access_token(&self, principal: &Principal) -> Result<String, AuthError> {
        self.issue(principal, self.access_ttl)
    }

    pub fn issue_refresh_token(&self, principal: &Principal) -> Result<String, AuthError> {
        self.issue(principal, self.refresh_ttl)
    }

    fn issue(&self, principal: &Principal, ttl: Duration) -> Result<String, AuthError> {
        let iat = self.clock.now().timestamp();
        let exp = iat + ttl.num_seconds();

        let mut extra = BTreeMap::new();
        extra.insert(
            self.codec.encode(&self.authorities_key),
            serde_json::Value::String(self.codec.encode(&principal.joined_authorities())),
        );

        let claims = TokenClaims {
            sub: self.codec.encode(&principal.username),
            iat,
            exp,
            extra,
        };

        debug!(username = %principal.username, iat, exp, "issuing token");

        self.keys.sign(&claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::clock::ManualClock;
    use chrono::DateTime;

    fn issuer(clock: Arc<ManualClock>) -> TokenIssuer {
        TokenIssuer::new(
            Arc::new(JwtKeys::from_secret(&[7u8; 32])),
            TokenCodec::new("payload-key"),
            clock,
            "roles",
            Duration::minutes(5),
            Duration::days(30),
        )
    }

    #[test]
    fn tokens_are_deterministic_for_the_same_instant() {
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        let issuer = issuer(clock);
        let p = Principal::new("t_admin", ["ROLE_ADMIN"]);

        assert_eq!(
            issuer.issue_access_token(&p).unwrap(),
            issuer.issue_access_token(&p).unwrap()
        );
    }

    #[test]
    fn access_and_refresh_differ_only_in_expiry() {
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        let issuer = issuer(clock);
        let p = Principal::new("t_admin", ["ROLE_ADMIN"]);

        let access = issuer.issue_access_token(&p).unwrap();
        let refresh = issuer.issue_refresh_token(&p).unwrap();
        assert_ne!(access, refresh);

        let keys = JwtKeys::from_secret(&[7u8; 32]);
        let a: TokenClaims = keys.verify(&access).unwrap();
        let r: TokenClaims = keys.verify(&refresh).unwrap();

        assert_eq!(a.sub, r.sub);
        assert_eq!(a.extra, r.extra);
        assert_eq!(a.iat, 1_700_000_000);
        assert_eq!(a.exp - a.iat, 300);
        assert_eq!(r.exp - r.iat, 30 * 24 * 3600);
    }

    #[test]
    fn payload_does_not_carry_plain_username_or_roles() {
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        let issuer = issuer(clock);
        let token = issuer
            .issue_access_token(&Principal::new("t_admin", ["ROLE_ADMIN"]))
            .unwrap();

        let keys = JwtKeys::from_secret(&[7u8; 32]);
        let claims: TokenClaims = keys.verify(&token).unwrap();
        let json = serde_json::to_string(&claims).unwrap();

        assert!(!json.contains("t_admin"));
        assert!(!json.contains("ROLE_ADMIN"));
        assert!(!json.contains("\"roles\""));
    }
}
