use std::{collections::BTreeSet, sync::Arc};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use tracing::debug;

use crate::services::auth::error::AuthError;
use crate::services::auth::jwt::{JwtKeys, TokenClaims};
use crate::services::auth::principal::Principal;
use crate::services::auth::token_codec::TokenCodec;
use crate::services::clock::Clock;

/// Result of checking a presented token.
///
/// Every expected failure is a variant, not an error, so call sites have to
/// match all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid {
        principal: Principal,
        expires_at: DateTime<Utc>,
    },
    Expired,
    Malformed(&'static str),
    BadSignature,
    UnknownSubject,
}

// Failures that can happen before the expiry check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejected {
    Malformed(&'static str),
    BadSignature,
    UnknownSubject,
}

impl From<Rejected> for ValidationOutcome {
    fn from(r: Rejected) -> Self {
        match r {
            Rejected::Malformed(reason) => ValidationOutcome::Malformed(reason),
            Rejected::BadSignature => ValidationOutcome::BadSignature,
            Rejected::UnknownSubject => ValidationOutcome::UnknownSubject,
        }
    }
}

impl From<Rejected> for AuthError {
    fn from(r: Rejected) -> Self {
        match r {
            Rejected::Malformed(reason) => AuthError::Malformed(reason),
            Rejected::BadSignature => AuthError::BadSignature,
            Rejected::UnknownSubject => AuthError::UnknownSubject,
        }
    }
}

#[derive(Clone)]
pub struct TokenValidator {
    keys: Arc<JwtKeys>,
    codec: TokenCodec,
    clock: Arc<dyn Clock>,
    // Already passed through the codec, as it appears in the payload.
    authorities_claim: String,
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidator").finish_non_exhaustive()
    }
}

impl TokenValidator {
    pub fn new(
        keys: Arc<JwtKeys>,
        codec: TokenCodec,
        clock: Arc<dyn Clock>,
        authorities_key: &str,
    ) -> Self {
        let authorities_claim = codec.encode(authorities_key);
        Self {
            keys,
            codec,
            clock,
            authorities_claim,
        }
    }

    /// Full check: structure, signature, expiry, then principal decoding.
    pub fn parse(&self, token: &str) -> ValidationOutcome {
        let claims = match self.verify_signature(token) {
            Ok(claims) => claims,
            Err(rejected) => return rejected.into(),
        };

        if self.clock.now().timestamp() >= claims.exp {
            return ValidationOutcome::Expired;
        }

        let Some(expires_at) = DateTime::from_timestamp(claims.exp, 0) else {
            return ValidationOutcome::Malformed("invalid expiration");
        };

        match self.principal_from(&claims) {
            Ok(principal) => ValidationOutcome::Valid {
                principal,
                expires_at,
            },
            Err(rejected) => rejected.into(),
        }
    }

    /// Subject of a correctly signed token, without looking at `exp`.
    ///
    /// Used by refresh to find the directory entry before the full check.
    pub fn username_of(&self, token: &str) -> Result<String, AuthError> {
        let claims = self.verify_signature(token)?;
        Ok(self.subject_from(&claims)?)
    }

    /// `true` iff the token is valid right now and names `expected`.
    ///
    /// Only the username is compared; authorities are not re-checked.
    pub fn validate_against_principal(&self, token: &str, expected: &Principal) -> bool {
        match self.parse(token) {
            ValidationOutcome::Valid { principal, .. } => principal.username == expected.username,
            ValidationOutcome::Expired
            | ValidationOutcome::Malformed(_)
            | ValidationOutcome::BadSignature
            | ValidationOutcome::UnknownSubject => false,
        }
    }

    fn verify_signature(&self, token: &str) -> Result<TokenClaims, Rejected> {
        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
            return Err(Rejected::Malformed("wrong segment count"));
        }

        if URL_SAFE_NO_PAD.decode(segments[0]).is_err()
            || URL_SAFE_NO_PAD.decode(segments[1]).is_err()
        {
            return Err(Rejected::Malformed("invalid encoding"));
        }

        self.keys.verify::<TokenClaims>(token).map_err(|e| {
            debug!(error = %e, "token verification failed");
            classify(e.kind())
        })
    }

    fn principal_from(&self, claims: &TokenClaims) -> Result<Principal, Rejected> {
        let username = self.subject_from(claims)?;
        let authorities = self.authorities_from(claims)?;
        Ok(Principal {
            username,
            authorities,
        })
    }

    fn subject_from(&self, claims: &TokenClaims) -> Result<String, Rejected> {
        let username = self
            .codec
            .decode(&claims.sub)
            .map_err(|_| Rejected::Malformed("invalid subject encoding"))?;

        if username.trim().is_empty() {
            return Err(Rejected::UnknownSubject);
        }
        Ok(username)
    }

    fn authorities_from(&self, claims: &TokenClaims) -> Result<BTreeSet<String>, Rejected> {
        let raw = claims
            .extra
            .get(&self.authorities_claim)
            .and_then(serde_json::Value::as_str)
            .ok_or(Rejected::Malformed("missing authorities claim"))?;

        let joined = self
            .codec
            .decode(raw)
            .map_err(|_| Rejected::Malformed("invalid authorities encoding"))?;

        Ok(Principal::split_authorities(&joined))
    }
}

// Header and payload were already decoded, so a base64 failure here can only
// come from the signature segment.
fn classify(kind: &ErrorKind) -> Rejected {
    match kind {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm | ErrorKind::Base64(_) => {
            Rejected::BadSignature
        }
        ErrorKind::Json(_) | ErrorKind::Utf8(_) => Rejected::Malformed("invalid claims"),
        _ => Rejected::Malformed("unverifiable token"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::token_issuer::TokenIssuer;
    use crate::services::clock::ManualClock;
    use chrono::Duration;
    use std::collections::BTreeMap;

    const SECRET: [u8; 32] = [42u8; 32];

    struct Fixture {
        clock: Arc<ManualClock>,
        issuer: TokenIssuer,
        validator: TokenValidator,
    }

    fn fixture_with_ttl(access_ttl: Duration) -> Fixture {
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        let keys = Arc::new(JwtKeys::from_secret(&SECRET));
        let codec = TokenCodec::new("payload-key");
        let issuer = TokenIssuer::new(
            keys.clone(),
            codec.clone(),
            clock.clone(),
            "roles",
            access_ttl,
            Duration::days(30),
        );
        let validator = TokenValidator::new(keys, codec, clock.clone(), "roles");
        Fixture {
            clock,
            issuer,
            validator,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_ttl(Duration::minutes(5))
    }

    fn admin() -> Principal {
        Principal::new("t_admin", ["ROLE_ADMIN"])
    }

    #[test]
    fn issued_token_round_trips_to_the_same_principal() {
        let f = fixture();
        for p in [
            admin(),
            Principal::new("elio", ["ROLE_USER", "ROLE_ADMIN"]),
            Principal::new("no-roles", Vec::<String>::new()),
            Principal::new("padded", ["ROLE_A ", " ROLE_B"]),
        ] {
            let token = f.issuer.issue_access_token(&p).unwrap();
            match f.validator.parse(&token) {
                ValidationOutcome::Valid {
                    principal,
                    expires_at,
                } => {
                    assert_eq!(principal, p);
                    assert_eq!(expires_at.timestamp(), 1_700_000_000 + 300);
                }
                other => panic!("expected Valid, got {other:?}"),
            }
        }
    }

    #[test]
    fn access_token_expires_after_its_window() {
        let f = fixture();
        let token = f.issuer.issue_access_token(&admin()).unwrap();

        assert!(matches!(
            f.validator.parse(&token),
            ValidationOutcome::Valid { .. }
        ));

        f.clock.advance(Duration::minutes(5) + Duration::seconds(1));
        assert_eq!(f.validator.parse(&token), ValidationOutcome::Expired);
    }

    #[test]
    fn token_expiring_one_second_ago_is_expired() {
        let f = fixture_with_ttl(Duration::seconds(-1));
        let token = f.issuer.issue_access_token(&admin()).unwrap();

        assert_eq!(f.validator.parse(&token), ValidationOutcome::Expired);
    }

    #[test]
    fn token_is_expired_at_its_exact_expiry_second() {
        let f = fixture();
        let token = f.issuer.issue_access_token(&admin()).unwrap();

        f.clock.advance(Duration::minutes(5));
        assert_eq!(f.validator.parse(&token), ValidationOutcome::Expired);
    }

    #[test]
    fn mutating_any_signature_character_is_bad_signature() {
        let f = fixture();
        let token = f.issuer.issue_access_token(&admin()).unwrap();
        let sig_start = token.rfind('.').unwrap() + 1;

        for i in sig_start..token.len() {
            let mut bytes = token.clone().into_bytes();
            bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
            let mutated = String::from_utf8(bytes).unwrap();

            assert_eq!(
                f.validator.parse(&mutated),
                ValidationOutcome::BadSignature,
                "mutation at {i}"
            );
        }
    }

    #[test]
    fn wrong_segment_count_is_malformed() {
        let f = fixture();
        let token = f.issuer.issue_access_token(&admin()).unwrap();
        let two_segments = &token[..token.rfind('.').unwrap()];

        for bad in ["", "abc", two_segments, "a.b.c.d", "a..c"] {
            assert_eq!(
                f.validator.parse(bad),
                ValidationOutcome::Malformed("wrong segment count"),
                "{bad}"
            );
        }
    }

    #[test]
    fn undecodable_payload_is_malformed() {
        let f = fixture();
        assert_eq!(
            f.validator.parse("eyJhbGciOiJIUzI1NiJ9.%%%%.c2ln"),
            ValidationOutcome::Malformed("invalid encoding")
        );
    }

    #[test]
    fn token_signed_with_another_key_is_bad_signature() {
        let f = fixture();
        let other = TokenIssuer::new(
            Arc::new(JwtKeys::from_secret(&[1u8; 32])),
            TokenCodec::new("payload-key"),
            f.clock.clone(),
            "roles",
            Duration::minutes(5),
            Duration::days(30),
        );
        let token = other.issue_access_token(&admin()).unwrap();

        assert_eq!(f.validator.parse(&token), ValidationOutcome::BadSignature);
        assert!(matches!(
            f.validator.username_of(&token),
            Err(AuthError::BadSignature)
        ));
    }

    #[test]
    fn claims_not_produced_by_the_codec_are_malformed() {
        let f = fixture();
        let keys = JwtKeys::from_secret(&SECRET);
        let claims = TokenClaims {
            sub: "dF9hZG1pbg==".to_string(), // plain "t_admin", no payload key
            iat: 1_700_000_000,
            exp: 1_700_000_300,
            extra: BTreeMap::new(),
        };
        let token = keys.sign(&claims).unwrap();

        assert_eq!(
            f.validator.parse(&token),
            ValidationOutcome::Malformed("invalid subject encoding")
        );
    }

    #[test]
    fn blank_subject_is_unknown_subject() {
        let f = fixture();
        let token = f
            .issuer
            .issue_access_token(&Principal::new("", ["ROLE_USER"]))
            .unwrap();

        assert_eq!(f.validator.parse(&token), ValidationOutcome::UnknownSubject);
        assert!(matches!(
            f.validator.username_of(&token),
            Err(AuthError::UnknownSubject)
        ));
    }

    #[test]
    fn username_of_ignores_expiry_but_not_structure() {
        let f = fixture();
        let token = f.issuer.issue_access_token(&admin()).unwrap();
        f.clock.advance(Duration::hours(1));

        assert_eq!(f.validator.username_of(&token).unwrap(), "t_admin");
        assert!(matches!(
            f.validator.username_of("only.two"),
            Err(AuthError::Malformed("wrong segment count"))
        ));
    }

    #[test]
    fn validate_against_principal_checks_username_and_expiry() {
        let f = fixture();
        let token = f.issuer.issue_access_token(&admin()).unwrap();

        assert!(f.validator.validate_against_principal(&token, &admin()));
        // Authorities are deliberately not compared.
        assert!(
            f.validator
                .validate_against_principal(&token, &Principal::new("t_admin", ["ROLE_USER"]))
        );
        assert!(
            !f.validator
                .validate_against_principal(&token, &Principal::new("renamed", ["ROLE_ADMIN"]))
        );

        f.clock.advance(Duration::minutes(6));
        assert!(!f.validator.validate_against_principal(&token, &admin()));
    }
}
