// src/services/token_issuer.rs
//! Session token issuance for verified WebApp users.
//!
//! After a credential passes verification the API can hand the client a
//! short-lived HS256 JWT so follow-up requests do not need to re-present
//! `initData`. Issuance is a single signing call; there is no refresh,
//! revocation or persistence.

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};

/// Default session token lifetime in seconds (1 hour).
pub const DEFAULT_TTL_SECS: i64 = 3600;

/// Claims carried by a session token.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SessionClaims {
    /// Subject: the verified user's id.
    pub sub: String,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

/// Issues HS256-signed session tokens.
#[derive(Debug, Clone)]
pub struct SessionTokenIssuer {
    signing_secret: String,
}

impl SessionTokenIssuer {
    pub fn new(signing_secret: &str) -> Self {
        Self {
            signing_secret: signing_secret.to_string(),
        }
    }

    /// Issues a token for `subject` valid for [`DEFAULT_TTL_SECS`] from now.
    pub fn issue(&self, subject: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        self.issue_at(subject, now, now + DEFAULT_TTL_SECS)
    }

    /// Issues a token with explicit issued-at and expiry timestamps.
    pub fn issue_at(
        &self,
        subject: &str,
        issued_at: i64,
        expires_at: i64,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = SessionClaims {
            sub: subject.to_string(),
            iat: issued_at,
            exp: expires_at,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.signing_secret.as_bytes()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    fn decode_claims(token: &str, secret: &str) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
        decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
    }

    #[test]
    fn test_issue_round_trips_claims() {
        let issuer = SessionTokenIssuer::new("session-secret");
        let token = issuer.issue("12345").unwrap();

        let claims = decode_claims(&token, "session-secret").unwrap();
        assert_eq!(claims.sub, "12345");
        assert_eq!(claims.exp - claims.iat, DEFAULT_TTL_SECS);
    }

    #[test]
    fn test_issue_at_uses_explicit_timestamps() {
        let issuer = SessionTokenIssuer::new("session-secret");
        let now = Utc::now().timestamp();
        let token = issuer.issue_at("7", now, now + 120).unwrap();

        let claims = decode_claims(&token, "session-secret").unwrap();
        assert_eq!(claims.iat, now);
        assert_eq!(claims.exp, now + 120);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let issuer = SessionTokenIssuer::new("session-secret");
        let token = issuer.issue("12345").unwrap();
        assert!(decode_claims(&token, "other-secret").is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let issuer = SessionTokenIssuer::new("session-secret");
        let stale = Utc::now().timestamp() - 2 * DEFAULT_TTL_SECS;
        let token = issuer
            .issue_at("12345", stale, stale + DEFAULT_TTL_SECS)
            .unwrap();
        assert!(decode_claims(&token, "session-secret").is_err());
    }
}
