//! Bearer token issuance and verification
//!
//! Tokens are HS256 JWTs signed with the shared `JWT_SECRET`. The `uid`
//! claim is the account identifier assigned by the identity provider.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use toolgate_types::AccountId;

/// Token verification errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AuthError {
    /// Malformed token or bad signature
    #[error("invalid token")]
    InvalidToken,

    /// Token has expired
    #[error("token expired")]
    TokenExpired,

    /// Token could not be signed
    #[error("signing failed: {0}")]
    Signing(String),
}

/// Claims carried by a bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account identifier
    pub uid: String,
    /// Account email
    pub email: String,
    /// Issued at (seconds since epoch)
    pub iat: i64,
    /// Expiration (seconds since epoch)
    pub exp: i64,
}

impl Claims {
    /// Claims for `uid` valid for `ttl` from now
    pub fn new(uid: impl Into<String>, email: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now().timestamp();
        Self {
            uid: uid.into(),
            email: email.into(),
            iat: now,
            exp: now.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)),
        }
    }

    /// Account the token was issued for
    pub fn account_id(&self) -> AccountId {
        AccountId::from(self.uid.as_str())
    }
}

/// Signs and verifies bearer tokens
pub struct TokenVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenVerifier {
    /// Create a verifier for `secret`
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "iat"]);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    /// Issue a token for an account
    pub fn issue(&self, account_id: &AccountId, email: &str) -> Result<String, AuthError> {
        self.sign(&Claims::new(account_id.as_str(), email, self.ttl))
    }

    /// Sign arbitrary claims
    pub fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Verify a token and return its claims
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!("Token validation failed: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            }
        })?;

        if data.claims.uid.is_empty() {
            return Err(AuthError::InvalidToken);
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-that-is-at-least-32-bytes!!";

    fn verifier() -> TokenVerifier {
        TokenVerifier::new(SECRET, Duration::from_secs(3600))
    }

    #[test]
    fn test_issue_and_verify() {
        let verifier = verifier();
        let account = AccountId::from("acct-1");

        let token = verifier.issue(&account, "dev@example.com").unwrap();
        let claims = verifier.verify(&token).unwrap();

        assert_eq!(claims.account_id(), account);
        assert_eq!(claims.email, "dev@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_expired_token() {
        let verifier = verifier();
        let now = Utc::now().timestamp();
        let claims = Claims {
            uid: "acct-1".to_string(),
            email: "dev@example.com".to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = verifier.sign(&claims).unwrap();

        assert_eq!(verifier.verify(&token), Err(AuthError::TokenExpired));
    }

    #[test]
    fn test_wrong_secret() {
        let token = verifier().issue(&AccountId::from("acct-1"), "a@b.c").unwrap();
        let other = TokenVerifier::new(b"another-secret-of-sufficient-length!!", Duration::from_secs(60));

        assert_eq!(other.verify(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_garbage_token() {
        assert_eq!(verifier().verify("not.a.jwt"), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_empty_uid_rejected() {
        let verifier = verifier();
        let token = verifier
            .sign(&Claims::new("", "a@b.c", Duration::from_secs(60)))
            .unwrap();

        assert_eq!(verifier.verify(&token), Err(AuthError::InvalidToken));
    }
}
