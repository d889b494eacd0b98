//! Signed access tokens (HS256 JWT).

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use accounts_core::{UserId, UserRole};

/// Errors from issuing or decoding tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Signature mismatch, malformed structure or past expiry.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Claim set carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: UserId,
    /// Role at issuance
    pub role: UserRole,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Login response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
}

impl AccessToken {
    #[must_use]
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_owned(),
        }
    }
}

/// Issues and verifies access tokens with a process-wide secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Create an issuer signing with `secret`; tokens expire after `ttl`.
    #[must_use]
    pub fn new(secret: &SecretString, ttl: Duration) -> Self {
        let key = secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            validation,
            ttl,
        }
    }

    /// Sign a token for `user_id` carrying `role`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue(&self, user_id: UserId, role: UserRole) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature and expiry and return the claims.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::InvalidToken` on any verification failure.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| TokenError::InvalidToken(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn issuer(secret: &str) -> TokenIssuer {
        TokenIssuer::new(&SecretString::from(secret), Duration::minutes(30))
    }

    #[test]
    fn test_issue_and_decode() {
        let tokens = issuer("k3Y!for-signing-access-tokens-2024");
        let user_id = UserId::new_v4();

        let token = tokens.issue(user_id, UserRole::Authenticated).unwrap();
        let claims = tokens.decode(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, UserRole::Authenticated);
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[test]
    fn test_rejects_other_secret() {
        let token = issuer("k3Y!for-signing-access-tokens-2024")
            .issue(UserId::new_v4(), UserRole::Admin)
            .unwrap();

        assert!(matches!(
            issuer("another-K3y!-entirely-different-99").decode(&token),
            Err(TokenError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_rejects_expired() {
        let tokens = issuer("k3Y!for-signing-access-tokens-2024");
        let now = Utc::now().timestamp();
        let expired = tokens
            .sign(&Claims {
                sub: UserId::new_v4(),
                role: UserRole::Authenticated,
                iat: now - 120,
                exp: now - 60,
            })
            .unwrap();

        assert!(matches!(
            tokens.decode(&expired),
            Err(TokenError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_rejects_garbage() {
        let tokens = issuer("k3Y!for-signing-access-tokens-2024");
        assert!(tokens.decode("not.a.token").is_err());
        assert!(tokens.decode("").is_err());
    }
}
