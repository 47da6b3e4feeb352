//! JWT issuing and verification.
//!
//! HMAC-SHA256 signed tokens carrying the user id as subject. The secret
//! comes from configuration and must be at least 32 bytes.

use anyhow::{Context, Result};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

/// JWT issuer claim value.
const ISSUER: &str = "campdir";

/// JWT token claims.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TokenClaims {
    /// Issuer.
    pub iss: String,
    /// Subject (user ID).
    pub sub: String,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
}

/// Token signing/verification service.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime_seconds: i64,
}

impl TokenService {
    /// Create a token service with HMAC-SHA256 signing.
    pub fn new(secret: &[u8], lifetime_days: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            lifetime_seconds: lifetime_days * 86_400,
        }
    }

    /// Token lifetime in seconds (drives the cookie max-age too).
    pub fn lifetime_seconds(&self) -> i64 {
        self.lifetime_seconds
    }

    /// Issue a signed token for a user.
    pub fn issue(&self, user_id: Uuid) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = TokenClaims {
            iss: ISSUER.to_string(),
            sub: user_id.to_string(),
            iat: now,
            exp: now + self.lifetime_seconds,
        };

        let header = Header::new(Algorithm::HS256);
        jsonwebtoken::encode(&header, &claims, &self.encoding_key)
            .context("failed to encode token")
    }

    /// Verify a token's signature, expiry, and issuer; return its claims.
    pub fn verify(&self, token: &str) -> Result<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);

        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .context("invalid token")?;

        Ok(data.claims)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(b"0123456789abcdef0123456789abcdef", 30)
    }

    #[test]
    fn issue_and_verify_round_trip() {
        let svc = service();
        let user_id = Uuid::now_v7();

        let token = svc.issue(user_id).unwrap();
        let claims = svc.verify(&token).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.iss, "campdir");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let svc = service();
        let token = svc.issue(Uuid::now_v7()).unwrap();

        let mut tampered = token.clone();
        tampered.pop();
        tampered.push(if token.ends_with('a') { 'b' } else { 'a' });

        assert!(svc.verify(&tampered).is_err());
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let svc = service();
        let other = TokenService::new(b"ffffffffffffffffffffffffffffffff", 30);

        let token = other.issue(Uuid::now_v7()).unwrap();
        assert!(svc.verify(&token).is_err());
    }
}
