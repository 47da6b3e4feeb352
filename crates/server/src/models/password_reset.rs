//! Password reset token model.
//!
//! Tokens are random, stored only as SHA-256 hashes, expire after one
//! hour, and are single use.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

/// Password reset token validity period (1 hour).
const TOKEN_VALIDITY_HOURS: i64 = 1;

/// Password reset token record.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PasswordResetToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PasswordResetToken {
    /// Create a new reset token for a user.
    ///
    /// Returns (record, plain_token); only the plain token is sent to the
    /// user, only the hash is stored.
    pub async fn create(pool: &PgPool, user_id: Uuid) -> Result<(Self, String)> {
        let plain_token = generate_token();
        let token_hash = hash_token(&plain_token);

        let id = Uuid::now_v7();
        let expires_at = Utc::now() + Duration::hours(TOKEN_VALIDITY_HOURS);

        let record = sqlx::query_as::<_, PasswordResetToken>(
            r#"
            INSERT INTO password_reset_tokens (id, user_id, token_hash, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(&token_hash)
        .bind(expires_at)
        .fetch_one(pool)
        .await
        .context("failed to create password reset token")?;

        Ok((record, plain_token))
    }

    /// Find a valid token by its plain text value.
    ///
    /// Returns None if the token doesn't exist, is expired, or was used.
    pub async fn find_valid(pool: &PgPool, plain_token: &str) -> Result<Option<Self>> {
        let token_hash = hash_token(plain_token);

        let token = sqlx::query_as::<_, PasswordResetToken>(
            r#"
            SELECT * FROM password_reset_tokens
            WHERE token_hash = $1
              AND expires_at > NOW()
              AND used_at IS NULL
            "#,
        )
        .bind(&token_hash)
        .fetch_optional(pool)
        .await
        .context("failed to find password reset token")?;

        Ok(token)
    }

    /// Mark a token as used.
    pub async fn mark_used(pool: &PgPool, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE password_reset_tokens SET used_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("failed to mark token as used")?;

        Ok(())
    }

    /// Invalidate all outstanding tokens for a user (after password change).
    pub async fn invalidate_for_user(pool: &PgPool, user_id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE password_reset_tokens SET used_at = NOW() WHERE user_id = $1 AND used_at IS NULL",
        )
        .bind(user_id)
        .execute(pool)
        .await
        .context("failed to invalidate user tokens")?;

        Ok(())
    }
}

/// Generate a secure random token.
fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// Hash a token for storage.
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_unique_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn token_hash_is_stable_and_distinct() {
        let token = "abc123";
        assert_eq!(hash_token(token), hash_token(token));
        assert_ne!(hash_token(token), hash_token("abc124"));
        assert_ne!(hash_token(token), token);
    }
}
