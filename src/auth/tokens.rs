//! Token issuer and verifier
//!
//! Mints the access/refresh JWT pair, persists a hash of each refresh token
//! as a session record, and verifies/revokes refresh tokens on presentation.
//!
//! The refresh token's embedded `exp` claim is the source of truth for
//! validity. The `expires_at` column on the session record mirrors it for
//! bookkeeping and is not consulted during verification.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sqlx::SqlitePool;
use tracing::{debug, error, warn};

use super::hashing::{hash_secret, verify_secret};
use super::models::{Claims, RefreshTokenRecord, TokenPair};
use crate::common::{generate_token_id, safe_token_log, ApiError};

/// Access token lifetime
pub const ACCESS_TOKEN_TTL_MINUTES: i64 = 15;

/// Refresh token lifetime
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 30;

/// Sign a single HS256 token for the given subject and expiry
fn sign_token(secret: &str, user_id: &str, email: &str, exp: usize) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        error!(error = %e, user_id = %user_id, "JWT encoding error");
        ApiError::InternalServer("jwt error".to_string())
    })
}

/// Issue an access/refresh pair and persist a hashed session record
///
/// Every issuance (register, login, refresh, OAuth callback) creates a new
/// `refresh_tokens` row. Multiple live rows per user are expected
/// (multi-device sessions); rows are only deleted by logout.
pub async fn issue_token_pair(
    pool: &SqlitePool,
    access_secret: &str,
    refresh_secret: &str,
    user_id: &str,
    email: &str,
) -> Result<TokenPair, ApiError> {
    let now = Utc::now();
    let access_exp = (now + Duration::minutes(ACCESS_TOKEN_TTL_MINUTES)).timestamp() as usize;
    let refresh_expires_at = now + Duration::days(REFRESH_TOKEN_TTL_DAYS);
    let refresh_exp = refresh_expires_at.timestamp() as usize;

    let access_token = sign_token(access_secret, user_id, email, access_exp)?;
    let refresh_token = sign_token(refresh_secret, user_id, email, refresh_exp)?;

    // Store only a one-way hash of the refresh token's literal value
    let hashed_refresh_token = hash_secret(&refresh_token)?;

    sqlx::query(
        "INSERT INTO refresh_tokens (id, user_id, token, expires_at) VALUES (?, ?, ?, ?)",
    )
    .bind(generate_token_id())
    .bind(user_id)
    .bind(&hashed_refresh_token)
    .bind(refresh_expires_at.to_rfc3339())
    .execute(pool)
    .await
    .map_err(|e| {
        error!(error = %e, user_id = %user_id, "Database error persisting refresh token");
        ApiError::DatabaseError(e)
    })?;

    debug!(
        user_id = %user_id,
        refresh_token = %safe_token_log(&refresh_token),
        "Issued access/refresh token pair"
    );

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Verify a presented refresh token's signature and embedded expiry
pub fn verify_refresh_token(refresh_secret: &str, token: &str) -> Result<Claims, ApiError> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(refresh_secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| {
        warn!(error = %e, token = %safe_token_log(token), "Refresh token validation failed");
        ApiError::InvalidToken("Invalid refresh token".to_string())
    })?;

    Ok(decoded.claims)
}

/// Delete the session record matching a presented refresh token
///
/// Loads the user's stored hashes and linear-scans them with the one-way
/// comparison. Session counts per user are small, so the scan is bounded.
/// Returns whether a record was deleted; a miss is not an error.
pub async fn revoke_session(
    pool: &SqlitePool,
    user_id: &str,
    presented: &str,
) -> Result<bool, ApiError> {
    let stored: Vec<RefreshTokenRecord> =
        sqlx::query_as::<_, RefreshTokenRecord>("SELECT * FROM refresh_tokens WHERE user_id = ?")
            .bind(user_id)
            .fetch_all(pool)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %user_id, "Database error loading refresh tokens");
                ApiError::DatabaseError(e)
            })?;

    let matched = stored
        .iter()
        .find(|record| verify_secret(presented, &record.token));

    match matched {
        Some(record) => {
            sqlx::query("DELETE FROM refresh_tokens WHERE id = ?")
                .bind(&record.id)
                .execute(pool)
                .await
                .map_err(|e| {
                    error!(error = %e, record_id = %record.id, "Database error deleting refresh token");
                    ApiError::DatabaseError(e)
                })?;

            debug!(user_id = %user_id, record_id = %record.id, "Deleted refresh token session");
            Ok(true)
        }
        None => {
            debug!(user_id = %user_id, "No stored session matched presented refresh token");
            Ok(false)
        }
    }
}
