//! Tests for auth module
//!
//! These tests verify core authentication functionality including:
//! - JWT token validation
//! - Password hashing and credential checks
//! - Refresh token issuance, rotation, and revocation
//! - Payload validation

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::common::{migrations, Validator};
    use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;

    const ACCESS_SECRET: &str = "test_access_secret";
    const REFRESH_SECRET: &str = "test_refresh_secret";

    async fn setup_test_db() -> SqlitePool {
        // A single connection keeps every query on the same in-memory database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        migrations::run_migrations(&pool).await.unwrap();

        pool
    }

    fn register_payload(email: &str, password: Option<&str>) -> models::RegisterPayload {
        models::RegisterPayload {
            email: email.to_string(),
            name: "Test User".to_string(),
            password: password.map(str::to_string),
            avatar: None,
            google_id: None,
        }
    }

    // ------------------------------------------------------------------
    // JWT
    // ------------------------------------------------------------------

    #[test]
    fn test_claims_structure() {
        let claims = models::Claims {
            sub: "U_TEST01".to_string(),
            email: "test@example.com".to_string(),
            exp: 1234567890,
        };

        assert_eq!(claims.sub, "U_TEST01");
        assert_eq!(claims.email, "test@example.com");
        assert_eq!(claims.exp, 1234567890);
    }

    #[test]
    fn test_jwt_encoding_and_decoding() {
        let claims = models::Claims {
            sub: "U_TEST01".to_string(),
            email: "test@example.com".to_string(),
            exp: 9999999999, // Far future
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(ACCESS_SECRET.as_bytes()),
        )
        .expect("Failed to encode token");

        let decoded = decode::<models::Claims>(
            &token,
            &DecodingKey::from_secret(ACCESS_SECRET.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .expect("Failed to decode token");

        assert_eq!(decoded.claims.sub, "U_TEST01");
        assert_eq!(decoded.claims.email, "test@example.com");
    }

    #[test]
    fn test_jwt_validation_fails_with_wrong_secret() {
        let claims = models::Claims {
            sub: "U_TEST01".to_string(),
            email: "test@example.com".to_string(),
            exp: 9999999999,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(ACCESS_SECRET.as_bytes()),
        )
        .expect("Failed to encode token");

        let result = decode::<models::Claims>(
            &token,
            &DecodingKey::from_secret("wrong_secret_key".as_bytes()),
            &Validation::new(Algorithm::HS256),
        );

        assert!(
            result.is_err(),
            "Token validation should fail with wrong secret"
        );
    }

    #[test]
    fn test_expired_refresh_token_is_rejected() {
        let expired = chrono::Utc::now() - chrono::Duration::hours(2);
        let claims = models::Claims {
            sub: "U_TEST01".to_string(),
            email: "test@example.com".to_string(),
            exp: expired.timestamp() as usize,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(REFRESH_SECRET.as_bytes()),
        )
        .expect("Failed to encode token");

        let result = tokens::verify_refresh_token(REFRESH_SECRET, &token);
        assert!(matches!(
            result,
            Err(crate::common::ApiError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_refresh_token_rejected_when_signed_with_access_secret() {
        let claims = models::Claims {
            sub: "U_TEST01".to_string(),
            email: "test@example.com".to_string(),
            exp: 9999999999,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(ACCESS_SECRET.as_bytes()),
        )
        .expect("Failed to encode token");

        let result = tokens::verify_refresh_token(REFRESH_SECRET, &token);
        assert!(matches!(
            result,
            Err(crate::common::ApiError::InvalidToken(_))
        ));
    }

    // ------------------------------------------------------------------
    // Hashing
    // ------------------------------------------------------------------

    #[test]
    fn test_hash_secret_verifies_original_only() {
        let hash = hashing::hash_secret("secret1").unwrap();

        assert_ne!(hash, "secret1");
        assert!(hashing::verify_secret("secret1", &hash));
        assert!(!hashing::verify_secret("secret2", &hash));
    }

    #[test]
    fn test_verify_secret_rejects_malformed_hash() {
        assert!(!hashing::verify_secret("secret1", "not-a-valid-hash"));
    }

    // ------------------------------------------------------------------
    // Payload validation
    // ------------------------------------------------------------------

    #[test]
    fn test_register_validation_success() {
        let payload = register_payload("a@x.com", Some("secret1"));
        let result = validators::RegisterValidator.validate(&payload);
        assert!(result.is_valid);
    }

    #[test]
    fn test_register_validation_allows_missing_password_with_google_id() {
        // Google-only accounts register without a password
        let mut payload = register_payload("a@x.com", None);
        payload.google_id = Some("google-sub-123".to_string());
        let result = validators::RegisterValidator.validate(&payload);
        assert!(result.is_valid);
    }

    #[test]
    fn test_register_validation_rejects_account_with_no_credential_path() {
        let payload = register_payload("a@x.com", None);
        let result = validators::RegisterValidator.validate(&payload);
        assert!(!result.is_valid);
    }

    #[test]
    fn test_register_validation_rejects_short_password() {
        let payload = register_payload("a@x.com", Some("short"));
        let result = validators::RegisterValidator.validate(&payload);
        assert!(!result.is_valid);
        assert_eq!(result.errors[0].field, "password");
    }

    #[test]
    fn test_register_validation_rejects_bad_email() {
        let payload = register_payload("not-an-email", Some("secret1"));
        let result = validators::RegisterValidator.validate(&payload);
        assert!(!result.is_valid);
        assert_eq!(result.errors[0].field, "email");
    }

    #[test]
    fn test_login_validation_requires_both_fields() {
        let payload = models::LoginPayload {
            email: "".to_string(),
            password: "".to_string(),
        };
        let result = validators::LoginValidator.validate(&payload);
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 2);
    }

    // ------------------------------------------------------------------
    // Identity store
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_create_user_strips_password_from_projection() {
        let pool = setup_test_db().await;

        let user = handlers::create_user(&pool, &register_payload("a@x.com", Some("secret1")))
            .await
            .unwrap();

        assert!(user.id.starts_with("U_"));
        assert_eq!(user.email, "a@x.com");

        // The public projection must not carry a password field at all
        let as_json = serde_json::to_value(&user).unwrap();
        assert!(as_json.get("password").is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected_and_first_account_unchanged() {
        let pool = setup_test_db().await;

        let first = handlers::create_user(&pool, &register_payload("a@x.com", Some("secret1")))
            .await
            .unwrap();

        // The unique index rejects a second row for the same email
        let second = handlers::create_user(&pool, &register_payload("a@x.com", Some("other66")))
            .await;
        assert!(second.is_err());

        let stored = handlers::find_user_by_email(&pool, "a@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, first.id);
        assert_eq!(stored.name, Some("Test User".to_string()));
    }

    #[tokio::test]
    async fn test_verify_password_accepts_registered_password_only() {
        let pool = setup_test_db().await;

        let created = handlers::create_user(&pool, &register_payload("a@x.com", Some("secret1")))
            .await
            .unwrap();

        let verified = handlers::verify_password(&pool, "a@x.com", "secret1")
            .await
            .unwrap();
        assert_eq!(verified, Some(created));

        let wrong = handlers::verify_password(&pool, "a@x.com", "wrong")
            .await
            .unwrap();
        assert!(wrong.is_none());

        let unknown = handlers::verify_password(&pool, "b@x.com", "secret1")
            .await
            .unwrap();
        assert!(unknown.is_none());
    }

    #[tokio::test]
    async fn test_verify_password_rejects_passwordless_account() {
        let pool = setup_test_db().await;

        // OAuth-only account: no password stored
        let mut payload = register_payload("oauth@x.com", None);
        payload.google_id = Some("google-sub-123".to_string());
        handlers::create_user(&pool, &payload).await.unwrap();

        let result = handlers::verify_password(&pool, "oauth@x.com", "anything")
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_resolve_google_user_reuses_existing_account() {
        let pool = setup_test_db().await;

        let existing = handlers::create_user(&pool, &register_payload("a@x.com", Some("secret1")))
            .await
            .unwrap();

        let profile = crate::services::GoogleProfile {
            id: "google-sub-123".to_string(),
            email: "a@x.com".to_string(),
            name: Some("Someone Else".to_string()),
            given_name: Some("Someone".to_string()),
            family_name: Some("Else".to_string()),
            picture: Some("https://example.com/p.jpg".to_string()),
        };

        let resolved = handlers::resolve_google_user(&pool, &profile).await.unwrap();

        // Existing email-matched account comes back untouched
        assert_eq!(resolved, existing);
        let stored = handlers::find_user_by_email(&pool, "a@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.name, Some("Test User".to_string()));
        assert!(stored.google_id.is_none());
    }

    #[tokio::test]
    async fn test_resolve_google_user_creates_account_on_first_sign_in() {
        let pool = setup_test_db().await;

        let profile = crate::services::GoogleProfile {
            id: "google-sub-123".to_string(),
            email: "new@x.com".to_string(),
            name: None,
            given_name: Some("New".to_string()),
            family_name: Some("User".to_string()),
            picture: Some("https://example.com/p.jpg".to_string()),
        };

        let resolved = handlers::resolve_google_user(&pool, &profile).await.unwrap();
        assert_eq!(resolved.name, Some("New User".to_string()));

        let stored = handlers::find_user_by_email(&pool, "new@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.google_id, Some("google-sub-123".to_string()));
        assert!(stored.password.is_none());
    }

    // ------------------------------------------------------------------
    // Token lifecycle
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_issue_token_pair_persists_hashed_session() {
        let pool = setup_test_db().await;

        let user = handlers::create_user(&pool, &register_payload("a@x.com", Some("secret1")))
            .await
            .unwrap();

        let pair =
            tokens::issue_token_pair(&pool, ACCESS_SECRET, REFRESH_SECRET, &user.id, &user.email)
                .await
                .unwrap();

        let stored: Vec<models::RefreshTokenRecord> =
            sqlx::query_as("SELECT * FROM refresh_tokens WHERE user_id = ?")
                .bind(&user.id)
                .fetch_all(&pool)
                .await
                .unwrap();

        assert_eq!(stored.len(), 1);
        assert!(stored[0].id.starts_with("K_"));
        assert_eq!(stored[0].user_id, user.id);
        assert!(stored[0].created_at.is_some());

        // Plaintext must never land in the store
        assert_ne!(stored[0].token, pair.refresh_token);
        assert!(hashing::verify_secret(&pair.refresh_token, &stored[0].token));

        // Stored expiry mirrors the 30-day token lifetime
        let expires_at = chrono::DateTime::parse_from_rfc3339(&stored[0].expires_at).unwrap();
        let days_out = (expires_at.with_timezone(&chrono::Utc) - chrono::Utc::now()).num_days();
        assert!((29..=30).contains(&days_out));
    }

    #[tokio::test]
    async fn test_refresh_rotation_preserves_subject_and_adds_record() {
        let pool = setup_test_db().await;

        let user = handlers::create_user(&pool, &register_payload("a@x.com", Some("secret1")))
            .await
            .unwrap();

        let pair =
            tokens::issue_token_pair(&pool, ACCESS_SECRET, REFRESH_SECRET, &user.id, &user.email)
                .await
                .unwrap();

        // The refresh flow: verify the presented token, then issue a new pair
        let claims = tokens::verify_refresh_token(REFRESH_SECRET, &pair.refresh_token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, user.email);

        let rotated =
            tokens::issue_token_pair(&pool, ACCESS_SECRET, REFRESH_SECRET, &claims.sub, &claims.email)
                .await
                .unwrap();

        let decoded = decode::<models::Claims>(
            &rotated.access_token,
            &DecodingKey::from_secret(ACCESS_SECRET.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();
        assert_eq!(decoded.claims.sub, user.id);
        assert_eq!(decoded.claims.email, user.email);

        // Rotation inserts a second record; only logout deletes
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM refresh_tokens WHERE user_id = ?")
            .bind(&user.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 2);
    }

    #[tokio::test]
    async fn test_revoke_session_deletes_matching_record() {
        let pool = setup_test_db().await;

        let user = handlers::create_user(&pool, &register_payload("a@x.com", Some("secret1")))
            .await
            .unwrap();

        let pair =
            tokens::issue_token_pair(&pool, ACCESS_SECRET, REFRESH_SECRET, &user.id, &user.email)
                .await
                .unwrap();

        let deleted = tokens::revoke_session(&pool, &user.id, &pair.refresh_token)
            .await
            .unwrap();
        assert!(deleted);

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM refresh_tokens WHERE user_id = ?")
            .bind(&user.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 0);
    }

    #[tokio::test]
    async fn test_revoke_session_is_idempotent_for_unknown_token() {
        let pool = setup_test_db().await;

        let user = handlers::create_user(&pool, &register_payload("a@x.com", Some("secret1")))
            .await
            .unwrap();

        tokens::issue_token_pair(&pool, ACCESS_SECRET, REFRESH_SECRET, &user.id, &user.email)
            .await
            .unwrap();

        // A token that was never issued to this user deletes nothing
        let deleted = tokens::revoke_session(&pool, &user.id, "never-issued-token")
            .await
            .unwrap();
        assert!(!deleted);

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM refresh_tokens WHERE user_id = ?")
            .bind(&user.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }
}
