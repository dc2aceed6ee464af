//! Authentication handlers

use axum::extract::{Extension, Json, Query};
use axum::http::StatusCode;
use axum::response::Redirect;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::extractors::AuthedUser;
use super::hashing::{hash_secret, verify_secret};
use super::models::{LoginPayload, PublicUser, RefreshTokenPayload, RegisterPayload, TokenPair, User};
use super::tokens;
use super::validators::{LoginValidator, RefreshTokenValidator, RegisterValidator};
use crate::common::{generate_user_id, safe_email_log, ApiError, AppState, Validator};
use crate::services::GoogleProfile;

/// POST /users/register
/// Creates a new account and issues a token pair
///
/// # Request Body
/// ```json
/// {
///   "email": "a@x.com",
///   "name": "A",
///   "password": "secret1"
/// }
/// ```
///
/// # Response
/// ```json
/// {
///   "user": { "id": "U_...", "email": "a@x.com", "name": "A", "avatar": null },
///   "accessToken": "<jwt>",
///   "refreshToken": "<jwt>"
/// }
/// ```
pub async fn register(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let state = state_lock.read().await.clone();

    let validation = RegisterValidator.validate(&payload);
    if !validation.is_valid {
        return Err(validation.into());
    }

    // Email uniqueness check before the insert; the unique index backs it up
    if find_user_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(
            email = %safe_email_log(&payload.email),
            "Registration rejected: email already taken"
        );
        return Err(ApiError::Conflict("User already exists".to_string()));
    }

    let user = create_user(&state.db, &payload).await?;

    let pair = tokens::issue_token_pair(
        &state.db,
        &state.access_token_secret,
        &state.refresh_token_secret,
        &user.id,
        &user.email,
    )
    .await?;

    info!(
        user_id = %user.id,
        email = %safe_email_log(&user.email),
        "New user account registered"
    );

    let resp = serde_json::json!({
        "user": user,
        "accessToken": pair.access_token,
        "refreshToken": pair.refresh_token,
    });

    Ok((StatusCode::CREATED, Json(resp)))
}

/// POST /users/login
/// Verifies email/password credentials and issues a token pair
///
/// # Request Body
/// ```json
/// {
///   "email": "a@x.com",
///   "password": "secret1"
/// }
/// ```
///
/// # Response
/// ```json
/// {
///   "accessToken": "<jwt>",
///   "refreshToken": "<jwt>"
/// }
/// ```
pub async fn login(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<TokenPair>, ApiError> {
    let state = state_lock.read().await.clone();

    let validation = LoginValidator.validate(&payload);
    if !validation.is_valid {
        return Err(validation.into());
    }

    // One error message for both unknown email and wrong password, so the
    // endpoint cannot be used to probe which addresses have accounts
    let user = match verify_password(&state.db, &payload.email, &payload.password).await? {
        Some(u) => u,
        None => {
            warn!(
                email = %safe_email_log(&payload.email),
                "Login failed: invalid credentials"
            );
            return Err(ApiError::InvalidCredentials(
                "Invalid email or password".to_string(),
            ));
        }
    };

    let pair = tokens::issue_token_pair(
        &state.db,
        &state.access_token_secret,
        &state.refresh_token_secret,
        &user.id,
        &user.email,
    )
    .await?;

    info!(
        user_id = %user.id,
        email = %safe_email_log(&user.email),
        "User logged in"
    );

    Ok(Json(pair))
}

/// POST /users/refresh
/// Rotates a refresh token into a fresh access/refresh pair
///
/// Requires a valid access token in the `Authorization: Bearer` header in
/// addition to the refresh token in the body.
///
/// # Request Body
/// ```json
/// {
///   "refreshToken": "<jwt>"
/// }
/// ```
pub async fn refresh(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    _authed: AuthedUser,
    Json(payload): Json<RefreshTokenPayload>,
) -> Result<Json<TokenPair>, ApiError> {
    let state = state_lock.read().await.clone();

    let validation = RefreshTokenValidator.validate(&payload);
    if !validation.is_valid {
        return Err(validation.into());
    }

    let claims = tokens::verify_refresh_token(&state.refresh_token_secret, &payload.refresh_token)?;

    // Fail closed when the subject no longer resolves to a user; a new pair
    // must never be bound to a missing identity
    let user = match find_user_by_id(&state.db, &claims.sub).await? {
        Some(u) => u,
        None => {
            warn!(
                user_id = %claims.sub,
                "Refresh rejected: token subject no longer exists"
            );
            return Err(ApiError::UnknownSubject(
                "Refresh token subject no longer exists".to_string(),
            ));
        }
    };

    let pair = tokens::issue_token_pair(
        &state.db,
        &state.access_token_secret,
        &state.refresh_token_secret,
        &user.id,
        &user.email,
    )
    .await?;

    debug!(user_id = %user.id, "Refresh token rotated");

    Ok(Json(pair))
}

/// GET /users/google/login - Start Google OAuth flow
/// Redirects user to Google's authorization page
pub async fn google_login(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
) -> Result<Redirect, ApiError> {
    let state = state_lock.read().await.clone();

    let auth_url = state.google_service.authorization_url().map_err(|e| {
        error!(error = %e, "Failed to generate Google OAuth URL");
        ApiError::InternalServer(format!("Failed to generate OAuth URL: {}", e))
    })?;

    info!("Redirecting to Google OAuth authorization page");
    Ok(Redirect::to(&auth_url))
}

/// GET /users/google/callback - Handle OAuth callback from Google
/// Exchanges the authorization code, resolves or creates the user, issues a
/// token pair, and redirects to the client deep link carrying both tokens
pub async fn google_callback(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Redirect, ApiError> {
    let state = state_lock.read().await.clone();

    // Check for error from Google
    if let Some(oauth_error) = params.get("error") {
        warn!(oauth_error = %oauth_error, "Google OAuth returned error");
        return Err(ApiError::Unauthorized(format!(
            "Google sign-in failed: {}",
            oauth_error
        )));
    }

    let code = params.get("code").ok_or_else(|| {
        warn!("No authorization code in OAuth callback");
        ApiError::ValidationError("No authorization code provided".to_string())
    })?;

    let token_response = state.google_service.exchange_code(code).await.map_err(|e| {
        error!(error = %e, "Failed to exchange authorization code for tokens");
        ApiError::InternalServer(format!("Failed to exchange code: {}", e))
    })?;

    let profile = state
        .google_service
        .fetch_profile(&token_response.access_token)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch Google profile");
            ApiError::InternalServer(format!("Failed to fetch profile: {}", e))
        })?;

    let user = resolve_google_user(&state.db, &profile).await?;

    let pair = tokens::issue_token_pair(
        &state.db,
        &state.access_token_secret,
        &state.refresh_token_secret,
        &user.id,
        &user.email,
    )
    .await?;

    info!(
        user_id = %user.id,
        email = %safe_email_log(&user.email),
        provider = "google",
        "User authentication successful via Google OAuth"
    );

    let redirect_url = format!(
        "{}?accessToken={}&refreshToken={}",
        state.oauth_success_redirect,
        urlencoding::encode(&pair.access_token),
        urlencoding::encode(&pair.refresh_token)
    );

    Ok(Redirect::to(&redirect_url))
}

/// POST /users/logout
/// Deletes the session record matching the presented refresh token
///
/// Reports success whether or not a record matched; deleting an already
/// absent session is not an error from the client's perspective.
///
/// # Request Body
/// ```json
/// {
///   "refreshToken": "<jwt>"
/// }
/// ```
pub async fn logout(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Json(payload): Json<RefreshTokenPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();

    let deleted = tokens::revoke_session(&state.db, &authed.id, &payload.refresh_token).await?;

    info!(
        user_id = %authed.id,
        session_deleted = deleted,
        "User logout"
    );

    let resp = serde_json::json!({
        "success": true,
        "message": "Logged out successfully"
    });

    Ok(Json(resp))
}

// ---- Helper Functions ----

/// Look up a user by email
pub async fn find_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, ApiError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            error!(
                error = %e,
                email = %safe_email_log(email),
                "Database error looking up user by email"
            );
            ApiError::DatabaseError(e)
        })
}

/// Look up a user by id
pub async fn find_user_by_id(pool: &SqlitePool, user_id: &str) -> Result<Option<User>, ApiError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %user_id, "Database error looking up user by id");
            ApiError::DatabaseError(e)
        })
}

/// Insert a new user and return its public projection
///
/// The password is hashed only when one is supplied and meets the minimum
/// length; Google-only accounts are stored without one.
pub async fn create_user(pool: &SqlitePool, payload: &RegisterPayload) -> Result<PublicUser, ApiError> {
    let hashed_password = match &payload.password {
        Some(password) if password.len() >= 6 => Some(hash_secret(password)?),
        _ => None,
    };

    let id = generate_user_id();

    if let Err(e) = sqlx::query(
        "INSERT INTO users (id, email, name, password, avatar, google_id) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&payload.email)
    .bind(&payload.name)
    .bind(hashed_password.as_deref())
    .bind(payload.avatar.as_deref())
    .bind(payload.google_id.as_deref())
    .execute(pool)
    .await
    {
        error!(
            error = %e,
            email = %safe_email_log(&payload.email),
            "Database error inserting new user"
        );
        return Err(ApiError::ValidationError("Invalid user data".to_string()));
    }

    // fetch back
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&id)
        .fetch_one(pool)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %id, "Database error fetching newly created user");
            ApiError::DatabaseError(e)
        })?;

    debug!(user_id = %user.id, "New user record created");

    Ok(PublicUser::from(user))
}

/// Check email/password credentials
///
/// Returns the public user on a match. An unknown email, a passwordless
/// (Google-only) account, and a wrong password all come back as `None`.
pub async fn verify_password(
    pool: &SqlitePool,
    email: &str,
    plaintext: &str,
) -> Result<Option<PublicUser>, ApiError> {
    let user = match find_user_by_email(pool, email).await? {
        Some(u) => u,
        None => return Ok(None),
    };

    let stored_hash = match &user.password {
        Some(h) => h.clone(),
        None => return Ok(None),
    };

    if verify_secret(plaintext, &stored_hash) {
        Ok(Some(PublicUser::from(user)))
    } else {
        Ok(None)
    }
}

/// Resolve a Google profile to a user, creating the account on first sign-in
///
/// An existing email-matched account is returned untouched; the OAuth path
/// never overwrites stored profile fields.
pub async fn resolve_google_user(
    pool: &SqlitePool,
    profile: &GoogleProfile,
) -> Result<PublicUser, ApiError> {
    if let Some(existing) = find_user_by_email(pool, &profile.email).await? {
        debug!(
            user_id = %existing.id,
            provider = "google",
            "Found existing user for Google profile"
        );
        return Ok(PublicUser::from(existing));
    }

    let display_name = match (&profile.given_name, &profile.family_name) {
        (Some(given), Some(family)) => format!("{} {}", given, family),
        _ => profile
            .name
            .clone()
            .unwrap_or_else(|| profile.email.clone()),
    };

    let payload = RegisterPayload {
        email: profile.email.clone(),
        name: display_name,
        password: None,
        avatar: profile.picture.clone(),
        google_id: Some(profile.id.clone()),
    };

    let user = create_user(pool, &payload).await?;

    info!(
        user_id = %user.id,
        email = %safe_email_log(&user.email),
        provider = "google",
        "Creating new user account via Google OAuth"
    );

    Ok(user)
}
