//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `POST /users/register` - Email/password registration
/// - `POST /users/login` - Email/password login
/// - `POST /users/refresh` - Refresh token rotation
/// - `GET /users/google/login` - Start Google OAuth flow
/// - `GET /users/google/callback` - Google OAuth callback
/// - `POST /users/logout` - Delete the matching session record
pub fn auth_routes() -> Router {
    Router::new()
        .route("/users/register", post(handlers::register))
        .route("/users/login", post(handlers::login))
        .route("/users/refresh", post(handlers::refresh))
        .route("/users/google/login", get(handlers::google_login))
        .route("/users/google/callback", get(handlers::google_callback))
        .route("/users/logout", post(handlers::logout))
}
