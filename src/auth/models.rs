//! Authentication data models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// JWT claims carried by both access and refresh tokens
#[derive(Serialize, Deserialize, Debug)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub exp: usize,
}

/// User database model
///
/// `password` holds the argon2 hash, never plaintext. It is NULL for
/// accounts created through Google sign-in.
#[derive(FromRow, Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub password: Option<String>,
    pub avatar: Option<String>,
    pub google_id: Option<String>,
    pub created_at: Option<String>,
}

/// Public projection of a user, safe to return to clients
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub avatar: Option<String>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        PublicUser {
            id: user.id,
            email: user.email,
            name: user.name,
            avatar: user.avatar,
        }
    }
}

/// Stored refresh-token session record
///
/// `token` is the argon2 hash of the refresh JWT's literal value.
#[derive(FromRow, Debug)]
pub struct RefreshTokenRecord {
    pub id: String,
    pub user_id: String,
    pub token: String,
    pub expires_at: String,
    pub created_at: Option<String>,
}

/// Access/refresh pair returned by the token issuer
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// POST /users/register request body
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    pub email: String,
    pub name: String,
    pub password: Option<String>,
    pub avatar: Option<String>,
    pub google_id: Option<String>,
}

/// POST /users/login request body
#[derive(Deserialize, Debug)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

/// POST /users/refresh and /users/logout request body
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenPayload {
    pub refresh_token: String,
}
