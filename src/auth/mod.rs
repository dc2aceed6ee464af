//! # Auth Module
//!
//! This module handles all authentication-related functionality including:
//! - Email/password registration and login
//! - Google OAuth sign-in
//! - JWT access/refresh token issuance, rotation, and logout
//! - AuthedUser extractor for protected routes

pub mod extractors;
pub mod handlers;
pub mod hashing;
pub mod models;
pub mod routes;
pub mod tokens;
pub mod validators;

#[cfg(test)]
mod tests;

pub use extractors::AuthedUser;
pub use models::User;
pub use routes::auth_routes;
