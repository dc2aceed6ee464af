//! One-way hashing for passwords and stored refresh tokens
//!
//! Both user passwords and persisted refresh tokens go through the same
//! argon2id salted hash. Plaintext values never reach the database.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::common::ApiError;

/// Hash a secret with argon2id and a fresh random salt
pub fn hash_secret(plain: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| ApiError::InternalServer(format!("hashing failed: {}", e)))?
        .to_string();

    Ok(hash)
}

/// Compare a plaintext secret against a stored argon2 hash
///
/// A malformed stored hash counts as a mismatch rather than an error, so a
/// corrupted row can never authenticate.
pub fn verify_secret(plain: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
