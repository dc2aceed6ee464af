// src/auth/validators.rs

use super::models::*;
use crate::common::{ValidationResult, Validator};

// ============================================================================
// Authentication Payload Validators
// ============================================================================

pub struct RegisterValidator;

impl Validator<RegisterPayload> for RegisterValidator {
    fn validate(&self, data: &RegisterPayload) -> ValidationResult {
        let mut result = ValidationResult::new();

        // Validate email
        if data.email.trim().is_empty() {
            result.add_error("email", "Email is required");
        } else if !is_plausible_email(&data.email) {
            result.add_error("email", "Email must be a valid email address");
        }

        // Validate name
        if data.name.trim().is_empty() {
            result.add_error("name", "Name is required");
        } else if data.name.len() > 255 {
            result.add_error("name", "Name must be less than 255 characters");
        }

        // Password is optional (Google-only accounts have none), but when
        // provided it must meet the minimum length. Every account needs at
        // least one credential path.
        match &data.password {
            Some(password) => {
                if password.len() < 6 {
                    result.add_error("password", "Password must be at least 6 characters long");
                }
            }
            None => {
                if data.google_id.is_none() {
                    result.add_error(
                        "password",
                        "Either a password or a Google identity is required",
                    );
                }
            }
        }

        // Validate avatar URL length if provided
        if let Some(avatar) = &data.avatar {
            if avatar.len() > 2048 {
                result.add_error("avatar", "Avatar URL must be less than 2048 characters");
            }
        }

        result
    }
}

pub struct LoginValidator;

impl Validator<LoginPayload> for LoginValidator {
    fn validate(&self, data: &LoginPayload) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.email.trim().is_empty() {
            result.add_error("email", "Email is required");
        } else if !is_plausible_email(&data.email) {
            result.add_error("email", "Email must be a valid email address");
        }

        if data.password.is_empty() {
            result.add_error("password", "Password is required");
        }

        result
    }
}

pub struct RefreshTokenValidator;

impl Validator<RefreshTokenPayload> for RefreshTokenValidator {
    fn validate(&self, data: &RefreshTokenPayload) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.refresh_token.trim().is_empty() {
            result.add_error("refreshToken", "Refresh token is required");
        }

        result
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn is_plausible_email(email: &str) -> bool {
    let parts: Vec<&str> = email.split('@').collect();
    parts.len() == 2 && !parts[0].is_empty() && parts[1].contains('.') && !parts[1].starts_with('.')
}
