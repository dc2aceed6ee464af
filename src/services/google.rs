// src/services/google.rs
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum GoogleError {
    #[error("Google OAuth not configured")]
    NotConfigured,

    #[error("OAuth flow failed: {0}")]
    OAuthFailed(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Token response from Google's token endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    pub token_type: String,
    pub scope: Option<String>,
}

/// Profile returned by Google's userinfo endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub picture: Option<String>,
}

/// Client for Google's OAuth authorization-code flow
///
/// Only the HTTP legs of the handshake live here; identity resolution stays
/// in the auth module.
#[derive(Debug, Clone)]
pub struct GoogleService {
    client_id: Option<String>,
    client_secret: Option<String>,
    callback_url: Option<String>,
    client: Client,
}

impl GoogleService {
    pub fn new(
        client_id: Option<String>,
        client_secret: Option<String>,
        callback_url: Option<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client_id,
            client_secret,
            callback_url,
            client,
        }
    }

    fn config(&self) -> Result<(&str, &str, &str), GoogleError> {
        match (&self.client_id, &self.client_secret, &self.callback_url) {
            (Some(id), Some(secret), Some(callback)) => {
                Ok((id.as_str(), secret.as_str(), callback.as_str()))
            }
            _ => Err(GoogleError::NotConfigured),
        }
    }

    /// Get authorization URL for OAuth flow
    pub fn authorization_url(&self) -> Result<String, GoogleError> {
        let (client_id, _, callback_url) = self.config()?;

        let scope_param = "email profile";

        let auth_url = format!(
            "https://accounts.google.com/o/oauth2/v2/auth?client_id={}&redirect_uri={}&response_type=code&scope={}",
            urlencoding::encode(client_id),
            urlencoding::encode(callback_url),
            urlencoding::encode(scope_param)
        );

        debug!("Generated Google OAuth authorization URL with scopes: {}", scope_param);
        Ok(auth_url)
    }

    /// Exchange authorization code for tokens
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, GoogleError> {
        let (client_id, client_secret, callback_url) = self.config()?;

        let params = [
            ("code", code),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("redirect_uri", callback_url),
            ("grant_type", "authorization_code"),
        ];

        debug!("Exchanging authorization code for tokens");

        let response = self
            .client
            .post("https://oauth2.googleapis.com/token")
            .form(&params)
            .send()
            .await
            .map_err(|e| GoogleError::RequestFailed(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "Token exchange failed");
            return Err(GoogleError::OAuthFailed(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let token_response = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| GoogleError::SerializationError(e.to_string()))?;

        info!("Successfully exchanged authorization code for tokens");
        Ok(token_response)
    }

    /// Fetch the signed-in user's profile with an access token
    pub async fn fetch_profile(&self, access_token: &str) -> Result<GoogleProfile, GoogleError> {
        let response = self
            .client
            .get("https://www.googleapis.com/oauth2/v2/userinfo")
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| GoogleError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GoogleError::RequestFailed(
                "Failed to get user info".to_string(),
            ));
        }

        let profile = response
            .json::<GoogleProfile>()
            .await
            .map_err(|e| GoogleError::SerializationError(e.to_string()))?;

        Ok(profile)
    }
}
