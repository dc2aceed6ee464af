// Application state shared across all modules

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::services::GoogleService;

/// Application state containing database pool, services, and configuration
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub oauth_success_redirect: String,
    pub google_service: Arc<GoogleService>,
}
