// SPDX-License-Identifier: MIT

//! Application configuration loaded from environment variables.
//!
//! Platform OAuth credentials are read once at startup and cached in memory.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Public base URL of this API (used to build OAuth redirect URIs)
    pub app_url: String,
    /// Frontend URL for post-OAuth redirects (connections page lives here)
    pub frontend_url: String,
    /// GCP project ID for Firestore
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,

    /// JWT signing key for bearer session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,

    // --- Platform OAuth credentials ---
    pub youtube_client_id: String,
    pub youtube_client_secret: String,
    pub tiktok_client_key: String,
    pub tiktok_client_secret: String,
    pub instagram_app_id: String,
    pub instagram_app_secret: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            app_url: env::var("APP_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),

            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),

            youtube_client_id: env::var("YOUTUBE_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("YOUTUBE_CLIENT_ID"))?,
            youtube_client_secret: env::var("YOUTUBE_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("YOUTUBE_CLIENT_SECRET"))?,
            tiktok_client_key: env::var("TIKTOK_CLIENT_KEY")
                .map_err(|_| ConfigError::Missing("TIKTOK_CLIENT_KEY"))?,
            tiktok_client_secret: env::var("TIKTOK_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("TIKTOK_CLIENT_SECRET"))?,
            instagram_app_id: env::var("INSTAGRAM_APP_ID")
                .map_err(|_| ConfigError::Missing("INSTAGRAM_APP_ID"))?,
            instagram_app_secret: env::var("INSTAGRAM_APP_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("INSTAGRAM_APP_SECRET"))?,
        })
    }

    /// Default config for tests.
    pub fn test_default() -> Self {
        Self {
            app_url: "http://localhost:8080".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            youtube_client_id: "yt_test_client_id".to_string(),
            youtube_client_secret: "yt_test_secret".to_string(),
            tiktok_client_key: "tt_test_client_key".to_string(),
            tiktok_client_secret: "tt_test_secret".to_string(),
            instagram_app_id: "ig_test_app_id".to_string(),
            instagram_app_secret: "ig_test_secret".to_string(),
        }
    }

    /// Redirect URI registered with each platform for the OAuth callback.
    pub fn redirect_uri(&self, platform: crate::models::Platform) -> String {
        format!("{}/auth/{}/callback", self.app_url, platform)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
