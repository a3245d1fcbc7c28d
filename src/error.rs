// SPDX-License-Identifier: MIT

//! Application error types with consistent API responses.

use crate::models::Platform;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("{0} not connected")]
    NotConnected(Platform),

    #[error("Authorization code exchange failed: {0}")]
    AuthExchange(String),

    #[error("Token refresh failed: {0}")]
    TokenRefresh(String),

    #[error("Content fetch failed: {0}")]
    ContentFetch(String),

    #[error("OAuth state is missing or unknown")]
    InvalidState,

    #[error("OAuth state has expired")]
    ExpiredState,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Short error code used in OAuth callback redirects (`?error=<code>`).
    pub fn redirect_code(&self) -> &'static str {
        match self {
            AppError::InvalidState => "invalid_state",
            AppError::ExpiredState => "state_expired",
            _ => "oauth_failed",
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "unauthorized".to_string(), None)
            }
            AppError::InvalidToken => {
                (StatusCode::UNAUTHORIZED, "invalid_token".to_string(), None)
            }
            AppError::NotConnected(platform) => (
                StatusCode::BAD_REQUEST,
                format!("{} not connected", platform),
                None,
            ),
            AppError::AuthExchange(msg) => (
                StatusCode::BAD_GATEWAY,
                "auth_exchange_failed".to_string(),
                Some(msg.clone()),
            ),
            AppError::TokenRefresh(msg) => (
                StatusCode::BAD_GATEWAY,
                "token_refresh_failed".to_string(),
                Some(msg.clone()),
            ),
            AppError::ContentFetch(msg) => (
                StatusCode::BAD_GATEWAY,
                "content_fetch_failed".to_string(),
                Some(msg.clone()),
            ),
            AppError::InvalidState => {
                (StatusCode::BAD_REQUEST, "invalid_state".to_string(), None)
            }
            AppError::ExpiredState => {
                (StatusCode::BAD_REQUEST, "state_expired".to_string(), None)
            }
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                "not_found".to_string(),
                Some(msg.clone()),
            ),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "bad_request".to_string(),
                Some(msg.clone()),
            ),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error".to_string(),
                    None,
                )
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse { error, details };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
