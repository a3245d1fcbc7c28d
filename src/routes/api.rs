// SPDX-License-Identifier: MIT

//! Authenticated dashboard API routes.

use axum::{
    extract::{Extension, Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{normalize_username, Connection, Platform, UserProfile};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/{platform}/sync", post(sync_platform))
        .route("/api/{platform}/disconnect", post(disconnect_platform))
        .route("/api/connections", get(get_connections))
        .route("/api/profile", put(update_profile))
        .route("/api/content", delete(purge_content))
}

fn parse_platform(raw: &str) -> Result<Platform> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("unknown platform: {}", raw)))
}

// ─── Sync ─────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub success: bool,
    pub items_added: usize,
    pub total_fetched: usize,
}

/// Pull a platform's content into the shared cache.
async fn sync_platform(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(platform): Path<String>,
) -> Result<Json<SyncResponse>> {
    let platform = parse_platform(&platform)?;
    let outcome = state.sync.sync(&user.user_id, platform).await?;

    Ok(Json(SyncResponse {
        success: true,
        items_added: outcome.items_saved,
        total_fetched: outcome.total_fetched,
    }))
}

// ─── Disconnect ───────────────────────────────────────────────────

#[derive(Serialize)]
pub struct DisconnectResponse {
    pub success: bool,
}

/// Disconnect a platform. Succeeds from the user's point of view even
/// when revocation or cleanup hiccups; already-synced content stays.
async fn disconnect_platform(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(platform): Path<String>,
) -> Result<Json<DisconnectResponse>> {
    let platform = parse_platform(&platform)?;

    if let Err(e) = state.oauth.disconnect(&user.user_id, platform).await {
        tracing::warn!(user_id = %user.user_id, %platform, error = %e, "Disconnect cleanup failed");
    }

    Ok(Json(DisconnectResponse { success: true }))
}

// ─── Connections ──────────────────────────────────────────────────

/// Connection status with all token material stripped.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub platform: Platform,
    pub is_connected: bool,
    pub display_name: Option<String>,
    pub last_synced: Option<String>,
}

impl From<Connection> for ConnectionInfo {
    fn from(conn: Connection) -> Self {
        Self {
            platform: conn.platform,
            is_connected: conn.is_connected,
            display_name: conn.display_name,
            last_synced: conn.last_synced,
        }
    }
}

/// Connection status for every supported platform, connected or not.
async fn get_connections(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<HashMap<Platform, ConnectionInfo>>> {
    let mut stored = state.store.get_connections(&user.user_id).await?;

    let mut response = HashMap::new();
    for platform in Platform::ALL {
        let info = match stored.remove(&platform) {
            Some(conn) => ConnectionInfo::from(conn),
            None => ConnectionInfo {
                platform,
                is_connected: false,
                display_name: None,
                last_synced: None,
            },
        };
        response.insert(platform, info);
    }

    Ok(Json(response))
}

// ─── Profile ──────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateRequest {
    pub username: String,
    pub display_name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Create or update the caller's public profile and claim the username.
async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<ProfileUpdateRequest>,
) -> Result<Json<UserProfile>> {
    let username = normalize_username(&request.username);
    if username.is_empty() {
        return Err(AppError::BadRequest("username must not be empty".to_string()));
    }

    state
        .store
        .create_username_mapping(&crate::models::UsernameMapping {
            username: username.clone(),
            user_id: user.user_id.clone(),
        })
        .await?;

    let created_at = state
        .store
        .get_profile(&user.user_id)
        .await?
        .map(|existing| existing.created_at)
        .unwrap_or_else(|| format_utc_rfc3339(chrono::Utc::now()));

    let profile = UserProfile {
        user_id: user.user_id.clone(),
        portfolio_url: format!("/portfolio/{}", username),
        username,
        display_name: request.display_name,
        bio: request.bio,
        avatar: request.avatar,
        created_at,
    };
    state.store.put_profile(&profile).await?;

    Ok(Json(profile))
}

// ─── Content purge ────────────────────────────────────────────────

#[derive(Serialize)]
pub struct PurgeResponse {
    pub success: bool,
    pub deleted: usize,
}

/// Delete every cached content item owned by the caller.
async fn purge_content(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<PurgeResponse>> {
    let deleted = state.store.delete_content_by_creator(&user.user_id).await?;

    tracing::info!(user_id = %user.user_id, deleted, "Content cache purged");
    Ok(Json(PurgeResponse {
        success: true,
        deleted,
    }))
}
