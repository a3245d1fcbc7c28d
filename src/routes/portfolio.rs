// SPDX-License-Identifier: MIT

//! Public portfolio route. No authentication; serves whatever the
//! creator has synced, newest first.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::ContentItem;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/portfolio/{username}", get(get_portfolio))
}

/// Profile fields safe to show publicly.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub username: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Serialize)]
pub struct PortfolioResponse {
    pub profile: PublicProfile,
    pub content: Vec<ContentItem>,
}

async fn get_portfolio(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<PortfolioResponse>> {
    let mapping = state
        .store
        .get_username_mapping(&username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no portfolio for {}", username)))?;

    let profile = state
        .store
        .get_profile(&mapping.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no portfolio for {}", username)))?;

    let mut content = state.store.content_by_creator(&mapping.user_id).await?;
    // Newest first. RFC3339 strings in UTC sort lexicographically.
    content.sort_by(|a, b| b.published_at.cmp(&a.published_at));

    Ok(Json(PortfolioResponse {
        profile: PublicProfile {
            username: profile.username,
            display_name: profile.display_name,
            bio: profile.bio,
            avatar: profile.avatar,
        },
        content,
    }))
}
