// SPDX-License-Identifier: MIT

//! Normalized content models for the shared public cache.

use crate::models::{AspectRatio, ContentType, Platform};
use serde::{Deserialize, Serialize};

/// Platform-agnostic content record produced by the per-platform
/// normalizers. Raw platform response shapes never travel further than
/// the client layer that builds one of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedContent {
    pub platform: Platform,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub title: String,
    pub description: Option<String>,
    pub views: u64,
    pub likes: Option<u64>,
    pub comments: Option<u64>,
    pub shares: Option<u64>,
    pub media_url: String,
    pub thumbnail_url: String,
    pub aspect_ratio: AspectRatio,
    /// Publication timestamp (RFC3339)
    pub published_at: String,
    pub external_id: String,
    pub external_url: String,
}

impl NormalizedContent {
    /// Deterministic composite cache key: `{platform}_{externalId}`.
    ///
    /// The platform prefix keeps externally-colliding ids from different
    /// platforms apart; re-syncing the same item updates rather than
    /// duplicates.
    pub fn cache_key(&self) -> String {
        format!("{}_{}", self.platform, self.external_id)
    }

    /// Attach ownership and turn this into a cache document.
    pub fn into_item(self, creator_id: &str) -> ContentItem {
        ContentItem {
            id: self.cache_key(),
            creator_id: creator_id.to_string(),
            platform: self.platform,
            content_type: self.content_type,
            title: self.title,
            description: self.description,
            views: self.views,
            likes: self.likes,
            comments: self.comments,
            shares: self.shares,
            media_url: self.media_url,
            thumbnail_url: self.thumbnail_url,
            aspect_ratio: self.aspect_ratio,
            published_at: self.published_at,
            external_id: self.external_id,
            external_url: self.external_url,
        }
    }
}

/// Stored content document in the shared public cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    /// Document id: `{platform}_{externalId}`
    pub id: String,
    /// Owning creator (internal user id) — used for portfolio queries
    pub creator_id: String,
    pub platform: Platform,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub title: String,
    pub description: Option<String>,
    pub views: u64,
    pub likes: Option<u64>,
    pub comments: Option<u64>,
    pub shares: Option<u64>,
    pub media_url: String,
    pub thumbnail_url: String,
    pub aspect_ratio: AspectRatio,
    pub published_at: String,
    pub external_id: String,
    pub external_url: String,
}
