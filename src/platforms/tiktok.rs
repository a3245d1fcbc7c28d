// SPDX-License-Identifier: MIT

//! TikTok Open API v2 client.
//!
//! Video listing is a POST endpoint with a numeric cursor. Everything a
//! creator posts on TikTok is short-form vertical video.

use crate::error::AppError;
use crate::models::{AspectRatio, ContentType, NormalizedContent, Platform};
use crate::platforms::{
    http_client, ContentPage, Cursor, PlatformClient, PlatformIdentity, RefreshPolicy, TokenGrant,
};
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;

const AUTH_URL: &str = "https://www.tiktok.com/v2/auth/authorize/";
const SCOPE: &str = "user.info.basic,video.list";

const PAGE_SIZE: u32 = 20;
const PAGE_LIMIT: u32 = 5;

const VIDEO_FIELDS: &str = "id,title,video_description,cover_image_url,share_url,view_count,like_count,comment_count,share_count,create_time";

#[derive(Clone)]
pub struct TikTokClient {
    http: reqwest::Client,
    api_base: String,
    client_key: String,
    client_secret: String,
}

impl TikTokClient {
    pub fn new(client_key: String, client_secret: String) -> Self {
        Self {
            http: http_client(),
            api_base: "https://open.tiktokapis.com/v2".to_string(),
            client_key,
            client_secret,
        }
    }

    async fn get_display_name(&self, access_token: &str) -> Result<String, AppError> {
        let url = format!(
            "{}/user/info/?fields=open_id,display_name",
            self.api_base
        );
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::AuthExchange(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::AuthExchange(format!("HTTP {}: {}", status, body)));
        }

        let info: UserInfoResponse = response
            .json()
            .await
            .map_err(|e| AppError::AuthExchange(format!("JSON parse error: {}", e)))?;
        Ok(info.data.user.display_name)
    }

    async fn post_token_form(
        &self,
        params: &[(&str, &str)],
        make_error: fn(String) -> AppError,
    ) -> Result<TokenResponse, AppError> {
        let url = format!("{}/oauth/token/", self.api_base);
        let response = self
            .http
            .post(&url)
            .form(params)
            .send()
            .await
            .map_err(|e| make_error(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(make_error(format!("HTTP {}: {}", status, body)));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| make_error(format!("JSON parse error: {}", e)))?;

        // TikTok reports some failures with HTTP 200 and an error field.
        if let Some(error) = token.error.as_deref() {
            if error != "ok" && !error.is_empty() {
                return Err(make_error(format!(
                    "{}: {}",
                    error,
                    token.error_description.as_deref().unwrap_or("")
                )));
            }
        }

        Ok(token)
    }
}

#[async_trait]
impl PlatformClient for TikTokClient {
    fn platform(&self) -> Platform {
        Platform::TikTok
    }

    fn authorize_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}?client_key={}&scope={}&response_type=code&redirect_uri={}&state={}",
            AUTH_URL,
            urlencoding::encode(&self.client_key),
            urlencoding::encode(SCOPE),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state),
        )
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<(TokenGrant, PlatformIdentity), AppError> {
        let token = self
            .post_token_form(
                &[
                    ("client_key", self.client_key.as_str()),
                    ("client_secret", self.client_secret.as_str()),
                    ("code", code),
                    ("grant_type", "authorization_code"),
                    ("redirect_uri", redirect_uri),
                ],
                AppError::AuthExchange,
            )
            .await?;

        let open_id = token
            .open_id
            .clone()
            .ok_or_else(|| AppError::AuthExchange("missing open_id in response".to_string()))?;
        let display_name = self.get_display_name(&token.access_token).await?;

        Ok((
            TokenGrant {
                access_token: token.access_token,
                refresh_token: token.refresh_token,
                expires_in: token.expires_in,
            },
            PlatformIdentity {
                native_id: open_id,
                display_name,
            },
        ))
    }

    async fn refresh_token(&self, token: &str) -> Result<TokenGrant, AppError> {
        let refreshed = self
            .post_token_form(
                &[
                    ("client_key", self.client_key.as_str()),
                    ("client_secret", self.client_secret.as_str()),
                    ("grant_type", "refresh_token"),
                    ("refresh_token", token),
                ],
                AppError::TokenRefresh,
            )
            .await?;

        Ok(TokenGrant {
            access_token: refreshed.access_token,
            refresh_token: refreshed.refresh_token,
            expires_in: refreshed.expires_in,
        })
    }

    fn refresh_policy(&self) -> RefreshPolicy {
        RefreshPolicy::OnExpiry
    }

    async fn fetch_content(
        &self,
        access_token: &str,
        cursor: Option<Cursor>,
    ) -> Result<ContentPage, AppError> {
        let offset = match cursor {
            Some(Cursor::Offset(offset)) => Some(offset),
            Some(_) => {
                return Err(AppError::ContentFetch(
                    "unexpected cursor kind for tiktok".to_string(),
                ))
            }
            None => None,
        };

        let url = format!("{}/video/list/?fields={}", self.api_base, VIDEO_FIELDS);
        let mut body = serde_json::json!({ "max_count": PAGE_SIZE });
        if let Some(offset) = offset {
            body["cursor"] = serde_json::json!(offset);
        }

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ContentFetch(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ContentFetch(format!("HTTP {}: {}", status, body)));
        }

        let listing: VideoListResponse = response
            .json()
            .await
            .map_err(|e| AppError::ContentFetch(format!("JSON parse error: {}", e)))?;

        let items = listing
            .data
            .videos
            .into_iter()
            .map(normalize_video)
            .collect();

        let next = if listing.data.has_more {
            Some(Cursor::Offset(listing.data.cursor))
        } else {
            None
        };

        Ok(ContentPage { items, next })
    }

    fn page_limit(&self) -> u32 {
        PAGE_LIMIT
    }

    /// TikTok has no token revocation endpoint for this flow; dropping the
    /// stored tokens is the whole disconnect.
    async fn revoke(&self, _access_token: &str) -> Result<(), AppError> {
        Ok(())
    }
}

fn normalize_video(video: TikTokVideo) -> NormalizedContent {
    let title = video
        .title
        .filter(|t| !t.is_empty())
        .or_else(|| video.video_description.clone().filter(|d| !d.is_empty()))
        .unwrap_or_else(|| "TikTok Video".to_string());

    let published_at = DateTime::from_timestamp(video.create_time, 0)
        .map(format_utc_rfc3339)
        .unwrap_or_default();

    NormalizedContent {
        platform: Platform::TikTok,
        content_type: ContentType::Short,
        title,
        description: video.video_description.filter(|d| !d.is_empty()),
        views: video.view_count,
        likes: Some(video.like_count),
        comments: Some(video.comment_count),
        shares: Some(video.share_count),
        media_url: video.share_url.clone(),
        thumbnail_url: video.cover_image_url,
        aspect_ratio: AspectRatio::Vertical,
        published_at,
        external_id: video.id,
        external_url: video.share_url,
    }
}

// ─── API response shapes ──────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    open_id: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    data: UserInfoData,
}

#[derive(Debug, Deserialize)]
struct UserInfoData {
    user: UserInfo,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    data: VideoListData,
}

#[derive(Debug, Deserialize)]
struct VideoListData {
    #[serde(default)]
    videos: Vec<TikTokVideo>,
    #[serde(default)]
    cursor: u64,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct TikTokVideo {
    id: String,
    title: Option<String>,
    video_description: Option<String>,
    #[serde(default)]
    cover_image_url: String,
    #[serde(default)]
    share_url: String,
    #[serde(default)]
    view_count: u64,
    #[serde(default)]
    like_count: u64,
    #[serde(default)]
    comment_count: u64,
    #[serde(default)]
    share_count: u64,
    #[serde(default)]
    create_time: i64,
}
