// SPDX-License-Identifier: MIT

//! Instagram Basic Display API client.
//!
//! Connecting is a two-step exchange: the authorization code buys a
//! short-lived token, which is immediately traded for a long-lived
//! (60-day) one. Long-lived tokens refresh off the access token itself,
//! so refreshes roll ahead of expiry instead of waiting for it.

use crate::error::AppError;
use crate::models::{AspectRatio, ContentType, NormalizedContent, Platform};
use crate::platforms::{
    http_client, ContentPage, Cursor, PlatformClient, PlatformIdentity, RefreshPolicy, TokenGrant,
};
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

const AUTH_URL: &str = "https://api.instagram.com/oauth/authorize";
const SCOPE: &str = "user_profile,user_media";

const PAGE_SIZE: u32 = 50;
// A single large page per sync; Instagram media lists are shallow.
const PAGE_LIMIT: u32 = 1;

/// Refresh long-lived tokens this far ahead of their expiry.
const REFRESH_AHEAD_DAYS: i64 = 10;

const MEDIA_FIELDS: &str =
    "id,caption,media_type,media_url,thumbnail_url,permalink,timestamp,like_count,comments_count";

#[derive(Clone)]
pub struct InstagramClient {
    http: reqwest::Client,
    oauth_base: String,
    graph_base: String,
    app_id: String,
    app_secret: String,
}

impl InstagramClient {
    pub fn new(app_id: String, app_secret: String) -> Self {
        Self {
            http: http_client(),
            oauth_base: "https://api.instagram.com".to_string(),
            graph_base: "https://graph.instagram.com".to_string(),
            app_id,
            app_secret,
        }
    }

    /// Step 1: trade the authorization code for a short-lived token.
    async fn exchange_short_lived(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<ShortLivedTokenResponse, AppError> {
        let url = format!("{}/oauth/access_token", self.oauth_base);
        let response = self
            .http
            .post(&url)
            .form(&[
                ("client_id", self.app_id.as_str()),
                ("client_secret", self.app_secret.as_str()),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri),
                ("code", code),
            ])
            .send()
            .await
            .map_err(|e| AppError::AuthExchange(e.to_string()))?;

        check_json_as(response, AppError::AuthExchange).await
    }

    /// Step 2: trade the short-lived token for a long-lived one.
    async fn exchange_long_lived(
        &self,
        short_lived_token: &str,
    ) -> Result<LongLivedTokenResponse, AppError> {
        let url = format!("{}/access_token", self.graph_base);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("grant_type", "ig_exchange_token"),
                ("client_secret", self.app_secret.as_str()),
                ("access_token", short_lived_token),
            ])
            .send()
            .await
            .map_err(|e| AppError::AuthExchange(e.to_string()))?;

        check_json_as(response, AppError::AuthExchange).await
    }

    async fn get_username(&self, access_token: &str) -> Result<String, AppError> {
        let url = format!("{}/me", self.graph_base);
        let response = self
            .http
            .get(&url)
            .query(&[("fields", "id,username"), ("access_token", access_token)])
            .send()
            .await
            .map_err(|e| AppError::AuthExchange(e.to_string()))?;

        let me: MeResponse = check_json_as(response, AppError::AuthExchange).await?;
        Ok(me.username)
    }
}

#[async_trait]
impl PlatformClient for InstagramClient {
    fn platform(&self) -> Platform {
        Platform::Instagram
    }

    fn authorize_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&scope={}&response_type=code&state={}",
            AUTH_URL,
            urlencoding::encode(&self.app_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(SCOPE),
            urlencoding::encode(state),
        )
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<(TokenGrant, PlatformIdentity), AppError> {
        let short = self.exchange_short_lived(code, redirect_uri).await?;
        let long = self.exchange_long_lived(&short.access_token).await?;
        let username = self.get_username(&long.access_token).await?;

        Ok((
            TokenGrant {
                access_token: long.access_token,
                // Long-lived tokens refresh via the access token itself.
                refresh_token: None,
                expires_in: long.expires_in,
            },
            PlatformIdentity {
                native_id: short.user_id,
                display_name: username,
            },
        ))
    }

    /// `token` is the current long-lived access token, not a refresh token.
    async fn refresh_token(&self, token: &str) -> Result<TokenGrant, AppError> {
        let url = format!("{}/refresh_access_token", self.graph_base);
        let response = self
            .http
            .get(&url)
            .query(&[("grant_type", "ig_refresh_token"), ("access_token", token)])
            .send()
            .await
            .map_err(|e| AppError::TokenRefresh(e.to_string()))?;

        let refreshed: LongLivedTokenResponse =
            check_json_as(response, AppError::TokenRefresh).await?;

        Ok(TokenGrant {
            access_token: refreshed.access_token,
            refresh_token: None,
            expires_in: refreshed.expires_in,
        })
    }

    fn refresh_policy(&self) -> RefreshPolicy {
        RefreshPolicy::Rolling {
            ahead: chrono::Duration::days(REFRESH_AHEAD_DAYS),
        }
    }

    async fn fetch_content(
        &self,
        access_token: &str,
        cursor: Option<Cursor>,
    ) -> Result<ContentPage, AppError> {
        let after = match cursor {
            Some(Cursor::After(after)) => Some(after),
            Some(_) => {
                return Err(AppError::ContentFetch(
                    "unexpected cursor kind for instagram".to_string(),
                ))
            }
            None => None,
        };

        let url = format!("{}/me/media", self.graph_base);
        let limit = PAGE_SIZE.to_string();
        let mut query = vec![
            ("fields", MEDIA_FIELDS.to_string()),
            ("limit", limit),
            ("access_token", access_token.to_string()),
        ];
        if let Some(after) = after {
            query.push(("after", after));
        }

        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::ContentFetch(e.to_string()))?;

        let listing: MediaListResponse = check_json_as(response, AppError::ContentFetch).await?;

        let items = listing
            .data
            .into_iter()
            .filter_map(normalize_media)
            .collect();

        // `after` is only a real continuation when a `next` link exists.
        let next = listing
            .paging
            .filter(|paging| paging.next.is_some())
            .and_then(|paging| paging.cursors)
            .and_then(|cursors| cursors.after)
            .map(Cursor::After);

        Ok(ContentPage { items, next })
    }

    fn page_limit(&self) -> u32 {
        PAGE_LIMIT
    }

    /// The Basic Display API has no revocation endpoint; the user removes
    /// the app from their Instagram settings.
    async fn revoke(&self, _access_token: &str) -> Result<(), AppError> {
        Ok(())
    }
}

/// Normalize one media item. Items without a media URL (some carousel
/// children, copyright-muted media) are skipped.
fn normalize_media(media: Media) -> Option<NormalizedContent> {
    let media_url = media.media_url.filter(|url| !url.is_empty())?;

    let (content_type, aspect_ratio) = match media.media_type.as_str() {
        "VIDEO" => (ContentType::Video, AspectRatio::Vertical),
        "IMAGE" => (ContentType::Post, AspectRatio::Square),
        "CAROUSEL_ALBUM" => (ContentType::Post, AspectRatio::Portrait),
        _ => (ContentType::Post, AspectRatio::Portrait),
    };

    let caption = media.caption.filter(|c| !c.is_empty());
    let title = caption
        .clone()
        .map(|c| c.lines().next().unwrap_or_default().to_string())
        .unwrap_or_else(|| "Instagram Post".to_string());

    let thumbnail_url = media
        .thumbnail_url
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| media_url.clone());

    // Instagram sends `+0000` offsets; store a uniform `Z` form so cached
    // timestamps sort consistently across platforms.
    let published_at = DateTime::parse_from_str(&media.timestamp, "%Y-%m-%dT%H:%M:%S%z")
        .map(|dt| format_utc_rfc3339(dt.with_timezone(&Utc)))
        .unwrap_or(media.timestamp);

    Some(NormalizedContent {
        platform: Platform::Instagram,
        content_type,
        title,
        description: caption,
        views: 0,
        likes: media.like_count,
        comments: media.comments_count,
        shares: None,
        media_url,
        thumbnail_url,
        aspect_ratio,
        published_at,
        external_id: media.id,
        external_url: media.permalink.unwrap_or_default(),
    })
}

// ─── API response shapes ──────────────────────────────────────────

/// Instagram has sent `user_id` both as a JSON number and as a string.
#[derive(Debug, Deserialize)]
struct ShortLivedTokenResponse {
    access_token: String,
    #[serde(deserialize_with = "user_id_string")]
    user_id: String,
}

fn user_id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Str(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Num(n) => n.to_string(),
        Raw::Str(s) => s,
    })
}

#[derive(Debug, Deserialize)]
struct LongLivedTokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct MeResponse {
    username: String,
}

#[derive(Debug, Deserialize)]
struct MediaListResponse {
    #[serde(default)]
    data: Vec<Media>,
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    cursors: Option<PagingCursors>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PagingCursors {
    after: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Media {
    id: String,
    caption: Option<String>,
    media_type: String,
    media_url: Option<String>,
    thumbnail_url: Option<String>,
    permalink: Option<String>,
    #[serde(default)]
    timestamp: String,
    like_count: Option<u64>,
    comments_count: Option<u64>,
}

/// Check response and parse JSON with a caller-chosen error constructor.
async fn check_json_as<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
    make_error: fn(String) -> AppError,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(make_error(format!("HTTP {}: {}", status, body)));
    }

    response
        .json()
        .await
        .map_err(|e| make_error(format!("JSON parse error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media(media_type: &str, media_url: Option<&str>) -> Media {
        Media {
            id: "17900000000000000".to_string(),
            caption: Some("Sunset shoot\nmore detail below".to_string()),
            media_type: media_type.to_string(),
            media_url: media_url.map(str::to_string),
            thumbnail_url: None,
            permalink: Some("https://www.instagram.com/p/abc/".to_string()),
            timestamp: "2026-03-01T09:30:00+0000".to_string(),
            like_count: Some(88),
            comments_count: Some(5),
        }
    }

    #[test]
    fn test_image_becomes_square_post() {
        let item = normalize_media(media("IMAGE", Some("https://cdn.ig/img.jpg"))).unwrap();
        assert_eq!(item.content_type, ContentType::Post);
        assert_eq!(item.aspect_ratio, AspectRatio::Square);
        // Title is the first caption line.
        assert_eq!(item.title, "Sunset shoot");
        // No thumbnail, so the media URL stands in.
        assert_eq!(item.thumbnail_url, "https://cdn.ig/img.jpg");
        // The +0000 offset is rewritten to the uniform Z form.
        assert_eq!(item.published_at, "2026-03-01T09:30:00Z");
    }

    #[test]
    fn test_video_becomes_vertical_video() {
        let item = normalize_media(media("VIDEO", Some("https://cdn.ig/clip.mp4"))).unwrap();
        assert_eq!(item.content_type, ContentType::Video);
        assert_eq!(item.aspect_ratio, AspectRatio::Vertical);
    }

    #[test]
    fn test_carousel_becomes_portrait_post() {
        let item = normalize_media(media("CAROUSEL_ALBUM", Some("https://cdn.ig/c.jpg"))).unwrap();
        assert_eq!(item.content_type, ContentType::Post);
        assert_eq!(item.aspect_ratio, AspectRatio::Portrait);
    }

    #[test]
    fn test_media_without_url_is_skipped() {
        assert!(normalize_media(media("IMAGE", None)).is_none());
        assert!(normalize_media(media("IMAGE", Some(""))).is_none());
    }

    #[test]
    fn test_missing_caption_gets_fallback_title() {
        let mut raw = media("IMAGE", Some("https://cdn.ig/img.jpg"));
        raw.caption = None;
        let item = normalize_media(raw).unwrap();
        assert_eq!(item.title, "Instagram Post");
        assert_eq!(item.description, None);
    }

    #[test]
    fn test_token_exchange_accepts_string_or_numeric_user_id() {
        let numeric: ShortLivedTokenResponse =
            serde_json::from_str(r#"{"access_token":"tok","user_id":17841400000000000}"#).unwrap();
        assert_eq!(numeric.user_id, "17841400000000000");

        let string: ShortLivedTokenResponse =
            serde_json::from_str(r#"{"access_token":"tok","user_id":"17841400000000000"}"#)
                .unwrap();
        assert_eq!(string.user_id, "17841400000000000");
    }

    #[test]
    fn test_authorize_url_shape() {
        let client = InstagramClient::new("app-1".to_string(), "secret".to_string());
        let url = client.authorize_url("http://localhost:8080/auth/instagram/callback", "tok789");
        assert!(url.starts_with("https://api.instagram.com/oauth/authorize?"));
        assert!(url.contains("scope=user_profile%2Cuser_media"));
        assert!(url.contains("state=tok789"));
    }
}
