// SPDX-License-Identifier: MIT

//! YouTube Data API v3 client.
//!
//! Content listing resolves the channel's uploads playlist once, walks it
//! page by page, and hydrates the video details in one batched `videos`
//! call per page. Videos of 60 seconds or less are classified as shorts.

use crate::error::AppError;
use crate::models::{AspectRatio, ContentType, NormalizedContent, Platform};
use crate::platforms::{
    http_client, string_or_u64, ContentPage, Cursor, PlatformClient, PlatformIdentity,
    RefreshPolicy, TokenGrant,
};
use async_trait::async_trait;
use serde::Deserialize;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const SCOPE: &str = "https://www.googleapis.com/auth/youtube.readonly";

const PAGE_SIZE: u32 = 50;
const PAGE_LIMIT: u32 = 3;

/// Shorts are at most this long.
const SHORT_MAX_SECONDS: u64 = 60;

#[derive(Clone)]
pub struct YouTubeClient {
    http: reqwest::Client,
    api_base: String,
    token_url: String,
    revoke_url: String,
    client_id: String,
    client_secret: String,
}

impl YouTubeClient {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            http: http_client(),
            api_base: "https://www.googleapis.com/youtube/v3".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            revoke_url: "https://oauth2.googleapis.com/revoke".to_string(),
            client_id,
            client_secret,
        }
    }

    /// Resolve the authenticated user's channel (id, title, uploads playlist).
    async fn get_own_channel(&self, access_token: &str) -> Result<Channel, AppError> {
        let url = format!(
            "{}/channels?part=snippet,contentDetails&mine=true",
            self.api_base
        );
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::ContentFetch(e.to_string()))?;

        let listing: ChannelListResponse = check_json(response).await?;
        listing
            .items
            .into_iter()
            .next()
            .ok_or_else(|| AppError::ContentFetch("no YouTube channel for account".to_string()))
    }

    /// One page of the uploads playlist: video ids plus the next page token.
    async fn list_uploads_page(
        &self,
        access_token: &str,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<(Vec<String>, Option<String>), AppError> {
        let mut url = format!(
            "{}/playlistItems?part=contentDetails&playlistId={}&maxResults={}",
            self.api_base, playlist_id, PAGE_SIZE
        );
        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::ContentFetch(e.to_string()))?;

        let listing: PlaylistItemsResponse = check_json(response).await?;
        let ids = listing
            .items
            .into_iter()
            .map(|item| item.content_details.video_id)
            .collect();
        Ok((ids, listing.next_page_token))
    }

    /// Hydrate a batch of video ids with snippet, duration, and statistics.
    async fn get_videos(&self, access_token: &str, ids: &[String]) -> Result<Vec<Video>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/videos?part=snippet,contentDetails,statistics&id={}",
            self.api_base,
            ids.join(",")
        );
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::ContentFetch(e.to_string()))?;

        let listing: VideoListResponse = check_json(response).await?;
        Ok(listing.items)
    }
}

#[async_trait]
impl PlatformClient for YouTubeClient {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    fn authorize_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent&state={}",
            AUTH_URL,
            urlencoding::encode(&self.client_id),
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
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::AuthExchange(e.to_string()))?;

        let token: TokenResponse = check_json_as(response, AppError::AuthExchange).await?;

        let channel = self.get_own_channel(&token.access_token).await?;

        Ok((
            TokenGrant {
                access_token: token.access_token,
                refresh_token: token.refresh_token,
                expires_in: token.expires_in,
            },
            PlatformIdentity {
                native_id: channel.id,
                display_name: channel.snippet.title,
            },
        ))
    }

    async fn refresh_token(&self, token: &str) -> Result<TokenGrant, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| AppError::TokenRefresh(e.to_string()))?;

        let refreshed: TokenResponse = check_json_as(response, AppError::TokenRefresh).await?;

        Ok(TokenGrant {
            access_token: refreshed.access_token,
            // Google does not rotate the refresh token; keep the stored one.
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
        // The channel lookup runs on the first page only; follow-up
        // cursors carry the uploads playlist id.
        let (playlist_id, page_token) = match &cursor {
            Some(Cursor::PageToken(raw)) => {
                let (playlist_id, token) = unpack_cursor(raw)?;
                (playlist_id.to_string(), Some(token.to_string()))
            }
            Some(_) => {
                return Err(AppError::ContentFetch(
                    "unexpected cursor kind for youtube".to_string(),
                ))
            }
            None => {
                let channel = self.get_own_channel(access_token).await?;
                (channel.content_details.related_playlists.uploads, None)
            }
        };

        let (ids, next_token) = self
            .list_uploads_page(access_token, &playlist_id, page_token.as_deref())
            .await?;

        let items = self
            .get_videos(access_token, &ids)
            .await?
            .into_iter()
            .map(normalize_video)
            .collect();

        Ok(ContentPage {
            items,
            next: next_token.map(|token| Cursor::PageToken(pack_cursor(&playlist_id, &token))),
        })
    }

    fn page_limit(&self) -> u32 {
        PAGE_LIMIT
    }

    async fn revoke(&self, access_token: &str) -> Result<(), AppError> {
        let response = self
            .http
            .post(&self.revoke_url)
            .form(&[("token", access_token)])
            .send()
            .await
            .map_err(|e| AppError::ContentFetch(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ContentFetch(format!("HTTP {}: {}", status, body)));
        }
        Ok(())
    }
}

/// Turn a hydrated video into the normalized shape.
fn normalize_video(video: Video) -> NormalizedContent {
    let seconds = parse_iso8601_duration_seconds(&video.content_details.duration);
    let is_short = seconds > 0 && seconds <= SHORT_MAX_SECONDS;

    let thumbnail_url = pick_thumbnail(&video.snippet.thumbnails);
    let watch_url = format!("https://www.youtube.com/watch?v={}", video.id);

    NormalizedContent {
        platform: Platform::YouTube,
        content_type: if is_short {
            ContentType::Short
        } else {
            ContentType::Video
        },
        title: video.snippet.title,
        description: Some(video.snippet.description).filter(|d| !d.is_empty()),
        views: video.statistics.view_count,
        likes: video.statistics.like_count,
        comments: video.statistics.comment_count,
        shares: None,
        media_url: watch_url.clone(),
        thumbnail_url,
        // YouTube content renders 16/9 regardless of classification.
        aspect_ratio: AspectRatio::Wide,
        published_at: video.snippet.published_at,
        external_id: video.id,
        external_url: watch_url,
    }
}

/// Highest-resolution thumbnail available.
fn pick_thumbnail(thumbnails: &Thumbnails) -> String {
    [
        &thumbnails.maxres,
        &thumbnails.high,
        &thumbnails.medium,
        &thumbnails.default,
    ]
    .into_iter()
    .flatten()
    .map(|thumb| thumb.url.clone())
    .next()
    .unwrap_or_default()
}

/// Pack the uploads playlist id into a page cursor alongside the API's
/// page token. Neither part contains a colon.
fn pack_cursor(playlist_id: &str, page_token: &str) -> String {
    format!("{}:{}", playlist_id, page_token)
}

fn unpack_cursor(raw: &str) -> Result<(&str, &str), AppError> {
    raw.split_once(':')
        .ok_or_else(|| AppError::ContentFetch("malformed youtube page cursor".to_string()))
}

/// Parse an ISO-8601 duration like `PT1H2M10S` into whole seconds.
/// Malformed input parses to 0.
fn parse_iso8601_duration_seconds(raw: &str) -> u64 {
    let Some(body) = raw.strip_prefix("PT") else {
        return 0;
    };

    let mut total: u64 = 0;
    let mut number: u64 = 0;
    let mut saw_digit = false;

    for ch in body.chars() {
        if let Some(digit) = ch.to_digit(10) {
            number = number.saturating_mul(10).saturating_add(digit as u64);
            saw_digit = true;
            continue;
        }
        if !saw_digit {
            return 0;
        }
        let unit = match ch {
            'H' => 3600,
            'M' => 60,
            'S' => 1,
            _ => return 0,
        };
        total = total.saturating_add(number.saturating_mul(unit));
        number = 0;
        saw_digit = false;
    }

    // Trailing digits without a unit letter
    if saw_digit {
        return 0;
    }

    total
}

// ─── API response shapes ──────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ChannelListResponse {
    #[serde(default)]
    items: Vec<Channel>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    id: String,
    snippet: ChannelSnippet,
    #[serde(rename = "contentDetails")]
    content_details: ChannelContentDetails,
}

#[derive(Debug, Deserialize)]
struct ChannelSnippet {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ChannelContentDetails {
    #[serde(rename = "relatedPlaylists")]
    related_playlists: RelatedPlaylists,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    uploads: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemsResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    #[serde(rename = "contentDetails")]
    content_details: PlaylistItemContentDetails,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemContentDetails {
    #[serde(rename = "videoId")]
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<Video>,
}

#[derive(Debug, Deserialize)]
struct Video {
    id: String,
    snippet: VideoSnippet,
    #[serde(rename = "contentDetails")]
    content_details: VideoContentDetails,
    statistics: VideoStatistics,
}

#[derive(Debug, Deserialize)]
struct VideoSnippet {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "publishedAt")]
    published_at: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    default: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    high: Option<Thumbnail>,
    maxres: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct VideoContentDetails {
    #[serde(default)]
    duration: String,
}

/// YouTube sends statistics counters as JSON strings.
#[derive(Debug, Deserialize)]
struct VideoStatistics {
    #[serde(rename = "viewCount", default, deserialize_with = "string_or_u64")]
    view_count: u64,
    #[serde(
        rename = "likeCount",
        default,
        deserialize_with = "crate::platforms::string_or_u64_opt"
    )]
    like_count: Option<u64>,
    #[serde(
        rename = "commentCount",
        default,
        deserialize_with = "crate::platforms::string_or_u64_opt"
    )]
    comment_count: Option<u64>,
}

/// Check response and parse JSON, mapping failures to `ContentFetch`.
async fn check_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    check_json_as(response, AppError::ContentFetch).await
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

    #[test]
    fn test_duration_parsing() {
        assert_eq!(parse_iso8601_duration_seconds("PT1H2M10S"), 3730);
        assert_eq!(parse_iso8601_duration_seconds("PT45S"), 45);
        assert_eq!(parse_iso8601_duration_seconds("PT90S"), 90);
        assert_eq!(parse_iso8601_duration_seconds("PT3M"), 180);
        assert_eq!(parse_iso8601_duration_seconds(""), 0);
        assert_eq!(parse_iso8601_duration_seconds("P1D"), 0);
        assert_eq!(parse_iso8601_duration_seconds("PT5X"), 0);
        assert_eq!(parse_iso8601_duration_seconds("PT12"), 0);
    }

    fn video_json(duration: &str) -> Video {
        serde_json::from_value(serde_json::json!({
            "id": "vid1",
            "snippet": {
                "title": "My Video",
                "description": "hello",
                "publishedAt": "2026-01-05T12:00:00Z",
                "thumbnails": {
                    "default": {"url": "https://i.ytimg.com/default.jpg"},
                    "high": {"url": "https://i.ytimg.com/high.jpg"}
                }
            },
            "contentDetails": {"duration": duration},
            "statistics": {"viewCount": "1200", "likeCount": "34"}
        }))
        .unwrap()
    }

    #[test]
    fn test_normalize_long_video() {
        let item = normalize_video(video_json("PT10M3S"));
        assert_eq!(item.content_type, ContentType::Video);
        assert_eq!(item.aspect_ratio, AspectRatio::Wide);
        assert_eq!(item.views, 1200);
        assert_eq!(item.likes, Some(34));
        assert_eq!(item.comments, None);
        assert_eq!(item.external_url, "https://www.youtube.com/watch?v=vid1");
        // No maxres thumbnail, so high wins.
        assert_eq!(item.thumbnail_url, "https://i.ytimg.com/high.jpg");
    }

    #[test]
    fn test_normalize_short() {
        let item = normalize_video(video_json("PT45S"));
        assert_eq!(item.content_type, ContentType::Short);
        // Classification changes, aspect ratio does not.
        assert_eq!(item.aspect_ratio, AspectRatio::Wide);
    }

    #[test]
    fn test_malformed_duration_classifies_as_video() {
        let item = normalize_video(video_json("bogus"));
        assert_eq!(item.content_type, ContentType::Video);
    }

    #[test]
    fn test_page_cursor_round_trip() {
        let raw = pack_cursor("UUabc123", "CAUQAA==");
        let (playlist_id, token) = unpack_cursor(&raw).unwrap();
        assert_eq!(playlist_id, "UUabc123");
        assert_eq!(token, "CAUQAA==");
    }

    #[test]
    fn test_malformed_page_cursor_rejected() {
        assert!(unpack_cursor("no-separator").is_err());
    }

    #[test]
    fn test_authorize_url_carries_state_and_redirect() {
        let client = YouTubeClient::new("id-1".to_string(), "secret".to_string());
        let url = client.authorize_url("http://localhost:8080/auth/youtube/callback", "tok123");
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("state=tok123"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fauth%2Fyoutube%2Fcallback"
        ));
    }
}
