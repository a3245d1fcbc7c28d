// SPDX-License-Identifier: MIT

//! Platform client abstraction.
//!
//! Each supported platform implements [`PlatformClient`]: building the
//! consent URL, exchanging the authorization code, refreshing tokens,
//! fetching a page of content, and revoking access. Raw platform response
//! shapes stay inside each client module; everything crossing the trait
//! boundary is normalized.

pub mod instagram;
pub mod tiktok;
pub mod youtube;

pub use instagram::InstagramClient;
pub use tiktok::TikTokClient;
pub use youtube::YouTubeClient;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{NormalizedContent, Platform};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Token material returned by an exchange or refresh.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: String,
    /// Absent on Instagram (long-lived tokens refresh via the access token)
    pub refresh_token: Option<String>,
    /// Token lifetime in seconds, if the platform reports one
    pub expires_in: Option<i64>,
}

/// Platform-native account identity captured at connect time.
#[derive(Debug, Clone)]
pub struct PlatformIdentity {
    /// Channel id / open id / IG user id
    pub native_id: String,
    /// Channel title / display name / username
    pub display_name: String,
}

/// Opaque pagination position within a content listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    /// YouTube uploads-playlist position (playlist id + page token)
    PageToken(String),
    /// TikTok numeric cursor
    Offset(u64),
    /// Instagram `after` cursor
    After(String),
}

/// One page of normalized content plus the position of the next page.
#[derive(Debug, Clone)]
pub struct ContentPage {
    pub items: Vec<NormalizedContent>,
    /// `None` when the listing is exhausted
    pub next: Option<Cursor>,
}

/// When and how a platform's access tokens are refreshed before a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Refresh only once the stored token has expired, using the refresh
    /// token. A failure aborts the sync.
    OnExpiry,
    /// Refresh whenever expiry is within `ahead`, using the current access
    /// token. A failure degrades to the stored token instead of aborting.
    Rolling { ahead: chrono::Duration },
}

#[async_trait]
pub trait PlatformClient: Send + Sync {
    fn platform(&self) -> Platform;

    /// Build the consent-screen URL the user is redirected to.
    fn authorize_url(&self, redirect_uri: &str, state: &str) -> String;

    /// Exchange the callback `code` for tokens and the account identity.
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<(TokenGrant, PlatformIdentity), AppError>;

    /// Obtain a fresh grant. For `OnExpiry` platforms `token` is the stored
    /// refresh token; for `Rolling` platforms it is the current access token.
    async fn refresh_token(&self, token: &str) -> Result<TokenGrant, AppError>;

    fn refresh_policy(&self) -> RefreshPolicy;

    /// Fetch one page of the account's content, newest first.
    async fn fetch_content(
        &self,
        access_token: &str,
        cursor: Option<Cursor>,
    ) -> Result<ContentPage, AppError>;

    /// Pages fetched per sync before stopping, whatever the cursor says.
    fn page_limit(&self) -> u32;

    /// Revoke the grant with the platform. Platforms without a revocation
    /// endpoint treat this as a successful no-op.
    async fn revoke(&self, access_token: &str) -> Result<(), AppError>;
}

/// The set of configured platform clients, looked up by platform.
#[derive(Clone)]
pub struct PlatformRegistry {
    clients: HashMap<Platform, Arc<dyn PlatformClient>>,
}

impl PlatformRegistry {
    pub fn from_config(config: &Config) -> Self {
        let mut clients: HashMap<Platform, Arc<dyn PlatformClient>> = HashMap::new();
        clients.insert(
            Platform::YouTube,
            Arc::new(YouTubeClient::new(
                config.youtube_client_id.clone(),
                config.youtube_client_secret.clone(),
            )),
        );
        clients.insert(
            Platform::TikTok,
            Arc::new(TikTokClient::new(
                config.tiktok_client_key.clone(),
                config.tiktok_client_secret.clone(),
            )),
        );
        clients.insert(
            Platform::Instagram,
            Arc::new(InstagramClient::new(
                config.instagram_app_id.clone(),
                config.instagram_app_secret.clone(),
            )),
        );
        Self { clients }
    }

    /// Build a registry from explicit clients (tests swap in fakes here).
    pub fn from_clients(clients: Vec<Arc<dyn PlatformClient>>) -> Self {
        Self {
            clients: clients
                .into_iter()
                .map(|client| (client.platform(), client))
                .collect(),
        }
    }

    pub fn get(&self, platform: Platform) -> Result<&Arc<dyn PlatformClient>, AppError> {
        self.clients
            .get(&platform)
            .ok_or_else(|| AppError::BadRequest(format!("unsupported platform: {}", platform)))
    }
}

/// Shared HTTP client for platform API calls.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Deserialize a counter that some platforms send as a JSON string.
/// Malformed strings count as zero rather than failing the whole page.
pub(crate) fn string_or_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Str(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Num(n) => n,
        Raw::Str(s) => s.parse().unwrap_or(0),
    })
}

/// Optional variant of [`string_or_u64`] for counters a platform may omit.
pub(crate) fn string_or_u64_opt<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Str(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        None => None,
        Some(Raw::Num(n)) => Some(n),
        Some(Raw::Str(s)) => Some(s.parse().unwrap_or(0)),
    })
}
