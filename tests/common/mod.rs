// SPDX-License-Identifier: MIT

//! Shared test harness: an in-memory app plus scriptable platform clients.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use vyllo_api::config::Config;
use vyllo_api::db::MemoryStore;
use vyllo_api::error::AppError;
use vyllo_api::models::{
    AspectRatio, ContentType, NormalizedContent, Platform,
};
use vyllo_api::platforms::{
    ContentPage, Cursor, PlatformClient, PlatformIdentity, PlatformRegistry, RefreshPolicy,
    TokenGrant,
};
use vyllo_api::routes::create_router;
use vyllo_api::AppState;

/// Scriptable platform client. Pages are served in order through an
/// offset cursor; exchanges and refreshes replay canned outcomes.
pub struct FakePlatformClient {
    platform: Platform,
    policy: RefreshPolicy,
    pages: Vec<Vec<NormalizedContent>>,
    exchange_ok: bool,
    refresh_ok: bool,
    pub refresh_calls: AtomicUsize,
    pub revoke_calls: AtomicUsize,
}

impl FakePlatformClient {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            policy: RefreshPolicy::OnExpiry,
            pages: Vec::new(),
            exchange_ok: true,
            refresh_ok: true,
            refresh_calls: AtomicUsize::new(0),
            revoke_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_policy(mut self, policy: RefreshPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_pages(mut self, pages: Vec<Vec<NormalizedContent>>) -> Self {
        self.pages = pages;
        self
    }

    pub fn failing_exchange(mut self) -> Self {
        self.exchange_ok = false;
        self
    }

    pub fn failing_refresh(mut self) -> Self {
        self.refresh_ok = false;
        self
    }
}

#[async_trait]
impl PlatformClient for FakePlatformClient {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn authorize_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "https://consent.example/{}?redirect_uri={}&state={}",
            self.platform, redirect_uri, state
        )
    }

    async fn exchange_code(
        &self,
        code: &str,
        _redirect_uri: &str,
    ) -> Result<(TokenGrant, PlatformIdentity), AppError> {
        if !self.exchange_ok {
            return Err(AppError::AuthExchange("exchange refused".to_string()));
        }
        Ok((
            TokenGrant {
                access_token: format!("access-for-{}", code),
                refresh_token: Some(format!("refresh-for-{}", code)),
                expires_in: Some(3600),
            },
            PlatformIdentity {
                native_id: format!("{}-native-id", self.platform),
                display_name: "Fake Creator".to_string(),
            },
        ))
    }

    async fn refresh_token(&self, _token: &str) -> Result<TokenGrant, AppError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if !self.refresh_ok {
            return Err(AppError::TokenRefresh("refresh refused".to_string()));
        }
        Ok(TokenGrant {
            access_token: "refreshed-access".to_string(),
            refresh_token: None,
            expires_in: Some(3600),
        })
    }

    fn refresh_policy(&self) -> RefreshPolicy {
        self.policy
    }

    async fn fetch_content(
        &self,
        _access_token: &str,
        cursor: Option<Cursor>,
    ) -> Result<ContentPage, AppError> {
        let index = match cursor {
            None => 0,
            Some(Cursor::Offset(i)) => i as usize,
            Some(other) => {
                return Err(AppError::ContentFetch(format!(
                    "unexpected cursor {:?}",
                    other
                )))
            }
        };

        let items = self.pages.get(index).cloned().unwrap_or_default();
        let next = if index + 1 < self.pages.len() {
            Some(Cursor::Offset(index as u64 + 1))
        } else {
            None
        };
        Ok(ContentPage { items, next })
    }

    fn page_limit(&self) -> u32 {
        10
    }

    async fn revoke(&self, _access_token: &str) -> Result<(), AppError> {
        self.revoke_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A normalized item for seeding fake pages.
#[allow(dead_code)]
pub fn content_item(platform: Platform, external_id: &str, published_at: &str) -> NormalizedContent {
    NormalizedContent {
        platform,
        content_type: ContentType::Video,
        title: format!("Item {}", external_id),
        description: None,
        views: 100,
        likes: Some(10),
        comments: Some(1),
        shares: None,
        media_url: format!("https://media.example/{}", external_id),
        thumbnail_url: format!("https://thumb.example/{}", external_id),
        aspect_ratio: AspectRatio::Wide,
        published_at: published_at.to_string(),
        external_id: external_id.to_string(),
        external_url: format!("https://watch.example/{}", external_id),
    }
}

/// Create a test app around an in-memory store and the given fake clients.
/// Returns the router, the state, and a handle to the store for assertions.
#[allow(dead_code)]
pub fn create_test_app(
    clients: Vec<Arc<dyn PlatformClient>>,
) -> (axum::Router, Arc<AppState>, Arc<MemoryStore>) {
    let config = Config::test_default();
    let store = Arc::new(MemoryStore::new());
    let registry = PlatformRegistry::from_clients(clients);

    let state = Arc::new(AppState::new(config, store.clone(), registry));
    (create_router(state.clone()), state, store)
}

/// Bearer header value for an authenticated test user.
#[allow(dead_code)]
pub fn bearer_for(user_id: &str, config: &Config) -> String {
    let token = vyllo_api::middleware::create_jwt(user_id, &config.jwt_signing_key)
        .expect("Failed to create JWT");
    format!("Bearer {}", token)
}

/// Read a JSON response body.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}
