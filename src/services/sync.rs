// SPDX-License-Identifier: MIT

//! Content sync orchestrator.
//!
//! A sync runs in four phases: load the connection, refresh the access
//! token per the platform's policy, walk the content listing up to the
//! platform's page limit, and upsert every normalized item into the
//! shared cache. Re-syncing updates items in place; nothing is deleted.

use crate::db::Store;
use crate::error::AppError;
use crate::models::{Connection, ConnectionPatch, Platform};
use crate::platforms::{PlatformRegistry, RefreshPolicy, TokenGrant};
use crate::time_utils::{format_utc_rfc3339, parse_rfc3339_utc};
use chrono::{Duration, Utc};
use futures_util::{stream, StreamExt};
use std::sync::Arc;

const MAX_CONCURRENT_DB_OPS: usize = 50;

/// Result of a completed sync.
#[derive(Debug, Clone, Copy)]
pub struct SyncOutcome {
    /// Items returned by the platform across all fetched pages
    pub total_fetched: usize,
    /// Items written to the content cache
    pub items_saved: usize,
}

#[derive(Clone)]
pub struct SyncService {
    store: Arc<dyn Store>,
    platforms: PlatformRegistry,
}

impl SyncService {
    pub fn new(store: Arc<dyn Store>, platforms: PlatformRegistry) -> Self {
        Self { store, platforms }
    }

    /// Sync a user's content from one platform into the shared cache.
    pub async fn sync(&self, user_id: &str, platform: Platform) -> Result<SyncOutcome, AppError> {
        let conn = self
            .store
            .get_connection(user_id, platform)
            .await?
            .filter(|conn| conn.is_connected)
            .ok_or(AppError::NotConnected(platform))?;

        let access_token = self.ensure_fresh_token(user_id, platform, &conn).await?;

        let client = self.platforms.get(platform)?;

        // Walk the listing newest-first, bounded by the page limit.
        let mut fetched = Vec::new();
        let mut cursor = None;
        for _ in 0..client.page_limit() {
            let page = client.fetch_content(&access_token, cursor).await?;
            fetched.extend(page.items);
            cursor = page.next;
            if cursor.is_none() {
                break;
            }
        }

        let total_fetched = fetched.len();

        // Concurrent upserts, bounded to avoid overloading the backend.
        // A single bad item must not sink the whole sync: failures are
        // logged and skipped.
        let store = &self.store;
        let items_saved = stream::iter(fetched)
            .map(|content| async move {
                let item = content.into_item(user_id);
                match store.upsert_content(&item).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!(id = %item.id, error = %e, "Failed to cache content item");
                        false
                    }
                }
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<bool>>()
            .await
            .into_iter()
            .filter(|saved| *saved)
            .count();

        self.store
            .upsert_connection(
                user_id,
                platform,
                ConnectionPatch {
                    last_synced: Some(format_utc_rfc3339(Utc::now())),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(
            user_id,
            %platform,
            total_fetched,
            items_saved,
            "Content sync complete"
        );

        Ok(SyncOutcome {
            total_fetched,
            items_saved,
        })
    }

    /// Apply the platform's refresh policy and return a usable access token.
    ///
    /// `OnExpiry` platforms refresh only once the stored token has expired,
    /// and a refresh failure aborts the sync. `Rolling` platforms refresh
    /// ahead of expiry and fall back to the stored token on failure.
    async fn ensure_fresh_token(
        &self,
        user_id: &str,
        platform: Platform,
        conn: &Connection,
    ) -> Result<String, AppError> {
        let client = self.platforms.get(platform)?;
        let access_token = conn
            .access_token
            .clone()
            .ok_or(AppError::NotConnected(platform))?;

        let expires_at = conn.expires_at.as_deref().and_then(parse_rfc3339_utc);
        let now = Utc::now();

        match client.refresh_policy() {
            RefreshPolicy::OnExpiry => {
                let expired = expires_at.is_some_and(|at| now >= at);
                if !expired {
                    return Ok(access_token);
                }

                let refresh_token = conn.refresh_token.as_deref().ok_or_else(|| {
                    AppError::TokenRefresh(format!(
                        "{} token expired and no refresh token is stored",
                        platform
                    ))
                })?;

                let grant = client.refresh_token(refresh_token).await?;
                self.persist_grant(user_id, platform, &grant).await?;
                Ok(grant.access_token)
            }
            RefreshPolicy::Rolling { ahead } => {
                let due = match expires_at {
                    Some(at) => now + ahead >= at,
                    // Unknown expiry: refresh to learn it.
                    None => true,
                };
                if !due {
                    return Ok(access_token);
                }

                match client.refresh_token(&access_token).await {
                    Ok(grant) => {
                        self.persist_grant(user_id, platform, &grant).await?;
                        Ok(grant.access_token)
                    }
                    Err(e) => {
                        // The old token may still work; let the fetch decide.
                        tracing::warn!(
                            user_id,
                            %platform,
                            error = %e,
                            "Rolling token refresh failed, continuing with stored token"
                        );
                        Ok(access_token)
                    }
                }
            }
        }
    }

    async fn persist_grant(
        &self,
        user_id: &str,
        platform: Platform,
        grant: &TokenGrant,
    ) -> Result<(), AppError> {
        let expires_at = grant
            .expires_in
            .map(|secs| format_utc_rfc3339(Utc::now() + Duration::seconds(secs)));

        self.store
            .upsert_connection(
                user_id,
                platform,
                ConnectionPatch {
                    access_token: Some(grant.access_token.clone()),
                    // Absent means the platform kept the old refresh token.
                    refresh_token: grant.refresh_token.clone(),
                    expires_at,
                    ..Default::default()
                },
            )
            .await
    }
}
