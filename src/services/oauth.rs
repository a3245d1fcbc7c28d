// SPDX-License-Identifier: MIT

//! OAuth connect flow: consent URL construction, state management, and
//! code-for-token exchange.

use crate::config::Config;
use crate::db::Store;
use crate::error::AppError;
use crate::models::{ConnectionPatch, OAuthState, Platform};
use crate::platforms::PlatformRegistry;
use crate::time_utils::format_utc_rfc3339;
use anyhow::anyhow;
use base64::Engine;
use chrono::{Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use std::sync::Arc;

/// How long a state token stays valid after the user is sent to consent.
const STATE_TTL_MINUTES: i64 = 10;

/// Entropy of the state token in bytes.
const STATE_TOKEN_BYTES: usize = 32;

#[derive(Clone)]
pub struct OAuthService {
    store: Arc<dyn Store>,
    platforms: PlatformRegistry,
    config: Config,
}

impl OAuthService {
    pub fn new(store: Arc<dyn Store>, platforms: PlatformRegistry, config: Config) -> Self {
        Self {
            store,
            platforms,
            config,
        }
    }

    /// Start a connect flow: persist a single-use state record and return
    /// the platform consent URL to redirect the user to.
    pub async fn begin(&self, user_id: &str, platform: Platform) -> Result<String, AppError> {
        let client = self.platforms.get(platform)?;

        let token = generate_state_token()?;
        let now = Utc::now();
        let state = OAuthState {
            token: token.clone(),
            user_id: user_id.to_string(),
            platform,
            created_at: format_utc_rfc3339(now),
            expires_at: format_utc_rfc3339(now + Duration::minutes(STATE_TTL_MINUTES)),
        };
        self.store.put_oauth_state(&state).await?;

        let redirect_uri = self.config.redirect_uri(platform);
        let url = client.authorize_url(&redirect_uri, &token);

        tracing::info!(user_id, %platform, "OAuth flow started");
        Ok(url)
    }

    /// Finish a connect flow: validate and consume the state, exchange the
    /// code, and persist the connection. Returns the connecting user id.
    pub async fn complete(
        &self,
        platform: Platform,
        code: &str,
        state_token: &str,
    ) -> Result<String, AppError> {
        // Consume first so the token is spent even when validation fails.
        let state = self
            .store
            .take_oauth_state(state_token)
            .await?
            .ok_or(AppError::InvalidState)?;

        if state.is_expired(Utc::now()) {
            return Err(AppError::ExpiredState);
        }
        // A state minted for one platform must not complete another's flow.
        if state.platform != platform {
            return Err(AppError::InvalidState);
        }

        let client = self.platforms.get(platform)?;
        let redirect_uri = self.config.redirect_uri(platform);
        let (grant, identity) = client.exchange_code(code, &redirect_uri).await?;

        let expires_at = grant
            .expires_in
            .map(|secs| format_utc_rfc3339(Utc::now() + Duration::seconds(secs)));

        self.store
            .upsert_connection(
                &state.user_id,
                platform,
                ConnectionPatch {
                    is_connected: Some(true),
                    access_token: Some(grant.access_token),
                    refresh_token: grant.refresh_token,
                    native_id: Some(identity.native_id),
                    display_name: Some(identity.display_name),
                    expires_at,
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(user_id = %state.user_id, %platform, "Platform connected");
        Ok(state.user_id)
    }

    /// Disconnect a platform: best-effort token revocation, then drop the
    /// stored connection. Never fails on revocation errors.
    pub async fn disconnect(&self, user_id: &str, platform: Platform) -> Result<(), AppError> {
        if let Some(conn) = self.store.get_connection(user_id, platform).await? {
            if let Some(access_token) = conn.access_token.as_deref() {
                let client = self.platforms.get(platform)?;
                if let Err(e) = client.revoke(access_token).await {
                    tracing::warn!(user_id, %platform, error = %e, "Token revocation failed");
                }
            }
        }

        self.store.delete_connection(user_id, platform).await?;

        tracing::info!(user_id, %platform, "Platform disconnected");
        Ok(())
    }
}

/// Random URL-safe state token.
fn generate_state_token() -> Result<String, AppError> {
    let mut bytes = [0u8; STATE_TOKEN_BYTES];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow!("system RNG failure")))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_tokens_are_unique_and_url_safe() {
        let a = generate_state_token().unwrap();
        let b = generate_state_token().unwrap();
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        // 32 bytes of entropy encode to 43 base64 characters.
        assert_eq!(a.len(), 43);
    }
}
