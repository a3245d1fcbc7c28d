// SPDX-License-Identifier: MIT

//! Per-(user, platform) OAuth connection record.

use crate::models::Platform;
use serde::{Deserialize, Serialize};

/// Stored connection document.
///
/// Invariant: `is_connected == true` implies a non-empty access token.
/// `expires_at` is authoritative for refresh decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub platform: Platform,
    pub is_connected: bool,
    /// Platform access token (secret; never exposed through the API)
    pub access_token: Option<String>,
    /// Refresh token where the platform grants one (YouTube, TikTok)
    pub refresh_token: Option<String>,
    /// Platform-native identifier (channel id / open id / ig user id)
    pub native_id: Option<String>,
    /// Platform display name (channel title / display name / username)
    pub display_name: Option<String>,
    /// Access token expiry (RFC3339)
    pub expires_at: Option<String>,
    /// Last successful sync (RFC3339)
    pub last_synced: Option<String>,
}

impl Connection {
    fn empty(platform: Platform) -> Self {
        Self {
            platform,
            is_connected: false,
            access_token: None,
            refresh_token: None,
            native_id: None,
            display_name: None,
            expires_at: None,
            last_synced: None,
        }
    }
}

/// Partial update for a connection, applied with merge semantics:
/// only supplied fields change.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConnectionPatch {
    pub is_connected: Option<bool>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub native_id: Option<String>,
    pub display_name: Option<String>,
    pub expires_at: Option<String>,
    pub last_synced: Option<String>,
}

impl ConnectionPatch {
    /// Merge this patch into an existing connection (or a fresh record).
    pub fn apply(self, platform: Platform, existing: Option<Connection>) -> Connection {
        let mut conn = existing.unwrap_or_else(|| Connection::empty(platform));
        conn.platform = platform;

        if let Some(v) = self.is_connected {
            conn.is_connected = v;
        }
        if let Some(v) = self.access_token {
            conn.access_token = Some(v);
        }
        if let Some(v) = self.refresh_token {
            conn.refresh_token = Some(v);
        }
        if let Some(v) = self.native_id {
            conn.native_id = Some(v);
        }
        if let Some(v) = self.display_name {
            conn.display_name = Some(v);
        }
        if let Some(v) = self.expires_at {
            conn.expires_at = Some(v);
        }
        if let Some(v) = self.last_synced {
            conn.last_synced = Some(v);
        }

        conn
    }
}
