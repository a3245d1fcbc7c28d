// SPDX-License-Identifier: MIT

//! Database layer: the `Store` trait plus Firestore and in-memory backends.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{
    Connection, ConnectionPatch, ContentItem, OAuthState, Platform, UserProfile, UsernameMapping,
};
use async_trait::async_trait;
use std::collections::HashMap;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const CONNECTIONS: &str = "connections";
    /// Shared public content cache, keyed `{platform}_{externalId}`
    pub const CONTENT: &str = "content";
    /// Username mappings, keyed by lowercased username
    pub const USERNAMES: &str = "usernames";
    /// Transient CSRF states, keyed by state token
    pub const OAUTH_STATES: &str = "oauth_states";
}

/// Document id for a connection record: one per (user, platform) pair.
pub fn connection_doc_id(user_id: &str, platform: Platform) -> String {
    format!("{}_{}", user_id, platform)
}

/// Persistence operations used by the OAuth flow, sync orchestrator, and
/// portfolio lookup. The Firestore backend serves production; the memory
/// backend serves tests and credential-less deployments.
#[async_trait]
pub trait Store: Send + Sync {
    // ─── OAuth states ─────────────────────────────────────────────

    async fn put_oauth_state(&self, state: &OAuthState) -> Result<(), AppError>;

    /// Look up and delete a state record in one step. Returns the record
    /// even if expired; expiry policy belongs to the caller. The record is
    /// gone either way — states are strictly single-use.
    async fn take_oauth_state(&self, token: &str) -> Result<Option<OAuthState>, AppError>;

    // ─── Connections ──────────────────────────────────────────────

    async fn get_connection(
        &self,
        user_id: &str,
        platform: Platform,
    ) -> Result<Option<Connection>, AppError>;

    async fn get_connections(
        &self,
        user_id: &str,
    ) -> Result<HashMap<Platform, Connection>, AppError>;

    /// Merge-semantics upsert: only fields present in the patch change.
    async fn upsert_connection(
        &self,
        user_id: &str,
        platform: Platform,
        patch: ConnectionPatch,
    ) -> Result<(), AppError>;

    async fn delete_connection(&self, user_id: &str, platform: Platform) -> Result<(), AppError>;

    // ─── Content cache ────────────────────────────────────────────

    async fn upsert_content(&self, item: &ContentItem) -> Result<(), AppError>;

    async fn get_content(&self, id: &str) -> Result<Option<ContentItem>, AppError>;

    async fn content_by_creator(&self, creator_id: &str) -> Result<Vec<ContentItem>, AppError>;

    /// Purge every cached item owned by a creator. Returns the number of
    /// documents deleted.
    async fn delete_content_by_creator(&self, creator_id: &str) -> Result<usize, AppError>;

    // ─── Profiles and usernames ───────────────────────────────────

    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, AppError>;

    async fn put_profile(&self, profile: &UserProfile) -> Result<(), AppError>;

    async fn get_username_mapping(
        &self,
        username: &str,
    ) -> Result<Option<UsernameMapping>, AppError>;

    /// Create a mapping for a normalized username. Fails with `BadRequest`
    /// if the username is already mapped to a different user.
    async fn create_username_mapping(&self, mapping: &UsernameMapping) -> Result<(), AppError>;
}
