// SPDX-License-Identifier: MIT

//! In-memory `Store` backend.
//!
//! Used by the test suite and as a fallback when no Firestore project is
//! configured. State lives in process memory and disappears on restart.

use crate::db::{connection_doc_id, Store};
use crate::error::AppError;
use crate::models::{
    normalize_username, Connection, ConnectionPatch, ContentItem, OAuthState, Platform,
    UserProfile, UsernameMapping,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;

#[derive(Default)]
pub struct MemoryStore {
    oauth_states: DashMap<String, OAuthState>,
    connections: DashMap<String, Connection>,
    content: DashMap<String, ContentItem>,
    profiles: DashMap<String, UserProfile>,
    usernames: DashMap<String, UsernameMapping>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn put_oauth_state(&self, state: &OAuthState) -> Result<(), AppError> {
        self.oauth_states.insert(state.token.clone(), state.clone());
        Ok(())
    }

    async fn take_oauth_state(&self, token: &str) -> Result<Option<OAuthState>, AppError> {
        Ok(self.oauth_states.remove(token).map(|(_, state)| state))
    }

    async fn get_connection(
        &self,
        user_id: &str,
        platform: Platform,
    ) -> Result<Option<Connection>, AppError> {
        Ok(self
            .connections
            .get(&connection_doc_id(user_id, platform))
            .map(|entry| entry.clone()))
    }

    async fn get_connections(
        &self,
        user_id: &str,
    ) -> Result<HashMap<Platform, Connection>, AppError> {
        let mut found = HashMap::new();
        for platform in Platform::ALL {
            if let Some(conn) = self.get_connection(user_id, platform).await? {
                found.insert(platform, conn);
            }
        }
        Ok(found)
    }

    async fn upsert_connection(
        &self,
        user_id: &str,
        platform: Platform,
        patch: ConnectionPatch,
    ) -> Result<(), AppError> {
        let key = connection_doc_id(user_id, platform);
        let existing = self.connections.get(&key).map(|entry| entry.clone());
        self.connections.insert(key, patch.apply(platform, existing));
        Ok(())
    }

    async fn delete_connection(&self, user_id: &str, platform: Platform) -> Result<(), AppError> {
        self.connections.remove(&connection_doc_id(user_id, platform));
        Ok(())
    }

    async fn upsert_content(&self, item: &ContentItem) -> Result<(), AppError> {
        self.content.insert(item.id.clone(), item.clone());
        Ok(())
    }

    async fn get_content(&self, id: &str) -> Result<Option<ContentItem>, AppError> {
        Ok(self.content.get(id).map(|entry| entry.clone()))
    }

    async fn content_by_creator(&self, creator_id: &str) -> Result<Vec<ContentItem>, AppError> {
        Ok(self
            .content
            .iter()
            .filter(|entry| entry.creator_id == creator_id)
            .map(|entry| entry.clone())
            .collect())
    }

    async fn delete_content_by_creator(&self, creator_id: &str) -> Result<usize, AppError> {
        let ids: Vec<String> = self
            .content
            .iter()
            .filter(|entry| entry.creator_id == creator_id)
            .map(|entry| entry.id.clone())
            .collect();
        for id in &ids {
            self.content.remove(id);
        }
        Ok(ids.len())
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, AppError> {
        Ok(self.profiles.get(user_id).map(|entry| entry.clone()))
    }

    async fn put_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
        self.profiles
            .insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }

    async fn get_username_mapping(
        &self,
        username: &str,
    ) -> Result<Option<UsernameMapping>, AppError> {
        Ok(self
            .usernames
            .get(&normalize_username(username))
            .map(|entry| entry.clone()))
    }

    async fn create_username_mapping(&self, mapping: &UsernameMapping) -> Result<(), AppError> {
        let key = normalize_username(&mapping.username);
        if let Some(existing) = self.usernames.get(&key) {
            if existing.user_id != mapping.user_id {
                return Err(AppError::BadRequest("username already taken".to_string()));
            }
            return Ok(());
        }
        self.usernames.insert(key, mapping.clone());
        Ok(())
    }
}
