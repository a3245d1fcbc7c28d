// SPDX-License-Identifier: MIT

//! Firestore `Store` backend.
//!
//! Wraps the fluent Firestore API with typed operations for connections,
//! the shared content cache, profiles, username mappings, and transient
//! OAuth states.

use crate::db::{collections, connection_doc_id, Store};
use crate::error::AppError;
use crate::models::{
    normalize_username, Connection, ConnectionPatch, ContentItem, OAuthState, Platform,
    UserProfile, UsernameMapping,
};
use async_trait::async_trait;
use std::collections::HashMap;

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreStore {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a client handle without a backing connection.
    ///
    /// All database operations will return an error if called. Lets the
    /// server boot (health checks, config validation) without Firestore
    /// credentials.
    pub fn new_unconfigured() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Helper to batch delete documents using transactions.
    async fn batch_delete<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        F: Fn(&T) -> String,
    {
        let client = self.get_client()?;

        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for item in chunk {
                let doc_id = id_extractor(item);
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(&doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }
}

#[async_trait]
impl Store for FirestoreStore {
    // ─── OAuth states ─────────────────────────────────────────────

    async fn put_oauth_state(&self, state: &OAuthState) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::OAUTH_STATES)
            .document_id(&state.token)
            .object(state)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn take_oauth_state(&self, token: &str) -> Result<Option<OAuthState>, AppError> {
        let state: Option<OAuthState> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::OAUTH_STATES)
            .obj()
            .one(token)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // Delete whether or not it validates; states are single-use.
        if state.is_some() {
            self.get_client()?
                .fluent()
                .delete()
                .from(collections::OAUTH_STATES)
                .document_id(token)
                .execute()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        Ok(state)
    }

    // ─── Connections ──────────────────────────────────────────────

    async fn get_connection(
        &self,
        user_id: &str,
        platform: Platform,
    ) -> Result<Option<Connection>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CONNECTIONS)
            .obj()
            .one(&connection_doc_id(user_id, platform))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
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
        // Read-merge-write; concurrent sync and connect flows for the same
        // (user, platform) are not expected.
        let existing = self.get_connection(user_id, platform).await?;
        let merged = patch.apply(platform, existing);

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::CONNECTIONS)
            .document_id(connection_doc_id(user_id, platform))
            .object(&merged)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete_connection(&self, user_id: &str, platform: Platform) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::CONNECTIONS)
            .document_id(connection_doc_id(user_id, platform))
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Content cache ────────────────────────────────────────────

    async fn upsert_content(&self, item: &ContentItem) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::CONTENT)
            .document_id(&item.id)
            .object(item)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn get_content(&self, id: &str) -> Result<Option<ContentItem>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CONTENT)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn content_by_creator(&self, creator_id: &str) -> Result<Vec<ContentItem>, AppError> {
        let creator_id = creator_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::CONTENT)
            .filter(move |q| q.field("creator_id").eq(creator_id.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn delete_content_by_creator(&self, creator_id: &str) -> Result<usize, AppError> {
        let items = self.content_by_creator(creator_id).await?;
        let count = items.len();

        self.batch_delete(&items, collections::CONTENT, |item: &ContentItem| {
            item.id.clone()
        })
        .await?;

        tracing::debug!(creator_id, count, "Deleted cached content");
        Ok(count)
    }

    // ─── Profiles and usernames ───────────────────────────────────

    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn put_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&profile.user_id)
            .object(profile)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn get_username_mapping(
        &self,
        username: &str,
    ) -> Result<Option<UsernameMapping>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERNAMES)
            .obj()
            .one(&normalize_username(username))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn create_username_mapping(&self, mapping: &UsernameMapping) -> Result<(), AppError> {
        let key = normalize_username(&mapping.username);

        if let Some(existing) = self.get_username_mapping(&key).await? {
            if existing.user_id != mapping.user_id {
                return Err(AppError::BadRequest("username already taken".to_string()));
            }
            return Ok(());
        }

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERNAMES)
            .document_id(&key)
            .object(mapping)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
