// SPDX-License-Identifier: MIT

//! Content sync tests: page walking, cache keys, idempotency, and token
//! refresh policy behavior.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tower::ServiceExt;
use vyllo_api::db::Store;
use vyllo_api::models::{ConnectionPatch, Platform};
use vyllo_api::platforms::{PlatformClient, RefreshPolicy};
use vyllo_api::time_utils::format_utc_rfc3339;

mod common;

use common::{bearer_for, body_json, content_item, create_test_app, FakePlatformClient};

async fn post_sync(
    app: &axum::Router,
    bearer: &str,
    platform: &str,
) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/{}/sync", platform))
                .header(header::AUTHORIZATION, bearer)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

/// Seed a live connection that will not need a refresh.
async fn seed_connection(store: &dyn Store, user_id: &str, platform: Platform) {
    store
        .upsert_connection(
            user_id,
            platform,
            ConnectionPatch {
                is_connected: Some(true),
                access_token: Some("stored-access".to_string()),
                refresh_token: Some("stored-refresh".to_string()),
                expires_at: Some(format_utc_rfc3339(Utc::now() + Duration::hours(1))),
                ..Default::default()
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_sync_without_connection_is_a_bad_request() {
    let clients: Vec<Arc<dyn PlatformClient>> =
        vec![Arc::new(FakePlatformClient::new(Platform::YouTube))];
    let (app, state, _store) = create_test_app(clients);
    let bearer = bearer_for("user-1", &state.config);

    let response = post_sync(&app, &bearer, "youtube").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "youtube not connected");
}

#[tokio::test]
async fn test_sync_walks_pages_and_caches_items() {
    let pages = vec![
        vec![
            content_item(Platform::YouTube, "vid-a", "2026-02-01T00:00:00Z"),
            content_item(Platform::YouTube, "vid-b", "2026-02-02T00:00:00Z"),
        ],
        vec![content_item(Platform::YouTube, "vid-c", "2026-02-03T00:00:00Z")],
    ];
    let clients: Vec<Arc<dyn PlatformClient>> =
        vec![Arc::new(FakePlatformClient::new(Platform::YouTube).with_pages(pages))];
    let (app, state, store) = create_test_app(clients);
    let bearer = bearer_for("user-1", &state.config);
    seed_connection(store.as_ref(), "user-1", Platform::YouTube).await;

    let response = post_sync(&app, &bearer, "youtube").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["itemsAdded"], 3);
    assert_eq!(body["totalFetched"], 3);

    // Items land under platform-prefixed ids, owned by the syncing user.
    let cached = store.get_content("youtube_vid-a").await.unwrap().unwrap();
    assert_eq!(cached.creator_id, "user-1");
    assert_eq!(cached.title, "Item vid-a");
    assert!(store.get_content("youtube_vid-c").await.unwrap().is_some());

    // The sync stamps last_synced.
    let conn = store
        .get_connection("user-1", Platform::YouTube)
        .await
        .unwrap()
        .unwrap();
    assert!(conn.last_synced.is_some());
    // Tokens were fresh, so they are untouched.
    assert_eq!(conn.access_token.as_deref(), Some("stored-access"));
}

#[tokio::test]
async fn test_resync_updates_in_place() {
    let pages = vec![vec![
        content_item(Platform::TikTok, "clip-1", "2026-02-01T00:00:00Z"),
        content_item(Platform::TikTok, "clip-2", "2026-02-02T00:00:00Z"),
    ]];
    let clients: Vec<Arc<dyn PlatformClient>> =
        vec![Arc::new(FakePlatformClient::new(Platform::TikTok).with_pages(pages))];
    let (app, state, store) = create_test_app(clients);
    let bearer = bearer_for("user-1", &state.config);
    seed_connection(store.as_ref(), "user-1", Platform::TikTok).await;

    post_sync(&app, &bearer, "tiktok").await;
    let response = post_sync(&app, &bearer, "tiktok").await;
    assert_eq!(response.status(), StatusCode::OK);

    // Same two documents, not four.
    let items = store.content_by_creator("user-1").await.unwrap();
    assert_eq!(items.len(), 2);
}

#[tokio::test]
async fn test_expired_token_refreshes_before_fetch() {
    let client = Arc::new(
        FakePlatformClient::new(Platform::YouTube)
            .with_pages(vec![vec![content_item(
                Platform::YouTube,
                "vid-a",
                "2026-02-01T00:00:00Z",
            )]]),
    );
    let (app, state, store) = create_test_app(vec![client.clone() as Arc<dyn PlatformClient>]);
    let bearer = bearer_for("user-1", &state.config);

    // Connection whose token expired an hour ago.
    store
        .upsert_connection(
            "user-1",
            Platform::YouTube,
            ConnectionPatch {
                is_connected: Some(true),
                access_token: Some("stale-access".to_string()),
                refresh_token: Some("stored-refresh".to_string()),
                expires_at: Some(format_utc_rfc3339(Utc::now() - Duration::hours(1))),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let response = post_sync(&app, &bearer, "youtube").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        client.refresh_calls.load(std::sync::atomic::Ordering::SeqCst),
        1
    );

    // The refreshed grant is persisted; the old refresh token survives.
    let conn = store
        .get_connection("user-1", Platform::YouTube)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conn.access_token.as_deref(), Some("refreshed-access"));
    assert_eq!(conn.refresh_token.as_deref(), Some("stored-refresh"));
}

#[tokio::test]
async fn test_expired_token_without_refresh_token_fails() {
    let clients: Vec<Arc<dyn PlatformClient>> =
        vec![Arc::new(FakePlatformClient::new(Platform::YouTube))];
    let (app, state, store) = create_test_app(clients);
    let bearer = bearer_for("user-1", &state.config);

    store
        .upsert_connection(
            "user-1",
            Platform::YouTube,
            ConnectionPatch {
                is_connected: Some(true),
                access_token: Some("stale-access".to_string()),
                expires_at: Some(format_utc_rfc3339(Utc::now() - Duration::hours(1))),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let response = post_sync(&app, &bearer, "youtube").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body = body_json(response).await;
    assert_eq!(body["error"], "token_refresh_failed");
}

#[tokio::test]
async fn test_rolling_refresh_failure_degrades_to_stored_token() {
    let client = Arc::new(
        FakePlatformClient::new(Platform::Instagram)
            .with_policy(RefreshPolicy::Rolling {
                ahead: Duration::days(10),
            })
            .with_pages(vec![vec![content_item(
                Platform::Instagram,
                "media-1",
                "2026-02-01T00:00:00Z",
            )]])
            .failing_refresh(),
    );
    let (app, state, store) = create_test_app(vec![client.clone() as Arc<dyn PlatformClient>]);
    let bearer = bearer_for("user-1", &state.config);

    // Expiry within the rolling window, so a refresh is attempted.
    store
        .upsert_connection(
            "user-1",
            Platform::Instagram,
            ConnectionPatch {
                is_connected: Some(true),
                access_token: Some("long-lived-access".to_string()),
                expires_at: Some(format_utc_rfc3339(Utc::now() + Duration::days(3))),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let response = post_sync(&app, &bearer, "instagram").await;
    // Refresh failed but the sync carried on with the stored token.
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        client.refresh_calls.load(std::sync::atomic::Ordering::SeqCst),
        1
    );

    let body = body_json(response).await;
    assert_eq!(body["itemsAdded"], 1);
}

#[tokio::test]
async fn test_rolling_refresh_skipped_when_expiry_is_far() {
    let client = Arc::new(
        FakePlatformClient::new(Platform::Instagram)
            .with_policy(RefreshPolicy::Rolling {
                ahead: Duration::days(10),
            })
            .with_pages(vec![Vec::new()]),
    );
    let (app, state, store) = create_test_app(vec![client.clone() as Arc<dyn PlatformClient>]);
    let bearer = bearer_for("user-1", &state.config);

    store
        .upsert_connection(
            "user-1",
            Platform::Instagram,
            ConnectionPatch {
                is_connected: Some(true),
                access_token: Some("long-lived-access".to_string()),
                expires_at: Some(format_utc_rfc3339(Utc::now() + Duration::days(40))),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let response = post_sync(&app, &bearer, "instagram").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        client.refresh_calls.load(std::sync::atomic::Ordering::SeqCst),
        0
    );
}

#[tokio::test]
async fn test_disconnect_always_succeeds_and_drops_connection() {
    let client = Arc::new(FakePlatformClient::new(Platform::YouTube));
    let (app, state, store) = create_test_app(vec![client.clone() as Arc<dyn PlatformClient>]);
    let bearer = bearer_for("user-1", &state.config);
    seed_connection(store.as_ref(), "user-1", Platform::YouTube).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/youtube/disconnect")
                .header(header::AUTHORIZATION, &bearer)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(
        client.revoke_calls.load(std::sync::atomic::Ordering::SeqCst),
        1
    );
    assert!(store
        .get_connection("user-1", Platform::YouTube)
        .await
        .unwrap()
        .is_none());

    // Disconnecting a platform that was never connected still succeeds.
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/youtube/disconnect")
                .header(header::AUTHORIZATION, &bearer)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
