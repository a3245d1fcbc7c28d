// SPDX-License-Identifier: MIT

//! Vyllo API: creator portfolio backend.
//!
//! This crate provides the backend API for connecting creator accounts on
//! YouTube, TikTok, and Instagram via OAuth, syncing their content into a
//! shared cache, and serving public portfolio pages.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod platforms;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Store;
use platforms::PlatformRegistry;
use services::{OAuthService, SyncService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub oauth: OAuthService,
    pub sync: SyncService,
}

impl AppState {
    /// Wire up services around a store and platform registry.
    pub fn new(config: Config, store: Arc<dyn Store>, platforms: PlatformRegistry) -> Self {
        let oauth = OAuthService::new(store.clone(), platforms.clone(), config.clone());
        let sync = SyncService::new(store.clone(), platforms);
        Self {
            config,
            store,
            oauth,
            sync,
        }
    }
}
