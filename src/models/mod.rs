// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod connection;
pub mod content;
pub mod oauth_state;
pub mod platform;
pub mod user;

pub use connection::{Connection, ConnectionPatch};
pub use content::{ContentItem, NormalizedContent};
pub use oauth_state::OAuthState;
pub use platform::{AspectRatio, ContentType, Platform};
pub use user::{normalize_username, UserProfile, UsernameMapping};
