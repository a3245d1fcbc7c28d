// SPDX-License-Identifier: MIT

//! Business logic services.

pub mod oauth;
pub mod sync;

pub use oauth::OAuthService;
pub use sync::{SyncOutcome, SyncService};
