// SPDX-License-Identifier: MIT

//! Single-use CSRF state records for the OAuth redirect round-trip.

use crate::models::Platform;
use crate::time_utils::parse_rfc3339_utc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ephemeral OAuth state document, keyed by its token.
///
/// Lifecycle: created at connect-initiation, deleted at callback (success
/// or failure) or when consumed after expiry. Strictly single-use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthState {
    /// Opaque random token embedded in the authorization URL
    pub token: String,
    /// Initiating user
    pub user_id: String,
    /// Platform the consent flow targets
    pub platform: Platform,
    /// Creation time (RFC3339)
    pub created_at: String,
    /// Expiry time (RFC3339), created_at + 10 minutes
    pub expires_at: String,
}

impl OAuthState {
    /// Whether this state's TTL has passed. An unparseable expiry counts
    /// as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match parse_rfc3339_utc(&self.expires_at) {
            Some(expires_at) => now > expires_at,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(expires_at: &str) -> OAuthState {
        OAuthState {
            token: "tok".to_string(),
            user_id: "user-1".to_string(),
            platform: Platform::YouTube,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            expires_at: expires_at.to_string(),
        }
    }

    #[test]
    fn test_expiry_boundary() {
        let now = parse_rfc3339_utc("2026-01-01T00:10:00Z").unwrap();

        assert!(!state("2026-01-01T00:10:00Z").is_expired(now));
        assert!(state("2026-01-01T00:09:59Z").is_expired(now));
    }

    #[test]
    fn test_unparseable_expiry_counts_as_expired() {
        assert!(state("not-a-timestamp").is_expired(Utc::now()));
    }
}
