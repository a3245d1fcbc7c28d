// SPDX-License-Identifier: MIT

//! Public user profile and username mapping models.

use serde::{Deserialize, Serialize};

/// Public creator profile, served by the portfolio endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    /// Public handle (lowercased in the username mapping)
    pub username: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    /// Relative portfolio path, e.g. `/portfolio/{username}`
    pub portfolio_url: String,
    /// When the profile was created (RFC3339)
    pub created_at: String,
}

/// Username → user id mapping, keyed by the lowercased username.
/// At most one mapping exists per normalized username; immutable after
/// creation (no rename).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsernameMapping {
    pub username: String,
    pub user_id: String,
}

/// Normalize a public handle for lookup and storage.
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_username() {
        assert_eq!(normalize_username("CreatorName"), "creatorname");
        assert_eq!(normalize_username("  Mixed Case "), "mixed case");
    }
}
