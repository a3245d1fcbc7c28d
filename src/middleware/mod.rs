// SPDX-License-Identifier: MIT

//! HTTP middleware.

pub mod auth;

pub use auth::{create_jwt, require_auth, AuthUser, Claims};
