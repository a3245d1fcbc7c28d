// SPDX-License-Identifier: MIT

//! Platform OAuth connect routes.
//!
//! Both routes are redirect-based: the initiate route sends the browser to
//! the platform consent screen, and the callback route always lands back on
//! the frontend connections page with either `?success=` or `?error=` in
//! the query string. Callback failures never surface as JSON.

use axum::{
    extract::{Path, Query, State},
    response::Redirect,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::Platform;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/{platform}", get(auth_start))
        .route("/auth/{platform}/callback", get(auth_callback))
}

/// Query parameters for starting a connect flow.
#[derive(Deserialize)]
pub struct AuthStartParams {
    user_id: String,
}

/// Callback query parameters. Platforms send `code` and `state` on
/// success, or `error`/`error_description` when the user denies consent.
#[derive(Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

fn parse_platform(raw: &str) -> Result<Platform> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("unknown platform: {}", raw)))
}

/// Where callback redirects land on the frontend.
fn connections_url(frontend_url: &str) -> String {
    format!("{}/dashboard/connections", frontend_url)
}

/// Start a connect flow - redirect to the platform consent screen.
async fn auth_start(
    State(state): State<Arc<AppState>>,
    Path(platform): Path<String>,
    Query(params): Query<AuthStartParams>,
) -> Result<Redirect> {
    let platform = parse_platform(&platform)?;
    let url = state.oauth.begin(&params.user_id, platform).await?;
    Ok(Redirect::temporary(&url))
}

/// OAuth callback - complete the flow and bounce back to the frontend.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Path(platform): Path<String>,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let base = connections_url(&state.config.frontend_url);

    let Ok(platform) = parse_platform(&platform) else {
        return Redirect::temporary(&format!("{}?error=oauth_failed", base));
    };

    // Consent denied or platform-side failure.
    if let Some(error) = params.error {
        tracing::warn!(%platform, error = %error, "OAuth callback returned an error");
        return Redirect::temporary(&format!(
            "{}?error={}",
            base,
            urlencoding::encode(&error)
        ));
    }

    let (Some(code), Some(state_token)) = (params.code, params.state) else {
        return Redirect::temporary(&format!("{}?error=missing_params", base));
    };

    match state.oauth.complete(platform, &code, &state_token).await {
        Ok(_user_id) => {
            Redirect::temporary(&format!("{}?success={}_connected", base, platform))
        }
        Err(e) => {
            tracing::warn!(%platform, error = %e, "OAuth callback failed");
            Redirect::temporary(&format!("{}?error={}", base, e.redirect_code()))
        }
    }
}
