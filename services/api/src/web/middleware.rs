//! services/api/src/web/middleware.rs
//!
//! Middleware guarding the admin back-office routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::warn;

use crate::error::ApiError;
use crate::web::params::secrets_match;
use crate::web::state::AppState;

/// Header carrying the admin API key.
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Middleware that checks the admin API key.
///
/// When `ADMIN_API_KEY` is not configured every request is let through.
/// Otherwise the `x-admin-key` header must match, or 401 Unauthorized is returned.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.config.admin_api_key.as_deref() else {
        return next.run(req).await;
    };

    let provided = req
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    match provided {
        Some(key) if secrets_match(key, expected) => next.run(req).await,
        _ => {
            warn!(path = %req.uri().path(), "Rejected admin request without a valid key");
            ApiError::Unauthorized.into_response()
        }
    }
}
