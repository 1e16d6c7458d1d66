//! Session middleware for the JSON API.
//!
//! Extracts the session token from the `Authorization: Bearer <token>`
//! header or the `session` cookie, verifies it, and materializes an
//! [`AuthSession`] — an explicit per-request context carrying the username,
//! display name, and role set. Guards are pure predicates over that
//! context; they never touch the database.
//!
//! Staff-only routes use the `RequireStaff` extractor to gate access.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use super::AppState;
use crate::auth;
use crate::roles::{Role, RoleSet};

/// Authenticated session context, built once per request at the
/// authentication boundary and passed explicitly to handlers.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub username: String,
    pub name: String,
    pub roles: RoleSet,
}

/// Pull the raw session token out of the request: bearer header first,
/// `session` cookie second.
fn raw_token(parts: &Parts) -> Option<String> {
    if let Some(value) = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(token) = value.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }

    let cookies = parts.headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == "session").then(|| value.to_string())
    })
}

/// Decode the session token into an [`AuthSession`], or None when the
/// request carries no valid session.
pub fn extract_session(state: &Arc<AppState>, parts: &Parts) -> Option<AuthSession> {
    let token = raw_token(parts)?;
    let claims = auth::decode_token(&state.session_secret, &token).ok()?;
    Some(AuthSession {
        username: claims.sub,
        name: claims.name,
        roles: claims.roles,
    })
}

/// Axum extractor that requires any authenticated session.
///
/// Returns 401 if no valid session token is present.
pub struct RequireAuth(pub AuthSession);

impl FromRequestParts<Arc<AppState>> for RequireAuth {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session = extract_session(state, parts).ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"success": false, "error": "Authentication required"})),
            )
                .into_response()
        })?;
        Ok(RequireAuth(session))
    }
}

/// Axum extractor that requires an authenticated session holding the staff
/// role.
///
/// Returns 401 if no valid session is present, 403 if the session lacks
/// the staff role.
pub struct RequireStaff(pub AuthSession);

impl FromRequestParts<Arc<AppState>> for RequireStaff {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(session) = RequireAuth::from_request_parts(parts, state).await?;
        if !session.roles.contains(Role::Staff) {
            return Err((
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({"success": false, "error": "Staff role required"})),
            )
                .into_response());
        }
        Ok(RequireStaff(session))
    }
}
