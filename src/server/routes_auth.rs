//! Account API — registration, login, logout, own profile.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use std::sync::OnceLock;

use super::middleware_auth::RequireAuth;
use super::AppState;
use crate::auth;
use crate::db::{self, NewPerson};
use crate::roles::RoleSet;

/// E.164-style phone validity: leading '+', 2-15 digits, no leading zero.
fn valid_phone(number: &str) -> bool {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = RE.get_or_init(|| regex::Regex::new(r"^\+[1-9]\d{1,14}$").expect("valid pattern"));
    re.is_match(number)
}

// ── POST /api/register ────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RegisterPayload {
    username: String,
    password: String,
    fname: String,
    lname: String,
    email: String,
    #[serde(default)]
    roles: Vec<String>,
    #[serde(default)]
    phones: Vec<String>,
}

pub(super) async fn handler_register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterPayload>,
) -> impl IntoResponse {
    if payload.username.len() < 3 || payload.username.len() > 32 {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"success": false, "error": "Username must be 3-32 characters"})),
        );
    }
    if payload.password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"success": false, "error": "Password is required"})),
        );
    }
    if !payload.email.contains('@') {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"success": false, "error": "Invalid email address"})),
        );
    }
    for phone in &payload.phones {
        if !valid_phone(phone) {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "success": false,
                    "error": format!("Invalid phone number format: {}", phone),
                })),
            );
        }
    }

    // Role names are validated against the catalog; staff+volunteer
    // combinations are rejected here.
    let roles = match RoleSet::from_names(&payload.roles) {
        Ok(roles) => roles,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"success": false, "error": e.to_string()})),
            );
        }
    };

    let hashed = match auth::hash_password(&payload.password) {
        Ok(h) => h,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"success": false, "error": e.to_string()})),
            );
        }
    };

    let new_person = NewPerson {
        username: &payload.username,
        password: &hashed,
        fname: &payload.fname,
        lname: &payload.lname,
        email: &payload.email,
        phones: &payload.phones,
        roles: &roles,
    };
    match state.db.register_person(&new_person).await {
        Ok(()) => (
            StatusCode::CREATED,
            Json(serde_json::json!({"success": true, "username": payload.username})),
        ),
        Err(e) if db::is_unique_violation(&e) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({"success": false, "error": "Username already taken"})),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"success": false, "error": format!("Registration failed: {}", e)})),
        ),
    }
}

// ── POST /api/login ───────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct LoginPayload {
    username: String,
    password: String,
}

/// One generic failure for both unknown usernames and bad passwords, so
/// the endpoint leaks no user-enumeration signal.
fn invalid_credentials() -> axum::response::Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({"success": false, "error": "Invalid username or password"})),
    )
        .into_response()
}

pub(super) async fn handler_login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginPayload>,
) -> impl IntoResponse {
    let person = match state.db.get_person_with_roles(&payload.username).await {
        Ok(Some(person)) => person,
        Ok(None) => return invalid_credentials(),
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"success": false, "error": format!("Login failed: {}", e)})),
            )
                .into_response();
        }
    };

    if !auth::verify_password(&payload.password, &person.password) {
        return invalid_credentials();
    }

    let roles = match person.role_set() {
        Ok(roles) => roles,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"success": false, "error": format!("Login failed: {}", e)})),
            )
                .into_response();
        }
    };

    let name = person.display_name();
    let token = match auth::issue_token(&state.session_secret, &person.username, &name, roles.clone())
    {
        Ok(token) => token,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"success": false, "error": format!("Login failed: {}", e)})),
            )
                .into_response();
        }
    };

    let cookie = format!(
        "session={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        token,
        auth::SESSION_TTL_SECS
    );
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({
            "success": true,
            "token": token,
            "username": person.username,
            "name": name,
            "roles": roles,
        })),
    )
        .into_response()
}

// ── POST /api/logout ──────────────────────────────────────────────

pub(super) async fn handler_logout() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::SET_COOKIE, "session=; HttpOnly; Path=/; Max-Age=0")],
        Json(serde_json::json!({"success": true})),
    )
}

// ── GET /api/me ───────────────────────────────────────────────────

/// The authenticated account's own details, including phones on file.
pub(super) async fn handler_me(
    State(state): State<Arc<AppState>>,
    RequireAuth(session): RequireAuth,
) -> impl IntoResponse {
    let person = match state.db.get_person_with_roles(&session.username).await {
        Ok(Some(person)) => person,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"success": false, "error": "Account no longer exists"})),
            );
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"success": false, "error": format!("Lookup failed: {}", e)})),
            );
        }
    };
    let phones = match state.db.get_phones(&session.username).await {
        Ok(phones) => phones,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"success": false, "error": format!("Lookup failed: {}", e)})),
            );
        }
    };
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "username": person.username,
            "name": person.display_name(),
            "email": person.email,
            "roles": session.roles,
            "phones": phones,
        })),
    )
}

// ── GET /api/roles ────────────────────────────────────────────────

/// The role catalog, for registration forms.
pub(super) async fn handler_roles(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.db.list_roles().await {
        Ok(roles) => (StatusCode::OK, Json(serde_json::json!({"roles": roles}))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"success": false, "error": format!("Lookup failed: {}", e)})),
        ),
    }
}
