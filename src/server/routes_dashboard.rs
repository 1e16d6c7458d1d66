//! Dashboard API — headline counts and the recent-activity feed.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

use super::middleware_auth::RequireAuth;
use super::AppState;

/// GET /api/dashboard — totals plus the five most recent donations/orders.
pub(super) async fn handler_dashboard(
    State(state): State<Arc<AppState>>,
    RequireAuth(_session): RequireAuth,
) -> impl IntoResponse {
    let stats = match state.db.dashboard_stats().await {
        Ok(stats) => stats,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"success": false, "error": format!("Lookup failed: {}", e)})),
            );
        }
    };
    let recent = match state.db.recent_activity().await {
        Ok(rows) => rows,
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
            "stats": stats,
            "recent_activity": recent,
        })),
    )
}
