//! Inventory API — catalog browsing and item/shelf lookups.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use super::middleware_auth::{RequireAuth, RequireStaff};
use super::AppState;
use crate::db::InventoryFilter;

/// GET /api/inventory — the full catalog with category and shelf placement.
pub(super) async fn handler_inventory(
    State(state): State<Arc<AppState>>,
    RequireAuth(_session): RequireAuth,
    Query(filter): Query<InventoryFilter>,
) -> impl IntoResponse {
    match state.db.list_inventory(&filter).await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({"items": items}))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"success": false, "error": format!("Lookup failed: {}", e)})),
        ),
    }
}

/// GET /api/items/{id} — locations of a single item's pieces.
///
/// Items without pieces return one row with null piece columns, so callers
/// can always show where to find the item.
pub(super) async fn handler_item_locations(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<i64>,
) -> impl IntoResponse {
    match state.db.get_item_locations(item_id).await {
        Ok(rows) if rows.is_empty() => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "success": false,
                "error": format!("No data found for item {}", item_id),
            })),
        ),
        Ok(rows) => (StatusCode::OK, Json(serde_json::json!({"pieces": rows}))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"success": false, "error": format!("Lookup failed: {}", e)})),
        ),
    }
}

// ── Available items (add-to-order screen) ─────────────────────────

#[derive(Deserialize)]
pub(super) struct AvailableQuery {
    main_category: String,
    sub_category: String,
}

/// GET /api/items/available?main_category=..&sub_category=..
///
/// Items in the category pair that are not linked to any order. The pair
/// must exist in the category catalog or the request is rejected before
/// any item lookup.
pub(super) async fn handler_available_items(
    State(state): State<Arc<AppState>>,
    RequireStaff(_session): RequireStaff,
    Query(query): Query<AvailableQuery>,
) -> impl IntoResponse {
    match state
        .db
        .category_exists(&query.main_category, &query.sub_category)
        .await
    {
        Ok(true) => {}
        Ok(false) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "success": false,
                    "error": format!(
                        "The combination of category '{}' and subcategory '{}' does not exist",
                        query.main_category, query.sub_category
                    ),
                })),
            );
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"success": false, "error": format!("Lookup failed: {}", e)})),
            );
        }
    }

    match state
        .db
        .find_available_items(&query.main_category, &query.sub_category)
        .await
    {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({"items": items}))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"success": false, "error": format!("Lookup failed: {}", e)})),
        ),
    }
}

/// Main categories for the intake and filter dropdowns.
pub(super) async fn handler_categories(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.db.list_main_categories().await {
        Ok(mains) => (StatusCode::OK, Json(serde_json::json!({"categories": mains}))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"success": false, "error": format!("Lookup failed: {}", e)})),
        ),
    }
}

// ── POST /api/subcategories ───────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct SubcategoriesPayload {
    main_category: String,
}

/// Subcategories for a selected main category (form dropdown data).
pub(super) async fn handler_subcategories(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SubcategoriesPayload>,
) -> impl IntoResponse {
    match state.db.list_subcategories(&payload.main_category).await {
        Ok(subs) => (
            StatusCode::OK,
            Json(serde_json::json!({"subcategories": subs})),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"success": false, "error": format!("Lookup failed: {}", e)})),
        ),
    }
}
