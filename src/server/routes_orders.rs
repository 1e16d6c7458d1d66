//! Order API — starting orders, linking items, preparation, per-item
//! status updates, and the role-scoped order views.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use super::middleware_auth::{RequireAuth, RequireStaff};
use super::AppState;
use crate::db::{AddItemOutcome, StatusUpdate};
use crate::lifecycle::DeliveryStatus;
use crate::roles::Role;

fn lookup_failed(e: anyhow::Error) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"success": false, "error": format!("Lookup failed: {}", e)})),
    )
}

// ── GET /api/orders ───────────────────────────────────────────────

/// One view per role the session holds, keyed by role name. A person who is
/// both client and volunteer gets both lists in one response.
pub(super) async fn handler_orders(
    State(state): State<Arc<AppState>>,
    RequireAuth(session): RequireAuth,
) -> impl IntoResponse {
    let mut views = serde_json::Map::new();
    for role in session.roles.iter() {
        let view = match role {
            Role::Client => state
                .db
                .client_orders(&session.username)
                .await
                .map(|rows| serde_json::to_value(rows)),
            Role::Donor => state
                .db
                .donor_orders(&session.username)
                .await
                .map(|rows| serde_json::to_value(rows)),
            Role::Staff => state
                .db
                .staff_orders()
                .await
                .map(|rows| serde_json::to_value(rows)),
            Role::Volunteer => state
                .db
                .volunteer_orders(&session.username)
                .await
                .map(|rows| serde_json::to_value(rows)),
        };
        match view {
            Ok(Ok(value)) => {
                views.insert(role.as_str().to_string(), value);
            }
            Ok(Err(e)) => return lookup_failed(e.into()),
            Err(e) => return lookup_failed(e),
        }
    }
    (
        StatusCode::OK,
        Json(serde_json::json!({"orders": serde_json::Value::Object(views)})),
    )
}

// ── POST /api/orders ──────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct StartOrderPayload {
    client: String,
    #[serde(default)]
    notes: Option<String>,
}

/// Start an order for a client. Staff only, and a staff member cannot open
/// an order for their own account.
pub(super) async fn handler_start_order(
    State(state): State<Arc<AppState>>,
    RequireStaff(session): RequireStaff,
    Json(payload): Json<StartOrderPayload>,
) -> impl IntoResponse {
    match state.db.person_exists(&payload.client).await {
        Ok(true) => {}
        Ok(false) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"success": false, "error": "Client username does not exist"})),
            );
        }
        Err(e) => return lookup_failed(e),
    }
    if payload.client == session.username {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"success": false, "error": "You cannot start an order for yourself"})),
        );
    }

    match state
        .db
        .start_order(&payload.client, &session.username, payload.notes.as_deref())
        .await
    {
        Ok(order_id) => {
            state.prom_metrics.orders_started.inc();
            (
                StatusCode::CREATED,
                Json(serde_json::json!({
                    "success": true,
                    "order_id": order_id,
                    "client": payload.client,
                    "supervisor": session.username,
                })),
            )
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"success": false, "error": format!("Order creation failed: {}", e)})),
        ),
    }
}

// ── GET /api/orders/{id} ──────────────────────────────────────────

/// Per-item detail for one order. `updatable_items` reflects what this
/// session may change: staff can update every item, a volunteer only the
/// items assigned to them.
pub(super) async fn handler_order_details(
    State(state): State<Arc<AppState>>,
    RequireAuth(session): RequireAuth,
    Path(order_id): Path<i64>,
) -> impl IntoResponse {
    let rows = match state.db.get_order_details(order_id).await {
        Ok(rows) => rows,
        Err(e) => return lookup_failed(e),
    };
    if rows.is_empty() {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "success": false,
                "error": format!("Order {} not found", order_id),
            })),
        );
    }

    let is_staff = session.roles.contains(Role::Staff);
    let updatable: Vec<i64> = rows
        .iter()
        .filter(|row| {
            is_staff || row.assigned_volunteer.as_deref() == Some(session.username.as_str())
        })
        .filter_map(|row| row.item_id)
        .collect();

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "items": rows,
            "updatable_items": updatable,
        })),
    )
}

// ── GET /api/orders/{id}/items ────────────────────────────────────

/// Pick list for an order: every linked item's pieces with their current
/// shelf placement.
pub(super) async fn handler_order_items(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<i64>,
) -> impl IntoResponse {
    match state.db.get_order_items(order_id).await {
        Ok(rows) if rows.is_empty() => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "success": false,
                "error": format!("No items found for order {}", order_id),
            })),
        ),
        Ok(rows) => (StatusCode::OK, Json(serde_json::json!({"items": rows}))),
        Err(e) => lookup_failed(e),
    }
}

// ── POST /api/orders/{id}/items ───────────────────────────────────

#[derive(Deserialize)]
pub(super) struct AddItemPayload {
    item_id: i64,
}

/// Link an item to an order. An item can belong to one order at a time; a
/// second attempt reports the order already holding it.
pub(super) async fn handler_add_item(
    State(state): State<Arc<AppState>>,
    RequireStaff(_session): RequireStaff,
    Path(order_id): Path<i64>,
    Json(payload): Json<AddItemPayload>,
) -> impl IntoResponse {
    match state.db.order_exists(order_id).await {
        Ok(true) => {}
        Ok(false) => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({
                    "success": false,
                    "error": format!("Order {} not found", order_id),
                })),
            );
        }
        Err(e) => return lookup_failed(e),
    }
    match state.db.item_exists(payload.item_id).await {
        Ok(true) => {}
        Ok(false) => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({
                    "success": false,
                    "error": format!("Item {} not found", payload.item_id),
                })),
            );
        }
        Err(e) => return lookup_failed(e),
    }

    match state.db.add_item_to_order(order_id, payload.item_id).await {
        Ok(AddItemOutcome::Added) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "success": true,
                "order_id": order_id,
                "item_id": payload.item_id,
            })),
        ),
        Ok(AddItemOutcome::AlreadyInOrder(holder)) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "success": false,
                "error": format!(
                    "Item {} is already part of Order {}",
                    payload.item_id, holder
                ),
                "order_id": holder,
            })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"success": false, "error": format!("Add failed: {}", e)})),
        ),
    }
}

// ── POST /api/orders/{id}/prepare ─────────────────────────────────

/// Stage an order for delivery: relocate every piece to the holding shelf
/// and clear the items' new flags.
pub(super) async fn handler_prepare_order(
    State(state): State<Arc<AppState>>,
    RequireStaff(_session): RequireStaff,
    Path(order_id): Path<i64>,
) -> impl IntoResponse {
    match state.db.order_exists(order_id).await {
        Ok(true) => {}
        Ok(false) => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({
                    "success": false,
                    "error": format!("Order {} not found", order_id),
                })),
            );
        }
        Err(e) => return lookup_failed(e),
    }

    match state.db.prepare_order(order_id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "message": format!("Order {} is staged for delivery", order_id),
            })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"success": false, "error": format!("Preparation failed: {}", e)})),
        ),
    }
}

// ── POST /api/orders/status ───────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct StatusUpdatePayload {
    order_id: i64,
    updates: Vec<StatusEntryPayload>,
}

#[derive(Deserialize)]
pub(super) struct StatusEntryPayload {
    item_id: i64,
    status: String,
}

/// Bulk per-item status update. Entries the session is not authorized to
/// change are skipped without failing the request; the response reports how
/// many updates were applied.
pub(super) async fn handler_update_status(
    State(state): State<Arc<AppState>>,
    RequireAuth(session): RequireAuth,
    Json(payload): Json<StatusUpdatePayload>,
) -> impl IntoResponse {
    let mut updates = Vec::with_capacity(payload.updates.len());
    for entry in &payload.updates {
        let status: DeliveryStatus = match entry.status.parse() {
            Ok(status) => status,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({"success": false, "error": e.to_string()})),
                );
            }
        };
        updates.push(StatusUpdate {
            item_id: entry.item_id,
            status,
        });
    }

    match state
        .db
        .update_item_statuses(payload.order_id, &session.username, &updates)
        .await
    {
        Ok(applied) => (
            StatusCode::OK,
            Json(serde_json::json!({"success": true, "updated": applied})),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"success": false, "error": format!("Update failed: {}", e)})),
        ),
    }
}

// ── GET /api/volunteers/ranking ───────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RankingQuery {
    /// Cutoff date (YYYY-MM-DD); defaults to one year back.
    #[serde(default)]
    since: Option<String>,
}

pub(super) async fn handler_volunteer_ranking(
    State(state): State<Arc<AppState>>,
    RequireAuth(_session): RequireAuth,
    Query(query): Query<RankingQuery>,
) -> impl IntoResponse {
    let since = match &query.since {
        Some(raw) => match raw.parse::<chrono::NaiveDate>() {
            Ok(date) => date,
            Err(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({
                        "success": false,
                        "error": "Invalid date, expected YYYY-MM-DD",
                    })),
                );
            }
        },
        None => chrono::Utc::now().date_naive() - chrono::Duration::days(365),
    };

    match state.db.volunteer_ranking(since).await {
        Ok(rows) => (StatusCode::OK, Json(serde_json::json!({"ranking": rows}))),
        Err(e) => lookup_failed(e),
    }
}
