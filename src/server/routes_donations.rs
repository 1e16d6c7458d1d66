//! Donations API — donation feed, donor validation, and intake.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use super::middleware_auth::{RequireAuth, RequireStaff};
use super::AppState;
use crate::db::{NewDonatedItem, NewItem, NewPiece};

/// GET /api/donations — all donations, newest first.
pub(super) async fn handler_donations(
    State(state): State<Arc<AppState>>,
    RequireAuth(_session): RequireAuth,
) -> impl IntoResponse {
    match state.db.list_donations().await {
        Ok(rows) => (StatusCode::OK, Json(serde_json::json!({"donations": rows}))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"success": false, "error": format!("Lookup failed: {}", e)})),
        ),
    }
}

// ── POST /api/donations/check ─────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct CheckDonorPayload {
    donor_id: String,
}

/// Validate a donor before intake: the account must exist and hold the
/// donor role.
pub(super) async fn handler_check_donor(
    State(state): State<Arc<AppState>>,
    RequireStaff(_session): RequireStaff,
    Json(payload): Json<CheckDonorPayload>,
) -> impl IntoResponse {
    match validate_donor(&state, &payload.donor_id).await {
        Ok(None) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "message": "Donor validated successfully",
                "donor_id": payload.donor_id,
            })),
        ),
        Ok(Some(reason)) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"success": false, "error": reason})),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"success": false, "error": format!("Lookup failed: {}", e)})),
        ),
    }
}

/// None = valid; Some(reason) = rejected.
async fn validate_donor(state: &Arc<AppState>, donor: &str) -> anyhow::Result<Option<String>> {
    if !state.db.person_exists(donor).await? {
        return Ok(Some("Donor ID does not exist".to_string()));
    }
    if !state.db.is_donor(donor).await? {
        return Ok(Some("The user is not registered as a donor".to_string()));
    }
    Ok(None)
}

// ── POST /api/donations/{donor} ───────────────────────────────────

#[derive(Deserialize)]
pub(super) struct DonationItemPayload {
    description: String,
    #[serde(default)]
    color: Option<String>,
    #[serde(default = "default_true")]
    is_new: bool,
    #[serde(default)]
    material: Option<String>,
    main_category: String,
    sub_category: String,
    #[serde(default)]
    pieces: Vec<PiecePayload>,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
pub(super) struct PiecePayload {
    description: String,
    #[serde(default)]
    length: Option<i32>,
    #[serde(default)]
    width: Option<i32>,
    #[serde(default)]
    height: Option<i32>,
    room_num: i32,
    shelf_num: i32,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct RecordDonationPayload {
    items: Vec<DonationItemPayload>,
}

/// Record a donation batch for a donor. Every category pair is validated
/// up front; the storage layer re-checks inside the intake transaction.
pub(super) async fn handler_record_donation(
    State(state): State<Arc<AppState>>,
    RequireStaff(_session): RequireStaff,
    Path(donor): Path<String>,
    Json(payload): Json<RecordDonationPayload>,
) -> impl IntoResponse {
    match validate_donor(&state, &donor).await {
        Ok(None) => {}
        Ok(Some(reason)) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"success": false, "error": reason})),
            );
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"success": false, "error": format!("Lookup failed: {}", e)})),
            );
        }
    }

    if payload.items.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"success": false, "error": "No items supplied"})),
        );
    }

    for item in &payload.items {
        match state
            .db
            .category_exists(&item.main_category, &item.sub_category)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({
                        "success": false,
                        "error": format!(
                            "Invalid category combination: {}, {}",
                            item.main_category, item.sub_category
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
    }

    let batch: Vec<NewDonatedItem<'_>> = payload
        .items
        .iter()
        .map(|item| NewDonatedItem {
            item: NewItem {
                i_description: &item.description,
                color: item.color.as_deref(),
                is_new: item.is_new,
                has_pieces: !item.pieces.is_empty(),
                material: item.material.as_deref(),
                main_category: &item.main_category,
                sub_category: &item.sub_category,
            },
            pieces: item
                .pieces
                .iter()
                .map(|p| NewPiece {
                    p_description: &p.description,
                    length: p.length,
                    width: p.width,
                    height: p.height,
                    room_num: p.room_num,
                    shelf_num: p.shelf_num,
                    p_notes: p.notes.as_deref(),
                })
                .collect(),
        })
        .collect();

    let recorded = match state.db.record_donation(&donor, &batch).await {
        Ok(recorded) => recorded,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"success": false, "error": format!("Intake failed: {}", e)})),
            );
        }
    };

    state
        .prom_metrics
        .donations_recorded
        .inc_by(recorded.len() as u64);

    let donor_name = state.db.display_name(&donor).await.ok().flatten();
    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "message": "All items and pieces recorded successfully",
            "donor_name": donor_name,
            "captured_items": recorded,
        })),
    )
}
