//! Donation intake and activity feeds.
//!
//! Intake records a batch of donated items for one donor in a single
//! transaction: item rows, provenance rows, and any pieces (with shelf
//! locations auto-created on first reference). A failure anywhere in the
//! batch rolls the whole intake back.

use anyhow::{bail, Result};
use serde::Serialize;

use super::catalog::{NewItem, NewPiece};
use super::Database;

/// One item in an intake batch, with its pieces when `item.has_pieces`.
pub struct NewDonatedItem<'a> {
    pub item: NewItem<'a>,
    pub pieces: Vec<NewPiece<'a>>,
}

/// Echo of a recorded item, returned to the intake form.
#[derive(Serialize)]
pub struct RecordedItem {
    pub item_id: i64,
    pub description: String,
}

/// Donation feed row: provenance joined with item and donor identity.
#[derive(Serialize, sqlx::FromRow)]
pub struct DonationRow {
    pub item_id: i64,
    pub donate_date: chrono::DateTime<chrono::Utc>,
    pub i_description: String,
    pub main_category: String,
    pub sub_category: String,
    pub is_new: bool,
    pub donor_username: String,
    pub fname: String,
    pub lname: String,
}

/// Headline counts for the dashboard.
#[derive(Serialize, sqlx::FromRow)]
pub struct DashboardStats {
    pub total_items: i64,
    pub total_orders: i64,
    pub monthly_donations: i64,
    pub monthly_orders: i64,
}

/// Recent activity row (donations and orders interleaved).
#[derive(Serialize, sqlx::FromRow)]
pub struct ActivityRow {
    pub activity: String,
    pub date: chrono::DateTime<chrono::Utc>,
    pub i_description: Option<String>,
    pub fname: String,
    pub lname: String,
}

impl Database {
    // ── Intake ────────────────────────────────────────────────────

    /// Record a donation batch for a donor. All items, provenance links,
    /// locations, and pieces land in one transaction.
    ///
    /// Category pairs are validated inside the transaction so a bad row
    /// cannot slip in between the caller's check and the insert.
    pub async fn record_donation(
        &self,
        donor: &str,
        items: &[NewDonatedItem<'_>],
    ) -> Result<Vec<RecordedItem>> {
        let mut tx = self.pool.begin().await?;
        let mut recorded = Vec::with_capacity(items.len());

        for entry in items {
            let item = &entry.item;

            let category_ok = sqlx::query_scalar::<_, i32>(
                "SELECT 1 FROM category WHERE main_category = $1 AND sub_category = $2",
            )
            .bind(item.main_category)
            .bind(item.sub_category)
            .fetch_optional(&mut *tx)
            .await?;
            if category_ok.is_none() {
                bail!(
                    "unknown category combination: {} / {}",
                    item.main_category,
                    item.sub_category
                );
            }

            let item_id = sqlx::query_scalar::<_, i64>(
                "INSERT INTO item (i_description, color, is_new, has_pieces, material,
                                   main_category, sub_category)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 RETURNING item_id",
            )
            .bind(item.i_description)
            .bind(item.color)
            .bind(item.is_new)
            .bind(item.has_pieces)
            .bind(item.material)
            .bind(item.main_category)
            .bind(item.sub_category)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO donated_by (item_id, username, donate_date) VALUES ($1, $2, NOW())",
            )
            .bind(item_id)
            .bind(donor)
            .execute(&mut *tx)
            .await?;

            for (idx, piece) in entry.pieces.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO location (room_num, shelf_num, shelf, shelf_description)
                     VALUES ($1, $2, $3, $4)
                     ON CONFLICT (room_num, shelf_num) DO NOTHING",
                )
                .bind(piece.room_num)
                .bind(piece.shelf_num)
                .bind(format!("Shelf-{}", piece.shelf_num))
                .bind("Auto-created location")
                .execute(&mut *tx)
                .await?;

                sqlx::query(
                    "INSERT INTO piece (item_id, piece_num, p_description, length, width,
                                        height, room_num, shelf_num, p_notes)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
                )
                .bind(item_id)
                .bind((idx + 1) as i32)
                .bind(piece.p_description)
                .bind(piece.length)
                .bind(piece.width)
                .bind(piece.height)
                .bind(piece.room_num)
                .bind(piece.shelf_num)
                .bind(piece.p_notes)
                .execute(&mut *tx)
                .await?;
            }

            recorded.push(RecordedItem {
                item_id,
                description: item.i_description.to_string(),
            });
        }

        tx.commit().await?;
        Ok(recorded)
    }

    // ── Feeds ─────────────────────────────────────────────────────

    /// All donations, newest first.
    pub async fn list_donations(&self) -> Result<Vec<DonationRow>> {
        let rows = sqlx::query_as::<_, DonationRow>(
            "SELECT d.item_id, d.donate_date,
                    i.i_description, i.main_category, i.sub_category, i.is_new,
                    d.username AS donor_username, p.fname, p.lname
             FROM donated_by d
             JOIN item i ON d.item_id = i.item_id
             JOIN person p ON d.username = p.username
             ORDER BY d.donate_date DESC, i.item_id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Headline counts: totals plus this calendar month's donations and
    /// orders.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let stats = sqlx::query_as::<_, DashboardStats>(
            "SELECT
                (SELECT COUNT(*) FROM item) AS total_items,
                (SELECT COUNT(*) FROM ordered) AS total_orders,
                (SELECT COUNT(*) FROM donated_by
                  WHERE date_trunc('month', donate_date) = date_trunc('month', NOW()))
                    AS monthly_donations,
                (SELECT COUNT(*) FROM ordered
                  WHERE date_trunc('month', order_date) = date_trunc('month', NOW()))
                    AS monthly_orders",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    /// The five most recent donations and orders, interleaved.
    pub async fn recent_activity(&self) -> Result<Vec<ActivityRow>> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            "SELECT 'Donation' AS activity, d.donate_date AS date,
                    i.i_description, p.fname, p.lname
             FROM donated_by d
             JOIN item i ON d.item_id = i.item_id
             JOIN person p ON d.username = p.username
             UNION ALL
             SELECT 'Order' AS activity, o.order_date AS date,
                    NULL AS i_description, p.fname, p.lname
             FROM ordered o
             JOIN person p ON o.client = p.username
             ORDER BY date DESC
             LIMIT 5",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
