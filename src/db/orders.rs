//! Order lifecycle and role-scoped projections.
//!
//! The lifecycle rows live in three tables: `ordered` (the request),
//! `item_in` (item → order links, unique per item), and `delivered`
//! (per-item delivery assignments with status). An order's status is never
//! stored; every projection here fetches the per-item statuses and derives
//! it through [`crate::lifecycle::derive_order_status`], so the four views
//! cannot disagree.

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::collections::HashMap;

use super::Database;
use crate::lifecycle::{
    derive_order_status, DeliveryStatus, HOLDING_NOTE, HOLDING_ROOM, HOLDING_SHELF,
};

/// Outcome of attempting to link an item to an order.
#[derive(Debug, PartialEq, Eq)]
pub enum AddItemOutcome {
    Added,
    /// The item is already linked; carries the holding order's id.
    AlreadyInOrder(i64),
}

/// One entry in a bulk status update.
pub struct StatusUpdate {
    pub item_id: i64,
    pub status: DeliveryStatus,
}

/// Item available for adding to an order (not linked anywhere yet).
#[derive(Serialize, sqlx::FromRow)]
pub struct AvailableItemRow {
    pub item_id: i64,
    pub i_description: String,
}

// ── Projection rows ─────────────────────────────────────────────
//
// `status` is never selected: it is filled in after the fact from the
// delivered rows, through the one shared derivation function.

/// Client view: the orders this client placed.
#[derive(Serialize, sqlx::FromRow)]
pub struct ClientOrderRow {
    pub order_id: i64,
    pub order_date: chrono::DateTime<chrono::Utc>,
    pub order_notes: Option<String>,
    pub supervisor_name: Option<String>,
    pub volunteers: Option<String>,
    pub item_count: i64,
    #[sqlx(skip)]
    pub status: DeliveryStatus,
}

/// Donor view: orders containing at least one item this donor gave.
#[derive(Serialize, sqlx::FromRow)]
pub struct DonorOrderRow {
    pub order_id: i64,
    pub order_date: chrono::DateTime<chrono::Utc>,
    pub i_description: String,
    pub donate_date: chrono::DateTime<chrono::Utc>,
    #[sqlx(skip)]
    pub status: DeliveryStatus,
}

/// Staff view: every order, with client identity and assignment lists.
#[derive(Serialize, sqlx::FromRow)]
pub struct StaffOrderRow {
    pub order_id: i64,
    pub order_date: chrono::DateTime<chrono::Utc>,
    pub order_notes: Option<String>,
    pub supervisor: String,
    pub client_name: String,
    pub volunteers: Option<String>,
    pub volunteer_usernames: Option<String>,
    pub item_count: i64,
    pub item_details: Option<String>,
    #[sqlx(skip)]
    pub status: DeliveryStatus,
}

/// Volunteer view: orders this volunteer appears in.
#[derive(Serialize, sqlx::FromRow)]
pub struct VolunteerOrderRow {
    pub order_id: i64,
    pub order_date: chrono::DateTime<chrono::Utc>,
    pub supervisor_name: String,
    pub client_name: String,
    pub item_count: i64,
    pub volunteer_usernames: Option<String>,
    pub item_details: Option<String>,
    #[sqlx(skip)]
    pub status: DeliveryStatus,
}

/// Per-item detail row for one order, used by the status-update screen.
#[derive(Serialize, sqlx::FromRow)]
pub struct OrderItemDetailRow {
    pub order_id: i64,
    pub order_date: chrono::DateTime<chrono::Utc>,
    pub order_notes: Option<String>,
    pub supervisor: String,
    pub client_fname: String,
    pub client_lname: String,
    pub item_id: Option<i64>,
    pub i_description: Option<String>,
    pub color: Option<String>,
    pub item_status: Option<String>,
    pub assigned_volunteer: Option<String>,
}

/// Volunteer ranking row: deliveries recorded since a cutoff date.
#[derive(Serialize, sqlx::FromRow)]
pub struct RankingRow {
    pub username: String,
    pub fname: String,
    pub lname: String,
    pub delivery_count: i64,
}

impl Database {
    // ── Transitions ───────────────────────────────────────────────

    /// Start an order: one `ordered` row plus the initial `delivered` row
    /// (status InProgress, attributed to the acting staff member), in a
    /// single transaction.
    ///
    /// The caller validates that the client exists and is not the acting
    /// staff member before calling.
    pub async fn start_order(
        &self,
        client: &str,
        supervisor: &str,
        notes: Option<&str>,
    ) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let order_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO ordered (client, supervisor, order_date, order_notes)
             VALUES ($1, $2, NOW(), $3)
             RETURNING order_id",
        )
        .bind(client)
        .bind(supervisor)
        .bind(notes)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO delivered (username, order_id, status, date)
             VALUES ($1, $2, 'InProgress', NOW())",
        )
        .bind(supervisor)
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(order_id)
    }

    /// Link an item to an order.
    ///
    /// The unique index on `item_in.item_id` makes this a single atomic
    /// conditional insert: no check-then-insert window. When the item is
    /// already linked the holding order's id is reported and nothing is
    /// written.
    pub async fn add_item_to_order(&self, order_id: i64, item_id: i64) -> Result<AddItemOutcome> {
        let inserted = sqlx::query_scalar::<_, i64>(
            "INSERT INTO item_in (order_id, item_id)
             VALUES ($1, $2)
             ON CONFLICT (item_id) DO NOTHING
             RETURNING order_id",
        )
        .bind(order_id)
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        if inserted.is_some() {
            return Ok(AddItemOutcome::Added);
        }

        let holder = sqlx::query_scalar::<_, i64>(
            "SELECT order_id FROM item_in WHERE item_id = $1",
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        holder
            .map(AddItemOutcome::AlreadyInOrder)
            .ok_or_else(|| anyhow!("item {} was unlinked concurrently; retry the add", item_id))
    }

    /// Items in a category pair that are not linked to any order.
    ///
    /// The caller validates the category pair first; an unknown pair is a
    /// validation failure, not an empty result.
    pub async fn find_available_items(
        &self,
        main_category: &str,
        sub_category: &str,
    ) -> Result<Vec<AvailableItemRow>> {
        let rows = sqlx::query_as::<_, AvailableItemRow>(
            "SELECT i.item_id, i.i_description
             FROM item i
             LEFT JOIN item_in ii ON i.item_id = ii.item_id
             WHERE ii.order_id IS NULL
               AND i.main_category = $1
               AND i.sub_category = $2
             ORDER BY i.item_id",
        )
        .bind(main_category)
        .bind(sub_category)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn order_exists(&self, order_id: i64) -> Result<bool> {
        let found = sqlx::query_scalar::<_, i32>("SELECT 1 FROM ordered WHERE order_id = $1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    /// Prepare an order for delivery: move every piece of every linked item
    /// to the holding location and clear each item's `is_new` flag, one
    /// transaction for the whole order.
    pub async fn prepare_order(&self, order_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO location (room_num, shelf_num, shelf, shelf_description)
             VALUES ($1, $2, 'Holding', 'Staging shelf for prepared orders')
             ON CONFLICT (room_num, shelf_num) DO NOTHING",
        )
        .bind(HOLDING_ROOM)
        .bind(HOLDING_SHELF)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE piece p
             SET room_num = $2, shelf_num = $3, p_notes = $4
             FROM item_in ii
             WHERE p.item_id = ii.item_id AND ii.order_id = $1",
        )
        .bind(order_id)
        .bind(HOLDING_ROOM)
        .bind(HOLDING_SHELF)
        .bind(HOLDING_NOTE)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE item i
             SET is_new = FALSE
             FROM item_in ii
             WHERE i.item_id = ii.item_id AND ii.order_id = $1",
        )
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Bulk per-item status update.
    ///
    /// Authorization per item: the actor must be the order's supervisor,
    /// or already the assigned deliverer for that specific item.
    /// Unauthorized entries are silently skipped; the count of applied
    /// updates is returned and the call still succeeds.
    pub async fn update_item_statuses(
        &self,
        order_id: i64,
        actor: &str,
        updates: &[StatusUpdate],
    ) -> Result<u64> {
        let supervisor = sqlx::query_scalar::<_, String>(
            "SELECT supervisor FROM ordered WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(supervisor) = supervisor else {
            return Ok(0);
        };

        let mut tx = self.pool.begin().await?;
        let mut applied = 0u64;

        for update in updates {
            let authorized = if actor == supervisor {
                true
            } else {
                sqlx::query_scalar::<_, i32>(
                    "SELECT 1 FROM delivered WHERE item_id = $1 AND username = $2",
                )
                .bind(update.item_id)
                .bind(actor)
                .fetch_optional(&mut *tx)
                .await?
                .is_some()
            };
            if !authorized {
                continue;
            }

            let result = sqlx::query(
                "UPDATE delivered
                 SET status = $1, date = NOW()
                 WHERE item_id = $2 AND order_id = $3",
            )
            .bind(update.status.as_str())
            .bind(update.item_id)
            .bind(order_id)
            .execute(&mut *tx)
            .await?;
            applied += result.rows_affected();
        }

        tx.commit().await?;
        Ok(applied)
    }

    // ── Status derivation ─────────────────────────────────────────

    /// Per-item delivery statuses grouped by order, for the given orders.
    /// Orders with no delivered rows are simply absent from the map; the
    /// derivation treats that as an empty set (→ Pending).
    async fn statuses_for_orders(
        &self,
        order_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<DeliveryStatus>>> {
        let rows = sqlx::query_as::<_, (i64, String)>(
            "SELECT order_id, status FROM delivered WHERE order_id = ANY($1)",
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut map: HashMap<i64, Vec<DeliveryStatus>> = HashMap::new();
        for (order_id, status) in rows {
            map.entry(order_id).or_default().push(status.parse()?);
        }
        Ok(map)
    }

    fn stitch_status(map: &HashMap<i64, Vec<DeliveryStatus>>, order_id: i64) -> DeliveryStatus {
        derive_order_status(map.get(&order_id).map(Vec::as_slice).unwrap_or(&[]))
    }

    // ── Projections ───────────────────────────────────────────────

    /// Client view: orders placed by this client, with supervisor identity,
    /// distinct volunteer names, and item count.
    pub async fn client_orders(&self, client: &str) -> Result<Vec<ClientOrderRow>> {
        let mut rows = sqlx::query_as::<_, ClientOrderRow>(
            "SELECT o.order_id, o.order_date, o.order_notes,
                    ps.fname || ' ' || ps.lname AS supervisor_name,
                    string_agg(DISTINCT pv.fname || ' ' || pv.lname, ', ') AS volunteers,
                    COUNT(DISTINCT ii.item_id) AS item_count
             FROM ordered o
             LEFT JOIN person ps ON o.supervisor = ps.username
             LEFT JOIN delivered d ON o.order_id = d.order_id
             LEFT JOIN person pv ON d.username = pv.username
             LEFT JOIN item_in ii ON o.order_id = ii.order_id
             WHERE o.client = $1
             GROUP BY o.order_id, ps.fname, ps.lname
             ORDER BY o.order_date DESC, o.order_id DESC",
        )
        .bind(client)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<i64> = rows.iter().map(|r| r.order_id).collect();
        let statuses = self.statuses_for_orders(&ids).await?;
        for row in &mut rows {
            row.status = Self::stitch_status(&statuses, row.order_id);
        }
        Ok(rows)
    }

    /// Donor view: orders containing at least one item this donor gave,
    /// with the item description and donation date.
    pub async fn donor_orders(&self, donor: &str) -> Result<Vec<DonorOrderRow>> {
        let mut rows = sqlx::query_as::<_, DonorOrderRow>(
            "SELECT o.order_id, o.order_date, i.i_description, db.donate_date
             FROM donated_by db
             JOIN item i ON db.item_id = i.item_id
             JOIN item_in ii ON i.item_id = ii.item_id
             JOIN ordered o ON ii.order_id = o.order_id
             WHERE db.username = $1
             ORDER BY o.order_date DESC, o.order_id DESC",
        )
        .bind(donor)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<i64> = rows.iter().map(|r| r.order_id).collect();
        let statuses = self.statuses_for_orders(&ids).await?;
        for row in &mut rows {
            row.status = Self::stitch_status(&statuses, row.order_id);
        }
        Ok(rows)
    }

    /// Staff view: every order (staff supervise globally), with item
    /// details and volunteer assignment lists.
    pub async fn staff_orders(&self) -> Result<Vec<StaffOrderRow>> {
        let mut rows = sqlx::query_as::<_, StaffOrderRow>(
            "SELECT o.order_id, o.order_date, o.order_notes, o.supervisor,
                    pc.fname || ' ' || pc.lname AS client_name,
                    string_agg(DISTINCT pv.fname || ' ' || pv.lname, ', ') AS volunteers,
                    string_agg(DISTINCT pv.username, ',') AS volunteer_usernames,
                    COUNT(DISTINCT ii.item_id) AS item_count,
                    string_agg(DISTINCT i.i_description || ' (' || COALESCE(i.color, 'n/a') || ')', ', ')
                        AS item_details
             FROM ordered o
             JOIN person pc ON o.client = pc.username
             LEFT JOIN delivered d ON o.order_id = d.order_id
             LEFT JOIN person pv ON d.username = pv.username
             LEFT JOIN item_in ii ON o.order_id = ii.order_id
             LEFT JOIN item i ON ii.item_id = i.item_id
             GROUP BY o.order_id, pc.fname, pc.lname
             ORDER BY o.order_date DESC, o.order_id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<i64> = rows.iter().map(|r| r.order_id).collect();
        let statuses = self.statuses_for_orders(&ids).await?;
        for row in &mut rows {
            row.status = Self::stitch_status(&statuses, row.order_id);
        }
        Ok(rows)
    }

    /// Volunteer view: orders where this volunteer appears in `delivered`.
    pub async fn volunteer_orders(&self, volunteer: &str) -> Result<Vec<VolunteerOrderRow>> {
        let mut rows = sqlx::query_as::<_, VolunteerOrderRow>(
            "SELECT o.order_id, o.order_date,
                    ps.fname || ' ' || ps.lname AS supervisor_name,
                    pc.fname || ' ' || pc.lname AS client_name,
                    COUNT(DISTINCT ii.item_id) AS item_count,
                    string_agg(DISTINCT d2.username, ',') AS volunteer_usernames,
                    string_agg(DISTINCT i.i_description || ' (' || COALESCE(i.color, 'n/a') || ')', ', ')
                        AS item_details
             FROM delivered d
             JOIN ordered o ON d.order_id = o.order_id
             JOIN person pc ON o.client = pc.username
             JOIN person ps ON o.supervisor = ps.username
             LEFT JOIN item_in ii ON o.order_id = ii.order_id
             LEFT JOIN item i ON ii.item_id = i.item_id
             LEFT JOIN delivered d2 ON o.order_id = d2.order_id
             WHERE d.username = $1
             GROUP BY o.order_id, ps.fname, ps.lname, pc.fname, pc.lname
             ORDER BY o.order_date DESC, o.order_id DESC",
        )
        .bind(volunteer)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<i64> = rows.iter().map(|r| r.order_id).collect();
        let statuses = self.statuses_for_orders(&ids).await?;
        for row in &mut rows {
            row.status = Self::stitch_status(&statuses, row.order_id);
        }
        Ok(rows)
    }

    // ── Details & ranking ─────────────────────────────────────────

    /// Per-item rows for one order: item identity, current status, and the
    /// assigned deliverer. The handler decides which rows the session may
    /// update.
    pub async fn get_order_details(&self, order_id: i64) -> Result<Vec<OrderItemDetailRow>> {
        let rows = sqlx::query_as::<_, OrderItemDetailRow>(
            "SELECT o.order_id, o.order_date, o.order_notes, o.supervisor,
                    pc.fname AS client_fname, pc.lname AS client_lname,
                    i.item_id, i.i_description, i.color,
                    d.status AS item_status,
                    d.username AS assigned_volunteer
             FROM ordered o
             JOIN person pc ON o.client = pc.username
             LEFT JOIN item_in ii ON o.order_id = ii.order_id
             LEFT JOIN item i ON ii.item_id = i.item_id
             LEFT JOIN delivered d ON ii.item_id = d.item_id
             WHERE o.order_id = $1
             ORDER BY i.item_id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Volunteers ranked by deliveries recorded since the cutoff date.
    pub async fn volunteer_ranking(&self, since: chrono::NaiveDate) -> Result<Vec<RankingRow>> {
        let rows = sqlx::query_as::<_, RankingRow>(
            "SELECT p.username, p.fname, p.lname,
                    COUNT(d.order_id) AS delivery_count
             FROM person p
             JOIN act a ON p.username = a.username
             LEFT JOIN delivered d ON p.username = d.username AND d.date >= $1
             WHERE a.role_id = 'volunteer'
             GROUP BY p.username
             ORDER BY delivery_count DESC, p.username",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
