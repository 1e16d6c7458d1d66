//! # Database — PostgreSQL Storage Layer
//!
//! Async storage operations for the donation-tracking domain via
//! `sqlx::PgPool`. All statements are parameterized; multi-statement writes
//! run inside explicit transactions so a failure leaves no partial rows.
//!
//! ## Schema
//!
//! - `person`, `person_phone`, `role`, `act`: accounts and role assignments
//! - `category`, `item`, `piece`, `location`: the donated-goods catalog
//! - `donated_by`: donor → item provenance
//! - `ordered`, `item_in`, `delivered`: the order lifecycle
//!
//! The one-order-per-item invariant is enforced by a unique index on
//! `item_in.item_id`, not by a check-then-insert sequence, so concurrent
//! staff sessions cannot race an item into two orders.
//!
//! ## Module Structure
//!
//! Operations are split into submodules by domain:
//!
//! - [`accounts`] — registration, credential lookup, role assignments
//! - [`catalog`] — categories, items, pieces, shelf locations
//! - [`donations`] — donation intake and activity feeds
//! - [`orders`] — order lifecycle, delivery statuses, role projections

mod accounts;
mod catalog;
mod donations;
mod orders;

pub use accounts::{NewPerson, PersonAuthRow};
pub use catalog::{InventoryRow, ItemPieceRow, NewItem, NewPiece, OrderItemPieceRow};
pub use donations::{ActivityRow, DashboardStats, DonationRow, NewDonatedItem, RecordedItem};
pub use orders::{
    AddItemOutcome, AvailableItemRow, ClientOrderRow, DonorOrderRow, OrderItemDetailRow,
    RankingRow, StaffOrderRow, StatusUpdate, VolunteerOrderRow,
};

use anyhow::Result;
use serde::Deserialize;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

/// Inventory listing filter with whitelisted sort parameters.
#[derive(Deserialize, Default, Clone)]
pub struct InventoryFilter {
    pub main_category: Option<String>,
    pub sub_category: Option<String>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
}

impl InventoryFilter {
    /// Whitelist sort column to prevent SQL injection.
    /// Unknown values default to "item_id".
    pub(crate) fn safe_sort_column(&self) -> &str {
        match self.sort_by.as_deref() {
            Some("description") => "i_description",
            Some("main_category") => "main_category",
            Some("color") => "color",
            Some("material") => "material",
            _ => "item_id",
        }
    }

    /// Whitelist sort direction to prevent SQL injection.
    /// Only "desc"/"DESC" are accepted; everything else defaults to "ASC".
    pub(crate) fn safe_sort_dir(&self) -> &str {
        match self.sort_dir.as_deref() {
            Some("desc") | Some("DESC") => "DESC",
            _ => "ASC",
        }
    }
}

/// True if the error chain bottoms out in a Postgres unique violation.
///
/// Used to map duplicate usernames and duplicate item-order links to
/// conflict responses instead of opaque 500s.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .and_then(|db| db.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL using the provided database URL.
    ///
    /// Manually parses the URL so usernames containing dots or URL-encoded
    /// characters (managed-Postgres pooler conventions) survive intact.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let url = url::Url::parse(database_url)?;
        let username = urlencoding::decode(url.username())?.into_owned();
        let password = url
            .password()
            .map(|p| urlencoding::decode(p).map(|s| s.into_owned()))
            .transpose()?;
        let mut opts = PgConnectOptions::new()
            .host(url.host_str().unwrap_or("localhost"))
            .port(url.port().unwrap_or(5432))
            .database(url.path().trim_start_matches('/'))
            .username(&username)
            .statement_cache_capacity(0);
        if let Some(ref pw) = password {
            opts = opts.password(pw);
        }
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;
        Ok(Database { pool })
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Health check: execute `SELECT 1` to verify database connectivity.
    ///
    /// Used by the `/readyz` readiness probe.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    /// Total item count, for the inventory gauge.
    pub async fn count_items(&self) -> Result<i64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM item")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    /// Total order count, for the orders gauge.
    pub async fn count_orders(&self) -> Result<i64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM ordered")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}

// ── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_sort_column_whitelists_known_columns() {
        let cases = vec![
            ("description", "i_description"),
            ("main_category", "main_category"),
            ("color", "color"),
            ("material", "material"),
        ];
        for (input, expected) in cases {
            let filter = InventoryFilter {
                sort_by: Some(input.into()),
                ..Default::default()
            };
            assert_eq!(filter.safe_sort_column(), expected);
        }
    }

    #[test]
    fn safe_sort_column_defaults_to_item_id_for_unknown() {
        let unknown_inputs = vec![
            "item_id",
            "unknown",
            "'; DROP TABLE item; --",
            "",
            "is_new",
        ];
        for input in unknown_inputs {
            let filter = InventoryFilter {
                sort_by: Some(input.into()),
                ..Default::default()
            };
            assert_eq!(
                filter.safe_sort_column(),
                "item_id",
                "Unknown sort_by '{}' should default to 'item_id'",
                input
            );
        }
    }

    #[test]
    fn safe_sort_dir_accepts_desc() {
        for input in ["desc", "DESC"] {
            let filter = InventoryFilter {
                sort_dir: Some(input.into()),
                ..Default::default()
            };
            assert_eq!(filter.safe_sort_dir(), "DESC");
        }
    }

    #[test]
    fn safe_sort_dir_defaults_to_asc() {
        let unknown_inputs = vec!["asc", "Desc", "random", "'; DROP TABLE--", ""];
        for input in unknown_inputs {
            let filter = InventoryFilter {
                sort_dir: Some(input.into()),
                ..Default::default()
            };
            assert_eq!(filter.safe_sort_dir(), "ASC");
        }
    }

    #[test]
    fn non_sqlx_errors_are_not_unique_violations() {
        let err = anyhow::anyhow!("plain error");
        assert!(!is_unique_violation(&err));
    }
}
