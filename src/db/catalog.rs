//! Catalog operations — categories, items, pieces, and shelf locations.

use anyhow::Result;
use serde::Serialize;

use super::{Database, InventoryFilter};

/// Inventory listing row: item joined with its category and (first) piece
/// location.
#[derive(Serialize, sqlx::FromRow)]
pub struct InventoryRow {
    pub item_id: i64,
    pub i_description: String,
    pub main_category: String,
    pub sub_category: String,
    pub color: Option<String>,
    pub material: Option<String>,
    pub is_new: bool,
    pub has_pieces: bool,
    pub room_num: Option<i32>,
    pub shelf_num: Option<i32>,
    pub shelf: Option<String>,
}

/// Per-piece location row for the single-item lookup. Items without pieces
/// produce one row with the piece columns null.
#[derive(Serialize, sqlx::FromRow)]
pub struct ItemPieceRow {
    pub item_id: i64,
    pub i_description: String,
    pub p_description: Option<String>,
    pub piece_num: Option<i32>,
    pub room_num: Option<i32>,
    pub shelf_num: Option<i32>,
    pub shelf: Option<String>,
    pub shelf_description: Option<String>,
}

/// Piece location row for every item in an order (delivery pick list).
#[derive(Serialize, sqlx::FromRow)]
pub struct OrderItemPieceRow {
    pub item_id: i64,
    pub item_description: String,
    pub piece_num: Option<i32>,
    pub piece_description: Option<String>,
    pub room_num: Option<i32>,
    pub shelf_num: Option<i32>,
    pub shelf_name: Option<String>,
    pub shelf_description: Option<String>,
}

/// New item for donation intake.
pub struct NewItem<'a> {
    pub i_description: &'a str,
    pub color: Option<&'a str>,
    pub is_new: bool,
    pub has_pieces: bool,
    pub material: Option<&'a str>,
    pub main_category: &'a str,
    pub sub_category: &'a str,
}

/// New piece accompanying a multi-piece item.
pub struct NewPiece<'a> {
    pub p_description: &'a str,
    pub length: Option<i32>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub room_num: i32,
    pub shelf_num: i32,
    pub p_notes: Option<&'a str>,
}

impl Database {
    // ── Categories ────────────────────────────────────────────────

    pub async fn list_main_categories(&self) -> Result<Vec<String>> {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT main_category FROM category ORDER BY main_category",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_subcategories(&self, main_category: &str) -> Result<Vec<String>> {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT sub_category FROM category WHERE main_category = $1 ORDER BY sub_category",
        )
        .bind(main_category)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// A category/subcategory pair must exist in the catalog before it can
    /// be used for filtering or intake.
    pub async fn category_exists(&self, main_category: &str, sub_category: &str) -> Result<bool> {
        let found = sqlx::query_scalar::<_, i32>(
            "SELECT 1 FROM category WHERE main_category = $1 AND sub_category = $2 LIMIT 1",
        )
        .bind(main_category)
        .bind(sub_category)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found.is_some())
    }

    // ── Inventory ─────────────────────────────────────────────────

    /// List the full inventory with category and shelf placement.
    ///
    /// Sort column and direction come from the whitelisted filter, never
    /// from raw user input.
    pub async fn list_inventory(&self, filter: &InventoryFilter) -> Result<Vec<InventoryRow>> {
        let mut sql = String::from(
            "SELECT * FROM (
                 SELECT DISTINCT ON (i.item_id)
                        i.item_id, i.i_description, i.main_category, i.sub_category,
                        i.color, i.material, i.is_new, i.has_pieces,
                        p.room_num, p.shelf_num, l.shelf
                 FROM item i
                 LEFT JOIN piece p ON i.item_id = p.item_id
                 LEFT JOIN location l ON p.room_num = l.room_num AND p.shelf_num = l.shelf_num
                 WHERE 1=1",
        );
        if filter.main_category.is_some() {
            sql.push_str(" AND i.main_category = $1");
        }
        if filter.sub_category.is_some() {
            sql.push_str(if filter.main_category.is_some() {
                " AND i.sub_category = $2"
            } else {
                " AND i.sub_category = $1"
            });
        }
        sql.push_str(" ORDER BY i.item_id, p.piece_num) inv");
        sql.push_str(&format!(
            " ORDER BY inv.{} {}",
            filter.safe_sort_column(),
            filter.safe_sort_dir()
        ));

        let mut query = sqlx::query_as::<_, InventoryRow>(&sql);
        if let Some(ref main) = filter.main_category {
            query = query.bind(main);
        }
        if let Some(ref sub) = filter.sub_category {
            query = query.bind(sub);
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows)
    }

    pub async fn item_exists(&self, item_id: i64) -> Result<bool> {
        let found = sqlx::query_scalar::<_, i32>("SELECT 1 FROM item WHERE item_id = $1")
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    /// Locations of a single item's pieces. Items without pieces yield one
    /// row with null piece columns; an unknown item yields no rows.
    pub async fn get_item_locations(&self, item_id: i64) -> Result<Vec<ItemPieceRow>> {
        let rows = sqlx::query_as::<_, ItemPieceRow>(
            "SELECT i.item_id, i.i_description,
                    p.p_description, p.piece_num, p.room_num, p.shelf_num,
                    l.shelf, l.shelf_description
             FROM item i
             LEFT JOIN piece p ON i.item_id = p.item_id
             LEFT JOIN location l ON p.room_num = l.room_num AND p.shelf_num = l.shelf_num
             WHERE i.item_id = $1
             ORDER BY p.piece_num",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Piece locations for every item in an order, for assembling the
    /// delivery pick list.
    pub async fn get_order_items(&self, order_id: i64) -> Result<Vec<OrderItemPieceRow>> {
        let rows = sqlx::query_as::<_, OrderItemPieceRow>(
            "SELECT i.item_id,
                    i.i_description AS item_description,
                    p.piece_num,
                    p.p_description AS piece_description,
                    p.room_num, p.shelf_num,
                    l.shelf AS shelf_name,
                    l.shelf_description
             FROM item_in ii
             JOIN item i ON ii.item_id = i.item_id
             LEFT JOIN piece p ON i.item_id = p.item_id
             LEFT JOIN location l ON p.room_num = l.room_num AND p.shelf_num = l.shelf_num
             WHERE ii.order_id = $1
             ORDER BY i.item_id, p.piece_num",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
