//! The transactional ledger writer.
//!
//! Recording a purchase line touches four tables: the line itself, the
//! price history trail, the item's stock, and the parent collection's
//! total. All four mutations run inside one transaction; a failure at any
//! step rolls the whole unit back, so a line is never observable without
//! its matching history entry and stock update.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, warn};

use pantry_core::{normalize_line, now_millis, PantryError, PurchaseLine, Result};

/// Record one purchase line atomically. Returns the new line id.
///
/// Validation (collection and item existence, quantity sanity) happens
/// before the first write, so the domain errors never leave debris behind.
pub fn record_line(conn: &Connection, line: &PurchaseLine) -> Result<i64> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| PantryError::storage(e.to_string()))?;

    let collection_exists: Option<i64> = tx
        .query_row(
            "SELECT id FROM collections WHERE id = ?1",
            params![line.collection_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| PantryError::storage(e.to_string()))?;
    if collection_exists.is_none() {
        return Err(PantryError::not_found("collection", line.collection_id));
    }

    let item_unit: Option<String> = tx
        .query_row(
            "SELECT unit FROM inventory_items WHERE id = ?1",
            params![line.item_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| PantryError::storage(e.to_string()))?;
    let item_unit = item_unit.ok_or(PantryError::not_found("inventory item", line.item_id))?;

    let normalized = normalize_line(line, &item_unit)?;
    if normalized.pass_through {
        warn!(
            item_id = line.item_id,
            purchase_unit = line.unit.as_deref().unwrap_or(""),
            item_unit = %item_unit,
            "no conversion rule between units, stock updated 1:1"
        );
    }

    let now = now_millis();

    tx.execute(
        r#"
        INSERT INTO collection_items (collection_id, item_id, quantity, price, unit, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            line.collection_id,
            line.item_id,
            line.quantity,
            line.price,
            line.unit,
            now,
        ],
    )
    .map_err(|e| PantryError::storage(format!("Failed to insert purchase line: {}", e)))?;

    let line_id = tx.last_insert_rowid();

    tx.execute(
        r#"
        INSERT INTO price_history (
            item_id, price, quantity, unit_price, unit, collection_id,
            standard_unit, standard_unit_price, recorded_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            line.item_id,
            line.price,
            line.quantity,
            normalized.unit_price,
            line.unit,
            line.collection_id,
            normalized.standard_unit,
            normalized.standard_unit_price,
            now,
        ],
    )
    .map_err(|e| PantryError::storage(format!("Failed to record price history: {}", e)))?;

    // Stock and last-spent only. `last_price` is user-curated and never
    // touched by purchase recording.
    tx.execute(
        r#"
        UPDATE inventory_items
        SET quantity = quantity + ?1,
            last_spent_price = ?2,
            is_empty = 0,
            last_updated = ?3
        WHERE id = ?4
        "#,
        params![normalized.quantity_to_add, line.price, now, line.item_id],
    )
    .map_err(|e| PantryError::storage(format!("Failed to update inventory: {}", e)))?;

    // Full re-aggregation rather than an incremental add, so the stored
    // total self-heals from any prior drift.
    tx.execute(
        r#"
        UPDATE collections
        SET total_amount = (
            SELECT COALESCE(SUM(price), 0) FROM collection_items WHERE collection_id = ?1
        )
        WHERE id = ?1
        "#,
        params![line.collection_id],
    )
    .map_err(|e| PantryError::storage(format!("Failed to update collection total: {}", e)))?;

    tx.commit()
        .map_err(|e| PantryError::storage(e.to_string()))?;

    debug!(
        line_id,
        item_id = line.item_id,
        collection_id = line.collection_id,
        quantity_added = normalized.quantity_to_add,
        "Recorded purchase line"
    );

    Ok(line_id)
}
