//! SQLite-based storage implementation.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension};
use tracing::{debug, info, warn};

use pantry_core::{
    now_millis, Category, Collection, CollectionItem, CollectionPatch, DatabaseConfig,
    InventoryItem, ItemFilter, ItemPatch, NewCollection, NewItem, PantryError, PriceHistoryEntry,
    PurchaseLine, Result, Store,
};

use crate::ledger;
use crate::schema::{MIGRATIONS, SCHEMA_VERSION};

/// SQLite-based store implementation.
///
/// Uses a blocking Mutex for thread-safe access; all mutations that span
/// more than one statement run inside explicit transactions.
pub struct SqliteStore {
    /// Connection wrapped in blocking Mutex.
    conn: Arc<Mutex<Connection>>,
}

// Manually implement Send + Sync since Connection is protected by Mutex
unsafe impl Send for SqliteStore {}
unsafe impl Sync for SqliteStore {}

impl SqliteStore {
    /// Open or create a database at the given path with default settings.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let config = DatabaseConfig {
            path: path.as_ref().to_path_buf(),
            ..Default::default()
        };
        Self::open_with_config(&config)
    }

    /// Open or create a database as described by the configuration.
    pub fn open_with_config(config: &DatabaseConfig) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open_with_flags(
            &config.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| PantryError::storage(format!("Failed to open database: {}", e)))?;

        Self::init(conn, config)
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| PantryError::storage(format!("Failed to open in-memory database: {}", e)))?;

        let config = DatabaseConfig {
            path: Path::new(":memory:").to_path_buf(),
            ..Default::default()
        };
        Self::init(conn, &config)
    }

    /// Initialize the store with a connection.
    fn init(conn: Connection, config: &DatabaseConfig) -> Result<Self> {
        Self::configure_connection(&conn, config)?;
        Self::apply_migrations(&conn)?;

        info!("Database opened at {:?}", config.path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Configure SQLite connection pragmas.
    fn configure_connection(conn: &Connection, config: &DatabaseConfig) -> Result<()> {
        let journal_mode = if config.wal_mode { "WAL" } else { "DELETE" };
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = {};\n\
             PRAGMA synchronous = NORMAL;\n\
             PRAGMA cache_size = {};\n\
             PRAGMA busy_timeout = {};\n\
             PRAGMA foreign_keys = ON;",
            journal_mode, config.cache_size, config.busy_timeout_ms
        ))
        .map_err(|e| PantryError::storage(format!("Failed to configure connection: {}", e)))?;

        Ok(())
    }

    /// Apply pending migrations, tracked through `PRAGMA user_version`.
    ///
    /// Safe to re-run: an up-to-date database applies nothing, and each
    /// migration is itself idempotent.
    fn apply_migrations(conn: &Connection) -> Result<()> {
        let current: u32 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .map_err(|e| PantryError::storage(e.to_string()))?;

        for (i, migration) in MIGRATIONS.iter().enumerate().skip(current as usize) {
            let version = i as u32 + 1;
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| PantryError::storage(e.to_string()))?;

            tx.execute_batch(migration)
                .map_err(|e| PantryError::storage(format!("Migration {} failed: {}", version, e)))?;
            tx.pragma_update(None, "user_version", version)
                .map_err(|e| PantryError::storage(e.to_string()))?;
            tx.commit().map_err(|e| PantryError::storage(e.to_string()))?;

            debug!("Applied migration {}", version);
        }

        if current < SCHEMA_VERSION {
            info!(
                "Schema migrated from version {} to {}",
                current, SCHEMA_VERSION
            );
        }

        Ok(())
    }

    /// Execute a blocking operation on the connection.
    fn with_conn<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| PantryError::storage(e.to_string()))?;
        f(&conn)
    }

    /// Check whether another item already uses this name (case-insensitive).
    fn name_in_use(conn: &Connection, name: &str, exclude_id: Option<i64>) -> Result<bool> {
        let existing: Option<i64> = match exclude_id {
            Some(id) => conn
                .query_row(
                    "SELECT id FROM inventory_items WHERE LOWER(name) = LOWER(?1) AND id != ?2",
                    params![name, id],
                    |row| row.get(0),
                )
                .optional(),
            None => conn
                .query_row(
                    "SELECT id FROM inventory_items WHERE LOWER(name) = LOWER(?1)",
                    params![name],
                    |row| row.get(0),
                )
                .optional(),
        }
        .map_err(|e| PantryError::storage(e.to_string()))?;

        Ok(existing.is_some())
    }
}

#[async_trait]
impl Store for SqliteStore {
    // Category operations

    async fn add_category(&self, name: &str) -> Result<i64> {
        let name = name.to_string();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO categories (name) VALUES (?1)",
                params![name],
            )
            .map_err(|e| {
                if e.to_string().contains("UNIQUE constraint") {
                    PantryError::duplicate_name(name.clone())
                } else {
                    PantryError::storage(format!("Failed to add category: {}", e))
                }
            })?;

            debug!("Added category: {}", name);
            Ok(conn.last_insert_rowid())
        })
    }

    async fn get_category(&self, id: i64) -> Result<Option<Category>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT c.id, c.name, COUNT(i.id), c.created_at
                    FROM categories c
                    LEFT JOIN inventory_items i ON c.id = i.category_id
                    WHERE c.id = ?1
                    GROUP BY c.id
                    "#,
                )
                .map_err(|e| PantryError::storage(e.to_string()))?;

            let result = stmt
                .query_row(params![id], row_to_category)
                .optional()
                .map_err(|e| PantryError::storage(e.to_string()))?;

            Ok(result)
        })
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT c.id, c.name, COUNT(i.id), c.created_at
                    FROM categories c
                    LEFT JOIN inventory_items i ON c.id = i.category_id
                    GROUP BY c.id
                    ORDER BY c.name ASC
                    "#,
                )
                .map_err(|e| PantryError::storage(e.to_string()))?;

            let categories = stmt
                .query_map([], row_to_category)
                .map_err(|e| PantryError::storage(e.to_string()))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| PantryError::storage(e.to_string()))?;

            Ok(categories)
        })
    }

    async fn update_category(&self, id: i64, name: &str) -> Result<bool> {
        let name = name.to_string();
        self.with_conn(|conn| {
            let changed = conn
                .execute(
                    "UPDATE categories SET name = ?1 WHERE id = ?2",
                    params![name, id],
                )
                .map_err(|e| {
                    if e.to_string().contains("UNIQUE constraint") {
                        PantryError::duplicate_name(name.clone())
                    } else {
                        PantryError::storage(e.to_string())
                    }
                })?;

            Ok(changed > 0)
        })
    }

    async fn delete_category(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            // Referential guard: refuse, not error, while items point here.
            let in_use: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM inventory_items WHERE category_id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .map_err(|e| PantryError::storage(e.to_string()))?;

            if in_use > 0 {
                debug!("Category {} still has {} items, not deleting", id, in_use);
                return Ok(false);
            }

            let deleted = conn
                .execute("DELETE FROM categories WHERE id = ?1", params![id])
                .map_err(|e| PantryError::storage(e.to_string()))?;

            Ok(deleted > 0)
        })
    }

    // Inventory operations

    async fn add_item(&self, item: NewItem) -> Result<i64> {
        self.with_conn(|conn| {
            if Self::name_in_use(conn, &item.name, None)? {
                return Err(PantryError::duplicate_name(item.name.clone()));
            }

            let now = now_millis();
            conn.execute(
                r#"
                INSERT INTO inventory_items
                    (name, category_id, quantity, unit, last_price, last_updated, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                "#,
                params![
                    item.name,
                    item.category_id,
                    item.quantity,
                    item.unit,
                    item.last_price,
                    now,
                ],
            )
            .map_err(|e| {
                if e.to_string().contains("UNIQUE constraint") {
                    PantryError::duplicate_name(item.name.clone())
                } else {
                    PantryError::storage(format!("Failed to add inventory item: {}", e))
                }
            })?;

            debug!("Added inventory item: {}", item.name);
            Ok(conn.last_insert_rowid())
        })
    }

    async fn get_item(&self, id: i64) -> Result<Option<InventoryItem>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!("{} WHERE i.id = ?1", ITEM_SELECT))
                .map_err(|e| PantryError::storage(e.to_string()))?;

            let result = stmt
                .query_row(params![id], row_to_item)
                .optional()
                .map_err(|e| PantryError::storage(e.to_string()))?;

            Ok(result)
        })
    }

    async fn list_items(&self, filter: ItemFilter) -> Result<Vec<InventoryItem>> {
        self.with_conn(|conn| {
            let mut conditions: Vec<&str> = Vec::new();
            let mut values: Vec<Value> = Vec::new();

            if let Some(category_id) = filter.category_id {
                conditions.push("i.category_id = ?");
                values.push(Value::Integer(category_id));
            }

            if let Some(is_empty) = filter.is_empty {
                conditions.push("i.is_empty = ?");
                values.push(Value::Integer(is_empty as i64));
            }

            if let Some(name) = filter.name.as_deref() {
                let name = name.trim();
                if !name.is_empty() {
                    conditions.push("i.name LIKE ?");
                    values.push(Value::Text(format!("%{}%", name)));
                }
            }

            let mut query = ITEM_SELECT.to_string();
            if !conditions.is_empty() {
                query.push_str(" WHERE ");
                query.push_str(&conditions.join(" AND "));
            }
            query.push_str(" ORDER BY i.name COLLATE NOCASE ASC");

            let mut stmt = conn
                .prepare(&query)
                .map_err(|e| PantryError::storage(e.to_string()))?;

            let items = stmt
                .query_map(params_from_iter(values), row_to_item)
                .map_err(|e| PantryError::storage(e.to_string()))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| PantryError::storage(e.to_string()))?;

            Ok(items)
        })
    }

    async fn update_item(&self, id: i64, patch: ItemPatch) -> Result<bool> {
        self.with_conn(|conn| {
            if patch.is_noop() {
                return Ok(false);
            }

            if let Some(name) = patch.name.as_deref() {
                if Self::name_in_use(conn, name, Some(id))? {
                    return Err(PantryError::duplicate_name(name));
                }
            }

            let mut sets: Vec<&str> = Vec::new();
            let mut values: Vec<Value> = Vec::new();

            if let Some(name) = patch.name {
                sets.push("name = ?");
                values.push(Value::Text(name));
            }
            if let Some(category_id) = patch.category_id {
                sets.push("category_id = ?");
                values.push(Value::Integer(category_id));
            }
            if let Some(quantity) = patch.quantity {
                sets.push("quantity = ?");
                values.push(Value::Real(quantity));
            }
            if let Some(unit) = patch.unit {
                sets.push("unit = ?");
                values.push(Value::Text(unit));
            }
            if let Some(last_price) = patch.last_price {
                sets.push("last_price = ?");
                values.push(Value::Real(last_price));
            }
            if let Some(is_empty) = patch.is_empty {
                sets.push("is_empty = ?");
                values.push(Value::Integer(is_empty as i64));
            }

            sets.push("last_updated = ?");
            values.push(Value::Integer(now_millis()));
            values.push(Value::Integer(id));

            let query = format!(
                "UPDATE inventory_items SET {} WHERE id = ?",
                sets.join(", ")
            );

            let changed = conn
                .execute(&query, params_from_iter(values))
                .map_err(|e| PantryError::storage(e.to_string()))?;

            Ok(changed > 0)
        })
    }

    async fn mark_item_empty(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn
                .execute(
                    r#"
                    UPDATE inventory_items
                    SET is_empty = 1, quantity = 0, last_updated = ?1
                    WHERE id = ?2
                    "#,
                    params![now_millis(), id],
                )
                .map_err(|e| PantryError::storage(e.to_string()))?;

            Ok(changed > 0)
        })
    }

    async fn delete_item(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            // An item with purchase history cannot be deleted; the lines
            // and price records reference it.
            let referenced: i64 = conn
                .query_row(
                    r#"
                    SELECT (SELECT COUNT(*) FROM collection_items WHERE item_id = ?1)
                         + (SELECT COUNT(*) FROM price_history WHERE item_id = ?1)
                    "#,
                    params![id],
                    |row| row.get(0),
                )
                .map_err(|e| PantryError::storage(e.to_string()))?;

            if referenced > 0 {
                return Err(PantryError::ReferentialConflict {
                    entity: "inventory item",
                    id,
                });
            }

            let deleted = conn
                .execute("DELETE FROM inventory_items WHERE id = ?1", params![id])
                .map_err(|e| PantryError::storage(e.to_string()))?;

            Ok(deleted > 0)
        })
    }

    // Collection operations

    async fn add_collection(&self, collection: NewCollection) -> Result<i64> {
        self.with_conn(|conn| {
            let now = now_millis();
            let purchase_date = collection.purchase_date.unwrap_or(now);

            conn.execute(
                r#"
                INSERT INTO collections (name, purchase_date, total_amount, notes, created_at)
                VALUES (?1, ?2, 0, ?3, ?4)
                "#,
                params![collection.name, purchase_date, collection.notes, now],
            )
            .map_err(|e| PantryError::storage(format!("Failed to add collection: {}", e)))?;

            debug!("Added collection: {}", collection.name);
            Ok(conn.last_insert_rowid())
        })
    }

    async fn get_collection(&self, id: i64) -> Result<Option<Collection>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "{} WHERE co.id = ?1 GROUP BY co.id",
                    COLLECTION_SELECT
                ))
                .map_err(|e| PantryError::storage(e.to_string()))?;

            let result = stmt
                .query_row(params![id], row_to_collection)
                .optional()
                .map_err(|e| PantryError::storage(e.to_string()))?;

            Ok(result)
        })
    }

    async fn list_collections(&self) -> Result<Vec<Collection>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "{} GROUP BY co.id ORDER BY co.purchase_date DESC",
                    COLLECTION_SELECT
                ))
                .map_err(|e| PantryError::storage(e.to_string()))?;

            let collections = stmt
                .query_map([], row_to_collection)
                .map_err(|e| PantryError::storage(e.to_string()))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| PantryError::storage(e.to_string()))?;

            Ok(collections)
        })
    }

    async fn list_collection_items(&self, collection_id: i64) -> Result<Vec<CollectionItem>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT ci.id, ci.collection_id, ci.item_id, i.name, c.name,
                           ci.quantity, ci.price, ci.unit, ci.created_at
                    FROM collection_items ci
                    JOIN inventory_items i ON ci.item_id = i.id
                    LEFT JOIN categories c ON i.category_id = c.id
                    WHERE ci.collection_id = ?1
                    ORDER BY i.name ASC
                    "#,
                )
                .map_err(|e| PantryError::storage(e.to_string()))?;

            let items = stmt
                .query_map(params![collection_id], |row| {
                    Ok(CollectionItem {
                        id: row.get(0)?,
                        collection_id: row.get(1)?,
                        item_id: row.get(2)?,
                        item_name: row.get(3)?,
                        category_name: row.get(4)?,
                        quantity: row.get(5)?,
                        price: row.get(6)?,
                        unit: row.get(7)?,
                        created_at: row.get(8)?,
                    })
                })
                .map_err(|e| PantryError::storage(e.to_string()))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| PantryError::storage(e.to_string()))?;

            Ok(items)
        })
    }

    async fn update_collection(&self, id: i64, patch: CollectionPatch) -> Result<bool> {
        self.with_conn(|conn| {
            if patch.is_noop() {
                return Ok(false);
            }

            let mut sets: Vec<&str> = Vec::new();
            let mut values: Vec<Value> = Vec::new();

            if let Some(name) = patch.name {
                sets.push("name = ?");
                values.push(Value::Text(name));
            }
            if let Some(purchase_date) = patch.purchase_date {
                sets.push("purchase_date = ?");
                values.push(Value::Integer(purchase_date));
            }
            if let Some(total_amount) = patch.total_amount {
                sets.push("total_amount = ?");
                values.push(Value::Real(total_amount));
            }
            if let Some(notes) = patch.notes {
                sets.push("notes = ?");
                values.push(Value::Text(notes));
            }

            values.push(Value::Integer(id));

            let query = format!("UPDATE collections SET {} WHERE id = ?", sets.join(", "));

            let changed = conn
                .execute(&query, params_from_iter(values))
                .map_err(|e| PantryError::storage(e.to_string()))?;

            Ok(changed > 0)
        })
    }

    async fn delete_collection(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| PantryError::storage(e.to_string()))?;

            // Line items first; they carry the collection FK.
            tx.execute(
                "DELETE FROM collection_items WHERE collection_id = ?1",
                params![id],
            )
            .map_err(|e| PantryError::storage(e.to_string()))?;

            let deleted = tx
                .execute("DELETE FROM collections WHERE id = ?1", params![id])
                .map_err(|e| PantryError::storage(e.to_string()))?;

            tx.commit().map_err(|e| PantryError::storage(e.to_string()))?;

            if deleted > 0 {
                debug!("Deleted collection {}", id);
            }
            Ok(deleted > 0)
        })
    }

    // Ledger operations

    async fn record_purchase_line(&self, line: PurchaseLine) -> Result<i64> {
        self.with_conn(|conn| ledger::record_line(conn, &line))
    }

    async fn item_price_history(&self, item_id: i64) -> Result<Vec<PriceHistoryEntry>> {
        if item_id <= 0 {
            return Ok(Vec::new());
        }

        self.with_conn(|conn| {
            // History is supplementary display data: a failed read (for
            // example a database from before the price_history migration)
            // yields an empty list instead of blocking the caller.
            let entries = read_price_history(conn, item_id).unwrap_or_else(|e| {
                warn!("Price history read failed for item {}: {}", item_id, e);
                Vec::new()
            });

            Ok(entries)
        })
    }
}

const ITEM_SELECT: &str = r#"
    SELECT i.id, i.name, i.category_id, c.name, i.quantity, i.unit,
           i.last_price, i.last_spent_price, i.is_empty, i.last_updated, i.created_at
    FROM inventory_items i
    LEFT JOIN categories c ON i.category_id = c.id
"#;

const COLLECTION_SELECT: &str = r#"
    SELECT co.id, co.name, co.purchase_date, co.total_amount, co.notes, co.created_at,
           COUNT(ci.id), SUM(ci.price)
    FROM collections co
    LEFT JOIN collection_items ci ON co.id = ci.collection_id
"#;

fn row_to_category(row: &rusqlite::Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        item_count: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn row_to_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<InventoryItem> {
    Ok(InventoryItem {
        id: row.get(0)?,
        name: row.get(1)?,
        category_id: row.get(2)?,
        category_name: row.get(3)?,
        quantity: row.get(4)?,
        unit: row.get(5)?,
        last_price: row.get(6)?,
        last_spent_price: row.get(7)?,
        is_empty: row.get(8)?,
        last_updated: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn row_to_collection(row: &rusqlite::Row<'_>) -> rusqlite::Result<Collection> {
    Ok(Collection {
        id: row.get(0)?,
        name: row.get(1)?,
        purchase_date: row.get(2)?,
        total_amount: row.get(3)?,
        notes: row.get(4)?,
        created_at: row.get(5)?,
        item_count: row.get(6)?,
        actual_total: row.get(7)?,
    })
}

fn read_price_history(conn: &Connection, item_id: i64) -> Result<Vec<PriceHistoryEntry>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT ph.id, ph.item_id, ph.price, ph.quantity, ph.unit_price, ph.unit,
                   ph.collection_id, co.name, co.purchase_date,
                   ph.standard_unit, ph.standard_unit_price, ph.recorded_at
            FROM price_history ph
            LEFT JOIN collections co ON ph.collection_id = co.id
            WHERE ph.item_id = ?1
            ORDER BY ph.recorded_at DESC, ph.id DESC
            "#,
        )
        .map_err(|e| PantryError::storage(e.to_string()))?;

    let entries = stmt
        .query_map(params![item_id], |row| {
            Ok(PriceHistoryEntry {
                id: row.get(0)?,
                item_id: row.get(1)?,
                price: row.get(2)?,
                quantity: row.get(3)?,
                unit_price: row.get(4)?,
                unit: row.get(5)?,
                collection_id: row.get(6)?,
                collection_name: row.get(7)?,
                purchase_date: row.get(8)?,
                standard_unit: row.get(9)?,
                standard_unit_price: row.get(10)?,
                recorded_at: row.get(11)?,
            })
        })
        .map_err(|e| PantryError::storage(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| PantryError::storage(e.to_string()))?;

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteStore {
        SqliteStore::open_memory().unwrap()
    }

    async fn add_kg_item(store: &SqliteStore, name: &str, last_price: Option<f64>) -> i64 {
        store
            .add_item(NewItem {
                name: name.to_string(),
                unit: "kg".to_string(),
                last_price,
                ..Default::default()
            })
            .await
            .unwrap()
    }

    async fn add_trip(store: &SqliteStore, name: &str) -> i64 {
        store
            .add_collection(NewCollection {
                name: name.to_string(),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_open_seeds_default_categories() {
        let store = store();
        let categories = store.list_categories().await.unwrap();
        assert_eq!(categories.len(), 11);
        assert!(categories.iter().any(|c| c.name == "Spices"));
        assert!(categories.iter().all(|c| c.item_count == 0));
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let store = store();
        {
            let conn = store.conn.lock().unwrap();
            SqliteStore::apply_migrations(&conn).unwrap();
            SqliteStore::apply_migrations(&conn).unwrap();
        }
        // Seeds did not duplicate.
        assert_eq!(store.list_categories().await.unwrap().len(), 11);
    }

    #[tokio::test]
    async fn test_category_crud() {
        let store = store();

        let id = store.add_category("Frozen").await.unwrap();
        let cat = store.get_category(id).await.unwrap().unwrap();
        assert_eq!(cat.name, "Frozen");

        assert!(store.update_category(id, "Frozen Goods").await.unwrap());
        let cat = store.get_category(id).await.unwrap().unwrap();
        assert_eq!(cat.name, "Frozen Goods");

        assert!(store.delete_category(id).await.unwrap());
        assert!(store.get_category(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_category_rejected() {
        let store = store();
        let err = store.add_category("Spices").await.unwrap_err();
        assert_eq!(err.error_code(), "DUPLICATE_NAME");
    }

    #[tokio::test]
    async fn test_category_delete_refused_while_in_use() {
        let store = store();
        let cat_id = store.add_category("Bulk").await.unwrap();
        store
            .add_item(NewItem {
                name: "Rice".to_string(),
                category_id: Some(cat_id),
                unit: "kg".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        // In use: refused without an error, category left intact.
        assert!(!store.delete_category(cat_id).await.unwrap());
        assert!(store.get_category(cat_id).await.unwrap().is_some());

        // Unused: delete succeeds.
        let other = store.add_category("Unused").await.unwrap();
        assert!(store.delete_category(other).await.unwrap());
    }

    #[tokio::test]
    async fn test_item_crud_and_filters() {
        let store = store();
        let cat_id = store.add_category("Staples").await.unwrap();

        store
            .add_item(NewItem {
                name: "Basmati Rice".to_string(),
                category_id: Some(cat_id),
                quantity: 5.0,
                unit: "kg".to_string(),
                last_price: Some(100.0),
            })
            .await
            .unwrap();
        let oil_id = store
            .add_item(NewItem {
                name: "Sunflower Oil".to_string(),
                unit: "l".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let all = store.list_items(ItemFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let by_category = store
            .list_items(ItemFilter {
                category_id: Some(cat_id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_category.len(), 1);
        assert_eq!(by_category[0].name, "Basmati Rice");
        assert_eq!(by_category[0].category_name.as_deref(), Some("Staples"));

        let by_name = store
            .list_items(ItemFilter {
                name: Some("oil".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].id, oil_id);

        assert!(store.delete_item(oil_id).await.unwrap());
        assert!(store.get_item(oil_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_item_name_case_insensitive() {
        let store = store();
        add_kg_item(&store, "Rice", None).await;

        let err = store
            .add_item(NewItem {
                name: "rice".to_string(),
                unit: "kg".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "DUPLICATE_NAME");

        // The second row was never created.
        let all = store.list_items(ItemFilter::default()).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_update_item_patch() {
        let store = store();
        let id = add_kg_item(&store, "Rice", Some(100.0)).await;

        // Empty patch is a no-op.
        assert!(!store.update_item(id, ItemPatch::default()).await.unwrap());

        let changed = store
            .update_item(
                id,
                ItemPatch {
                    last_price: Some(110.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(changed);

        let item = store.get_item(id).await.unwrap().unwrap();
        assert_eq!(item.last_price, Some(110.0));
        assert_eq!(item.name, "Rice");

        // Renaming onto another item's name is rejected.
        add_kg_item(&store, "Wheat", None).await;
        let err = store
            .update_item(
                id,
                ItemPatch {
                    name: Some("WHEAT".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "DUPLICATE_NAME");
    }

    #[tokio::test]
    async fn test_mark_item_empty() {
        let store = store();
        let id = store
            .add_item(NewItem {
                name: "Milk".to_string(),
                quantity: 2.0,
                unit: "l".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(store.mark_item_empty(id).await.unwrap());
        let item = store.get_item(id).await.unwrap().unwrap();
        assert_eq!(item.quantity, 0.0);
        assert!(item.is_empty);

        assert!(!store.mark_item_empty(9999).await.unwrap());
    }

    #[tokio::test]
    async fn test_collection_crud_and_cascade_delete() {
        let store = store();
        let item_id = add_kg_item(&store, "Rice", None).await;
        let trip_id = add_trip(&store, "Weekly shop").await;

        store
            .record_purchase_line(PurchaseLine::new(trip_id, item_id, 1.0, 80.0, "kg"))
            .await
            .unwrap();

        let trip = store.get_collection(trip_id).await.unwrap().unwrap();
        assert_eq!(trip.item_count, 1);
        assert_eq!(trip.actual_total, Some(80.0));

        assert!(store.delete_collection(trip_id).await.unwrap());
        assert!(store.get_collection(trip_id).await.unwrap().is_none());
        assert!(store
            .list_collection_items(trip_id)
            .await
            .unwrap()
            .is_empty());

        // Price history outlives the trip; only its reference clears.
        let history = store.item_price_history(item_id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].collection_id, None);
        assert_eq!(history[0].collection_name, None);
    }

    #[tokio::test]
    async fn test_update_collection_patch() {
        let store = store();
        let id = add_trip(&store, "Trip").await;

        let changed = store
            .update_collection(
                id,
                CollectionPatch {
                    notes: Some("paid cash".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(changed);

        let trip = store.get_collection(id).await.unwrap().unwrap();
        assert_eq!(trip.notes.as_deref(), Some("paid cash"));
    }

    // The collection total always equals the sum of its line prices.
    #[tokio::test]
    async fn test_total_tracks_line_sum() {
        let store = store();
        let rice = add_kg_item(&store, "Rice", None).await;
        let oil = store
            .add_item(NewItem {
                name: "Oil".to_string(),
                unit: "l".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let trip_id = add_trip(&store, "Trip").await;

        let prices = [80.0, 120.5, 33.25];
        let items = [rice, oil, rice];
        let mut expected = 0.0;
        for (price, item) in prices.iter().zip(items.iter()) {
            store
                .record_purchase_line(PurchaseLine::new(trip_id, *item, 1.0, *price, "kg"))
                .await
                .unwrap();
            expected += price;

            let trip = store.get_collection(trip_id).await.unwrap().unwrap();
            assert_eq!(trip.total_amount, expected);
        }

        let lines = store.list_collection_items(trip_id).await.unwrap();
        let sum: f64 = lines.iter().map(|l| l.price).sum();
        assert_eq!(sum, expected);
    }

    // Stock updates in the item's canonical unit.
    #[tokio::test]
    async fn test_stock_added_in_canonical_unit() {
        let store = store();
        let item_id = add_kg_item(&store, "Rice", None).await;
        let trip_id = add_trip(&store, "Trip").await;

        store
            .record_purchase_line(PurchaseLine::new(trip_id, item_id, 2000.0, 100.0, "g"))
            .await
            .unwrap();

        let item = store.get_item(item_id).await.unwrap().unwrap();
        assert_eq!(item.quantity, 2.0);
    }

    // last_price is never touched by purchase recording.
    #[tokio::test]
    async fn test_last_price_isolated_from_purchases() {
        let store = store();
        let item_id = add_kg_item(&store, "Rice", Some(100.0)).await;
        let trip_id = add_trip(&store, "Trip").await;

        for _ in 0..5 {
            store
                .record_purchase_line(PurchaseLine::new(trip_id, item_id, 1.0, 95.0, "kg"))
                .await
                .unwrap();
        }

        let item = store.get_item(item_id).await.unwrap().unwrap();
        assert_eq!(item.last_price, Some(100.0));
        assert_eq!(item.last_spent_price, Some(95.0));

        // Only an explicit edit changes it.
        store
            .update_item(
                item_id,
                ItemPatch {
                    last_price: Some(98.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let item = store.get_item(item_id).await.unwrap().unwrap();
        assert_eq!(item.last_price, Some(98.0));
    }

    // History grows by exactly one entry per line, newest first.
    #[tokio::test]
    async fn test_price_history_append_only() {
        let store = store();
        let item_id = add_kg_item(&store, "Rice", None).await;
        let trip_id = add_trip(&store, "Trip").await;

        for i in 0..4 {
            store
                .record_purchase_line(PurchaseLine::new(
                    trip_id,
                    item_id,
                    1.0,
                    80.0 + i as f64,
                    "kg",
                ))
                .await
                .unwrap();
        }

        let history = store.item_price_history(item_id).await.unwrap();
        assert_eq!(history.len(), 4);
        // Newest first: the last recorded price leads.
        assert_eq!(history[0].price, 83.0);
        assert_eq!(history[3].price, 80.0);
        for pair in history.windows(2) {
            assert!(pair[0].recorded_at >= pair[1].recorded_at);
        }
        assert_eq!(history[0].collection_name.as_deref(), Some("Trip"));
    }

    // A failure after the first write leaves nothing behind.
    #[tokio::test]
    async fn test_failed_line_rolls_back_everything() {
        let store = store();
        let item_id = add_kg_item(&store, "Rice", None).await;
        let trip_id = add_trip(&store, "Trip").await;

        // Force the price-history step to fail after the line insert.
        store
            .conn
            .lock()
            .unwrap()
            .execute_batch("DROP TABLE price_history")
            .unwrap();

        let err = store
            .record_purchase_line(PurchaseLine::new(trip_id, item_id, 1.0, 50.0, "kg"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "STORAGE_ERROR");

        // No partial state: no line, total untouched, stock untouched.
        assert!(store
            .list_collection_items(trip_id)
            .await
            .unwrap()
            .is_empty());
        let trip = store.get_collection(trip_id).await.unwrap().unwrap();
        assert_eq!(trip.total_amount, 0.0);
        let item = store.get_item(item_id).await.unwrap().unwrap();
        assert_eq!(item.quantity, 0.0);
    }

    #[tokio::test]
    async fn test_missing_ids_rejected_before_writes() {
        let store = store();
        let item_id = add_kg_item(&store, "Rice", None).await;
        let trip_id = add_trip(&store, "Trip").await;

        let err = store
            .record_purchase_line(PurchaseLine::new(9999, item_id, 1.0, 10.0, "kg"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");

        let err = store
            .record_purchase_line(PurchaseLine::new(trip_id, 9999, 1.0, 10.0, "kg"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");

        let err = store
            .record_purchase_line(PurchaseLine::new(trip_id, item_id, 0.0, 10.0, "kg"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_QUANTITY");

        assert!(store.item_price_history(item_id).await.unwrap().is_empty());
        let trip = store.get_collection(trip_id).await.unwrap().unwrap();
        assert_eq!(trip.item_count, 0);
    }

    #[tokio::test]
    async fn test_delete_item_with_history_refused() {
        let store = store();
        let item_id = add_kg_item(&store, "Rice", None).await;
        let trip_id = add_trip(&store, "Trip").await;

        store
            .record_purchase_line(PurchaseLine::new(trip_id, item_id, 1.0, 50.0, "kg"))
            .await
            .unwrap();

        let err = store.delete_item(item_id).await.unwrap_err();
        assert_eq!(err.error_code(), "REFERENTIAL_CONFLICT");
        assert!(store.get_item(item_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_history_read_is_soft() {
        let store = store();

        // Unknown item and bogus id both read as empty, never an error.
        assert!(store.item_price_history(1234).await.unwrap().is_empty());
        assert!(store.item_price_history(-1).await.unwrap().is_empty());

        // Even a missing table reads as empty.
        store
            .conn
            .lock()
            .unwrap()
            .execute_batch("DROP TABLE price_history")
            .unwrap();
        assert!(store.item_price_history(1).await.unwrap().is_empty());
    }

    // End-to-end example: 500 g for 60 against a kg item.
    #[tokio::test]
    async fn test_gram_purchase_against_kilogram_item() {
        let store = store();
        let item_id = add_kg_item(&store, "Rice", Some(100.0)).await;
        let trip_id = add_trip(&store, "Trip").await;

        store
            .record_purchase_line(PurchaseLine::new(trip_id, item_id, 500.0, 60.0, "g"))
            .await
            .unwrap();

        let item = store.get_item(item_id).await.unwrap().unwrap();
        assert_eq!(item.quantity, 0.5);
        assert_eq!(item.last_spent_price, Some(60.0));
        assert_eq!(item.last_price, Some(100.0));
        assert!(!item.is_empty);

        let history = store.item_price_history(item_id).await.unwrap();
        assert_eq!(history.len(), 1);
        let entry = &history[0];
        assert_eq!(entry.unit.as_deref(), Some("g"));
        assert_eq!(entry.quantity, 500.0);
        assert_eq!(entry.price, 60.0);
        // The default-path unit price stays in the purchase unit: 60/500.
        assert!((entry.unit_price - 0.12).abs() < 1e-12);
        assert_eq!(entry.standard_unit.as_deref(), Some("kg"));
        assert_eq!(entry.standard_unit_price, Some(entry.unit_price));
    }

    #[tokio::test]
    async fn test_caller_supplied_standard_price_recorded_verbatim() {
        let store = store();
        let item_id = add_kg_item(&store, "Rice", None).await;
        let trip_id = add_trip(&store, "Trip").await;

        let mut line = PurchaseLine::new(trip_id, item_id, 500.0, 60.0, "g");
        line.standard_unit = Some("kg".to_string());
        line.standard_unit_price = Some(120.0);
        store.record_purchase_line(line).await.unwrap();

        let history = store.item_price_history(item_id).await.unwrap();
        assert_eq!(history[0].standard_unit_price, Some(120.0));
        assert_eq!(history[0].standard_unit.as_deref(), Some("kg"));
    }

    #[tokio::test]
    async fn test_purchase_clears_empty_flag() {
        let store = store();
        let item_id = add_kg_item(&store, "Rice", None).await;
        let trip_id = add_trip(&store, "Trip").await;

        store.mark_item_empty(item_id).await.unwrap();
        store
            .record_purchase_line(PurchaseLine::new(trip_id, item_id, 1.0, 50.0, "kg"))
            .await
            .unwrap();

        let item = store.get_item(item_id).await.unwrap().unwrap();
        assert!(!item.is_empty);
        assert_eq!(item.quantity, 1.0);
    }

    #[tokio::test]
    async fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pantry.sqlite");

        {
            let store = SqliteStore::open(&path).unwrap();
            add_kg_item(&store, "Rice", None).await;
        }

        // Reopen: migrations re-run harmlessly, data persists.
        let store = SqliteStore::open(&path).unwrap();
        let items = store.list_items(ItemFilter::default()).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Rice");
    }
}
