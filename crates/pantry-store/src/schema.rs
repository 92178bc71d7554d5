//! Database schema migrations.
//!
//! Migrations are numbered, applied in order, and tracked through
//! `PRAGMA user_version`. Each migration only uses `IF NOT EXISTS` /
//! `OR IGNORE` forms, so re-running the whole list against an
//! already-initialized database is a no-op.

/// Ordered migration list. `user_version` after applying migration N is N.
pub const MIGRATIONS: &[&str] = &[
    // 1: base schema and default categories
    r#"
-- Categories
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    created_at INTEGER NOT NULL DEFAULT (CAST(strftime('%s','now') AS INTEGER) * 1000)
);

-- Inventory items. `quantity` is denominated in the row's own `unit`.
-- The NOCASE unique index backs the DAO-level duplicate-name check.
CREATE TABLE IF NOT EXISTS inventory_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    category_id INTEGER REFERENCES categories(id),
    quantity REAL NOT NULL DEFAULT 0,
    unit TEXT NOT NULL DEFAULT '',
    last_price REAL,
    last_spent_price REAL,
    is_empty INTEGER NOT NULL DEFAULT 0,
    last_updated INTEGER NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_inventory_items_name
    ON inventory_items(name COLLATE NOCASE);
CREATE INDEX IF NOT EXISTS idx_inventory_items_category
    ON inventory_items(category_id);

-- Collections (purchase events)
CREATE TABLE IF NOT EXISTS collections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    purchase_date INTEGER NOT NULL,
    total_amount REAL NOT NULL DEFAULT 0,
    notes TEXT,
    created_at INTEGER NOT NULL
);

-- Purchase lines. Quantity and unit are the purchase's, not the item's.
CREATE TABLE IF NOT EXISTS collection_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    collection_id INTEGER NOT NULL REFERENCES collections(id),
    item_id INTEGER NOT NULL REFERENCES inventory_items(id),
    quantity REAL NOT NULL,
    price REAL NOT NULL,
    unit TEXT,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_collection_items_collection
    ON collection_items(collection_id);
CREATE INDEX IF NOT EXISTS idx_collection_items_item
    ON collection_items(item_id);

-- Append-only pricing audit trail. History outlives its collection; the
-- reference clears when the collection is deleted.
CREATE TABLE IF NOT EXISTS price_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    item_id INTEGER NOT NULL REFERENCES inventory_items(id),
    price REAL NOT NULL,
    quantity REAL NOT NULL,
    unit_price REAL NOT NULL,
    unit TEXT,
    collection_id INTEGER REFERENCES collections(id) ON DELETE SET NULL,
    standard_unit TEXT,
    standard_unit_price REAL,
    recorded_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_price_history_item
    ON price_history(item_id, recorded_at DESC);

-- Default categories
INSERT OR IGNORE INTO categories (name) VALUES
    ('Spices'),
    ('Grains'),
    ('Pulses'),
    ('Oils'),
    ('Dairy'),
    ('Vegetables'),
    ('Fruits'),
    ('Snacks'),
    ('Beverages'),
    ('Cleaning Supplies'),
    ('Others');
"#,
];

/// Schema version the code expects; equal to the number of migrations.
pub const SCHEMA_VERSION: u32 = MIGRATIONS.len() as u32;
