//! The operation surface exposed to UI glue.
//!
//! Each operation takes a serde-typed params struct and returns either the
//! typed payload or a [`PantryError`] whose `error_code()` the glue maps to
//! form errors (`DUPLICATE_NAME`, `INVALID_QUANTITY`) or generic failure
//! banners (everything else).

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use pantry_core::{
    Category, Collection, CollectionItem, CollectionPatch, InventoryItem, ItemFilter, ItemPatch,
    NewCollection, NewItem, PantryConfig, PantryError, PriceHistoryEntry, PurchaseLine, Result,
    Store,
};
use pantry_store::SqliteStore;

/// Pantry server state.
pub struct PantryServer {
    /// Database store.
    store: Arc<SqliteStore>,
}

/// Parameters for creating an inventory item.
#[derive(Debug, Deserialize, Serialize)]
pub struct AddItemParams {
    pub name: String,

    /// Canonical unit the item's stock is tracked in.
    pub unit: String,

    pub category_id: Option<i64>,

    /// Initial stock (default: 0).
    #[serde(default)]
    pub quantity: f64,

    /// User-curated reference price per canonical unit.
    pub last_price: Option<f64>,
}

/// Parameters for updating an inventory item.
#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateItemParams {
    pub id: i64,

    #[serde(flatten)]
    pub patch: ItemPatch,
}

/// Parameters for listing inventory items.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ListItemsParams {
    #[serde(flatten)]
    pub filter: ItemFilter,
}

/// Parameters for creating a collection.
#[derive(Debug, Deserialize, Serialize)]
pub struct AddCollectionParams {
    pub name: String,

    /// Unix millis; defaults to now.
    pub purchase_date: Option<i64>,

    pub notes: Option<String>,
}

/// Parameters for recording a purchase line into a collection.
#[derive(Debug, Deserialize, Serialize)]
pub struct AddLineParams {
    pub collection_id: i64,
    pub item_id: i64,

    /// Quantity in the purchase unit.
    pub quantity: f64,

    /// Total price paid for this line.
    pub price: f64,

    /// The unit the purchase was made in (default: the item's own unit).
    pub unit: Option<String>,

    /// Caller-precomputed standard pricing, trusted verbatim when present.
    pub standard_unit: Option<String>,
    pub standard_unit_price: Option<f64>,
}

/// Serializable error body for bridge responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl From<&PantryError> for ErrorBody {
    fn from(err: &PantryError) -> Self {
        Self {
            code: err.error_code(),
            message: err.to_string(),
        }
    }
}

impl PantryServer {
    /// Open the server over a database file, running migrations.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        info!("Initializing pantry server with database at {:?}", db_path);

        let store = Arc::new(SqliteStore::open(&db_path)?);
        Ok(Self { store })
    }

    /// Open the server as described by the configuration.
    pub fn open_with_config(config: &PantryConfig) -> Result<Self> {
        info!(
            "Initializing pantry server with database at {:?}",
            config.database.path
        );

        let store = Arc::new(SqliteStore::open_with_config(&config.database)?);
        Ok(Self { store })
    }

    /// Open the server over an in-memory database.
    pub fn open_memory() -> Result<Self> {
        info!("Initializing pantry server with in-memory database");

        let store = Arc::new(SqliteStore::open_memory()?);
        Ok(Self { store })
    }

    /// Access the underlying store.
    pub fn store(&self) -> &Arc<SqliteStore> {
        &self.store
    }

    // Inventory operations

    pub async fn add_item(&self, params: AddItemParams) -> Result<i64> {
        self.store
            .add_item(NewItem {
                name: params.name,
                category_id: params.category_id,
                quantity: params.quantity,
                unit: params.unit,
                last_price: params.last_price,
            })
            .await
    }

    pub async fn get_item(&self, id: i64) -> Result<Option<InventoryItem>> {
        self.store.get_item(id).await
    }

    pub async fn list_items(&self, params: ListItemsParams) -> Result<Vec<InventoryItem>> {
        self.store.list_items(params.filter).await
    }

    pub async fn update_item(&self, params: UpdateItemParams) -> Result<bool> {
        self.store.update_item(params.id, params.patch).await
    }

    pub async fn mark_item_empty(&self, id: i64) -> Result<bool> {
        self.store.mark_item_empty(id).await
    }

    pub async fn delete_item(&self, id: i64) -> Result<bool> {
        self.store.delete_item(id).await
    }

    // Collection operations

    pub async fn add_collection(&self, params: AddCollectionParams) -> Result<i64> {
        self.store
            .add_collection(NewCollection {
                name: params.name,
                purchase_date: params.purchase_date,
                notes: params.notes,
            })
            .await
    }

    pub async fn get_collection(&self, id: i64) -> Result<Option<Collection>> {
        self.store.get_collection(id).await
    }

    pub async fn list_collections(&self) -> Result<Vec<Collection>> {
        self.store.list_collections().await
    }

    pub async fn list_collection_items(&self, collection_id: i64) -> Result<Vec<CollectionItem>> {
        self.store.list_collection_items(collection_id).await
    }

    pub async fn update_collection(&self, id: i64, patch: CollectionPatch) -> Result<bool> {
        self.store.update_collection(id, patch).await
    }

    pub async fn delete_collection(&self, id: i64) -> Result<bool> {
        self.store.delete_collection(id).await
    }

    /// Record one purchase line; runs the full ledger transaction.
    pub async fn add_collection_item(&self, params: AddLineParams) -> Result<i64> {
        self.store
            .record_purchase_line(PurchaseLine {
                collection_id: params.collection_id,
                item_id: params.item_id,
                quantity: params.quantity,
                price: params.price,
                unit: params.unit,
                standard_unit: params.standard_unit,
                standard_unit_price: params.standard_unit_price,
            })
            .await
    }

    pub async fn item_price_history(&self, item_id: i64) -> Result<Vec<PriceHistoryEntry>> {
        self.store.item_price_history(item_id).await
    }

    // Category operations

    pub async fn add_category(&self, name: &str) -> Result<i64> {
        self.store.add_category(name).await
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.store.list_categories().await
    }

    pub async fn update_category(&self, id: i64, name: &str) -> Result<bool> {
        self.store.update_category(id, name).await
    }

    /// Delete a category; `Ok(false)` is the in-use refusal, not a failure.
    pub async fn delete_category(&self, id: i64) -> Result<bool> {
        self.store.delete_category(id).await
    }
}
