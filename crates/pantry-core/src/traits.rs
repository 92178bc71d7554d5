//! Core traits defining the interfaces between components.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    Category, Collection, CollectionItem, CollectionPatch, InventoryItem, ItemFilter, ItemPatch,
    NewCollection, NewItem, PriceHistoryEntry, PurchaseLine,
};

/// Storage layer trait.
///
/// All mutations run inside explicit transactions where more than one
/// statement is involved; every operation resolves fully before returning.
#[async_trait]
pub trait Store: Send + Sync {
    // Category operations

    async fn add_category(&self, name: &str) -> Result<i64>;
    async fn get_category(&self, id: i64) -> Result<Option<Category>>;
    async fn list_categories(&self) -> Result<Vec<Category>>;
    async fn update_category(&self, id: i64, name: &str) -> Result<bool>;

    /// Delete a category. Returns `Ok(false)` without deleting when any
    /// inventory item still references it.
    async fn delete_category(&self, id: i64) -> Result<bool>;

    // Inventory operations

    async fn add_item(&self, item: NewItem) -> Result<i64>;
    async fn get_item(&self, id: i64) -> Result<Option<InventoryItem>>;
    async fn list_items(&self, filter: ItemFilter) -> Result<Vec<InventoryItem>>;
    async fn update_item(&self, id: i64, patch: ItemPatch) -> Result<bool>;

    /// Atomically zero the stock and set the empty flag.
    async fn mark_item_empty(&self, id: i64) -> Result<bool>;

    /// Delete an item. Refused while purchase lines or price history still
    /// reference it.
    async fn delete_item(&self, id: i64) -> Result<bool>;

    // Collection operations

    async fn add_collection(&self, collection: NewCollection) -> Result<i64>;
    async fn get_collection(&self, id: i64) -> Result<Option<Collection>>;
    async fn list_collections(&self) -> Result<Vec<Collection>>;
    async fn list_collection_items(&self, collection_id: i64) -> Result<Vec<CollectionItem>>;
    async fn update_collection(&self, id: i64, patch: CollectionPatch) -> Result<bool>;

    /// Delete a collection and its line items, in one transaction.
    async fn delete_collection(&self, id: i64) -> Result<bool>;

    // Ledger operations

    /// Record one purchase line as a single atomic unit of work: insert
    /// the line, append price history, update the item's stock and last
    /// spent price, and recompute the collection total. Returns the new
    /// line id.
    async fn record_purchase_line(&self, line: PurchaseLine) -> Result<i64>;

    /// Price history for an item, newest first. Returns an empty list
    /// rather than an error when there is nothing to show.
    async fn item_price_history(&self, item_id: i64) -> Result<Vec<PriceHistoryEntry>>;
}
