//! Core domain types for the pantry system.

use serde::{Deserialize, Serialize};

/// Current time as Unix milliseconds.
pub fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// A name grouping for inventory items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Row id.
    pub id: i64,

    /// Unique category name.
    pub name: String,

    /// Number of inventory items referencing this category.
    #[serde(default)]
    pub item_count: i64,

    /// Creation timestamp (Unix millis).
    pub created_at: i64,
}

/// A stocked good.
///
/// `quantity` is always denominated in the item's own `unit` (the
/// canonical unit); purchases made in other units are converted before the
/// stock update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Row id.
    pub id: i64,

    /// Item name, unique case-insensitively.
    pub name: String,

    /// Optional category reference.
    pub category_id: Option<i64>,

    /// Category name, joined in on reads.
    #[serde(default)]
    pub category_name: Option<String>,

    /// Stock on hand, in `unit`.
    pub quantity: f64,

    /// Canonical unit this item's stock is tracked in (e.g. "kg", "pcs").
    pub unit: String,

    /// User-curated reference price per canonical unit. Set only by
    /// explicit edits, never by purchase recording.
    pub last_price: Option<f64>,

    /// Total price of the most recent purchase line. Informational; not a
    /// per-unit figure.
    pub last_spent_price: Option<f64>,

    /// Whether the item has been explicitly marked empty.
    pub is_empty: bool,

    /// Last mutation timestamp (Unix millis).
    pub last_updated: i64,

    /// Creation timestamp (Unix millis).
    pub created_at: i64,
}

/// A purchase event (one shopping trip) grouping purchase lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    /// Row id.
    pub id: i64,

    /// Trip name.
    pub name: String,

    /// When the purchase happened (Unix millis).
    pub purchase_date: i64,

    /// Derived total: always the sum of the line items' prices.
    pub total_amount: f64,

    /// Free-form notes.
    pub notes: Option<String>,

    /// Number of lines in this collection, joined in on reads.
    #[serde(default)]
    pub item_count: i64,

    /// Sum of line prices as currently stored, joined in on reads. Equal
    /// to `total_amount` unless the rows have drifted.
    #[serde(default)]
    pub actual_total: Option<f64>,

    /// Creation timestamp (Unix millis).
    pub created_at: i64,
}

/// One item-quantity-price line within a collection.
///
/// Immutable once created; lines only appear via the ledger writer and
/// disappear via collection cascade delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionItem {
    /// Row id.
    pub id: i64,

    /// Parent collection.
    pub collection_id: i64,

    /// Purchased inventory item.
    pub item_id: i64,

    /// Item name, joined in on reads.
    #[serde(default)]
    pub item_name: String,

    /// Item's category name, joined in on reads.
    #[serde(default)]
    pub category_name: Option<String>,

    /// Quantity in the *purchase* unit, which may differ from the item's
    /// canonical unit.
    pub quantity: f64,

    /// Total price paid for this line. Not a unit price.
    pub price: f64,

    /// The unit the purchase was made in.
    pub unit: Option<String>,

    /// Creation timestamp (Unix millis).
    pub created_at: i64,
}

/// An append-only audit record of one purchase line's pricing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceHistoryEntry {
    /// Row id.
    pub id: i64,

    /// Item this price was observed for.
    pub item_id: i64,

    /// Total price paid.
    pub price: f64,

    /// Quantity purchased, in `unit`.
    pub quantity: f64,

    /// Price per purchase unit (price / quantity).
    pub unit_price: f64,

    /// The purchase unit.
    pub unit: Option<String>,

    /// Originating collection. Nullable to leave room for manual entries.
    pub collection_id: Option<i64>,

    /// Collection name, joined in on reads.
    #[serde(default)]
    pub collection_name: Option<String>,

    /// Collection purchase date, joined in on reads (Unix millis).
    #[serde(default)]
    pub purchase_date: Option<i64>,

    /// The item's canonical unit at recording time.
    pub standard_unit: Option<String>,

    /// Price per standard unit.
    pub standard_unit_price: Option<f64>,

    /// Append timestamp (Unix millis). History is displayed newest first.
    pub recorded_at: i64,
}

/// Fields for creating an inventory item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub category_id: Option<i64>,
    /// Initial stock; defaults to zero.
    #[serde(default)]
    pub quantity: f64,
    pub unit: String,
    pub last_price: Option<f64>,
}

/// Partial update for an inventory item.
///
/// Only the fields present here may be changed through the update path;
/// everything else (stock bookkeeping, timestamps) is owned by dedicated
/// operations. A `None` field is left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub category_id: Option<i64>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub last_price: Option<f64>,
    pub is_empty: Option<bool>,
}

impl ItemPatch {
    /// True when no field is set; the update is a no-op.
    pub fn is_noop(&self) -> bool {
        self.name.is_none()
            && self.category_id.is_none()
            && self.quantity.is_none()
            && self.unit.is_none()
            && self.last_price.is_none()
            && self.is_empty.is_none()
    }
}

/// Optional filters for listing inventory items.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemFilter {
    /// Case-insensitive name substring.
    pub name: Option<String>,
    pub category_id: Option<i64>,
    pub is_empty: Option<bool>,
}

/// Fields for creating a collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCollection {
    pub name: String,
    /// Defaults to now when omitted.
    pub purchase_date: Option<i64>,
    pub notes: Option<String>,
}

/// Partial update for a collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionPatch {
    pub name: Option<String>,
    pub purchase_date: Option<i64>,
    pub total_amount: Option<f64>,
    pub notes: Option<String>,
}

impl CollectionPatch {
    /// True when no field is set; the update is a no-op.
    pub fn is_noop(&self) -> bool {
        self.name.is_none()
            && self.purchase_date.is_none()
            && self.total_amount.is_none()
            && self.notes.is_none()
    }
}

/// A purchase-line request submitted against an existing collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseLine {
    /// Parent collection.
    pub collection_id: i64,

    /// Purchased item.
    pub item_id: i64,

    /// Quantity in `unit`.
    pub quantity: f64,

    /// Total price paid for this line.
    pub price: f64,

    /// The unit the purchase was made in. Absent means the item's own
    /// canonical unit.
    pub unit: Option<String>,

    /// Caller-supplied standard unit, typically derived from prior price
    /// history. Trusted verbatim when present.
    pub standard_unit: Option<String>,

    /// Caller-supplied price per standard unit. Trusted verbatim when
    /// present; otherwise derived from price and quantity.
    pub standard_unit_price: Option<f64>,
}

impl PurchaseLine {
    /// A plain line with no caller-supplied standard pricing.
    pub fn new(collection_id: i64, item_id: i64, quantity: f64, price: f64, unit: &str) -> Self {
        Self {
            collection_id,
            item_id,
            quantity,
            price,
            unit: Some(unit.to_string()),
            standard_unit: None,
            standard_unit_price: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_is_noop() {
        assert!(ItemPatch::default().is_noop());
        let patch = ItemPatch {
            last_price: Some(120.0),
            ..Default::default()
        };
        assert!(!patch.is_noop());
    }

    #[test]
    fn test_purchase_line_new() {
        let line = PurchaseLine::new(1, 2, 500.0, 60.0, "g");
        assert_eq!(line.unit.as_deref(), Some("g"));
        assert!(line.standard_unit_price.is_none());
    }

    #[test]
    fn test_patch_deserializes_with_missing_fields() {
        let patch: ItemPatch = serde_json::from_str(r#"{"last_price": 95.5}"#).unwrap();
        assert_eq!(patch.last_price, Some(95.5));
        assert!(patch.name.is_none());
    }
}
