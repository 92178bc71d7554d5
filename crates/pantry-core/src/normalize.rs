//! Price/quantity normalization for purchase lines.
//!
//! Given a purchase made in some unit against an item whose stock is kept
//! in its own canonical unit, compute the quantity to add to stock and the
//! standardized unit price to persist alongside the raw figures.

use crate::error::{PantryError, Result};
use crate::types::PurchaseLine;
use crate::units::convert_quantity;

/// The derived figures for one purchase line.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedLine {
    /// Quantity expressed in the item's canonical unit, ready to be added
    /// to stock.
    pub quantity_to_add: f64,

    /// Price per purchase unit (total price / purchased quantity).
    pub unit_price: f64,

    /// The unit the standardized price is denominated in.
    pub standard_unit: String,

    /// Price per standard unit. Caller-supplied values are trusted
    /// verbatim; the fallback is the purchase-unit `unit_price`, left
    /// unconverted.
    pub standard_unit_price: f64,

    /// True when the purchase unit differed from the item unit but no
    /// conversion rule existed, so the quantity passed through 1:1.
    pub pass_through: bool,
}

/// Pairs the stock update is guaranteed to convert between. Everything
/// else passes through unconverted.
const STOCK_CONVERSIONS: &[(&str, &str)] = &[
    ("g", "kg"),
    ("kg", "g"),
    ("mg", "kg"),
    ("kg", "mg"),
    ("mg", "g"),
    ("g", "mg"),
    ("ml", "l"),
    ("l", "ml"),
];

/// Normalize one purchase line against the target item's canonical unit.
///
/// Fails with `InvalidQuantity` when the purchased quantity is zero or
/// negative; the per-unit division would otherwise produce infinities.
pub fn normalize_line(line: &PurchaseLine, item_unit: &str) -> Result<NormalizedLine> {
    if line.quantity <= 0.0 || !line.quantity.is_finite() {
        return Err(PantryError::invalid_quantity(line.quantity));
    }

    let unit_price = line.price / line.quantity;

    let purchase_unit = line.unit.as_deref().unwrap_or("").trim();
    let (quantity_to_add, pass_through) = if purchase_unit.is_empty()
        || purchase_unit.eq_ignore_ascii_case(item_unit)
    {
        (line.quantity, false)
    } else if STOCK_CONVERSIONS
        .iter()
        .any(|&(from, to)| purchase_unit.eq_ignore_ascii_case(from) && item_unit.eq_ignore_ascii_case(to))
    {
        (convert_quantity(line.quantity, purchase_unit, item_unit), false)
    } else {
        (line.quantity, true)
    };

    let standard_unit = line
        .standard_unit
        .clone()
        .unwrap_or_else(|| item_unit.to_string());

    // When the caller omits the standard price, the purchase-unit figure is
    // stored as-is; it is not re-expressed in the standard unit.
    let standard_unit_price = line.standard_unit_price.unwrap_or(unit_price);

    Ok(NormalizedLine {
        quantity_to_add,
        unit_price,
        standard_unit,
        standard_unit_price,
        pass_through,
    })
}
