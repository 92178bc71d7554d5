//! Unit classification and conversion tables.
//!
//! Stateless helpers mapping a unit string to its dimension (weight,
//! volume, count) and computing conversion factors between units of the
//! same dimension. Unit pairs without a tabulated entry fall back to an
//! identity conversion rather than failing; callers that care should check
//! [`compatible`] first.

/// Weight units, most common first.
pub const WEIGHT_UNITS: &[&str] = &["kg", "g", "mg", "lb", "oz"];

/// Volume units.
pub const VOLUME_UNITS: &[&str] = &["l", "ml", "gal", "qt", "pt", "fl oz"];

/// Count/packaging units. These have no universal canonical form.
pub const COUNT_UNITS: &[&str] = &[
    "pcs", "box", "pack", "bottle", "can", "bag", "jar", "unit",
];

/// The physical dimension a unit measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Weight,
    Volume,
    Count,
    Unknown,
}

/// Classify a unit string into its dimension. Case-insensitive.
pub fn classify(unit: &str) -> Dimension {
    let unit = unit.trim().to_lowercase();
    if WEIGHT_UNITS.contains(&unit.as_str()) {
        Dimension::Weight
    } else if VOLUME_UNITS.contains(&unit.as_str()) {
        Dimension::Volume
    } else if COUNT_UNITS.contains(&unit.as_str()) {
        Dimension::Count
    } else {
        Dimension::Unknown
    }
}

/// The standard unit prices are normalized to for a given unit.
///
/// Weight normalizes to "kg" and volume to "l". Count units keep their own
/// unit as the standard form, as does anything unrecognized.
pub fn standard_unit(unit: &str) -> &str {
    match classify(unit) {
        Dimension::Weight => "kg",
        Dimension::Volume => "l",
        Dimension::Count | Dimension::Unknown => unit,
    }
}

/// Check whether two units share a dimension and can be converted.
pub fn compatible(a: &str, b: &str) -> bool {
    let da = classify(a);
    da != Dimension::Unknown && da == classify(b)
}

/// How a conversion factor is applied to a *quantity*.
///
/// `Multiply` means a quantity in the from-unit becomes a quantity in the
/// to-unit by multiplying (e.g. kg to g multiplies by 1000). Per-unit
/// prices convert by the inverse relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Multiply,
    Divide,
    Identity,
}

/// A conversion factor between two units of the same dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversion {
    pub factor: f64,
    pub direction: Direction,
}

impl Conversion {
    const IDENTITY: Conversion = Conversion {
        factor: 1.0,
        direction: Direction::Identity,
    };
}

/// Look up the conversion factor from one unit to another.
///
/// Only the tabulated pairs below are supported. Anything else, including
/// a missing unit on either side, yields an identity conversion; the
/// caller sees the quantity pass through unchanged.
pub fn conversion_factor(from_unit: &str, to_unit: &str) -> Conversion {
    let from = from_unit.trim().to_lowercase();
    let to = to_unit.trim().to_lowercase();

    use Direction::{Divide, Multiply};

    let (factor, direction) = match (from.as_str(), to.as_str()) {
        // Metric weight
        ("kg", "g") => (1000.0, Multiply),
        ("g", "kg") => (1000.0, Divide),
        ("kg", "mg") => (1_000_000.0, Multiply),
        ("mg", "kg") => (1_000_000.0, Divide),
        ("g", "mg") => (1000.0, Multiply),
        ("mg", "g") => (1000.0, Divide),

        // Metric volume
        ("l", "ml") => (1000.0, Multiply),
        ("ml", "l") => (1000.0, Divide),

        // Imperial/metric
        ("kg", "lb") => (2.20462, Multiply),
        ("lb", "kg") => (2.20462, Divide),
        ("oz", "g") => (28.3495, Multiply),
        ("g", "oz") => (28.3495, Divide),
        ("gal", "l") => (3.78541, Multiply),
        ("l", "gal") => (3.78541, Divide),

        _ => return Conversion::IDENTITY,
    };

    Conversion { factor, direction }
}

/// Convert a quantity from one unit to another.
pub fn convert_quantity(quantity: f64, from_unit: &str, to_unit: &str) -> f64 {
    match conversion_factor(from_unit, to_unit) {
        Conversion {
            factor,
            direction: Direction::Multiply,
        } => quantity * factor,
        Conversion {
            factor,
            direction: Direction::Divide,
        } => quantity / factor,
        _ => quantity,
    }
}

/// Convert a per-unit price from one unit to another.
///
/// The inverse of the quantity relation: if quantities multiply by F going
/// from-unit to to-unit, a price per from-unit divides by F to become a
/// price per to-unit.
pub fn convert_unit_price(price: f64, from_unit: &str, to_unit: &str) -> f64 {
    match conversion_factor(from_unit, to_unit) {
        Conversion {
            factor,
            direction: Direction::Multiply,
        } => price / factor,
        Conversion {
            factor,
            direction: Direction::Divide,
        } => price * factor,
        _ => price,
    }
}
