//! pantry-core - Core types and traits for the pantry system
//!
//! This crate provides the domain types, error taxonomy, unit conversion
//! tables, and purchase-line normalization used throughout the pantry
//! workspace. It performs no I/O.

pub mod config;
pub mod error;
pub mod normalize;
pub mod traits;
pub mod types;
pub mod units;

pub use config::*;
pub use error::{PantryError, Result};
pub use normalize::{normalize_line, NormalizedLine};
pub use traits::Store;
pub use types::*;
pub use units::Dimension;
