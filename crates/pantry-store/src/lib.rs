//! pantry-store - SQLite storage layer
//!
//! This crate provides persistent storage for categories, inventory items,
//! collections, and price history using SQLite, including the transactional
//! ledger writer behind purchase-line recording.

mod ledger;
mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

// Re-export migrations for inspection/testing
pub use schema::{MIGRATIONS, SCHEMA_VERSION};
