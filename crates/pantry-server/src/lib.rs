//! pantry-server - request/response bridge
//!
//! This crate exposes the pantry operations as a typed request/response
//! surface for UI glue. Window/process bootstrap and the transport itself
//! live outside; this layer owns the store handle and the error-code
//! mapping.
//!
//! # Operations
//!
//! - `inventory`: add, list, get, update, mark-empty, delete
//! - `collections`: add, list, get, update, delete, add line, price history
//! - `categories`: add, list, update, delete

mod server;

pub use server::{
    AddCollectionParams, AddItemParams, AddLineParams, ErrorBody, ListItemsParams, PantryServer,
    UpdateItemParams,
};
