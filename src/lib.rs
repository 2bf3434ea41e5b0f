//! Nabaat Store
//!
//! Backend for a plant shop.
//!
//! ## Features
//! - Catalog of plants, accessories and the products assembled from them
//! - Categories, reviews and ratings
//! - Orders whose line items reserve component stock
//!
//! Every order item mutation runs in one store transaction that snapshots
//! price/cost on first save and reconciles the stock of the product's
//! components (see [`stock`]).

use thiserror::Error;
use uuid::Uuid;

pub mod api;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod orders;
pub mod publisher;
pub mod stock;
pub mod store;

pub use catalog::CatalogService;
pub use config::{Config, InventoryPolicy};
pub use orders::OrderService;
pub use stock::{plan_delete, plan_save, LineState, StockAdjustment};
pub use store::{MemoryStore, PgStore, Store, Transaction};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum EcommerceError {
    #[error("Product {0} not found")]
    ProductNotFound(Uuid),

    #[error("Component {0} not found")]
    ComponentNotFound(Uuid),

    #[error("Category {0} not found")]
    CategoryNotFound(Uuid),

    #[error("Order {0} not found")]
    OrderNotFound(Uuid),

    #[error("Order item {0} not found")]
    OrderItemNotFound(Uuid),

    #[error("Insufficient stock for component {component_id}: {available} available, {requested} requested")]
    InsufficientStock { component_id: Uuid, available: i32, requested: i32 },

    #[error("Invalid quantity {0}")]
    InvalidQuantity(u32),

    #[error("Invalid rating {0}")]
    InvalidRating(u8),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, EcommerceError>;
