//! Aggregates module
pub mod product;
pub mod category;
pub mod review;
pub mod order;

pub use product::{Component, ComponentKind, Product, ProductView};
pub use category::Category;
pub use review::{Rate, RatingSummary, Review};
pub use order::{CustomerInfo, Order, OrderAddress, OrderItem, OrderStatus};
