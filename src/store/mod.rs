//! Persistence seam.
//!
//! Every mutation runs inside a [`Transaction`] obtained from [`Store::begin`].
//! Changes become visible only on [`Transaction::commit`]; dropping a
//! transaction discards them.

use std::future::Future;

use uuid::Uuid;

use crate::domain::aggregates::{Category, Component, Order, OrderItem, Product, Rate, Review};
use crate::Result;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub trait Store: Clone + Send + Sync + 'static {
    type Tx: Transaction;

    fn begin(&self) -> impl Future<Output = Result<Self::Tx>> + Send;
}

pub trait Transaction: Send + Sized {
    // components
    fn component(&mut self, id: Uuid) -> impl Future<Output = Result<Option<Component>>> + Send;
    fn insert_component(&mut self, component: &Component) -> impl Future<Output = Result<()>> + Send;
    fn update_component(&mut self, component: &Component) -> impl Future<Output = Result<()>> + Send;
    /// Removes the component and every product link to it.
    fn delete_component(&mut self, id: Uuid) -> impl Future<Output = Result<()>> + Send;
    /// Adds `delta` to the component's stock and returns the new stock.
    fn adjust_component_stock(&mut self, id: Uuid, delta: i32) -> impl Future<Output = Result<i32>> + Send;

    // products
    fn product(&mut self, id: Uuid) -> impl Future<Output = Result<Option<Product>>> + Send;
    /// Accessories first, then plants, each in link order.
    fn components_of(&mut self, product_id: Uuid) -> impl Future<Output = Result<Vec<Component>>> + Send;
    fn insert_product(&mut self, product: &Product) -> impl Future<Output = Result<()>> + Send;
    /// Updates fields and replaces every link.
    fn update_product(&mut self, product: &Product) -> impl Future<Output = Result<()>> + Send;
    /// Removes the product; order items pointing at it keep their row with a null product.
    fn delete_product(&mut self, id: Uuid) -> impl Future<Output = Result<()>> + Send;

    // categories
    fn category(&mut self, id: Uuid) -> impl Future<Output = Result<Option<Category>>> + Send;
    fn categories(&mut self) -> impl Future<Output = Result<Vec<Category>>> + Send;
    fn insert_category(&mut self, category: &Category) -> impl Future<Output = Result<()>> + Send;
    /// Removes the category; children lose their parent.
    fn delete_category(&mut self, id: Uuid) -> impl Future<Output = Result<()>> + Send;

    // reviews
    fn insert_review(&mut self, review: &Review) -> impl Future<Output = Result<()>> + Send;
    fn reviews_for(&mut self, product_id: Uuid) -> impl Future<Output = Result<Vec<Review>>> + Send;
    fn insert_rate(&mut self, rate: &Rate) -> impl Future<Output = Result<()>> + Send;
    fn rates_for(&mut self, product_id: Uuid) -> impl Future<Output = Result<Vec<Rate>>> + Send;

    // orders
    fn order(&mut self, id: Uuid) -> impl Future<Output = Result<Option<Order>>> + Send;
    fn insert_order(&mut self, order: &Order) -> impl Future<Output = Result<()>> + Send;
    fn update_order(&mut self, order: &Order) -> impl Future<Output = Result<()>> + Send;
    /// Removes the order row. Callers delete its items first.
    fn delete_order(&mut self, id: Uuid) -> impl Future<Output = Result<()>> + Send;
    fn order_item(&mut self, id: Uuid) -> impl Future<Output = Result<Option<OrderItem>>> + Send;
    fn order_items(&mut self, order_id: Uuid) -> impl Future<Output = Result<Vec<OrderItem>>> + Send;
    fn insert_order_item(&mut self, item: &OrderItem) -> impl Future<Output = Result<()>> + Send;
    fn update_order_item(&mut self, item: &OrderItem) -> impl Future<Output = Result<()>> + Send;
    fn delete_order_item(&mut self, id: Uuid) -> impl Future<Output = Result<()>> + Send;

    fn commit(self) -> impl Future<Output = Result<()>> + Send;
}
