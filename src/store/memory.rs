//! In-process store.
//!
//! A transaction holds the store lock for its whole lifetime and works on a
//! private copy of the state, which replaces the shared state on commit.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::domain::aggregates::{Category, Component, Order, OrderItem, Product, Rate, Review};
use crate::store::{Store, Transaction};
use crate::{EcommerceError, Result};

#[derive(Clone, Debug, Default)]
struct State {
    components: BTreeMap<Uuid, Component>,
    products: BTreeMap<Uuid, Product>,
    categories: BTreeMap<Uuid, Category>,
    reviews: BTreeMap<Uuid, Review>,
    rates: BTreeMap<Uuid, Rate>,
    orders: BTreeMap<Uuid, Order>,
    order_items: BTreeMap<Uuid, OrderItem>,
}

impl State {
    fn check_product_links(&self, product: &Product) -> Result<()> {
        for id in product.component_ids() {
            if !self.components.contains_key(&id) {
                return Err(EcommerceError::Integrity(format!("product {} links missing component {id}", product.id)));
            }
        }
        for id in &product.category_ids {
            if !self.categories.contains_key(id) {
                return Err(EcommerceError::Integrity(format!("product {} links missing category {id}", product.id)));
            }
        }
        Ok(())
    }

    fn check_item_refs(&self, item: &OrderItem) -> Result<()> {
        if !self.orders.contains_key(&item.order_id) {
            return Err(EcommerceError::Integrity(format!("order item {} references missing order {}", item.id, item.order_id)));
        }
        if let Some(pid) = item.product_id {
            if !self.products.contains_key(&pid) {
                return Err(EcommerceError::Integrity(format!("order item {} references missing product {pid}", item.id)));
            }
        }
        Ok(())
    }

    fn check_product_exists(&self, product_id: Uuid) -> Result<()> {
        if self.products.contains_key(&product_id) { Ok(()) } else {
            Err(EcommerceError::Integrity(format!("missing product {product_id}")))
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore { state: Arc<Mutex<State>> }

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

pub struct MemoryTx { guard: OwnedMutexGuard<State>, work: State }

impl Store for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        Ok(MemoryTx { guard, work })
    }
}

impl Transaction for MemoryTx {
    async fn component(&mut self, id: Uuid) -> Result<Option<Component>> {
        Ok(self.work.components.get(&id).cloned())
    }

    async fn insert_component(&mut self, component: &Component) -> Result<()> {
        self.work.components.insert(component.id, component.clone());
        Ok(())
    }

    async fn update_component(&mut self, component: &Component) -> Result<()> {
        let slot = self.work.components.get_mut(&component.id).ok_or(EcommerceError::ComponentNotFound(component.id))?;
        *slot = component.clone();
        Ok(())
    }

    async fn delete_component(&mut self, id: Uuid) -> Result<()> {
        self.work.components.remove(&id).ok_or(EcommerceError::ComponentNotFound(id))?;
        for product in self.work.products.values_mut() {
            product.unlink(id);
        }
        Ok(())
    }

    async fn adjust_component_stock(&mut self, id: Uuid, delta: i32) -> Result<i32> {
        let component = self.work.components.get_mut(&id).ok_or(EcommerceError::ComponentNotFound(id))?;
        component.stock = component.stock.checked_add(delta)
            .ok_or_else(|| EcommerceError::Integrity(format!("stock of component {id} out of range")))?;
        component.updated_at = chrono::Utc::now();
        Ok(component.stock)
    }

    async fn product(&mut self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.work.products.get(&id).cloned())
    }

    async fn components_of(&mut self, product_id: Uuid) -> Result<Vec<Component>> {
        let Some(product) = self.work.products.get(&product_id) else { return Ok(vec![]) };
        Ok(product.component_ids().filter_map(|id| self.work.components.get(&id).cloned()).collect())
    }

    async fn insert_product(&mut self, product: &Product) -> Result<()> {
        self.work.check_product_links(product)?;
        self.work.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn update_product(&mut self, product: &Product) -> Result<()> {
        if !self.work.products.contains_key(&product.id) { return Err(EcommerceError::ProductNotFound(product.id)); }
        self.work.check_product_links(product)?;
        self.work.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn delete_product(&mut self, id: Uuid) -> Result<()> {
        self.work.products.remove(&id).ok_or(EcommerceError::ProductNotFound(id))?;
        for item in self.work.order_items.values_mut().filter(|i| i.product_id == Some(id)) {
            item.product_id = None;
        }
        self.work.reviews.retain(|_, r| r.product_id != id);
        self.work.rates.retain(|_, r| r.product_id != id);
        Ok(())
    }

    async fn category(&mut self, id: Uuid) -> Result<Option<Category>> {
        Ok(self.work.categories.get(&id).cloned())
    }

    async fn categories(&mut self) -> Result<Vec<Category>> {
        Ok(self.work.categories.values().cloned().collect())
    }

    async fn insert_category(&mut self, category: &Category) -> Result<()> {
        if let Some(parent) = category.parent_id {
            if !self.work.categories.contains_key(&parent) {
                return Err(EcommerceError::Integrity(format!("category {} references missing parent {parent}", category.id)));
            }
        }
        self.work.categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn delete_category(&mut self, id: Uuid) -> Result<()> {
        self.work.categories.remove(&id).ok_or(EcommerceError::CategoryNotFound(id))?;
        for child in self.work.categories.values_mut().filter(|c| c.parent_id == Some(id)) {
            child.orphan();
        }
        for product in self.work.products.values_mut() {
            product.category_ids.retain(|c| *c != id);
        }
        Ok(())
    }

    async fn insert_review(&mut self, review: &Review) -> Result<()> {
        self.work.check_product_exists(review.product_id)?;
        self.work.reviews.insert(review.id, review.clone());
        Ok(())
    }

    async fn reviews_for(&mut self, product_id: Uuid) -> Result<Vec<Review>> {
        let mut reviews: Vec<_> = self.work.reviews.values().filter(|r| r.product_id == product_id).cloned().collect();
        Review::sort_newest_first(&mut reviews);
        Ok(reviews)
    }

    async fn insert_rate(&mut self, rate: &Rate) -> Result<()> {
        self.work.check_product_exists(rate.product_id)?;
        self.work.rates.insert(rate.id, rate.clone());
        Ok(())
    }

    async fn rates_for(&mut self, product_id: Uuid) -> Result<Vec<Rate>> {
        Ok(self.work.rates.values().filter(|r| r.product_id == product_id).cloned().collect())
    }

    async fn order(&mut self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.work.orders.get(&id).cloned())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        self.work.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn update_order(&mut self, order: &Order) -> Result<()> {
        let slot = self.work.orders.get_mut(&order.id).ok_or(EcommerceError::OrderNotFound(order.id))?;
        *slot = order.clone();
        Ok(())
    }

    async fn delete_order(&mut self, id: Uuid) -> Result<()> {
        if self.work.order_items.values().any(|i| i.order_id == id) {
            return Err(EcommerceError::Integrity(format!("order {id} still has items")));
        }
        self.work.orders.remove(&id).ok_or(EcommerceError::OrderNotFound(id))?;
        Ok(())
    }

    async fn order_item(&mut self, id: Uuid) -> Result<Option<OrderItem>> {
        Ok(self.work.order_items.get(&id).cloned())
    }

    async fn order_items(&mut self, order_id: Uuid) -> Result<Vec<OrderItem>> {
        Ok(self.work.order_items.values().filter(|i| i.order_id == order_id).cloned().collect())
    }

    async fn insert_order_item(&mut self, item: &OrderItem) -> Result<()> {
        self.work.check_item_refs(item)?;
        self.work.order_items.insert(item.id, item.clone());
        Ok(())
    }

    async fn update_order_item(&mut self, item: &OrderItem) -> Result<()> {
        if !self.work.order_items.contains_key(&item.id) { return Err(EcommerceError::OrderItemNotFound(item.id)); }
        self.work.check_item_refs(item)?;
        self.work.order_items.insert(item.id, item.clone());
        Ok(())
    }

    async fn delete_order_item(&mut self, id: Uuid) -> Result<()> {
        self.work.order_items.remove(&id).ok_or(EcommerceError::OrderItemNotFound(id))?;
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        let MemoryTx { mut guard, work } = self;
        *guard = work;
        Ok(())
    }
}
