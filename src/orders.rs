//! Orders and their line items.

use uuid::Uuid;

use crate::config::InventoryPolicy;
use crate::domain::aggregates::{CustomerInfo, Order, OrderAddress, OrderItem, OrderStatus};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::Quantity;
use crate::stock::{self, LineState};
use crate::store::{Store, Transaction};
use crate::{EcommerceError, Result};

#[derive(Clone, Debug, serde::Serialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Result of a committed mutation plus the events it raised.
#[derive(Clone, Debug)]
pub struct Outcome<T> {
    pub value: T,
    pub events: Vec<DomainEvent>,
}

#[derive(Clone)]
pub struct OrderService<S: Store> {
    store: S,
    policy: InventoryPolicy,
}

impl<S: Store> OrderService<S> {
    pub fn new(store: S, policy: InventoryPolicy) -> Self { Self { store, policy } }

    pub fn store(&self) -> &S { &self.store }

    pub async fn create_order(&self, customer: Option<CustomerInfo>, address: Option<OrderAddress>) -> Result<Order> {
        let order = Order::create(customer, address);
        let mut tx = self.store.begin().await?;
        tx.insert_order(&order).await?;
        tx.commit().await?;
        tracing::info!(order_id = %order.id, "order submitted");
        Ok(order)
    }

    pub async fn order(&self, id: Uuid) -> Result<OrderDetails> {
        let mut tx = self.store.begin().await?;
        let order = tx.order(id).await?.ok_or(EcommerceError::OrderNotFound(id))?;
        let items = tx.order_items(id).await?;
        Ok(OrderDetails { order, items })
    }

    pub async fn set_status(&self, id: Uuid, status: OrderStatus) -> Result<Order> {
        let mut tx = self.store.begin().await?;
        let mut order = tx.order(id).await?.ok_or(EcommerceError::OrderNotFound(id))?;
        order.set_status(status);
        tx.update_order(&order).await?;
        tx.commit().await?;
        tracing::info!(order_id = %id, status = status.code(), "order status changed");
        Ok(order)
    }

    /// Assigns (or with `None`, clears) the support user handling the order.
    pub async fn assign_support(&self, id: Uuid, support_id: Option<Uuid>) -> Result<Order> {
        let mut tx = self.store.begin().await?;
        let mut order = tx.order(id).await?.ok_or(EcommerceError::OrderNotFound(id))?;
        order.assign_support(support_id);
        tx.update_order(&order).await?;
        tx.commit().await?;
        tracing::info!(order_id = %id, support_id = ?support_id, "order support assigned");
        Ok(order)
    }

    /// Deletes every item (restoring its stock) and then the order, atomically.
    pub async fn delete_order(&self, id: Uuid) -> Result<Outcome<()>> {
        let mut tx = self.store.begin().await?;
        tx.order(id).await?.ok_or(EcommerceError::OrderNotFound(id))?;
        let mut events = Vec::new();
        for item in tx.order_items(id).await? {
            events.extend(self.delete_item_in(&mut tx, &item).await?);
        }
        tx.delete_order(id).await?;
        tx.commit().await?;
        tracing::info!(order_id = %id, "order deleted");
        Ok(Outcome { value: (), events })
    }

    /// Adds a new line to an order.
    pub async fn add_item(&self, order_id: Uuid, product_id: Uuid, quantity: Quantity) -> Result<Outcome<OrderItem>> {
        self.save_item(OrderItem::new(order_id, product_id, quantity)).await
    }

    /// Changes the product and/or quantity of an existing line.
    pub async fn update_item(&self, item_id: Uuid, product_id: Uuid, quantity: Quantity) -> Result<Outcome<OrderItem>> {
        let mut tx = self.store.begin().await?;
        let stored = tx.order_item(item_id).await?.ok_or(EcommerceError::OrderItemNotFound(item_id))?;
        let mut item = stored.clone();
        item.product_id = Some(product_id);
        item.quantity = quantity;
        let events = self.save_item_in(&mut tx, &mut item, Some(&stored)).await?;
        tx.commit().await?;
        tracing::info!(item_id = %item.id, order_id = %item.order_id, quantity = item.quantity.value(), "order item updated");
        Ok(Outcome { value: item, events })
    }

    /// Inserts or updates `item` and reconciles component stock.
    ///
    /// On first save the unit price and cost are copied from the product. On
    /// later saves the stored snapshot is kept and only a change of product
    /// or quantity touches stock.
    pub async fn save_item(&self, mut item: OrderItem) -> Result<Outcome<OrderItem>> {
        let mut tx = self.store.begin().await?;
        let prior = tx.order_item(item.id).await?;
        let events = self.save_item_in(&mut tx, &mut item, prior.as_ref()).await?;
        tx.commit().await?;
        tracing::info!(item_id = %item.id, order_id = %item.order_id, quantity = item.quantity.value(), "order item saved");
        Ok(Outcome { value: item, events })
    }

    async fn save_item_in(&self, tx: &mut S::Tx, item: &mut OrderItem, prior: Option<&OrderItem>) -> Result<Vec<DomainEvent>> {
        let event = match prior {
            None => {
                let product_id = item.product_id.ok_or_else(|| EcommerceError::Integrity(format!("order item {} has no product", item.id)))?;
                let product = tx.product(product_id).await?
                    .ok_or_else(|| EcommerceError::Integrity(format!("order item {} references missing product {product_id}", item.id)))?;
                let components = tx.components_of(product_id).await?;
                item.take_snapshot(&product, &components);
                tx.insert_order_item(item).await?;
                DomainEvent::OrderItemCreated { order_id: item.order_id, item_id: item.id, product_id: item.product_id, quantity: item.quantity.value() }
            }
            Some(stored) => {
                item.keep_snapshot_of(stored);
                item.touch();
                tx.update_order_item(item).await?;
                DomainEvent::OrderItemChanged { order_id: item.order_id, item_id: item.id, product_id: item.product_id, quantity: item.quantity.value() }
            }
        };

        let plan = stock::plan_save(prior.map(LineState::from).as_ref(), &LineState::from(&*item));
        let mut events = vec![event];
        events.extend(stock::apply(tx, &plan, self.policy).await?);
        tracing::debug!(item_id = %item.id, adjustments = plan.len(), "order item reconciled");
        Ok(events)
    }

    /// Deletes a line and gives its reserved stock back.
    pub async fn delete_item(&self, item_id: Uuid) -> Result<Outcome<OrderItem>> {
        let mut tx = self.store.begin().await?;
        let item = tx.order_item(item_id).await?.ok_or(EcommerceError::OrderItemNotFound(item_id))?;
        let events = self.delete_item_in(&mut tx, &item).await?;
        tx.commit().await?;
        tracing::info!(item_id = %item.id, order_id = %item.order_id, "order item deleted");
        Ok(Outcome { value: item, events })
    }

    async fn delete_item_in(&self, tx: &mut S::Tx, item: &OrderItem) -> Result<Vec<DomainEvent>> {
        let mut events = stock::apply(tx, &stock::plan_delete(&LineState::from(item)), self.policy).await?;
        tx.delete_order_item(item.id).await?;
        events.insert(0, DomainEvent::OrderItemDeleted { order_id: item.order_id, item_id: item.id, product_id: item.product_id, quantity: item.quantity.value() });
        Ok(events)
    }
}
