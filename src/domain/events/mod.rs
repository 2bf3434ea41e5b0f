//! Domain events
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderItemCreated { order_id: Uuid, item_id: Uuid, product_id: Option<Uuid>, quantity: u32 },
    OrderItemChanged { order_id: Uuid, item_id: Uuid, product_id: Option<Uuid>, quantity: u32 },
    OrderItemDeleted { order_id: Uuid, item_id: Uuid, product_id: Option<Uuid>, quantity: u32 },
    StockAdjusted { component_id: Uuid, delta: i32, stock: i32 },
}

impl DomainEvent {
    /// NATS subject suffix.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::OrderItemCreated { .. } => "order_item.created",
            Self::OrderItemChanged { .. } => "order_item.changed",
            Self::OrderItemDeleted { .. } => "order_item.deleted",
            Self::StockAdjusted { .. } => "stock.adjusted",
        }
    }
}
