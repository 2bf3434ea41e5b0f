//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::product::{Component, Product};
use crate::domain::value_objects::{Money, Quantity};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus { #[default] Submitted, PaymentCompleted, Failed, Returned, Completed }

impl OrderStatus {
    /// Single-letter code used in storage.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Submitted => "S",
            Self::PaymentCompleted => "P",
            Self::Failed => "F",
            Self::Returned => "R",
            Self::Completed => "C",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "S" => Some(Self::Submitted),
            "P" => Some(Self::PaymentCompleted),
            "F" => Some(Self::Failed),
            "R" => Some(Self::Returned),
            "C" => Some(Self::Completed),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Submitted => "Submitted",
            Self::PaymentCompleted => "Payment completed",
            Self::Failed => "Failed",
            Self::Returned => "Returned",
            Self::Completed => "Completed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAddress { pub city: String, pub address: String, pub postal_code: String, pub phone_number: String, pub location: Option<String> }

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo { pub name: String, pub phone_number: String, pub email: Option<String> }

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub status: OrderStatus,
    pub support_id: Option<Uuid>,
    pub customer: Option<CustomerInfo>,
    pub address: Option<OrderAddress>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn create(customer: Option<CustomerInfo>, address: Option<OrderAddress>) -> Self {
        let now = Utc::now();
        Self { id: Uuid::now_v7(), status: OrderStatus::Submitted, support_id: None, customer, address, created_at: now, updated_at: now }
    }

    pub fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
        self.touch();
    }

    pub fn assign_support(&mut self, user_id: Option<Uuid>) {
        self.support_id = user_id;
        self.touch();
    }

    /// Sum of the line totals of `items`.
    pub fn subtotal(items: &[OrderItem], currency: &str) -> Money {
        items.iter().fold(Money::zero(currency), |acc, i| acc.add(&i.line_total(currency)).unwrap_or(acc))
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

/// A line of an order. `unit_price` and `unit_cost` are a snapshot of the
/// product taken when the item is first saved and never change afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub quantity: Quantity,
    pub unit_price: Decimal,
    pub unit_cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderItem {
    /// A line that has not been saved yet; its snapshot is filled in on first save.
    pub fn new(order_id: Uuid, product_id: Uuid, quantity: Quantity) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(), order_id, product_id: Some(product_id), quantity,
            unit_price: Decimal::ZERO, unit_cost: Decimal::ZERO, created_at: now, updated_at: now,
        }
    }

    pub fn take_snapshot(&mut self, product: &Product, components: &[Component]) {
        self.unit_price = product.price;
        self.unit_cost = Product::cost(components);
    }

    /// Copies the immutable parts of the stored row onto an edited line.
    pub fn keep_snapshot_of(&mut self, stored: &OrderItem) {
        self.unit_price = stored.unit_price;
        self.unit_cost = stored.unit_cost;
        self.order_id = stored.order_id;
        self.created_at = stored.created_at;
    }

    pub fn line_total(&self, currency: &str) -> Money { Money::new(self.unit_price, currency).multiply(self.quantity) }

    pub fn touch(&mut self) { self.updated_at = Utc::now(); }
}
