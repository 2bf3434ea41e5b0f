//! Product Aggregate
//!
//! A product is sold as a bundle of components (plants and accessories). Its
//! cost and stock are never stored; they are derived from the linked
//! components every time they are read.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind { Plant, Accessory }

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Plant => "plant", Self::Accessory => "accessory" }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s { "plant" => Some(Self::Plant), "accessory" => Some(Self::Accessory), _ => None }
    }
}

/// A plant or accessory with its own stock counter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: Uuid,
    pub kind: ComponentKind,
    pub name: String,
    pub description: Option<String>,
    pub cost: Decimal,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Component {
    pub fn new(kind: ComponentKind, name: impl Into<String>, cost: Decimal, stock: i32) -> Self {
        let now = Utc::now();
        Self { id: Uuid::now_v7(), kind, name: name.into(), description: None, cost, stock, created_at: now, updated_at: now }
    }

    pub fn plant(name: impl Into<String>, cost: Decimal, stock: i32) -> Self { Self::new(ComponentKind::Plant, name, cost, stock) }
    pub fn accessory(name: impl Into<String>, cost: Decimal, stock: i32) -> Self { Self::new(ComponentKind::Accessory, name, cost, stock) }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category_ids: Vec<Uuid>,
    pub plant_ids: Vec<Uuid>,
    pub accessory_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn create(name: impl Into<String>, price: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(), name: name.into(), description: None, price,
            category_ids: vec![], plant_ids: vec![], accessory_ids: vec![],
            created_at: now, updated_at: now,
        }
    }

    pub fn with_component(mut self, component: &Component) -> Self {
        self.link(component);
        self
    }

    /// Links a component under the list matching its kind. Linking twice is a no-op.
    pub fn link(&mut self, component: &Component) {
        let ids = match component.kind {
            ComponentKind::Plant => &mut self.plant_ids,
            ComponentKind::Accessory => &mut self.accessory_ids,
        };
        if !ids.contains(&component.id) { ids.push(component.id); }
    }

    pub fn unlink(&mut self, component_id: Uuid) {
        self.plant_ids.retain(|id| *id != component_id);
        self.accessory_ids.retain(|id| *id != component_id);
    }

    pub fn component_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.accessory_ids.iter().chain(self.plant_ids.iter()).copied()
    }

    /// Sum of the costs of `components`; zero when there are none.
    pub fn cost(components: &[Component]) -> Decimal {
        components.iter().map(|c| c.cost).sum()
    }

    /// Minimum stock across `components`, or 0 when there are none.
    pub fn stock(components: &[Component]) -> i32 {
        components.iter().map(|c| c.stock).min().unwrap_or(0)
    }

    pub fn touch(&mut self) { self.updated_at = Utc::now(); }
}

/// A product together with the values derived from its components.
#[derive(Clone, Debug, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub cost: Decimal,
    pub stock: i32,
}

impl ProductView {
    pub fn new(product: Product, components: &[Component]) -> Self {
        Self { cost: Product::cost(components), stock: Product::stock(components), product }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_without_components_is_zero() {
        assert_eq!(Product::stock(&[]), 0);
        assert_eq!(Product::cost(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_stock_is_minimum_across_kinds() {
        let fern = Component::plant("Fern", Decimal::new(40, 0), 12);
        let pot = Component::accessory("Clay pot", Decimal::new(15, 0), 3);
        let moss = Component::accessory("Moss", Decimal::new(5, 0), 30);
        let components = [fern, pot, moss];
        assert_eq!(Product::stock(&components), 3);
        assert_eq!(Product::cost(&components), Decimal::new(60, 0));
    }

    #[test]
    fn test_only_plants_or_only_accessories() {
        let fern = Component::plant("Fern", Decimal::new(40, 0), 12);
        assert_eq!(Product::stock(std::slice::from_ref(&fern)), 12);
        let pot = Component::accessory("Clay pot", Decimal::new(15, 0), -2);
        assert_eq!(Product::stock(&[pot]), -2);
    }

    #[test]
    fn test_link_routes_by_kind() {
        let fern = Component::plant("Fern", Decimal::ONE, 1);
        let pot = Component::accessory("Pot", Decimal::ONE, 1);
        let mut p = Product::create("Fern in a pot", Decimal::new(90, 0)).with_component(&fern).with_component(&pot);
        p.link(&fern);
        assert_eq!(p.plant_ids, vec![fern.id]);
        assert_eq!(p.accessory_ids, vec![pot.id]);
        p.unlink(fern.id);
        assert!(p.plant_ids.is_empty());
        assert_eq!(p.component_ids().collect::<Vec<_>>(), vec![pot.id]);
    }
}
