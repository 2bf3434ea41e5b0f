//! Order item stock reconciliation.
//!
//! An order item reserves `quantity` units of every component (plant or
//! accessory) of its product. Planning is pure: given the stored line (if any)
//! and the line being saved, [`plan_save`] returns the adjustments to apply, in
//! order. [`apply`] runs them inside the caller's transaction.
//!
//! For any item that is created, edited any number of times and finally
//! deleted, the adjustments applied to each component sum to zero.

use uuid::Uuid;

use crate::config::InventoryPolicy;
use crate::domain::aggregates::OrderItem;
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::Quantity;
use crate::store::Transaction;
use crate::{EcommerceError, Result};

/// The part of an order item that drives stock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineState {
    pub product_id: Option<Uuid>,
    pub quantity: Quantity,
}

impl From<&OrderItem> for LineState {
    fn from(item: &OrderItem) -> Self { Self { product_id: item.product_id, quantity: item.quantity } }
}

/// Add `delta` to the stock of every component of `product_id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StockAdjustment {
    pub product_id: Uuid,
    pub delta: i32,
}

impl StockAdjustment {
    fn reserve(line: &LineState) -> Option<Self> {
        line.product_id.map(|product_id| Self { product_id, delta: -line.quantity.as_delta() })
    }

    fn release(line: &LineState) -> Option<Self> {
        line.product_id.map(|product_id| Self { product_id, delta: line.quantity.as_delta() })
    }
}

/// Adjustments for saving `current` over `prior` (`None` on first save).
///
/// An edit releases the stored reservation before taking the new one. A line
/// whose product was deleted has nothing to release.
pub fn plan_save(prior: Option<&LineState>, current: &LineState) -> Vec<StockAdjustment> {
    match prior {
        None => StockAdjustment::reserve(current).into_iter().collect(),
        Some(prior) if prior != current => {
            StockAdjustment::release(prior).into_iter().chain(StockAdjustment::reserve(current)).collect()
        }
        Some(_) => vec![],
    }
}

/// Adjustments for deleting `current`.
pub fn plan_delete(current: &LineState) -> Vec<StockAdjustment> {
    StockAdjustment::release(current).into_iter().collect()
}

/// Applies `plan` in order. Under [`InventoryPolicy::Deny`] a decrement that
/// leaves any component below zero fails; the caller drops the transaction.
pub async fn apply<T: Transaction>(tx: &mut T, plan: &[StockAdjustment], policy: InventoryPolicy) -> Result<Vec<DomainEvent>> {
    let mut events = Vec::new();
    for adjustment in plan {
        let components = tx.components_of(adjustment.product_id).await?;
        for component in components {
            let stock = tx.adjust_component_stock(component.id, adjustment.delta).await?;
            if policy == InventoryPolicy::Deny && adjustment.delta < 0 && stock < 0 {
                tracing::warn!(component_id = %component.id, stock, delta = adjustment.delta, "stock would go negative");
                return Err(EcommerceError::InsufficientStock {
                    component_id: component.id,
                    available: stock - adjustment.delta,
                    requested: -adjustment.delta,
                });
            }
            tracing::debug!(component_id = %component.id, product_id = %adjustment.product_id, delta = adjustment.delta, stock, "stock adjusted");
            events.push(DomainEvent::StockAdjusted { component_id: component.id, delta: adjustment.delta, stock });
        }
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn line(product: Uuid, q: u32) -> LineState { LineState { product_id: Some(product), quantity: Quantity::new(q).unwrap() } }

    fn net(plans: &[Vec<StockAdjustment>]) -> HashMap<Uuid, i32> {
        let mut totals = HashMap::new();
        for a in plans.iter().flatten() {
            *totals.entry(a.product_id).or_insert(0) += a.delta;
        }
        totals
    }

    #[test]
    fn test_first_save_reserves() {
        let p = Uuid::now_v7();
        assert_eq!(plan_save(None, &line(p, 3)), vec![StockAdjustment { product_id: p, delta: -3 }]);
    }

    #[test]
    fn test_unchanged_save_is_noop() {
        let p = Uuid::now_v7();
        assert!(plan_save(Some(&line(p, 3)), &line(p, 3)).is_empty());
    }

    #[test]
    fn test_quantity_change_releases_then_reserves() {
        let p = Uuid::now_v7();
        let plan = plan_save(Some(&line(p, 2)), &line(p, 5));
        assert_eq!(plan, vec![StockAdjustment { product_id: p, delta: 2 }, StockAdjustment { product_id: p, delta: -5 }]);
        assert_eq!(net(&[plan])[&p], 2 - 5);
    }

    #[test]
    fn test_product_change_moves_reservation() {
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let plan = plan_save(Some(&line(a, 2)), &line(b, 2));
        assert_eq!(plan, vec![StockAdjustment { product_id: a, delta: 2 }, StockAdjustment { product_id: b, delta: -2 }]);
    }

    #[test]
    fn test_lifecycle_nets_to_zero() {
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let created = line(a, 4);
        let edited = line(a, 1);
        let moved = line(b, 7);
        let plans = vec![
            plan_save(None, &created),
            plan_save(Some(&created), &edited),
            plan_save(Some(&edited), &moved),
            plan_delete(&moved),
        ];
        assert!(net(&plans).values().all(|d| *d == 0));
    }

    #[test]
    fn test_deleted_product_has_nothing_to_release() {
        let p = Uuid::now_v7();
        let orphan = LineState { product_id: None, quantity: Quantity::new(2).unwrap() };
        assert!(plan_delete(&orphan).is_empty());
        assert_eq!(plan_save(Some(&orphan), &line(p, 2)), vec![StockAdjustment { product_id: p, delta: -2 }]);
    }
}
