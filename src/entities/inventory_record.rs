use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;

/// Stock-accounting record for one (location, product) pair.
///
/// Invariant: `0 <= reserved_quantity <= current_quantity` at every
/// observable point. Quantity fields are private; the ledger service mutates
/// them under its per-record lock through the methods below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryRecord {
    id: Uuid,
    location_id: Uuid,
    product_id: Uuid,
    current_quantity: i32,
    reserved_quantity: i32,
    minimum_stock_level: i32,
    maximum_stock_level: Option<i32>,
    reorder_point: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    created_by: String,
    updated_by: String,
}

impl InventoryRecord {
    /// Creates a zeroed record. Records are created lazily on the first
    /// stock movement or reservation attempt and are never deleted.
    pub(crate) fn new(location_id: Uuid, product_id: Uuid, created_by: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            location_id,
            product_id,
            current_quantity: 0,
            reserved_quantity: 0,
            minimum_stock_level: 0,
            maximum_stock_level: None,
            reorder_point: 0,
            created_at: now,
            updated_at: now,
            created_by: created_by.to_string(),
            updated_by: created_by.to_string(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn location_id(&self) -> Uuid {
        self.location_id
    }

    pub fn product_id(&self) -> Uuid {
        self.product_id
    }

    pub fn current_quantity(&self) -> i32 {
        self.current_quantity
    }

    pub fn reserved_quantity(&self) -> i32 {
        self.reserved_quantity
    }

    /// The only quantity safe to promise to a new order.
    pub fn available_quantity(&self) -> i32 {
        self.current_quantity - self.reserved_quantity
    }

    pub fn reorder_point(&self) -> i32 {
        self.reorder_point
    }

    pub fn is_low_stock(&self) -> bool {
        self.available_quantity() <= self.reorder_point
    }

    pub fn is_overstock(&self) -> bool {
        self.maximum_stock_level
            .map(|max| self.current_quantity > max)
            .unwrap_or(false)
    }

    pub fn can_reserve(&self, quantity: i32) -> bool {
        quantity > 0 && self.available_quantity() >= quantity
    }

    /// Soft-holds `quantity` units against open orders.
    pub(crate) fn reserve(&mut self, quantity: i32, actor: &str) -> Result<(), ServiceError> {
        if !self.can_reserve(quantity) {
            return Err(ServiceError::InsufficientStock(format!(
                "cannot reserve {} units, available: {}",
                quantity,
                self.available_quantity()
            )));
        }
        self.reserved_quantity += quantity;
        self.touch(actor);
        Ok(())
    }

    /// Releases up to `quantity` reserved units, flooring at zero. Releasing
    /// more than is currently reserved is lossy but never drives the value
    /// negative. Returns the amount actually released.
    pub(crate) fn release(&mut self, quantity: i32, actor: &str) -> i32 {
        let released = quantity.min(self.reserved_quantity);
        self.reserved_quantity -= released;
        self.touch(actor);
        released
    }

    pub(crate) fn add_stock(&mut self, quantity: i32, actor: &str) {
        self.current_quantity += quantity;
        self.touch(actor);
    }

    /// Removes physical stock. A withdrawal must not eat into reserved
    /// stock, so availability is what gets checked.
    pub(crate) fn remove_stock(&mut self, quantity: i32, actor: &str) -> Result<(), ServiceError> {
        if quantity > self.available_quantity() {
            return Err(ServiceError::InsufficientStock(format!(
                "cannot remove {} units, available: {}",
                quantity,
                self.available_quantity()
            )));
        }
        self.current_quantity -= quantity;
        self.touch(actor);
        Ok(())
    }

    pub(crate) fn set_levels(
        &mut self,
        minimum_stock_level: i32,
        maximum_stock_level: Option<i32>,
        reorder_point: i32,
        actor: &str,
    ) {
        self.minimum_stock_level = minimum_stock_level;
        self.maximum_stock_level = maximum_stock_level;
        self.reorder_point = reorder_point;
        self.touch(actor);
    }

    fn touch(&mut self, actor: &str) {
        self.updated_at = Utc::now();
        self.updated_by = actor.to_string();
    }

    pub fn snapshot(&self) -> InventorySnapshot {
        InventorySnapshot {
            id: self.id,
            location_id: self.location_id,
            product_id: self.product_id,
            current_quantity: self.current_quantity,
            reserved_quantity: self.reserved_quantity,
            available_quantity: self.available_quantity(),
            minimum_stock_level: self.minimum_stock_level,
            maximum_stock_level: self.maximum_stock_level,
            reorder_point: self.reorder_point,
            low_stock: self.is_low_stock(),
            overstock: self.is_overstock(),
            updated_at: self.updated_at,
            updated_by: self.updated_by.clone(),
        }
    }
}

/// Read-only view of a ledger record, taken under the record lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub id: Uuid,
    pub location_id: Uuid,
    pub product_id: Uuid,
    pub current_quantity: i32,
    pub reserved_quantity: i32,
    pub available_quantity: i32,
    pub minimum_stock_level: i32,
    pub maximum_stock_level: Option<i32>,
    pub reorder_point: i32,
    pub low_stock: bool,
    pub overstock: bool,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record() -> InventoryRecord {
        InventoryRecord::new(Uuid::new_v4(), Uuid::new_v4(), "test")
    }

    #[test]
    fn reserve_checks_availability() {
        let mut rec = record();
        rec.add_stock(10, "test");
        assert!(rec.reserve(6, "test").is_ok());
        assert_eq!(rec.reserved_quantity(), 6);
        assert_eq!(rec.available_quantity(), 4);

        let err = rec.reserve(5, "test").unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientStock(_)));
        assert_eq!(rec.reserved_quantity(), 6);
    }

    #[test]
    fn release_floors_at_zero() {
        let mut rec = record();
        rec.add_stock(10, "test");
        rec.reserve(3, "test").unwrap();
        assert_eq!(rec.release(8, "test"), 3);
        assert_eq!(rec.reserved_quantity(), 0);
    }

    #[test]
    fn remove_stock_protects_reserved() {
        let mut rec = record();
        rec.add_stock(10, "test");
        rec.reserve(8, "test").unwrap();
        assert!(rec.remove_stock(5, "test").is_err());
        assert!(rec.remove_stock(2, "test").is_ok());
        assert_eq!(rec.current_quantity(), 8);
        assert_eq!(rec.reserved_quantity(), 8);
    }

    #[test]
    fn low_stock_and_overstock_predicates() {
        let mut rec = record();
        rec.set_levels(0, Some(20), 5, "test");
        rec.add_stock(10, "test");
        assert!(!rec.is_low_stock());
        rec.reserve(6, "test").unwrap();
        assert!(rec.is_low_stock());
        rec.add_stock(20, "test");
        assert!(rec.is_overstock());
    }

    proptest! {
        /// Any sequence of ledger operations preserves
        /// `0 <= reserved <= current`.
        #[test]
        fn invariant_holds_under_op_sequences(ops in proptest::collection::vec((0u8..4, 1i32..50), 0..64)) {
            let mut rec = record();
            for (op, qty) in ops {
                match op {
                    0 => rec.add_stock(qty, "prop"),
                    1 => { let _ = rec.reserve(qty, "prop"); }
                    2 => { let _ = rec.release(qty, "prop"); }
                    _ => { let _ = rec.remove_stock(qty, "prop"); }
                }
                prop_assert!(rec.reserved_quantity() >= 0);
                prop_assert!(rec.reserved_quantity() <= rec.current_quantity());
                prop_assert!(rec.available_quantity() >= 0);
            }
        }
    }
}
