use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Sales order state machine.
///
/// ```text
/// OPEN ──submit──► PENDING_MANAGER_APPROVAL ──approve──► CONFIRMED
///   │                        │                               │
///   │                        │                        request_cancel
///   │                        │                               ▼
///   └────────request_cancel──┴──────► CANCELLED ◄── CANCEL_REQUESTED
///                                    (terminal)      (approve_cancel)
/// ```
///
/// Open and PendingManagerApproval cancel directly (reservations released on
/// the spot); Confirmed must go through the cancel-request/approval path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Open,
    PendingManagerApproval,
    Confirmed,
    CancelRequested,
    Cancelled,
}

impl OrderStatus {
    /// Items can only be added while the order is open.
    pub fn is_modifiable(&self) -> bool {
        matches!(self, OrderStatus::Open)
    }

    pub fn can_submit(&self) -> bool {
        matches!(self, OrderStatus::Open)
    }

    /// Statuses where a cancel request releases stock and cancels
    /// immediately, without manager sign-off.
    pub fn can_cancel_directly(&self) -> bool {
        matches!(self, OrderStatus::Open | OrderStatus::PendingManagerApproval)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled)
    }
}

/// One line of a sales order. The quantity is exactly the amount reserved
/// against the ledger when the item was added.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesOrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub location_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discount_percent: Decimal,
    pub currency_code: String,
    pub created_at: DateTime<Utc>,
}

/// Customer order created by an employee at the point of sale.
///
/// Orders exclusively own their items and are never physically deleted;
/// terminal states are retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesOrder {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub status: OrderStatus,
    pub requires_manager_approval: bool,
    pub currency_code: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub items: Vec<SalesOrderItem>,
    /// Set when a best-effort reservation release during cancellation did not
    /// fully complete, so the inconsistency is observable downstream.
    pub release_incomplete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_by: String,
}

impl SalesOrder {
    pub fn new(tenant_id: Uuid, currency_code: &str, created_by: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            status: OrderStatus::Open,
            requires_manager_approval: false,
            currency_code: currency_code.to_string(),
            customer_name: None,
            customer_phone: None,
            customer_email: None,
            items: Vec::new(),
            release_incomplete: false,
            created_at: now,
            updated_at: now,
            created_by: created_by.to_string(),
            updated_by: created_by.to_string(),
        }
    }

    /// Distinct locations the order's items source from.
    pub fn distinct_locations(&self) -> usize {
        let mut locations: Vec<Uuid> = self.items.iter().map(|i| i.location_id).collect();
        locations.sort_unstable();
        locations.dedup();
        locations.len()
    }

    pub(crate) fn set_status(&mut self, status: OrderStatus, actor: &str) {
        self.status = status;
        self.touch(actor);
    }

    pub(crate) fn touch(&mut self, actor: &str) {
        self.updated_at = Utc::now();
        self.updated_by = actor.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(OrderStatus::Open, true; "open is modifiable")]
    #[test_case(OrderStatus::PendingManagerApproval, false; "pending approval is frozen")]
    #[test_case(OrderStatus::Confirmed, false; "confirmed is frozen")]
    #[test_case(OrderStatus::CancelRequested, false; "cancel requested is frozen")]
    #[test_case(OrderStatus::Cancelled, false; "cancelled is frozen")]
    fn modifiability(status: OrderStatus, expected: bool) {
        assert_eq!(status.is_modifiable(), expected);
    }

    #[test_case(OrderStatus::Open, true)]
    #[test_case(OrderStatus::PendingManagerApproval, true)]
    #[test_case(OrderStatus::Confirmed, false)]
    #[test_case(OrderStatus::CancelRequested, false)]
    #[test_case(OrderStatus::Cancelled, false)]
    fn direct_cancellation(status: OrderStatus, expected: bool) {
        assert_eq!(status.can_cancel_directly(), expected);
    }

    #[test]
    fn status_serializes_screaming_snake() {
        assert_eq!(
            OrderStatus::PendingManagerApproval.to_string(),
            "PENDING_MANAGER_APPROVAL"
        );
    }

    #[test]
    fn distinct_location_count() {
        let loc_a = Uuid::new_v4();
        let loc_b = Uuid::new_v4();
        let mut order = SalesOrder::new(Uuid::new_v4(), "USD", "test");
        for loc in [loc_a, loc_a, loc_b] {
            order.items.push(SalesOrderItem {
                id: Uuid::new_v4(),
                order_id: order.id,
                location_id: loc,
                product_id: Uuid::new_v4(),
                quantity: 1,
                unit_price: Decimal::ZERO,
                discount_percent: Decimal::ZERO,
                currency_code: "USD".into(),
                created_at: Utc::now(),
            });
        }
        assert_eq!(order.distinct_locations(), 2);
    }
}
