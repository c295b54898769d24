//! Manager-approval policy for sales orders.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::auth::Actor;
use crate::config::SalesConfig;
use crate::entities::SalesOrderItem;

/// Why an order needs manager sign-off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalReason {
    /// An employee applied a discount above the configured maximum.
    DiscountExceedsLimit,
    /// An employee order sources items from more than one location.
    CrossLocationSourcing,
}

/// Pure decision over (actor role, order items).
///
/// Manager-level actors never trigger approval regardless of discount or
/// sourcing spread.
#[derive(Debug, Clone)]
pub struct ApprovalPolicy {
    max_employee_discount_percent: Decimal,
    cross_location_requires_approval: bool,
}

impl ApprovalPolicy {
    pub fn new(max_employee_discount_percent: Decimal, cross_location_requires_approval: bool) -> Self {
        Self {
            max_employee_discount_percent,
            cross_location_requires_approval,
        }
    }

    pub fn from_config(config: &SalesConfig) -> Self {
        Self::new(
            config.max_employee_discount_percent,
            config.cross_location_requires_approval,
        )
    }

    /// Evaluates the cumulative item set of an order. Returns the first
    /// reason that applies, or `None` when no approval is needed.
    pub fn evaluate(&self, actor: &Actor, items: &[SalesOrderItem]) -> Option<ApprovalReason> {
        if actor.is_manager_level() {
            return None;
        }

        if items
            .iter()
            .any(|item| item.discount_percent > self.max_employee_discount_percent)
        {
            return Some(ApprovalReason::DiscountExceedsLimit);
        }

        if self.cross_location_requires_approval {
            let mut locations: Vec<_> = items.iter().map(|i| i.location_id).collect();
            locations.sort_unstable();
            locations.dedup();
            if locations.len() > 1 {
                return Some(ApprovalReason::CrossLocationSourcing);
            }
        }

        None
    }
}
