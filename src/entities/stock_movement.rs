use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Whether a movement brings stock in or takes it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementDirection {
    Addition,
    Withdrawal,
}

/// Business reason for a movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    Receipt,
    Restock,
    CustomerReturn,
    Issue,
    Damage,
    Transfer,
}

impl MovementKind {
    pub fn direction(&self) -> MovementDirection {
        match self {
            MovementKind::Receipt | MovementKind::Restock | MovementKind::CustomerReturn => {
                MovementDirection::Addition
            }
            MovementKind::Issue | MovementKind::Damage | MovementKind::Transfer => {
                MovementDirection::Withdrawal
            }
        }
    }
}

/// Append-only record of a physical receipt or withdrawal.
///
/// A movement may be corrected (quantity only) on the day it was recorded;
/// once `occurred_on` has passed it is immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: Uuid,
    pub location_id: Uuid,
    pub product_id: Uuid,
    pub kind: MovementKind,
    pub quantity: i32,
    pub unit_cost: Option<Decimal>,
    /// Supplier for additions, destination for withdrawals.
    pub counterparty: Option<String>,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub occurred_on: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl StockMovement {
    pub fn direction(&self) -> MovementDirection {
        self.kind.direction()
    }

    /// Signed effect of this movement on on-hand quantity.
    pub fn signed_quantity(&self) -> i32 {
        match self.direction() {
            MovementDirection::Addition => self.quantity,
            MovementDirection::Withdrawal => -self.quantity,
        }
    }

    pub fn is_editable_on(&self, date: NaiveDate) -> bool {
        self.occurred_on == date
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    fn movement(kind: MovementKind, quantity: i32) -> StockMovement {
        StockMovement {
            id: Uuid::new_v4(),
            location_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            kind,
            quantity,
            unit_cost: None,
            counterparty: None,
            reference_number: None,
            notes: None,
            occurred_on: Utc::now().date_naive(),
            created_at: Utc::now(),
            created_by: "test".into(),
        }
    }

    #[test]
    fn signed_quantity_follows_direction() {
        assert_eq!(movement(MovementKind::Restock, 7).signed_quantity(), 7);
        assert_eq!(movement(MovementKind::Damage, 7).signed_quantity(), -7);
    }

    #[test]
    fn editable_only_on_recording_day() {
        let today = Utc::now().date_naive();
        let m = movement(MovementKind::Receipt, 3);
        assert!(m.is_editable_on(today));
        assert!(!m.is_editable_on(today.checked_add_days(Days::new(1)).unwrap()));
    }

    #[test]
    fn kind_round_trips_through_string() {
        use std::str::FromStr;
        assert_eq!(MovementKind::Receipt.to_string(), "RECEIPT");
        assert_eq!(
            MovementKind::from_str("CUSTOMER_RETURN").unwrap(),
            MovementKind::CustomerReturn
        );
    }
}
