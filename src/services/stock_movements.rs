//! Stock movement log: physical receipts and withdrawals.
//!
//! Movements are the only way on-hand quantity changes. Each movement is
//! applied to the ledger when recorded; a same-day correction replays only
//! the delta between old and new quantity, and a correction that would
//! withdraw more than is available fails without partially applying.

use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::Actor;
use crate::entities::{MovementDirection, MovementKind, StockMovement};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::activity_log::ActivityLog;
use crate::services::inventory::InventoryService;

/// Input for recording a receipt/restock.
#[derive(Debug, Clone, Default)]
pub struct AddStockInput {
    pub location_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    /// Defaults to [`MovementKind::Receipt`].
    pub kind: Option<MovementKind>,
    pub unit_cost: Option<Decimal>,
    pub supplier_name: Option<String>,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    /// Defaults to today.
    pub occurred_on: Option<NaiveDate>,
}

/// Input for recording an issue/damage/transfer withdrawal.
#[derive(Debug, Clone, Default)]
pub struct RemoveStockInput {
    pub location_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    /// Defaults to [`MovementKind::Issue`].
    pub kind: Option<MovementKind>,
    pub unit_cost: Option<Decimal>,
    pub destination: Option<String>,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub occurred_on: Option<NaiveDate>,
}

/// Outcome of a batch addition; failures don't abort the rest of the batch.
#[derive(Debug, Clone, Default)]
pub struct BatchAddResult {
    pub total_items: usize,
    pub movements: Vec<StockMovement>,
    pub errors: Vec<BatchAddError>,
}

#[derive(Debug, Clone)]
pub struct BatchAddError {
    pub index: usize,
    pub product_id: Uuid,
    pub message: String,
}

/// Service for recording stock movements against the ledger.
#[derive(Clone)]
pub struct StockMovementService {
    movements: Arc<DashMap<Uuid, Arc<Mutex<StockMovement>>>>,
    inventory: InventoryService,
    event_sender: EventSender,
    activity_log: Arc<dyn ActivityLog>,
}

impl StockMovementService {
    pub fn new(
        inventory: InventoryService,
        event_sender: EventSender,
        activity_log: Arc<dyn ActivityLog>,
    ) -> Self {
        Self {
            movements: Arc::new(DashMap::new()),
            inventory,
            event_sender,
            activity_log,
        }
    }

    /// Records a receipt and adds its quantity to on-hand stock.
    ///
    /// Employee-level actors may not set cost fields; `unit_cost` is cleared
    /// with a warning rather than rejected.
    #[instrument(skip(self, input, actor), fields(actor = %actor.username))]
    pub async fn add_stock(
        &self,
        mut input: AddStockInput,
        actor: &Actor,
    ) -> Result<StockMovement, ServiceError> {
        let kind = input.kind.unwrap_or(MovementKind::Receipt);
        validate_direction(kind, MovementDirection::Addition)?;
        validate_unit_cost(input.unit_cost)?;

        if !actor.is_manager_level() && input.unit_cost.is_some() {
            warn!(actor = %actor.username, "Employee attempted to set unit cost, field ignored");
            input.unit_cost = None;
        }

        let movement = StockMovement {
            id: Uuid::new_v4(),
            location_id: input.location_id,
            product_id: input.product_id,
            kind,
            quantity: input.quantity,
            unit_cost: input.unit_cost,
            counterparty: input.supplier_name,
            reference_number: input.reference_number,
            notes: input.notes,
            occurred_on: input.occurred_on.unwrap_or_else(|| Utc::now().date_naive()),
            created_at: Utc::now(),
            created_by: actor.username.clone(),
        };

        self.inventory
            .add_stock(
                movement.location_id,
                movement.product_id,
                movement.quantity,
                movement.id,
                actor,
            )
            .await?;

        self.movements
            .insert(movement.id, Arc::new(Mutex::new(movement.clone())));

        self.activity_log
            .record(
                &actor.username,
                "inventory_added",
                "stock_movement",
                &format!(
                    "Added {} units of product {} at location {}",
                    movement.quantity, movement.product_id, movement.location_id
                ),
            )
            .await;

        info!(movement_id = %movement.id, quantity = movement.quantity, "Recorded stock addition");
        Ok(movement)
    }

    /// Records a withdrawal and removes its quantity from on-hand stock.
    /// Fails with `InsufficientStock` when the withdrawal would eat into
    /// reserved stock; no movement is recorded in that case.
    #[instrument(skip(self, input, actor), fields(actor = %actor.username))]
    pub async fn remove_stock(
        &self,
        input: RemoveStockInput,
        actor: &Actor,
    ) -> Result<StockMovement, ServiceError> {
        let kind = input.kind.unwrap_or(MovementKind::Issue);
        validate_direction(kind, MovementDirection::Withdrawal)?;
        validate_unit_cost(input.unit_cost)?;

        let movement = StockMovement {
            id: Uuid::new_v4(),
            location_id: input.location_id,
            product_id: input.product_id,
            kind,
            quantity: input.quantity,
            unit_cost: input.unit_cost,
            counterparty: input.destination,
            reference_number: input.reference_number,
            notes: input.notes,
            occurred_on: input.occurred_on.unwrap_or_else(|| Utc::now().date_naive()),
            created_at: Utc::now(),
            created_by: actor.username.clone(),
        };

        self.inventory
            .remove_stock(
                movement.location_id,
                movement.product_id,
                movement.quantity,
                movement.id,
                actor,
            )
            .await?;

        self.movements
            .insert(movement.id, Arc::new(Mutex::new(movement.clone())));

        self.activity_log
            .record(
                &actor.username,
                "inventory_withdrawn",
                "stock_movement",
                &format!(
                    "Withdrew {} units of product {} from location {}",
                    movement.quantity, movement.product_id, movement.location_id
                ),
            )
            .await;

        info!(movement_id = %movement.id, quantity = movement.quantity, "Recorded stock withdrawal");
        Ok(movement)
    }

    /// Batch restock: each item is attempted independently and failures are
    /// collected rather than aborting the batch.
    #[instrument(skip(self, items, actor), fields(actor = %actor.username, items = items.len()))]
    pub async fn add_stock_batch(&self, items: Vec<AddStockInput>, actor: &Actor) -> BatchAddResult {
        let mut result = BatchAddResult {
            total_items: items.len(),
            ..Default::default()
        };

        for (index, item) in items.into_iter().enumerate() {
            let product_id = item.product_id;
            match self.add_stock(item, actor).await {
                Ok(movement) => result.movements.push(movement),
                Err(e) => {
                    warn!(index, %product_id, error = %e, "Batch addition item failed");
                    result.errors.push(BatchAddError {
                        index,
                        product_id,
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            succeeded = result.movements.len(),
            failed = result.errors.len(),
            "Batch stock addition completed"
        );
        result
    }

    /// Corrects a movement's quantity on the day it was recorded.
    ///
    /// Only the delta between old and new quantity hits the ledger; a
    /// correction that would effectively withdraw more than is available
    /// fails with `InsufficientStock` and leaves both the ledger and the
    /// movement untouched.
    #[instrument(skip(self, actor), fields(actor = %actor.username))]
    pub async fn edit_movement_same_day(
        &self,
        movement_id: Uuid,
        new_quantity: i32,
        actor: &Actor,
    ) -> Result<StockMovement, ServiceError> {
        if new_quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "quantity must be positive".to_string(),
            ));
        }

        let handle = self
            .movements
            .get(&movement_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ServiceError::not_found("Movement", movement_id))?;

        let mut movement = handle.lock().await;

        if !movement.is_editable_on(Utc::now().date_naive()) {
            return Err(ServiceError::InvalidOperation(format!(
                "movement {} can only be edited on the day it was recorded",
                movement_id
            )));
        }

        let old_quantity = movement.quantity;
        let delta = new_quantity - old_quantity;
        // The on-hand effect of the edit: positive means stock goes up.
        let on_hand_delta = match movement.direction() {
            MovementDirection::Addition => delta,
            MovementDirection::Withdrawal => -delta,
        };

        if on_hand_delta > 0 {
            self.inventory
                .add_stock(
                    movement.location_id,
                    movement.product_id,
                    on_hand_delta,
                    movement.id,
                    actor,
                )
                .await?;
        } else if on_hand_delta < 0 {
            self.inventory
                .remove_stock(
                    movement.location_id,
                    movement.product_id,
                    -on_hand_delta,
                    movement.id,
                    actor,
                )
                .await?;
        }

        movement.quantity = new_quantity;
        let updated = movement.clone();
        drop(movement);

        self.event_sender
            .send_or_log(Event::MovementCorrected {
                movement_id,
                old_quantity,
                new_quantity,
            })
            .await;

        info!(%movement_id, old_quantity, new_quantity, "Corrected stock movement");
        Ok(updated)
    }

    pub async fn get_movement(&self, movement_id: Uuid) -> Option<StockMovement> {
        let handle = self
            .movements
            .get(&movement_id)
            .map(|entry| entry.value().clone())?;
        let movement = handle.lock().await;
        Some(movement.clone())
    }

    /// Movement history, optionally filtered, newest first.
    pub async fn list_movements(
        &self,
        location_id: Option<Uuid>,
        product_id: Option<Uuid>,
    ) -> Vec<StockMovement> {
        let handles: Vec<_> = self
            .movements
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut movements = Vec::new();
        for handle in handles {
            let movement = handle.lock().await;
            if location_id.is_some_and(|l| l != movement.location_id) {
                continue;
            }
            if product_id.is_some_and(|p| p != movement.product_id) {
                continue;
            }
            movements.push(movement.clone());
        }
        movements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        movements
    }
}

fn validate_direction(kind: MovementKind, expected: MovementDirection) -> Result<(), ServiceError> {
    if kind.direction() != expected {
        return Err(ServiceError::ValidationError(format!(
            "movement kind {} is not valid here",
            kind
        )));
    }
    Ok(())
}

fn validate_unit_cost(unit_cost: Option<Decimal>) -> Result<(), ServiceError> {
    if unit_cost.is_some_and(|c| c < Decimal::ZERO) {
        return Err(ServiceError::ValidationError(
            "unit cost cannot be negative".to_string(),
        ));
    }
    Ok(())
}
