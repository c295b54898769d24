//! Inventory reservation ledger.
//!
//! One [`InventoryRecord`] per (location, product) pair, each behind its own
//! mutex in a concurrent map. Every mutation is a minimal
//! acquire-read-validate-write critical section on the single record, so the
//! check-then-act of a reservation is atomic and unrelated pairs proceed
//! fully in parallel. Events and activity notifications are emitted after
//! the lock is released and never roll the mutation back.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::Actor;
use crate::entities::{InventoryRecord, InventorySnapshot};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::activity_log::ActivityLog;

type RecordKey = (Uuid, Uuid);

/// Service owning the per-record locking protocol.
///
/// Callers never see an [`InventoryRecord`] directly, only
/// [`InventorySnapshot`]s taken under the lock.
#[derive(Clone)]
pub struct InventoryService {
    records: Arc<DashMap<RecordKey, Arc<Mutex<InventoryRecord>>>>,
    event_sender: EventSender,
    activity_log: Arc<dyn ActivityLog>,
}

impl InventoryService {
    pub fn new(event_sender: EventSender, activity_log: Arc<dyn ActivityLog>) -> Self {
        Self {
            records: Arc::new(DashMap::new()),
            event_sender,
            activity_log,
        }
    }

    /// Record handle, created lazily (zeroed) on first touch. Records are
    /// never removed from the map.
    fn record_handle(&self, location_id: Uuid, product_id: Uuid, actor: &Actor) -> Arc<Mutex<InventoryRecord>> {
        self.records
            .entry((location_id, product_id))
            .or_insert_with(|| {
                Arc::new(Mutex::new(InventoryRecord::new(
                    location_id,
                    product_id,
                    &actor.username,
                )))
            })
            .value()
            .clone()
    }

    /// Soft-holds `quantity` units for `reference_id` (an order).
    ///
    /// Fails with `InsufficientStock` when availability is short; the record
    /// is unchanged in that case.
    #[instrument(skip(self, actor), fields(actor = %actor.username))]
    pub async fn reserve(
        &self,
        location_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        reference_id: Uuid,
        actor: &Actor,
    ) -> Result<InventorySnapshot, ServiceError> {
        validate_quantity(quantity)?;

        let handle = self.record_handle(location_id, product_id, actor);
        let (snapshot, newly_low) = {
            let mut record = handle.lock().await;
            let was_low = record.is_low_stock();
            record.reserve(quantity, &actor.username)?;
            let snapshot = record.snapshot();
            (snapshot.clone(), !was_low && snapshot.low_stock)
        };

        self.event_sender
            .send_or_log(Event::InventoryReserved {
                location_id,
                product_id,
                quantity,
                reference_id,
            })
            .await;
        self.notify_if_low(&snapshot, newly_low, actor).await;

        info!(%location_id, %product_id, quantity, %reference_id, "Reserved stock");
        Ok(snapshot)
    }

    /// Releases up to `quantity` reserved units, flooring at zero. Releasing
    /// more than is reserved is lossy but safe.
    #[instrument(skip(self, actor), fields(actor = %actor.username))]
    pub async fn release(
        &self,
        location_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        reference_id: Uuid,
        actor: &Actor,
    ) -> Result<InventorySnapshot, ServiceError> {
        validate_quantity(quantity)?;

        let handle = self.record_handle(location_id, product_id, actor);
        let (snapshot, released) = {
            let mut record = handle.lock().await;
            let released = record.release(quantity, &actor.username);
            (record.snapshot(), released)
        };

        self.event_sender
            .send_or_log(Event::InventoryReleased {
                location_id,
                product_id,
                quantity: released,
                reference_id,
            })
            .await;

        info!(%location_id, %product_id, quantity = released, %reference_id, "Released reservation");
        Ok(snapshot)
    }

    /// Physical receipt. Only the stock movement service calls this; every
    /// on-hand change has a movement record behind it.
    pub(crate) async fn add_stock(
        &self,
        location_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        movement_id: Uuid,
        actor: &Actor,
    ) -> Result<InventorySnapshot, ServiceError> {
        validate_quantity(quantity)?;

        let handle = self.record_handle(location_id, product_id, actor);
        let snapshot = {
            let mut record = handle.lock().await;
            record.add_stock(quantity, &actor.username);
            record.snapshot()
        };

        self.event_sender
            .send_or_log(Event::StockAdded {
                location_id,
                product_id,
                quantity,
                movement_id,
            })
            .await;

        Ok(snapshot)
    }

    /// Physical withdrawal. Must not eat into reserved stock, so
    /// availability is what gets validated under the lock.
    pub(crate) async fn remove_stock(
        &self,
        location_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        movement_id: Uuid,
        actor: &Actor,
    ) -> Result<InventorySnapshot, ServiceError> {
        validate_quantity(quantity)?;

        let handle = self.record_handle(location_id, product_id, actor);
        let (snapshot, newly_low) = {
            let mut record = handle.lock().await;
            let was_low = record.is_low_stock();
            record.remove_stock(quantity, &actor.username)?;
            let snapshot = record.snapshot();
            (snapshot.clone(), !was_low && snapshot.low_stock)
        };

        self.event_sender
            .send_or_log(Event::StockRemoved {
                location_id,
                product_id,
                quantity,
                movement_id,
            })
            .await;
        self.notify_if_low(&snapshot, newly_low, actor).await;

        Ok(snapshot)
    }

    /// Get-or-create a record and configure its stock level thresholds.
    #[instrument(skip(self, actor), fields(actor = %actor.username))]
    pub async fn set_levels(
        &self,
        location_id: Uuid,
        product_id: Uuid,
        minimum_stock_level: i32,
        maximum_stock_level: Option<i32>,
        reorder_point: i32,
        actor: &Actor,
    ) -> Result<InventorySnapshot, ServiceError> {
        if minimum_stock_level < 0 || reorder_point < 0 || maximum_stock_level.is_some_and(|m| m < 0) {
            return Err(ServiceError::ValidationError(
                "stock levels cannot be negative".to_string(),
            ));
        }

        let handle = self.record_handle(location_id, product_id, actor);
        let snapshot = {
            let mut record = handle.lock().await;
            record.set_levels(
                minimum_stock_level,
                maximum_stock_level,
                reorder_point,
                &actor.username,
            );
            record.snapshot()
        };

        self.event_sender
            .send_or_log(Event::InventoryLevelsSet {
                location_id,
                product_id,
            })
            .await;

        Ok(snapshot)
    }

    /// Point-in-time view of one record, `None` if it was never touched.
    pub async fn get_record(&self, location_id: Uuid, product_id: Uuid) -> Option<InventorySnapshot> {
        let handle = self
            .records
            .get(&(location_id, product_id))
            .map(|entry| entry.value().clone())?;
        let record = handle.lock().await;
        Some(record.snapshot())
    }

    /// All records currently at or below their reorder point.
    pub async fn list_low_stock(&self) -> Vec<InventorySnapshot> {
        let handles: Vec<_> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut low = Vec::new();
        for handle in handles {
            let record = handle.lock().await;
            if record.is_low_stock() {
                low.push(record.snapshot());
            }
        }
        low
    }

    async fn notify_if_low(&self, snapshot: &InventorySnapshot, newly_low: bool, actor: &Actor) {
        if !newly_low {
            return;
        }
        self.event_sender
            .send_or_log(Event::LowStock {
                location_id: snapshot.location_id,
                product_id: snapshot.product_id,
                available_quantity: snapshot.available_quantity,
                reorder_point: snapshot.reorder_point,
            })
            .await;
        self.activity_log
            .record(
                &actor.username,
                "low_stock",
                "inventory_record",
                &format!(
                    "Product {} at location {} is low on stock ({} available, reorder at {})",
                    snapshot.product_id,
                    snapshot.location_id,
                    snapshot.available_quantity,
                    snapshot.reorder_point
                ),
            )
            .await;
    }
}

fn validate_quantity(quantity: i32) -> Result<(), ServiceError> {
    if quantity <= 0 {
        return Err(ServiceError::ValidationError(
            "quantity must be positive".to_string(),
        ));
    }
    Ok(())
}
