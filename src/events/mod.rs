//! Change-feed notification stream.
//!
//! Every ledger mutation and order status transition pushes an [`Event`]
//! through an [`EventSender`]. Delivery is fire-and-forget from the core's
//! perspective: a send failure is logged and never rolls back the mutation
//! that produced it. Downstream sync consumes the channel via
//! [`process_events`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::OrderStatus;

/// Events emitted after core mutations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Order events
    OrderCreated(Uuid),
    OrderItemAdded {
        order_id: Uuid,
        item_id: Uuid,
        product_id: Uuid,
        location_id: Uuid,
        quantity: i32,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
    },
    /// A best-effort release during cancellation did not fully complete;
    /// downstream reconciliation should inspect the order.
    OrderReleaseIncomplete(Uuid),

    // Inventory events
    InventoryReserved {
        location_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        reference_id: Uuid,
    },
    InventoryReleased {
        location_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        reference_id: Uuid,
    },
    StockAdded {
        location_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        movement_id: Uuid,
    },
    StockRemoved {
        location_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        movement_id: Uuid,
    },
    MovementCorrected {
        movement_id: Uuid,
        old_quantity: i32,
        new_quantity: i32,
    },
    InventoryLevelsSet {
        location_id: Uuid,
        product_id: Uuid,
    },
    LowStock {
        location_id: Uuid,
        product_id: Uuid,
        available_quantity: i32,
        reorder_point: i32,
    },

    /// Generic event for custom messages
    Generic {
        message: String,
        timestamp: DateTime<Utc>,
        metadata: serde_json::Value,
    },
}

impl Event {
    pub fn with_data(message: String) -> Self {
        Event::Generic {
            message,
            timestamp: Utc::now(),
            metadata: serde_json::Value::Null,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, surfacing the failure to the caller.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Fire-and-forget send. The core mutation has already happened when
    /// this is called, so a full or closed channel only gets a warning.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!("Failed to send event: {}", e);
        }
    }
}

/// Drains the event channel, logging each event. Spawn this (or a consumer
/// like it) alongside the services so the channel never fills up.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::LowStock {
                location_id,
                product_id,
                available_quantity,
                reorder_point,
            } => {
                warn!(
                    %location_id,
                    %product_id,
                    available_quantity,
                    reorder_point,
                    "Low stock threshold reached"
                );
            }
            other => info!("Received event: {:?}", other),
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_or_log_swallows_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        // Must not panic or error.
        sender.send_or_log(Event::OrderCreated(Uuid::new_v4())).await;
    }

    #[tokio::test]
    async fn strict_send_surfaces_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        assert!(sender.send(Event::OrderCreated(Uuid::new_v4())).await.is_err());
    }
}
