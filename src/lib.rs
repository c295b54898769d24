//! Stockline core
//!
//! Warehouse inventory reservation ledger and sales-order approval workflow.
//! The crate is an in-process API: no wire protocol, no persistence schema.
//! The ledger guarantees that concurrent orders can never over-commit the
//! same physical stock, and the order workflow enforces manager approval for
//! discount- and cross-location-sensitive orders.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod entities;
pub mod errors;
pub mod events;
pub mod logging;
pub mod services;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::events::EventSender;
use crate::services::activity_log::{ActivityLog, TracingActivityLog};
use crate::services::inventory::InventoryService;
use crate::services::orders::SalesOrderService;
use crate::services::stock_movements::StockMovementService;

/// Wires the core services to shared configuration, the change-feed sender
/// and the activity log collaborator.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub event_sender: EventSender,
    pub inventory_service: InventoryService,
    pub stock_movement_service: StockMovementService,
    pub order_service: SalesOrderService,
}

impl AppState {
    pub fn new(config: AppConfig, event_sender: EventSender) -> Self {
        Self::with_activity_log(config, event_sender, Arc::new(TracingActivityLog))
    }

    pub fn with_activity_log(
        config: AppConfig,
        event_sender: EventSender,
        activity_log: Arc<dyn ActivityLog>,
    ) -> Self {
        let config = Arc::new(config);
        let inventory_service = InventoryService::new(event_sender.clone(), activity_log.clone());
        let stock_movement_service = StockMovementService::new(
            inventory_service.clone(),
            event_sender.clone(),
            activity_log.clone(),
        );
        let order_service = SalesOrderService::new(
            inventory_service.clone(),
            config.clone(),
            event_sender.clone(),
            activity_log,
        );

        Self {
            config,
            event_sender,
            inventory_service,
            stock_movement_service,
            order_service,
        }
    }
}
