//! In-memory domain records.
//!
//! The ledger record keeps its quantity fields private: every mutation goes
//! through the reserve/release/add/remove methods so the
//! `reserved <= current` invariant cannot be bypassed by field assignment.

pub mod inventory_record;
pub mod sales_order;
pub mod stock_movement;

pub use inventory_record::{InventoryRecord, InventorySnapshot};
pub use sales_order::{OrderStatus, SalesOrder, SalesOrderItem};
pub use stock_movement::{MovementDirection, MovementKind, StockMovement};
