pub mod activity_log;
pub mod approval;
pub mod inventory;
pub mod orders;
pub mod stock_movements;

pub use activity_log::{ActivityLog, TracingActivityLog};
pub use approval::{ApprovalPolicy, ApprovalReason};
pub use inventory::InventoryService;
pub use orders::SalesOrderService;
pub use stock_movements::StockMovementService;
