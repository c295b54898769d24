//! Observational activity logging collaborator.
//!
//! The core reports completed additions, withdrawals, approvals and low-stock
//! conditions here. Implementations must be non-blocking from the caller's
//! point of view and must never fail the core operation.

use async_trait::async_trait;
use tracing::info;

#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn record(&self, actor: &str, action: &str, entity_type: &str, description: &str);
}

/// Default implementation that writes activities to the tracing log.
#[derive(Debug, Default, Clone)]
pub struct TracingActivityLog;

#[async_trait]
impl ActivityLog for TracingActivityLog {
    async fn record(&self, actor: &str, action: &str, entity_type: &str, description: &str) {
        info!(actor, action, entity_type, "{}", description);
    }
}
