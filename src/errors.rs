use thiserror::Error;

/// Errors surfaced by the core services.
///
/// Every variant is returned to the caller synchronously; the only place a
/// failure is swallowed is the per-item release loop during cancellation,
/// which logs and continues (see `SalesOrderService`).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    /// Operation not valid for the order's current status.
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// Operation not valid for the entity's current state (e.g. editing a
    /// stock movement after its recording day has passed).
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Event error: {0}")]
    EventError(String),
}

impl ServiceError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        ServiceError::NotFound(format!("{} {} not found", entity, id))
    }
}
