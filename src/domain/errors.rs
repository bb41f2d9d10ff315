use bigdecimal::BigDecimal;
use thiserror::Error;
use uuid::Uuid;

use super::order::OrderStatus;

/// Recoverable, caller-surfaceable errors of the transaction core.
///
/// Every variant except `Unavailable` is a validation outcome and carries
/// the entity or values involved so the HTTP boundary can produce a
/// specific message. `Unavailable` marks infrastructure failures (store
/// unreachable) and is the only kind the boundary retries.
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Order total mismatch: calculated {calculated}, received {received}")]
    InvalidOrderTotal {
        calculated: BigDecimal,
        received: BigDecimal,
    },

    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error("Invalid order status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
