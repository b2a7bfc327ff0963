use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Product {0} is unavailable")]
    ProductNotFound(Uuid),
    #[error("Product {0} is not in the cart")]
    ItemNotFound(Uuid),
    #[error("Cannot place an order from an empty cart")]
    EmptyCart,
    #[error("Order could not be saved: {0}")]
    OrderPersistenceFailed(String),
    #[error("Order {0} not found")]
    OrderNotFound(Uuid),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Errors raised while an order transaction is open are all reported as
    /// persistence failures, whatever layer produced them.
    pub fn into_persistence_failure(self) -> Self {
        match self {
            DomainError::OrderPersistenceFailed(_) => self,
            other => DomainError::OrderPersistenceFailed(other.to_string()),
        }
    }
}
