use thiserror::Error;

use crate::domain::order::OrderStatus;

/// Invariant violations raised by the domain types themselves.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("insufficient stock for {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: String,
        requested: u32,
        available: u32,
    },

    #[error("order cannot move from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}

impl DomainError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }
}
