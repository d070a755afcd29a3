use thiserror::Error;

use crate::ports::RepositoryError;

/// Failures surfaced by the cart and order workflows.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("cart is empty")]
    EmptyCart,

    #[error("product {0} is not available")]
    ProductUnavailable(String),

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("quantity must be greater than 0, got {0}")]
    InvalidQuantity(i32),

    #[error("storage error: {0}")]
    Storage(RepositoryError),
}

impl From<RepositoryError> for DomainError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => DomainError::NotFound(what),
            other => DomainError::Storage(other),
        }
    }
}
