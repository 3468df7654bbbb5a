//! Domain error model.

use thiserror::Error;

use crate::id::{BatchReference, OrderId, Sku};

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, unknown references). Storage concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. a zero quantity).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. blank).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// No product exists for the SKU.
    #[error("Invalid sku {0}")]
    InvalidSku(Sku),

    /// The product has no batch with this reference.
    #[error("Invalid batch reference {0}")]
    InvalidBatchReference(BatchReference),

    /// Deallocation requested for a line that no batch of the product holds.
    #[error("Order line {order_id} is not allocated to any batch in Product {sku}")]
    UnallocatedLine { order_id: OrderId, sku: Sku },

    /// A batch cannot be removed while order lines are allocated to it.
    #[error("batch {0} still has allocated order lines")]
    BatchStillAllocated(BatchReference),

    /// A conflicting state was detected (duplicate reference, stale version).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_sku(sku: &Sku) -> Self {
        Self::InvalidSku(sku.clone())
    }

    pub fn invalid_batch_reference(reference: &BatchReference) -> Self {
        Self::InvalidBatchReference(reference.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_identifiers() {
        let sku: Sku = "NONEXISTENTSKU".parse().unwrap();
        assert_eq!(
            DomainError::invalid_sku(&sku).to_string(),
            "Invalid sku NONEXISTENTSKU"
        );

        let err = DomainError::UnallocatedLine {
            order_id: "o30".parse().unwrap(),
            sku: "FANCY-TABLE".parse().unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "Order line o30 is not allocated to any batch in Product FANCY-TABLE"
        );

        let reference: BatchReference = "b1".parse().unwrap();
        assert_eq!(
            DomainError::invalid_batch_reference(&reference).to_string(),
            "Invalid batch reference b1"
        );
    }
}
