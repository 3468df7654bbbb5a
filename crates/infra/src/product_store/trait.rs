use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use allocation_core::{BatchReference, ExpectedVersion, Sku};
use allocation_domain::Product;

/// A product as held by storage, with the stamp of its last write.
///
/// The stamp is separate from `Product::version_number`: every write bumps
/// it, including writes that leave the domain version alone (deallocation,
/// quantity changes, batch removal).
#[derive(Debug, Clone)]
pub struct StoredProduct {
    pub product: Product,
    pub stamp: u64,
}

/// Stamps assigned by a successful `apply`, per upserted sku.
pub type WriteStamps = BTreeMap<Sku, u64>;

/// A write staged by a unit of work, applied by `ProductStore::apply`.
///
/// Each change carries the stamp the product had when it was loaded; the
/// store rejects the whole commit if any stored stamp moved since.
#[derive(Debug, Clone)]
pub enum ProductChange {
    Upsert {
        product: Product,
        expected: ExpectedVersion,
    },
    Delete {
        sku: Sku,
        expected: ExpectedVersion,
    },
}

impl ProductChange {
    pub fn sku(&self) -> &Sku {
        match self {
            ProductChange::Upsert { product, .. } => product.sku(),
            ProductChange::Delete { sku, .. } => sku,
        }
    }

    pub fn expected(&self) -> ExpectedVersion {
        match self {
            ProductChange::Upsert { expected, .. } | ProductChange::Delete { expected, .. } => {
                *expected
            }
        }
    }
}

/// Product storage operation error.
///
/// These are **infrastructure errors** as opposed to domain errors. A stale
/// optimistic token is reported as `Concurrency` so callers can tell it apart
/// from every other storage failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("session is closed")]
    SessionClosed,
}

/// Storage collaborator for `Product` aggregates.
///
/// Loads hand out detached copies; nothing changes in storage until `apply`.
///
/// `apply()`:
/// - checks every change's `ExpectedVersion` against the stored write stamp
/// - writes all changes or none of them, bumping the stamp of each upsert
/// - is atomic with respect to concurrent `apply` calls
pub trait ProductStore: Send + Sync {
    fn load(&self, sku: &Sku) -> Result<Option<StoredProduct>, StoreError>;

    /// Load the product owning the batch `reference`.
    fn load_by_batch_reference(
        &self,
        reference: &BatchReference,
    ) -> Result<Option<StoredProduct>, StoreError>;

    fn load_all(&self) -> Result<Vec<StoredProduct>, StoreError>;

    fn apply(&self, changes: Vec<ProductChange>) -> Result<WriteStamps, StoreError>;
}

impl<S> ProductStore for Arc<S>
where
    S: ProductStore + ?Sized,
{
    fn load(&self, sku: &Sku) -> Result<Option<StoredProduct>, StoreError> {
        (**self).load(sku)
    }

    fn load_by_batch_reference(
        &self,
        reference: &BatchReference,
    ) -> Result<Option<StoredProduct>, StoreError> {
        (**self).load_by_batch_reference(reference)
    }

    fn load_all(&self) -> Result<Vec<StoredProduct>, StoreError> {
        (**self).load_all()
    }

    fn apply(&self, changes: Vec<ProductChange>) -> Result<WriteStamps, StoreError> {
        (**self).apply(changes)
    }
}
