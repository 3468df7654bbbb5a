//! Transaction-scoped handle over a `ProductStore`.
//!
//! A session is opened per unit of work. It forwards loads to the store and
//! submits the unit's staged changes as one atomic `apply` on commit. After
//! `close()` every operation fails with `StoreError::SessionClosed`.

use std::sync::Arc;

use tracing::debug;

use allocation_core::{BatchReference, Sku};
use super::r#trait::{ProductChange, ProductStore, StoreError, StoredProduct, WriteStamps};

/// Transaction handle used by one unit of work.
pub trait Session {
    fn load(&mut self, sku: &Sku) -> Result<Option<StoredProduct>, StoreError>;

    fn load_by_batch_reference(
        &mut self,
        reference: &BatchReference,
    ) -> Result<Option<StoredProduct>, StoreError>;

    fn load_all(&mut self) -> Result<Vec<StoredProduct>, StoreError>;

    /// Submit staged changes and return the new write stamps. Fails with
    /// `StoreError::Concurrency` when any optimistic token is stale; nothing
    /// is written in that case.
    fn commit(&mut self, changes: Vec<ProductChange>) -> Result<WriteStamps, StoreError>;

    /// Discard anything not yet committed.
    fn rollback(&mut self);

    /// Release the session. Idempotent.
    fn close(&mut self);

    fn is_open(&self) -> bool;
}

/// Opens fresh sessions, one per unit of work.
pub trait SessionFactory {
    type Session: Session;

    fn open_session(&self) -> Result<Self::Session, StoreError>;
}

/// `Session` over any `ProductStore`.
///
/// Loads are detached copies and writes are only sent on `commit`, so
/// `rollback` has nothing to undo in the store.
#[derive(Debug)]
pub struct StoreSession<S> {
    store: S,
    open: bool,
}

impl<S: ProductStore> StoreSession<S> {
    pub fn new(store: S) -> Self {
        Self { store, open: true }
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.open {
            Ok(())
        } else {
            Err(StoreError::SessionClosed)
        }
    }
}

impl<S: ProductStore> Session for StoreSession<S> {
    fn load(&mut self, sku: &Sku) -> Result<Option<StoredProduct>, StoreError> {
        self.ensure_open()?;
        self.store.load(sku)
    }

    fn load_by_batch_reference(
        &mut self,
        reference: &BatchReference,
    ) -> Result<Option<StoredProduct>, StoreError> {
        self.ensure_open()?;
        self.store.load_by_batch_reference(reference)
    }

    fn load_all(&mut self) -> Result<Vec<StoredProduct>, StoreError> {
        self.ensure_open()?;
        self.store.load_all()
    }

    fn commit(&mut self, changes: Vec<ProductChange>) -> Result<WriteStamps, StoreError> {
        self.ensure_open()?;
        debug!(changes = changes.len(), "committing session");
        self.store.apply(changes)
    }

    fn rollback(&mut self) {}

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

impl<S> SessionFactory for Arc<S>
where
    S: ProductStore + ?Sized,
{
    type Session = StoreSession<Arc<S>>;

    fn open_session(&self) -> Result<Self::Session, StoreError> {
        Ok(StoreSession::new(Arc::clone(self)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product_store::InMemoryProductStore;
    use allocation_domain::Product;

    #[test]
    fn closed_session_rejects_every_operation() {
        let store = Arc::new(InMemoryProductStore::new());
        let mut session = store.open_session().unwrap();
        assert!(session.is_open());
        assert!(session.load(&"LAMP".parse().unwrap()).unwrap().is_none());

        session.close();
        session.close();
        assert!(!session.is_open());
        assert!(matches!(
            session.load(&"LAMP".parse().unwrap()),
            Err(StoreError::SessionClosed)
        ));
        assert!(matches!(session.commit(Vec::new()), Err(StoreError::SessionClosed)));
    }

    #[test]
    fn sessions_from_one_factory_share_the_store() {
        let store = Arc::new(InMemoryProductStore::new());
        let mut writer = store.open_session().unwrap();
        let stamps = writer
            .commit(vec![ProductChange::Upsert {
                product: Product::new("LAMP".parse().unwrap()),
                expected: allocation_core::ExpectedVersion::Absent,
            }])
            .unwrap();

        let mut reader = store.open_session().unwrap();
        let stored = reader.load(&"LAMP".parse().unwrap()).unwrap().unwrap();
        assert_eq!(stamps.get(stored.product.sku()), Some(&stored.stamp));
    }
}
