//! Identity-mapped product repository.
//!
//! `TrackingRepository` is the collection view a unit of work hands to its
//! handlers. Every product it returns or is given is tracked for the rest of
//! the unit:
//!
//! - a second lookup of the same sku returns the same instance;
//! - each tracked product keeps a snapshot of its loaded state, so only
//!   products that actually changed are written back on commit;
//! - the write stamp storage held at load time is the optimistic token for
//!   that write.

use tracing::debug;

use allocation_core::{BatchReference, ExpectedVersion, RecordsEvents, Sku};
use allocation_domain::{AllocationEvent, Product};

use crate::product_store::{ProductChange, Session, StoreError, StoredProduct, WriteStamps};

/// Collection-like access to products inside one unit of work.
pub trait Repository {
    /// Track a new product. Replaces a tracked product with the same sku.
    fn add(&mut self, product: Product) -> &mut Product;

    fn get(&mut self, sku: &Sku) -> Result<Option<&mut Product>, StoreError>;

    /// Find the product owning the batch `reference`.
    fn get_by_batch_reference(
        &mut self,
        reference: &BatchReference,
    ) -> Result<Option<&mut Product>, StoreError>;

    /// Every product known to storage or tracked in this unit, by sku.
    fn list(&mut self) -> Result<Vec<&Product>, StoreError>;

    /// Stage removal of the product. Returns whether it existed.
    fn delete(&mut self, sku: &Sku) -> Result<bool, StoreError>;
}

#[derive(Debug)]
struct Tracked {
    product: Product,
    /// State and stamp as held by storage; `None` for products added in
    /// this unit.
    original: Option<StoredProduct>,
}

impl Tracked {
    fn loaded(stored: StoredProduct) -> Self {
        Self {
            product: stored.product.clone(),
            original: Some(stored),
        }
    }

    fn expected(&self) -> ExpectedVersion {
        ExpectedVersion::from_loaded(self.original.as_ref().map(|o| o.stamp))
    }

    fn change(&self) -> Option<ProductChange> {
        match &self.original {
            Some(original) if self.product.same_state_as(&original.product) => None,
            _ => Some(ProductChange::Upsert {
                product: self.product.clone(),
                expected: self.expected(),
            }),
        }
    }
}

/// `Repository` over a `Session`, with identity map and dirty tracking.
#[derive(Debug)]
pub struct TrackingRepository<S> {
    session: S,
    /// Tracked products in the order they were first seen.
    seen: Vec<Tracked>,
    deleted: Vec<Tracked>,
}

impl<S: Session> TrackingRepository<S> {
    pub fn new(session: S) -> Self {
        Self {
            session,
            seen: Vec::new(),
            deleted: Vec::new(),
        }
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    /// Tracked products, in seen order.
    pub fn seen(&self) -> impl Iterator<Item = &Product> {
        self.seen.iter().map(|t| &t.product)
    }

    /// Writes needed to bring storage in line with the tracked state.
    pub fn pending_changes(&self) -> Vec<ProductChange> {
        let mut changes: Vec<ProductChange> =
            self.seen.iter().filter_map(Tracked::change).collect();

        changes.extend(self.deleted.iter().filter_map(|t| {
            t.original.as_ref().map(|original| ProductChange::Delete {
                sku: original.product.sku().clone(),
                expected: t.expected(),
            })
        }));
        changes
    }

    /// Whether anything tracked differs from what was loaded, or still holds
    /// recorded events.
    pub fn has_outstanding_changes(&self) -> bool {
        !self.pending_changes().is_empty()
            || self.seen.iter().any(|t| !t.product.pending_events().is_empty())
    }

    /// Drain recorded events from every tracked product (seen order, FIFO per
    /// product).
    pub fn harvest_events(&mut self) -> Vec<AllocationEvent> {
        self.seen
            .iter_mut()
            .flat_map(|t| t.product.take_events())
            .collect()
    }

    /// Treat the current tracked state as stored. `stamps` are the stamps
    /// storage assigned to the products just written; products that were not
    /// written keep the stamp they were loaded with.
    pub fn mark_clean(&mut self, stamps: &WriteStamps) {
        for tracked in &mut self.seen {
            let stamp = stamps
                .get(tracked.product.sku())
                .copied()
                .or_else(|| tracked.original.as_ref().map(|o| o.stamp));
            let mut snapshot = tracked.product.clone();
            snapshot.take_events();
            tracked.original = stamp.map(|stamp| StoredProduct {
                product: snapshot,
                stamp,
            });
        }
        self.deleted.clear();
    }

    /// Forget every tracked product and its recorded events.
    pub fn discard(&mut self) {
        if !self.seen.is_empty() || !self.deleted.is_empty() {
            debug!(
                tracked = self.seen.len(),
                deleted = self.deleted.len(),
                "discarding tracked products"
            );
        }
        self.seen.clear();
        self.deleted.clear();
    }

    fn position(&self, sku: &Sku) -> Option<usize> {
        self.seen.iter().position(|t| t.product.sku() == sku)
    }

    fn is_deleted(&self, sku: &Sku) -> bool {
        self.deleted.iter().any(|t| t.product.sku() == sku)
    }

    fn track(&mut self, tracked: Tracked) -> &mut Product {
        let idx = self.seen.len();
        self.seen.push(tracked);
        &mut self.seen[idx].product
    }
}

impl<S: Session> Repository for TrackingRepository<S> {
    fn add(&mut self, product: Product) -> &mut Product {
        if let Some(idx) = self.position(product.sku()) {
            self.seen[idx].product = product;
            return &mut self.seen[idx].product;
        }

        // Re-adding a product deleted in this unit keeps its stored token.
        let original = self
            .deleted
            .iter()
            .position(|t| t.product.sku() == product.sku())
            .and_then(|idx| self.deleted.remove(idx).original);

        self.track(Tracked { product, original })
    }

    fn get(&mut self, sku: &Sku) -> Result<Option<&mut Product>, StoreError> {
        if let Some(idx) = self.position(sku) {
            return Ok(Some(&mut self.seen[idx].product));
        }
        if self.is_deleted(sku) {
            return Ok(None);
        }

        match self.session.load(sku)? {
            Some(stored) => Ok(Some(self.track(Tracked::loaded(stored)))),
            None => Ok(None),
        }
    }

    fn get_by_batch_reference(
        &mut self,
        reference: &BatchReference,
    ) -> Result<Option<&mut Product>, StoreError> {
        if let Some(idx) = self.seen.iter().position(|t| t.product.has_batch(reference)) {
            return Ok(Some(&mut self.seen[idx].product));
        }

        let Some(stored) = self.session.load_by_batch_reference(reference)? else {
            return Ok(None);
        };
        // The tracked instance wins over storage; it no longer owns the batch.
        let sku = stored.product.sku();
        if self.position(sku).is_some() || self.is_deleted(sku) {
            return Ok(None);
        }
        Ok(Some(self.track(Tracked::loaded(stored))))
    }

    fn list(&mut self) -> Result<Vec<&Product>, StoreError> {
        for stored in self.session.load_all()? {
            let sku = stored.product.sku();
            if self.position(sku).is_none() && !self.is_deleted(sku) {
                self.track(Tracked::loaded(stored));
            }
        }

        let mut products: Vec<&Product> = self.seen().collect();
        products.sort_by(|a, b| a.sku().cmp(b.sku()));
        Ok(products)
    }

    fn delete(&mut self, sku: &Sku) -> Result<bool, StoreError> {
        if self.get(sku)?.is_none() {
            return Ok(false);
        }
        if let Some(idx) = self.position(sku) {
            let tracked = self.seen.remove(idx);
            self.deleted.push(tracked);
        }
        Ok(true)
    }
}
