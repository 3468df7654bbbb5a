use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard};

use allocation_core::{BatchReference, RecordsEvents, Sku};

use super::r#trait::{ProductChange, ProductStore, StoreError, StoredProduct, WriteStamps};

/// In-memory product store.
///
/// Intended for tests/dev. Products are stored by value; every load returns
/// a copy, so callers never share mutable state through the store.
#[derive(Debug, Default)]
pub struct InMemoryProductStore {
    products: RwLock<BTreeMap<Sku, StoredProduct>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<Sku, StoredProduct>>, StoreError> {
        self.products
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }
}

impl ProductStore for InMemoryProductStore {
    fn load(&self, sku: &Sku) -> Result<Option<StoredProduct>, StoreError> {
        Ok(self.read()?.get(sku).cloned())
    }

    fn load_by_batch_reference(
        &self,
        reference: &BatchReference,
    ) -> Result<Option<StoredProduct>, StoreError> {
        Ok(self
            .read()?
            .values()
            .find(|stored| stored.product.has_batch(reference))
            .cloned())
    }

    fn load_all(&self) -> Result<Vec<StoredProduct>, StoreError> {
        Ok(self.read()?.values().cloned().collect())
    }

    fn apply(&self, changes: Vec<ProductChange>) -> Result<WriteStamps, StoreError> {
        let mut stamps = WriteStamps::new();
        if changes.is_empty() {
            return Ok(stamps);
        }

        let mut products = self
            .products
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        // Check every token before touching anything (all or nothing).
        for change in &changes {
            let current = products.get(change.sku()).map(|stored| stored.stamp);
            if !change.expected().matches(current) {
                return Err(StoreError::Concurrency(format!(
                    "product {}: expected {:?}, found stamp {:?}",
                    change.sku(),
                    change.expected(),
                    current
                )));
            }
        }

        for change in changes {
            match change {
                ProductChange::Upsert { mut product, .. } => {
                    // Recorded events belong to the unit of work, not to storage.
                    product.take_events();
                    let sku = product.sku().clone();
                    let stamp = products.get(&sku).map_or(1, |stored| stored.stamp + 1);
                    products.insert(sku.clone(), StoredProduct { product, stamp });
                    stamps.insert(sku, stamp);
                }
                ProductChange::Delete { sku, .. } => {
                    products.remove(&sku);
                }
            }
        }

        Ok(stamps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use allocation_core::{AggregateRoot, ExpectedVersion};
    use allocation_domain::{Batch, OrderLine, Product};

    fn sku(s: &str) -> Sku {
        s.parse().unwrap()
    }

    fn product_with_batch(sku_: &str, reference: &str, qty: u32) -> Product {
        Product::restore(
            sku(sku_),
            vec![Batch::new(reference.parse().unwrap(), sku(sku_), qty, None)],
            0,
        )
        .unwrap()
    }

    fn insert(store: &InMemoryProductStore, product: Product) {
        store
            .apply(vec![ProductChange::Upsert {
                product,
                expected: ExpectedVersion::Absent,
            }])
            .unwrap();
    }

    fn upsert(product: Product, stamp: u64) -> ProductChange {
        ProductChange::Upsert {
            product,
            expected: ExpectedVersion::Exact(stamp),
        }
    }

    fn line(order_id: &str, qty: u32) -> OrderLine {
        OrderLine::new(order_id.parse().unwrap(), sku("LAMP"), qty).unwrap()
    }

    #[test]
    fn loads_by_sku_and_batch_reference() {
        let store = InMemoryProductStore::new();
        insert(&store, product_with_batch("LAMP", "b1", 10));
        insert(&store, product_with_batch("TABLE", "b2", 10));

        let lamp = store.load(&sku("LAMP")).unwrap().unwrap();
        assert_eq!(lamp.product.sku(), &sku("LAMP"));
        assert_eq!(lamp.stamp, 1);
        let owner = store
            .load_by_batch_reference(&"b2".parse().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(owner.product.sku(), &sku("TABLE"));
        assert!(store.load(&sku("CHAIR")).unwrap().is_none());
        assert_eq!(store.load_all().unwrap().len(), 2);
    }

    #[test]
    fn stale_stamp_is_rejected_and_nothing_is_written() {
        let store = InMemoryProductStore::new();
        insert(&store, product_with_batch("LAMP", "b1", 10));

        let mut winner = store.load(&sku("LAMP")).unwrap().unwrap();
        let mut loser = store.load(&sku("LAMP")).unwrap().unwrap();
        winner.product.allocate(&line("o1", 1));
        loser.product.allocate(&line("o2", 1));

        let stamps = store.apply(vec![upsert(winner.product, winner.stamp)]).unwrap();
        assert_eq!(stamps.get(&sku("LAMP")), Some(&2));

        let err = store
            .apply(vec![
                ProductChange::Upsert {
                    product: product_with_batch("TABLE", "b9", 1),
                    expected: ExpectedVersion::Absent,
                },
                upsert(loser.product, loser.stamp),
            ])
            .unwrap_err();

        assert!(matches!(err, StoreError::Concurrency(_)));
        assert!(store.load(&sku("TABLE")).unwrap().is_none());
        let stored = store.load(&sku("LAMP")).unwrap().unwrap();
        assert_eq!(stored.product.version(), 1);
        assert_eq!(stored.stamp, 2);
    }

    #[test]
    fn writes_that_keep_the_domain_version_still_move_the_stamp() {
        let store = InMemoryProductStore::new();
        let mut seeded = product_with_batch("LAMP", "b1", 10);
        seeded.allocate(&line("o1", 2));
        insert(&store, seeded);

        let mut releaser = store.load(&sku("LAMP")).unwrap().unwrap();
        let mut allocator = store.load(&sku("LAMP")).unwrap().unwrap();

        releaser.product.deallocate(&line("o1", 2)).unwrap();
        assert_eq!(releaser.product.version(), 1);
        store.apply(vec![upsert(releaser.product, releaser.stamp)]).unwrap();

        allocator.product.allocate(&line("o2", 3));
        let err = store
            .apply(vec![upsert(allocator.product, allocator.stamp)])
            .unwrap_err();
        assert!(matches!(err, StoreError::Concurrency(_)));

        let stored = store.load(&sku("LAMP")).unwrap().unwrap();
        let b1 = stored.product.get_batch(&"b1".parse().unwrap()).unwrap();
        assert_eq!(b1.allocations().count(), 0);
        assert_eq!(stored.stamp, 2);
    }

    #[test]
    fn stored_products_carry_no_events() {
        let store = InMemoryProductStore::new();
        let mut p = product_with_batch("LAMP", "b1", 1);
        p.allocate(&line("o1", 5));
        assert_eq!(p.pending_events().len(), 1);

        insert(&store, p);
        let stored = store.load(&sku("LAMP")).unwrap().unwrap();
        assert!(stored.product.pending_events().is_empty());
    }

    #[test]
    fn delete_removes_the_product() {
        let store = InMemoryProductStore::new();
        insert(&store, product_with_batch("LAMP", "b1", 1));

        let stale = store
            .apply(vec![ProductChange::Delete {
                sku: sku("LAMP"),
                expected: ExpectedVersion::Exact(0),
            }])
            .unwrap_err();
        assert!(matches!(stale, StoreError::Concurrency(_)));

        let stamps = store
            .apply(vec![ProductChange::Delete {
                sku: sku("LAMP"),
                expected: ExpectedVersion::Exact(1),
            }])
            .unwrap();
        assert!(stamps.is_empty());
        assert!(store.load_all().unwrap().is_empty());
    }
}
