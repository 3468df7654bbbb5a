use allocation_core::{
    AggregateRoot, BatchReference, DomainError, DomainResult, RecordsEvents, Sku,
};

use crate::batch::Batch;
use crate::events::{AllocationEvent, AllocationRequired, OutOfStock};
use crate::order_line::OrderLine;

/// Aggregate root: Product.
///
/// Owns every batch of one SKU. `version` is bumped once per successful
/// allocation and serves as the optimistic concurrency token at the storage
/// boundary. Mutations record events in `events` until a unit of work drains
/// them.
#[derive(Debug, Clone)]
pub struct Product {
    sku: Sku,
    batches: Vec<Batch>,
    version: u64,
    events: Vec<AllocationEvent>,
}

impl Product {
    pub fn new(sku: Sku) -> Self {
        Self {
            sku,
            batches: Vec::new(),
            version: 0,
            events: Vec::new(),
        }
    }

    /// Rebuild a product from stored state.
    pub fn restore(sku: Sku, batches: Vec<Batch>, version: u64) -> DomainResult<Self> {
        let mut product = Self::new(sku);
        for batch in batches {
            product.add_batch(batch)?;
        }
        product.version = version;
        Ok(product)
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn version_number(&self) -> u64 {
        self.version
    }

    pub fn has_batch(&self, reference: &BatchReference) -> bool {
        self.batches.iter().any(|b| b.reference() == reference)
    }

    pub fn add_batch(&mut self, batch: Batch) -> DomainResult<()> {
        if batch.sku() != &self.sku {
            return Err(DomainError::invariant(format!(
                "batch {} has sku {}, product is {}",
                batch.reference(),
                batch.sku(),
                self.sku
            )));
        }
        if self.has_batch(batch.reference()) {
            return Err(DomainError::conflict(format!(
                "batch {} already exists for product {}",
                batch.reference(),
                self.sku
            )));
        }
        self.batches.push(batch);
        Ok(())
    }

    /// Allocate `line` to the preferred batch that can take it.
    ///
    /// Batches are tried in allocation order (in-stock first, then earliest
    /// eta). When none fits, an `OutOfStock` event is recorded and `None` is
    /// returned.
    pub fn allocate(&mut self, line: &OrderLine) -> Option<&Batch> {
        let mut order: Vec<usize> = (0..self.batches.len()).collect();
        order.sort_by(|&a, &b| self.batches[a].allocation_order(&self.batches[b]));

        let chosen = order
            .into_iter()
            .find(|&idx| self.batches[idx].can_allocate(line));

        match chosen {
            Some(idx) => {
                self.batches[idx].allocate(line.clone());
                self.version += 1;
                Some(&self.batches[idx])
            }
            None => {
                self.events.push(
                    OutOfStock {
                        sku: line.sku().clone(),
                    }
                    .into(),
                );
                None
            }
        }
    }

    /// Deallocate `line` from the first batch holding a line of the same order.
    pub fn deallocate(&mut self, line: &OrderLine) -> DomainResult<BatchReference> {
        let batch = self
            .batches
            .iter_mut()
            .find(|b| b.allocated_line(line.order_id()).is_some())
            .ok_or_else(|| DomainError::UnallocatedLine {
                order_id: line.order_id().clone(),
                sku: self.sku.clone(),
            })?;

        batch.deallocate(line);
        Ok(batch.reference().clone())
    }

    pub fn get_batch(&self, reference: &BatchReference) -> DomainResult<&Batch> {
        self.batches
            .iter()
            .find(|b| b.reference() == reference)
            .ok_or_else(|| DomainError::invalid_batch_reference(reference))
    }

    /// Change a batch's purchased quantity.
    ///
    /// Lines that no longer fit are evicted one at a time; each eviction
    /// records an `AllocationRequired` so the line can be reallocated.
    pub fn change_batch_quantity(&mut self, reference: &BatchReference, qty: u32) -> DomainResult<()> {
        let batch = self
            .batches
            .iter_mut()
            .find(|b| b.reference() == reference)
            .ok_or_else(|| DomainError::invalid_batch_reference(reference))?;

        batch.set_purchased_quantity(qty);
        while batch.available_quantity() < 0 {
            let Some(line) = batch.deallocate_one() else {
                break;
            };
            self.events.push(
                AllocationRequired {
                    order_id: line.order_id().clone(),
                    sku: line.sku().clone(),
                    qty: line.qty(),
                }
                .into(),
            );
        }
        Ok(())
    }

    /// Remove a batch that holds no allocations.
    pub fn delete_batch(&mut self, reference: &BatchReference) -> DomainResult<Batch> {
        let idx = self
            .batches
            .iter()
            .position(|b| b.reference() == reference)
            .ok_or_else(|| DomainError::invalid_batch_reference(reference))?;

        if self.batches[idx].has_allocations() {
            return Err(DomainError::BatchStillAllocated(reference.clone()));
        }
        Ok(self.batches.remove(idx))
    }

    /// Deep state comparison (batches, allocations, version); recorded events
    /// are ignored.
    pub fn same_state_as(&self, other: &Product) -> bool {
        self.sku == other.sku
            && self.version == other.version
            && self.batches.len() == other.batches.len()
            && self
                .batches
                .iter()
                .zip(&other.batches)
                .all(|(a, b)| a.same_state_as(b))
    }
}

impl AggregateRoot for Product {
    type Id = Sku;

    fn id(&self) -> &Self::Id {
        &self.sku
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl RecordsEvents for Product {
    type Event = AllocationEvent;

    fn pending_events(&self) -> &[AllocationEvent] {
        &self.events
    }

    fn take_events(&mut self) -> Vec<AllocationEvent> {
        std::mem::take(&mut self.events)
    }
}
