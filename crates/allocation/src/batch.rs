use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::NaiveDate;

use allocation_core::{BatchReference, Entity, OrderId, Sku};

use crate::order_line::OrderLine;

/// A receipt of stock for one SKU.
///
/// A batch without an `eta` is already in the warehouse; a batch with an
/// `eta` is still shipping.
#[derive(Debug, Clone)]
pub struct Batch {
    reference: BatchReference,
    sku: Sku,
    purchased_quantity: u32,
    eta: Option<NaiveDate>,
    allocations: HashSet<OrderLine>,
}

impl Batch {
    pub fn new(reference: BatchReference, sku: Sku, qty: u32, eta: Option<NaiveDate>) -> Self {
        Self {
            reference,
            sku,
            purchased_quantity: qty,
            eta,
            allocations: HashSet::new(),
        }
    }

    pub fn reference(&self) -> &BatchReference {
        &self.reference
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn eta(&self) -> Option<NaiveDate> {
        self.eta
    }

    pub fn purchased_quantity(&self) -> u32 {
        self.purchased_quantity
    }

    pub fn allocated_quantity(&self) -> u64 {
        self.allocations.iter().map(|l| u64::from(l.qty())).sum()
    }

    /// Purchased minus allocated; negative only transiently while a quantity
    /// change is evicting lines.
    pub fn available_quantity(&self) -> i64 {
        i64::from(self.purchased_quantity) - self.allocated_quantity() as i64
    }

    pub fn can_allocate(&self, line: &OrderLine) -> bool {
        self.sku == *line.sku() && self.available_quantity() >= i64::from(line.qty())
    }

    /// Allocate `line` if it fits. Allocating the same line twice is a no-op.
    pub fn allocate(&mut self, line: OrderLine) {
        if self.can_allocate(&line) {
            self.allocations.insert(line);
        }
    }

    /// Remove `line` if it is allocated here; no-op otherwise.
    pub fn deallocate(&mut self, line: &OrderLine) {
        self.allocations.remove(line);
    }

    /// Remove and return an arbitrary allocated line.
    ///
    /// Which line is evicted is unspecified.
    pub fn deallocate_one(&mut self) -> Option<OrderLine> {
        let line = self.allocations.iter().next()?.clone();
        self.allocations.take(&line)
    }

    pub fn allocated_line(&self, order_id: &OrderId) -> Option<&OrderLine> {
        self.allocations.iter().find(|l| l.order_id() == order_id)
    }

    pub fn is_allocated(&self, line: &OrderLine) -> bool {
        self.allocations.contains(line)
    }

    pub fn has_allocations(&self) -> bool {
        !self.allocations.is_empty()
    }

    pub fn allocations(&self) -> impl Iterator<Item = &OrderLine> {
        self.allocations.iter()
    }

    /// Allocation preference: in-stock batches (no eta) first, then earliest eta.
    pub fn allocation_order(&self, other: &Batch) -> Ordering {
        match (self.eta, other.eta) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a.cmp(&b),
        }
    }

    /// Deep comparison of mutable state, including allocated quantities.
    pub fn same_state_as(&self, other: &Batch) -> bool {
        self.reference == other.reference
            && self.sku == other.sku
            && self.purchased_quantity == other.purchased_quantity
            && self.eta == other.eta
            && self.allocations.len() == other.allocations.len()
            && self.allocations.iter().all(|line| {
                other
                    .allocations
                    .get(line)
                    .is_some_and(|theirs| theirs.qty() == line.qty())
            })
    }

    pub(crate) fn set_purchased_quantity(&mut self, qty: u32) {
        self.purchased_quantity = qty;
    }
}

impl PartialEq for Batch {
    fn eq(&self, other: &Self) -> bool {
        self.same_identity_as(other)
    }
}

impl Eq for Batch {}

impl core::hash::Hash for Batch {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.reference.hash(state);
    }
}

impl Entity for Batch {
    type Id = BatchReference;

    fn id(&self) -> &Self::Id {
        &self.reference
    }
}
