//! Event handlers and direct product operations.
//!
//! Every function here opens its own transaction on the shared `UnitOfWork`
//! and commits it before returning. Events recorded by the product are
//! harvested by that commit and picked up by the message bus afterwards.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use allocation_core::{BatchReference, DomainError, OrderId, Sku};
use allocation_domain::{
    AllocationRequired, Batch, BatchCreated, BatchQuantityChanged, OrderLine, OutOfStock, Product,
};

use crate::notifications::{NotificationError, Notifier};
use crate::product_store::{SessionFactory, StoreError};
use crate::repository::Repository;
use crate::unit_of_work::UnitOfWork;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Optimistic concurrency failure: another unit committed the product first.
    #[error("concurrency conflict: {0}")]
    Concurrency(String),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Notification(#[from] NotificationError),

    /// An event was routed to a handler for a different event type.
    #[error("handler cannot process event {0}")]
    Misrouted(&'static str),
}

impl HandlerError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, HandlerError::Concurrency(_))
    }
}

impl From<StoreError> for HandlerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Concurrency(msg) => HandlerError::Concurrency(msg),
            other => HandlerError::Store(other),
        }
    }
}

/// Caller-facing view of one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchView {
    pub reference: String,
    pub sku: String,
    pub qty: u32,
    /// ISO-8601 date, `None` for stock already in the warehouse.
    pub eta: Option<String>,
}

impl From<&Batch> for BatchView {
    fn from(batch: &Batch) -> Self {
        Self {
            reference: batch.reference().to_string(),
            sku: batch.sku().to_string(),
            qty: batch.purchased_quantity(),
            eta: batch.eta().map(|d| d.format("%Y-%m-%d").to_string()),
        }
    }
}

/// Add a batch, creating its product on first sight of the sku.
pub fn add_batch<F: SessionFactory>(
    event: &BatchCreated,
    uow: &mut UnitOfWork<F>,
) -> Result<(), HandlerError> {
    let batch = Batch::new(event.reference.clone(), event.sku.clone(), event.qty, event.eta);

    let mut tx = uow.begin()?;
    let products = tx.products();
    match products.get(&event.sku)? {
        Some(product) => product.add_batch(batch)?,
        None => products
            .add(Product::new(event.sku.clone()))
            .add_batch(batch)?,
    }
    tx.commit()?;

    debug!(sku = %event.sku, batch = %event.reference, qty = event.qty, "batch added");
    Ok(())
}

/// Allocate an order line. `None` means out of stock; the product recorded an
/// `OutOfStock` event, which this commit harvests.
pub fn allocate<F: SessionFactory>(
    event: &AllocationRequired,
    uow: &mut UnitOfWork<F>,
) -> Result<Option<BatchReference>, HandlerError> {
    let line = OrderLine::new(event.order_id.clone(), event.sku.clone(), event.qty)?;

    let mut tx = uow.begin()?;
    let product = tx
        .products()
        .get(line.sku())?
        .ok_or_else(|| DomainError::invalid_sku(line.sku()))?;
    let allocated = product.allocate(&line).map(|b| b.reference().clone());
    tx.commit()?;

    match &allocated {
        Some(reference) => info!(
            order_id = %line.order_id(),
            sku = %line.sku(),
            qty = line.qty(),
            batch = %reference,
            "order line allocated"
        ),
        None => info!(
            order_id = %line.order_id(),
            sku = %line.sku(),
            qty = line.qty(),
            "order line not allocated: out of stock"
        ),
    }
    Ok(allocated)
}

/// Change a batch's purchased quantity. The owning product is found by batch
/// reference; evicted lines come back as `AllocationRequired` events.
pub fn change_batch_quantity<F: SessionFactory>(
    event: &BatchQuantityChanged,
    uow: &mut UnitOfWork<F>,
) -> Result<(), HandlerError> {
    let mut tx = uow.begin()?;
    let product = tx
        .products()
        .get_by_batch_reference(&event.reference)?
        .ok_or_else(|| DomainError::invalid_batch_reference(&event.reference))?;
    product.change_batch_quantity(&event.reference, event.qty)?;
    tx.commit()?;

    debug!(batch = %event.reference, qty = event.qty, "batch quantity changed");
    Ok(())
}

pub fn send_out_of_stock_notification(
    event: &OutOfStock,
    notifier: &dyn Notifier,
) -> Result<(), HandlerError> {
    notifier.send_out_of_stock_notification(&event.sku)?;
    Ok(())
}

/// Release an order line from whichever batch holds it.
pub fn deallocate<F: SessionFactory>(
    uow: &mut UnitOfWork<F>,
    sku: &Sku,
    order_id: &OrderId,
    qty: u32,
) -> Result<BatchReference, HandlerError> {
    let line = OrderLine::new(order_id.clone(), sku.clone(), qty)?;

    let mut tx = uow.begin()?;
    let product = tx
        .products()
        .get(sku)?
        .ok_or_else(|| DomainError::invalid_sku(sku))?;
    let reference = product.deallocate(&line)?;
    tx.commit()?;

    info!(order_id = %order_id, sku = %sku, batch = %reference, "order line deallocated");
    Ok(reference)
}

/// Remove a batch that holds no allocations.
pub fn delete_batch<F: SessionFactory>(
    uow: &mut UnitOfWork<F>,
    sku: &Sku,
    reference: &BatchReference,
) -> Result<(), HandlerError> {
    let mut tx = uow.begin()?;
    let product = tx
        .products()
        .get(sku)?
        .ok_or_else(|| DomainError::invalid_sku(sku))?;
    product.delete_batch(reference)?;
    tx.commit()?;

    debug!(sku = %sku, batch = %reference, "batch deleted");
    Ok(())
}

/// Read-only: nothing is committed.
pub fn get_batch<F: SessionFactory>(
    uow: &mut UnitOfWork<F>,
    sku: &Sku,
    reference: &BatchReference,
) -> Result<BatchView, HandlerError> {
    let mut tx = uow.begin()?;
    let product = tx
        .products()
        .get(sku)?
        .ok_or_else(|| DomainError::invalid_sku(sku))?;
    let view = BatchView::from(product.get_batch(reference)?);
    Ok(view)
}
