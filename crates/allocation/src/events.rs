use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use allocation_core::{BatchReference, OrderId, Sku};
use allocation_events::Event;

/// Event: BatchCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCreated {
    pub reference: BatchReference,
    pub sku: Sku,
    pub qty: u32,
    pub eta: Option<NaiveDate>,
}

/// Event: AllocationRequired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRequired {
    pub order_id: OrderId,
    pub sku: Sku,
    pub qty: u32,
}

/// Event: BatchQuantityChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchQuantityChanged {
    pub reference: BatchReference,
    pub qty: u32,
}

/// Event: OutOfStock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutOfStock {
    pub sku: Sku,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum AllocationEvent {
    BatchCreated(BatchCreated),
    AllocationRequired(AllocationRequired),
    BatchQuantityChanged(BatchQuantityChanged),
    OutOfStock(OutOfStock),
}

/// Discriminant of `AllocationEvent`, used to route events to handlers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AllocationEventKind {
    BatchCreated,
    AllocationRequired,
    BatchQuantityChanged,
    OutOfStock,
}

impl Event for AllocationEvent {
    type Kind = AllocationEventKind;

    fn kind(&self) -> AllocationEventKind {
        match self {
            AllocationEvent::BatchCreated(_) => AllocationEventKind::BatchCreated,
            AllocationEvent::AllocationRequired(_) => AllocationEventKind::AllocationRequired,
            AllocationEvent::BatchQuantityChanged(_) => AllocationEventKind::BatchQuantityChanged,
            AllocationEvent::OutOfStock(_) => AllocationEventKind::OutOfStock,
        }
    }

    fn event_type(&self) -> &'static str {
        match self {
            AllocationEvent::BatchCreated(_) => "allocation.batch.created",
            AllocationEvent::AllocationRequired(_) => "allocation.line.allocation_required",
            AllocationEvent::BatchQuantityChanged(_) => "allocation.batch.quantity_changed",
            AllocationEvent::OutOfStock(_) => "allocation.product.out_of_stock",
        }
    }
}

impl From<BatchCreated> for AllocationEvent {
    fn from(value: BatchCreated) -> Self {
        AllocationEvent::BatchCreated(value)
    }
}

impl From<AllocationRequired> for AllocationEvent {
    fn from(value: AllocationRequired) -> Self {
        AllocationEvent::AllocationRequired(value)
    }
}

impl From<BatchQuantityChanged> for AllocationEvent {
    fn from(value: BatchQuantityChanged) -> Self {
        AllocationEvent::BatchQuantityChanged(value)
    }
}

impl From<OutOfStock> for AllocationEvent {
    fn from(value: OutOfStock) -> Self {
        AllocationEvent::OutOfStock(value)
    }
}
