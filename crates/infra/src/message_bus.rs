//! Wiring of allocation events to their handlers.
//!
//! | event                  | handler                          |
//! |------------------------|----------------------------------|
//! | `BatchCreated`         | `handlers::add_batch`            |
//! | `AllocationRequired`   | `handlers::allocate`             |
//! | `BatchQuantityChanged` | `handlers::change_batch_quantity`|
//! | `OutOfStock`           | `handlers::send_out_of_stock_notification` |
//!
//! Only `allocate` produces a value; every other handler reports `None`.

use std::sync::Arc;

use allocation_core::BatchReference;
use allocation_domain::{AllocationEvent, AllocationEventKind};
use allocation_events::{Event, HandlerRegistry, MessageBus};

use crate::handlers::{self, HandlerError};
use crate::notifications::Notifier;
use crate::product_store::SessionFactory;
use crate::unit_of_work::UnitOfWork;

pub type AllocationBus<F> =
    MessageBus<AllocationEvent, UnitOfWork<F>, Option<BatchReference>, HandlerError>;

pub type AllocationHandlers<F> =
    HandlerRegistry<AllocationEvent, UnitOfWork<F>, Option<BatchReference>, HandlerError>;

/// Registration table for every allocation event kind.
pub fn allocation_handlers<F>(notifier: Arc<dyn Notifier>) -> AllocationHandlers<F>
where
    F: SessionFactory + 'static,
{
    AllocationHandlers::<F>::new()
        .with(
            AllocationEventKind::BatchCreated,
            "add_batch",
            |event: &AllocationEvent, uow: &mut UnitOfWork<F>| match event {
                AllocationEvent::BatchCreated(ev) => handlers::add_batch(ev, uow).map(|()| None),
                other => Err(HandlerError::Misrouted(other.event_type())),
            },
        )
        .with(
            AllocationEventKind::AllocationRequired,
            "allocate",
            |event: &AllocationEvent, uow: &mut UnitOfWork<F>| match event {
                AllocationEvent::AllocationRequired(ev) => handlers::allocate(ev, uow),
                other => Err(HandlerError::Misrouted(other.event_type())),
            },
        )
        .with(
            AllocationEventKind::BatchQuantityChanged,
            "change_batch_quantity",
            |event: &AllocationEvent, uow: &mut UnitOfWork<F>| match event {
                AllocationEvent::BatchQuantityChanged(ev) => {
                    handlers::change_batch_quantity(ev, uow).map(|()| None)
                }
                other => Err(HandlerError::Misrouted(other.event_type())),
            },
        )
        .with(
            AllocationEventKind::OutOfStock,
            "send_out_of_stock_notification",
            move |event: &AllocationEvent, _uow: &mut UnitOfWork<F>| match event {
                AllocationEvent::OutOfStock(ev) => {
                    handlers::send_out_of_stock_notification(ev, notifier.as_ref()).map(|()| None)
                }
                other => Err(HandlerError::Misrouted(other.event_type())),
            },
        )
}

pub fn build_message_bus<F>(notifier: Arc<dyn Notifier>) -> AllocationBus<F>
where
    F: SessionFactory + 'static,
{
    MessageBus::new(allocation_handlers(notifier))
}
