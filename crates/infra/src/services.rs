//! Caller-facing allocation API.
//!
//! `AllocationService` takes primitives (strings, quantities, dates), parses
//! them into domain identifiers and drives the message bus or the direct
//! handlers with a fresh `UnitOfWork` per call.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::warn;

use allocation_core::{BatchReference, OrderId, Sku};
use allocation_domain::{AllocationEvent, AllocationRequired, BatchCreated, BatchQuantityChanged};

use crate::config::{AllocationConfig, ConfigError};
use crate::handlers::{self, BatchView, HandlerError};
use crate::message_bus::{build_message_bus, AllocationBus};
use crate::notifications::{LogNotifier, Notifier};
use crate::product_store::{InMemoryProductStore, SessionFactory};
use crate::unit_of_work::UnitOfWork;

pub struct AllocationService<F: SessionFactory> {
    factory: F,
    bus: AllocationBus<F>,
    config: AllocationConfig,
}

impl<F: SessionFactory> std::fmt::Debug for AllocationService<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllocationService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AllocationService<Arc<InMemoryProductStore>> {
    /// Service over a fresh in-memory store, notifying through the log.
    pub fn in_memory(config: AllocationConfig) -> Self {
        let notifier = Arc::new(LogNotifier::new(config.stock_notification_recipient.clone()));
        Self::new(Arc::new(InMemoryProductStore::new()), notifier, config)
    }

    /// In-memory service configured from the `ALLOCATION_*` environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::in_memory(AllocationConfig::from_env()?))
    }
}

impl<F> AllocationService<F>
where
    F: SessionFactory + Clone + 'static,
{
    pub fn new(factory: F, notifier: Arc<dyn Notifier>, config: AllocationConfig) -> Self {
        Self {
            factory,
            bus: build_message_bus(notifier),
            config,
        }
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    /// Dispatch `event` and everything it cascades into.
    pub fn dispatch(&self, event: AllocationEvent) -> Result<Vec<Option<BatchReference>>, HandlerError> {
        let mut uow = self.unit_of_work();
        self.bus.handle(event, &mut uow)
    }

    pub fn add_batch(
        &self,
        reference: &str,
        sku: &str,
        qty: u32,
        eta: Option<NaiveDate>,
    ) -> Result<(), HandlerError> {
        let event = BatchCreated {
            reference: BatchReference::parse(reference)?,
            sku: Sku::parse(sku)?,
            qty,
            eta,
        };
        self.dispatch(event.into())?;
        Ok(())
    }

    /// Allocate an order line; returns the chosen batch reference, or `None`
    /// when out of stock (the stock notification has been sent by then).
    ///
    /// A concurrency conflict re-runs the whole dispatch, up to
    /// `conflict_retries` times.
    pub fn allocate(&self, order_id: &str, sku: &str, qty: u32) -> Result<Option<String>, HandlerError> {
        let event = AllocationRequired {
            order_id: OrderId::parse(order_id)?,
            sku: Sku::parse(sku)?,
            qty,
        };

        let mut attempt = 0;
        loop {
            match self.dispatch(event.clone().into()) {
                Ok(results) => {
                    return Ok(results
                        .into_iter()
                        .next()
                        .flatten()
                        .map(BatchReference::into_inner));
                }
                Err(err) if err.is_conflict() && attempt < self.config.conflict_retries => {
                    attempt += 1;
                    warn!(
                        order_id = %event.order_id,
                        sku = %event.sku,
                        attempt,
                        error = %err,
                        "allocation conflicted; retrying"
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub fn deallocate(&self, sku: &str, order_id: &str, qty: u32) -> Result<String, HandlerError> {
        let sku = Sku::parse(sku)?;
        let order_id = OrderId::parse(order_id)?;
        let reference = handlers::deallocate(&mut self.unit_of_work(), &sku, &order_id, qty)?;
        Ok(reference.into_inner())
    }

    pub fn change_batch_quantity(&self, reference: &str, qty: u32) -> Result<(), HandlerError> {
        let event = BatchQuantityChanged {
            reference: BatchReference::parse(reference)?,
            qty,
        };
        self.dispatch(event.into())?;
        Ok(())
    }

    pub fn delete_batch(&self, sku: &str, reference: &str) -> Result<(), HandlerError> {
        let sku = Sku::parse(sku)?;
        let reference = BatchReference::parse(reference)?;
        handlers::delete_batch(&mut self.unit_of_work(), &sku, &reference)
    }

    pub fn get_batch(&self, sku: &str, reference: &str) -> Result<BatchView, HandlerError> {
        let sku = Sku::parse(sku)?;
        let reference = BatchReference::parse(reference)?;
        handlers::get_batch(&mut self.unit_of_work(), &sku, &reference)
    }

    fn unit_of_work(&self) -> UnitOfWork<F> {
        UnitOfWork::new(self.factory.clone())
    }
}
