//! Unit of Work: the transactional boundary around product changes.
//!
//! ```text
//! UnitOfWork::begin()          -> open session, state = Active
//!   products().get/add/...     -> tracked by the repository
//!   commit()                   -> one atomic store write (optimistic write stamps)
//!                                 harvest recorded events into the buffer
//! drop(ActiveUnitOfWork)       -> roll back anything uncommitted, close session
//! collect_new_events()         -> drain the harvested buffer (FIFO)
//! ```
//!
//! Events are harvested only after a successful commit, so the events of a
//! rolled-back or conflicting unit never reach the message bus.

use std::collections::VecDeque;

use tracing::{debug, warn};

use allocation_domain::AllocationEvent;
use allocation_events::EventSource;

use crate::product_store::{Session, SessionFactory, StoreError};
use crate::repository::TrackingRepository;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UnitOfWorkState {
    Idle,
    Active,
    Committed,
    RolledBack,
}

/// Owns the session factory and the buffer of harvested events.
///
/// One `UnitOfWork` is threaded through a whole bus dispatch; each handler
/// opens its own transaction with `begin()`.
#[derive(Debug)]
pub struct UnitOfWork<F> {
    factory: F,
    harvested: VecDeque<AllocationEvent>,
    state: UnitOfWorkState,
}

impl<F: SessionFactory> UnitOfWork<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            harvested: VecDeque::new(),
            state: UnitOfWorkState::Idle,
        }
    }

    pub fn state(&self) -> UnitOfWorkState {
        self.state
    }

    /// Harvested events not yet collected.
    pub fn pending_event_count(&self) -> usize {
        self.harvested.len()
    }

    /// Open a transaction. The returned guard rolls back on drop.
    pub fn begin(&mut self) -> Result<ActiveUnitOfWork<'_, F::Session>, StoreError> {
        let session = self.factory.open_session()?;
        self.state = UnitOfWorkState::Active;
        Ok(ActiveUnitOfWork {
            products: TrackingRepository::new(session),
            harvested: &mut self.harvested,
            state: &mut self.state,
        })
    }
}

impl<F: SessionFactory> EventSource<AllocationEvent> for UnitOfWork<F> {
    fn collect_new_events(&mut self) -> Vec<AllocationEvent> {
        self.harvested.drain(..).collect()
    }
}

/// An open transaction.
///
/// Dropping the guard rolls back whatever was not committed and closes the
/// session, on every exit path.
#[derive(Debug)]
pub struct ActiveUnitOfWork<'a, S: Session> {
    products: TrackingRepository<S>,
    harvested: &'a mut VecDeque<AllocationEvent>,
    state: &'a mut UnitOfWorkState,
}

impl<S: Session> ActiveUnitOfWork<'_, S> {
    pub fn products(&mut self) -> &mut TrackingRepository<S> {
        &mut self.products
    }

    pub fn state(&self) -> UnitOfWorkState {
        *self.state
    }

    /// Write every new, changed or deleted product in one atomic store call,
    /// then harvest the recorded events.
    ///
    /// On `StoreError::Concurrency` nothing was written and no events are
    /// harvested; the guard stays open and rolls back on drop.
    pub fn commit(&mut self) -> Result<(), StoreError> {
        let changes = self.products.pending_changes();
        let change_count = changes.len();

        let stamps = match self.products.session_mut().commit(changes) {
            Ok(stamps) => stamps,
            Err(err) => {
                warn!(changes = change_count, error = %err, "unit of work commit failed");
                return Err(err);
            }
        };

        let events = self.products.harvest_events();
        debug!(
            changes = change_count,
            events = events.len(),
            "unit of work committed"
        );
        self.harvested.extend(events);
        self.products.mark_clean(&stamps);
        *self.state = UnitOfWorkState::Committed;
        Ok(())
    }

    /// Discard tracked products and their recorded events.
    pub fn rollback(&mut self) {
        self.products.discard();
        self.products.session_mut().rollback();
        *self.state = UnitOfWorkState::RolledBack;
    }
}

impl<S: Session> Drop for ActiveUnitOfWork<'_, S> {
    fn drop(&mut self) {
        let outstanding = self.products.has_outstanding_changes();
        if *self.state != UnitOfWorkState::Committed || outstanding {
            self.rollback();
        } else {
            self.products.discard();
        }
        self.products.session_mut().close();
    }
}
