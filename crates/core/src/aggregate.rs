//! Aggregate root traits and the optimistic concurrency token.

/// Aggregate root marker + minimal interface.
///
/// All mutations to entities owned by an aggregate go through the root, which
/// makes the root the unit of consistency and the unit of contention.
pub trait AggregateRoot {
    /// Business identifier of the aggregate.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Domain version counter.
    ///
    /// Only the operations that the aggregate considers contended bump it; it
    /// is never decremented. Storage keeps its own write stamp for optimistic
    /// concurrency, so this number is informational outside the aggregate.
    fn version(&self) -> u64;
}

/// Aggregates that record domain events as a side effect of mutation.
///
/// Events are buffered on the aggregate until a transaction boundary drains
/// them. Draining is destructive: each recorded event is handed out once.
pub trait RecordsEvents: AggregateRoot {
    type Event: Clone + core::fmt::Debug;

    /// Events recorded since the last drain, oldest first.
    fn pending_events(&self) -> &[Self::Event];

    /// Drain the recorded events in FIFO order.
    fn take_events(&mut self) -> Vec<Self::Event>;
}

/// Optimistic concurrency expectation for a stored aggregate.
///
/// The numbers are storage write stamps: a store bumps the stamp of every
/// aggregate it writes, whatever the aggregate's own version does.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// The aggregate must not be stored yet.
    Absent,
    /// Require the stored aggregate to carry exactly this stamp.
    Exact(u64),
}

impl ExpectedVersion {
    /// Expectation for an aggregate that was loaded at `loaded` (`None` when it
    /// did not exist in storage).
    pub fn from_loaded(loaded: Option<u64>) -> Self {
        match loaded {
            Some(v) => ExpectedVersion::Exact(v),
            None => ExpectedVersion::Absent,
        }
    }

    /// `actual` is the stored stamp, `None` when nothing is stored.
    pub fn matches(self, actual: Option<u64>) -> bool {
        match (self, actual) {
            (ExpectedVersion::Absent, None) => true,
            (ExpectedVersion::Absent, Some(_)) => false,
            (ExpectedVersion::Exact(_), None) => false,
            (ExpectedVersion::Exact(v), Some(found)) => v == found,
        }
    }
}
