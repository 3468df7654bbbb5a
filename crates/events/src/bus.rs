//! Synchronous in-process message bus.
//!
//! The bus drains one dispatch pass at a time:
//!
//! ```text
//! starting event → queue → handlers(kind) → context.collect_new_events() → queue tail → ...
//! ```
//!
//! ## Ordering
//!
//! The queue is FIFO and owned by the bus, so cascading events are processed
//! breadth-first in the order they were produced, and stack depth stays
//! constant however long the cascade gets.
//!
//! ## Failure semantics
//!
//! A failing handler aborts the pass and its error is returned unchanged.
//! Events still waiting in the queue are dropped (they were never persisted),
//! which makes side-effect delivery at-most-once.

use std::collections::VecDeque;

use tracing::{debug, info_span, warn};
use uuid::Uuid;

use crate::{Envelope, Event, HandlerRegistry};

/// Source of events produced while a handler ran (typically a unit of work
/// that harvested them from the aggregates it committed).
pub trait EventSource<E> {
    /// Drain the events produced since the last call, oldest first.
    fn collect_new_events(&mut self) -> Vec<E>;
}

/// Dispatches events to the handlers registered for their kind.
#[derive(Debug)]
pub struct MessageBus<E: Event, C, R, Err> {
    registry: HandlerRegistry<E, C, R, Err>,
}

impl<E: Event, C, R, Err> MessageBus<E, C, R, Err> {
    pub fn new(registry: HandlerRegistry<E, C, R, Err>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &HandlerRegistry<E, C, R, Err> {
        &self.registry
    }
}

impl<E, C, R, Err> MessageBus<E, C, R, Err>
where
    E: Event,
    C: EventSource<E>,
    Err: core::fmt::Debug,
{
    /// Handle `event` and everything it cascades into.
    ///
    /// Every handler receives the same `context`. Results are returned in the
    /// order the handlers ran.
    pub fn handle(&self, event: E, context: &mut C) -> Result<Vec<R>, Err> {
        let dispatch_id = Uuid::now_v7();
        let span = info_span!("message_bus.handle", %dispatch_id, event_type = event.event_type());
        let _guard = span.enter();

        let mut queue = VecDeque::from([Envelope::origin(dispatch_id, event)]);
        let mut next_position = 1u64;
        let mut results = Vec::new();

        while let Some(envelope) = queue.pop_front() {
            let payload = envelope.payload();
            let handlers = self.registry.handlers_for(payload.kind());

            if handlers.is_empty() {
                warn!(
                    event_type = payload.event_type(),
                    position = envelope.position(),
                    "no handler registered for event; skipping"
                );
                continue;
            }

            for handler in handlers {
                debug!(
                    handler = handler.name(),
                    event_type = payload.event_type(),
                    position = envelope.position(),
                    caused_by = ?envelope.caused_by(),
                    "dispatching event"
                );

                let result = match handler.call(payload, context) {
                    Ok(r) => r,
                    Err(err) => {
                        warn!(
                            handler = handler.name(),
                            event_type = payload.event_type(),
                            stranded = queue.len(),
                            error = ?err,
                            "handler failed; aborting dispatch"
                        );
                        return Err(err);
                    }
                };
                results.push(result);

                for produced in context.collect_new_events() {
                    queue.push_back(Envelope::cascaded(
                        dispatch_id,
                        next_position,
                        envelope.position(),
                        produced,
                    ));
                    next_position += 1;
                }
            }
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test event: `Split(n)` produces `n` `Leaf`s, a `Leaf(i)` with odd `i`
    /// produces a `Tail`.
    #[derive(Debug, Clone, PartialEq, Eq)]
    enum TestEvent {
        Split(u32),
        Leaf(u32),
        Tail(u32),
        Unrouted,
    }

    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    enum Kind {
        Split,
        Leaf,
        Tail,
        Unrouted,
    }

    impl Event for TestEvent {
        type Kind = Kind;

        fn kind(&self) -> Kind {
            match self {
                TestEvent::Split(_) => Kind::Split,
                TestEvent::Leaf(_) => Kind::Leaf,
                TestEvent::Tail(_) => Kind::Tail,
                TestEvent::Unrouted => Kind::Unrouted,
            }
        }

        fn event_type(&self) -> &'static str {
            "test.event"
        }
    }

    #[derive(Default)]
    struct Context {
        produced: Vec<TestEvent>,
        seen: Vec<TestEvent>,
    }

    impl EventSource<TestEvent> for Context {
        fn collect_new_events(&mut self) -> Vec<TestEvent> {
            std::mem::take(&mut self.produced)
        }
    }

    type TestBus = MessageBus<TestEvent, Context, u32, String>;

    fn bus() -> TestBus {
        let registry = HandlerRegistry::new()
            .with(Kind::Split, "split", |ev: &TestEvent, ctx: &mut Context| {
                ctx.seen.push(ev.clone());
                if let TestEvent::Split(n) = ev {
                    ctx.produced.extend((0..*n).map(TestEvent::Leaf));
                }
                Ok(0)
            })
            .with(Kind::Leaf, "leaf", |ev: &TestEvent, ctx: &mut Context| {
                ctx.seen.push(ev.clone());
                match ev {
                    TestEvent::Leaf(i) if i % 2 == 1 => {
                        ctx.produced.push(TestEvent::Tail(*i));
                        Ok(*i)
                    }
                    TestEvent::Leaf(i) => Ok(*i),
                    _ => Err("misrouted".to_string()),
                }
            })
            .with(Kind::Tail, "tail", |ev: &TestEvent, ctx: &mut Context| {
                ctx.seen.push(ev.clone());
                match ev {
                    TestEvent::Tail(99) => Err("tail 99 failed".to_string()),
                    TestEvent::Tail(i) => Ok(100 + *i),
                    _ => Err("misrouted".to_string()),
                }
            });
        MessageBus::new(registry)
    }

    #[test]
    fn cascading_events_are_processed_breadth_first() {
        let mut ctx = Context::default();
        let results = bus().handle(TestEvent::Split(4), &mut ctx).unwrap();

        assert_eq!(
            ctx.seen,
            vec![
                TestEvent::Split(4),
                TestEvent::Leaf(0),
                TestEvent::Leaf(1),
                TestEvent::Leaf(2),
                TestEvent::Leaf(3),
                TestEvent::Tail(1),
                TestEvent::Tail(3),
            ]
        );
        assert_eq!(results, vec![0, 0, 1, 2, 3, 101, 103]);
    }

    #[test]
    fn every_handler_for_a_kind_runs_in_registration_order() {
        let registry = HandlerRegistry::new()
            .with(Kind::Leaf, "one", |_: &TestEvent, _: &mut Context| Ok(1))
            .with(Kind::Leaf, "two", |_: &TestEvent, _: &mut Context| Ok(2));
        let bus: TestBus = MessageBus::new(registry);

        let results = bus.handle(TestEvent::Leaf(0), &mut Context::default()).unwrap();
        assert_eq!(results, vec![1, 2]);
    }

    #[test]
    fn handler_failure_aborts_and_strands_queued_events() {
        let registry = HandlerRegistry::new()
            .with(Kind::Split, "split", |_: &TestEvent, ctx: &mut Context| {
                ctx.produced.push(TestEvent::Tail(99));
                ctx.produced.push(TestEvent::Leaf(0));
                Ok(0)
            })
            .with(Kind::Tail, "tail", |_: &TestEvent, _: &mut Context| {
                Err("boom".to_string())
            })
            .with(Kind::Leaf, "leaf", |ev: &TestEvent, ctx: &mut Context| {
                ctx.seen.push(ev.clone());
                Ok(1)
            });
        let bus: TestBus = MessageBus::new(registry);

        let mut ctx = Context::default();
        let err = bus.handle(TestEvent::Split(0), &mut ctx).unwrap_err();

        assert_eq!(err, "boom");
        assert!(ctx.seen.is_empty(), "queued leaf must not be processed");
    }

    #[test]
    fn events_without_handlers_are_skipped() {
        let mut ctx = Context::default();
        let results = bus().handle(TestEvent::Unrouted, &mut ctx).unwrap();
        assert!(results.is_empty());
        assert!(ctx.seen.is_empty());
    }
}
