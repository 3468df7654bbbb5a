//! `allocation-events`: event abstraction and the in-process message bus.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod handler;

pub use bus::{EventSource, MessageBus};
pub use envelope::Envelope;
pub use event::Event;
pub use handler::{HandlerFn, HandlerRegistry, RegisteredHandler};
