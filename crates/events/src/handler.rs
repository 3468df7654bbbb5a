//! Static event → handler registration table.

use std::collections::HashMap;

use crate::Event;

/// Boxed handler function.
///
/// `C` is the context every handler of a dispatch pass shares (typically a
/// unit of work), `R` the value a handler hands back to the caller.
pub type HandlerFn<E, C, R, Err> = Box<dyn Fn(&E, &mut C) -> Result<R, Err> + Send + Sync>;

/// A handler together with the name it is logged under.
pub struct RegisteredHandler<E, C, R, Err> {
    name: &'static str,
    handler: HandlerFn<E, C, R, Err>,
}

impl<E, C, R, Err> RegisteredHandler<E, C, R, Err> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn call(&self, event: &E, context: &mut C) -> Result<R, Err> {
        (self.handler)(event, context)
    }
}

impl<E, C, R, Err> core::fmt::Debug for RegisteredHandler<E, C, R, Err> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RegisteredHandler")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Mapping from an event kind to the handlers that run for it.
///
/// The table is built once at start-up and then handed to a `MessageBus`,
/// which only reads it. Handlers registered for the same kind run in
/// registration order.
pub struct HandlerRegistry<E: Event, C, R, Err> {
    table: HashMap<E::Kind, Vec<RegisteredHandler<E, C, R, Err>>>,
}

impl<E: Event, C, R, Err> HandlerRegistry<E, C, R, Err> {
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Register a handler for `kind` (builder style).
    pub fn with<F>(mut self, kind: E::Kind, name: &'static str, handler: F) -> Self
    where
        F: Fn(&E, &mut C) -> Result<R, Err> + Send + Sync + 'static,
    {
        self.register(kind, name, handler);
        self
    }

    pub fn register<F>(&mut self, kind: E::Kind, name: &'static str, handler: F)
    where
        F: Fn(&E, &mut C) -> Result<R, Err> + Send + Sync + 'static,
    {
        self.table.entry(kind).or_default().push(RegisteredHandler {
            name,
            handler: Box::new(handler),
        });
    }

    /// Handlers for `kind`, in registration order (empty if none).
    pub fn handlers_for(&self, kind: E::Kind) -> &[RegisteredHandler<E, C, R, Err>] {
        self.table.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_registered(&self, kind: E::Kind) -> bool {
        !self.handlers_for(kind).is_empty()
    }
}

impl<E: Event, C, R, Err> Default for HandlerRegistry<E, C, R, Err> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event, C, R, Err> core::fmt::Debug for HandlerRegistry<E, C, R, Err> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map()
            .entries(
                self.table
                    .iter()
                    .map(|(kind, handlers)| (kind, handlers.iter().map(|h| h.name).collect::<Vec<_>>())),
            )
            .finish()
    }
}
