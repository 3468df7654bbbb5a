/// A domain-agnostic event.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **pure data** (no behavior beyond describing themselves)
/// - **routable** by their `kind()` discriminant
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Discriminant of the concrete event variant, used as the handler table key.
    type Kind: Copy + Eq + core::hash::Hash + core::fmt::Debug + Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;

    /// Stable event name/type identifier (e.g. "allocation.batch.created").
    fn event_type(&self) -> &'static str;
}
