//! Entities: objects defined by who they are rather than by their attributes.

/// An object with a stable business identifier.
///
/// A batch whose quantity or allocations change is still the same batch, so
/// equality for entities compares identifiers only.
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    fn same_identity_as(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}
