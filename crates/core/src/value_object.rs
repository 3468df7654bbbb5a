//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable once constructed. Their equality is defined by
/// the attributes that make up their business identity, which is not always
/// every field: an order line, for example, is the same line whatever quantity
/// was requested for it.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Dimensions {
///     width_mm: u32,
///     height_mm: u32,
/// }
///
/// impl ValueObject for Dimensions {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
