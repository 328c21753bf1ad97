//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by value. They are validated once,
/// at construction, so holding one is proof that the value is well-formed:
/// a `Slug` always matches the slug alphabet, a `Price` always fits the
/// storage precision.
///
/// ```ignore
/// let a = Slug::parse("running-shoes")?;
/// let b = Slug::parse("running-shoes")?;
/// assert_eq!(a, b);
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
