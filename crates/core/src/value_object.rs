//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have **no identity**: two instances holding the same value
/// are interchangeable. They are immutable and validate themselves at
/// construction, so holding one is proof that the wrapped primitive is
/// well-formed.
///
/// ```ignore
/// let a = TrackingNumber::parse("vtx-202501-0001")?;
/// let b = TrackingNumber::parse("VTX-202501-0001")?;
/// assert_eq!(a, b);
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
