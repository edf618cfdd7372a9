//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Child records owned by an aggregate (e.g. a status-history entry) are
/// entities too: they keep their identity even though only the aggregate
/// root is loaded and saved.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
