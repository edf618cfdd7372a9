//! Aggregate root trait and optimistic concurrency expectations.

use crate::error::{DomainError, DomainResult};

/// Aggregate root marker + minimal interface.
///
/// An aggregate is the unit that repositories load and save. Every mutation
/// of an aggregate bumps its version by one; persistence adapters use the
/// version to detect lost updates.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing version of the aggregate's state.
    ///
    /// A freshly created aggregate is at version 1.
    fn version(&self) -> u64;
}

/// Optimistic concurrency expectation for a save.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// The aggregate must not exist yet.
    New,
    /// Require the stored aggregate to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    /// Whether a stored version (`None` when absent) satisfies the expectation.
    pub fn matches(self, stored: Option<u64>) -> bool {
        match (self, stored) {
            (ExpectedVersion::New, None) => true,
            (ExpectedVersion::New, Some(_)) => false,
            (ExpectedVersion::Exact(v), Some(actual)) => v == actual,
            (ExpectedVersion::Exact(_), None) => false,
        }
    }

    pub fn check(self, stored: Option<u64>) -> DomainResult<()> {
        if self.matches(stored) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, stored: {stored:?})"
            )))
        }
    }
}
