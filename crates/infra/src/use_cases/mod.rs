//! Application use cases.
//!
//! Every command and query runs the same pipeline:
//!
//! ```text
//! authorize caller -> validate input (collect every violation) -> load
//!   -> domain operation -> save with the loaded version
//! ```
//!
//! Failures are reported as one of the [`UseCaseError`] kinds, which the
//! HTTP layer maps onto status codes.

use serde::Serialize;
use thiserror::Error;

use shiptrack_auth::{AuthzError, IdentityFailure};
use shiptrack_core::DomainError;

use crate::repository::RepositoryError;

pub mod identity;
pub mod ports;
pub mod shipments;
pub mod views;

pub use identity::IdentityHandlers;
pub use ports::PortHandlers;
pub use shipments::ShipmentHandlers;

#[derive(Debug, Error)]
pub enum UseCaseError {
    /// The entity does not exist or is soft-deleted.
    #[error("not found")]
    NotFound,

    /// Input validation failed; every violation is listed.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// The caller lacks the required permission.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Stale version, uniqueness clash, or a referential guard.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Storage failure.
    #[error(transparent)]
    Repository(RepositoryError),

    /// Any other infrastructure failure (token signing).
    #[error("internal error: {0}")]
    Internal(String),
}

impl UseCaseError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(vec![msg.into()])
    }
}

impl From<DomainError> for UseCaseError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg)
            | DomainError::InvariantViolation(msg)
            | DomainError::InvalidId(msg) => UseCaseError::Validation(vec![msg]),
            DomainError::NotFound => UseCaseError::NotFound,
            DomainError::Conflict(msg) => UseCaseError::Conflict(msg),
            DomainError::Forbidden => UseCaseError::Forbidden("forbidden".to_string()),
        }
    }
}

impl From<RepositoryError> for UseCaseError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict(msg) => UseCaseError::Conflict(msg),
            other => UseCaseError::Repository(other),
        }
    }
}

impl From<AuthzError> for UseCaseError {
    fn from(value: AuthzError) -> Self {
        match value {
            AuthzError::Forbidden(permission) => {
                UseCaseError::Forbidden(format!("missing permission '{permission}'"))
            }
        }
    }
}

impl From<IdentityFailure> for UseCaseError {
    fn from(value: IdentityFailure) -> Self {
        UseCaseError::Validation(value.errors)
    }
}

/// Accumulates input violations so a request reports all of them at once.
#[derive(Debug, Default)]
pub(crate) struct Violations(Vec<String>);

impl Violations {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, msg: impl Into<String>) {
        self.0.push(msg.into());
    }

    pub(crate) fn require(&mut self, ok: bool, msg: impl Into<String>) {
        if !ok {
            self.push(msg);
        }
    }

    /// Keep the value, or record why it could not be built.
    pub(crate) fn capture<T>(&mut self, result: Result<T, DomainError>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(
                DomainError::Validation(msg)
                | DomainError::InvariantViolation(msg)
                | DomainError::InvalidId(msg),
            ) => {
                self.push(msg);
                None
            }
            Err(other) => {
                self.push(other.to_string());
                None
            }
        }
    }

    pub(crate) fn finish(self) -> Result<(), UseCaseError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(UseCaseError::Validation(self.0))
        }
    }
}

/// One page of a listing plus the total match count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}

pub const MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_PAGE_SIZE: u32 = 20;

pub(crate) fn paginate<T>(all: Vec<T>, page: u32, page_size: u32) -> Page<T> {
    let total = all.len() as u64;
    let skip = (page.saturating_sub(1) as usize).saturating_mul(page_size as usize);
    let items = all.into_iter().skip(skip).take(page_size as usize).collect();
    Page {
        items,
        page,
        page_size,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn violations_collect_domain_messages() {
        let mut v = Violations::new();
        assert_eq!(v.capture(Ok::<_, DomainError>(3)), Some(3));
        assert_eq!(
            v.capture::<()>(Err(DomainError::validation("weight must be greater than zero"))),
            None
        );
        v.require(false, "origin and destination must differ");
        v.require(true, "never recorded");

        match v.finish() {
            Err(UseCaseError::Validation(errors)) => assert_eq!(
                errors,
                vec![
                    "weight must be greater than zero".to_string(),
                    "origin and destination must differ".to_string()
                ]
            ),
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn repository_conflicts_surface_as_conflicts() {
        let err: UseCaseError = RepositoryError::Conflict("stale".into()).into();
        assert!(matches!(err, UseCaseError::Conflict(_)));
        let err: UseCaseError = RepositoryError::Backend("down".into()).into();
        assert!(matches!(err, UseCaseError::Repository(_)));
    }

    #[test]
    fn pages_are_one_based() {
        let page = paginate((1..=45).collect::<Vec<_>>(), 3, 20);
        assert_eq!(page.items, vec![41, 42, 43, 44, 45]);
        assert_eq!(page.total, 45);
        assert!(paginate(vec![1, 2], 5, 20).items.is_empty());
    }
}
