//! Identity-provider port.
//!
//! User accounts, credentials, and the token flows around them (email
//! confirmation, password reset, refresh tokens) live behind
//! [`IdentityService`]. Every operation either succeeds or reports the full
//! list of reasons it did not.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use shiptrack_core::UserId;

use crate::Role;

mod in_memory;
mod notifier;
mod password;

pub use in_memory::InMemoryIdentityService;
pub use notifier::{Notification, Notifier, TracingNotifier};
pub use password::{PasswordHash, PasswordHashError, password_violations};

/// Failed identity operation with every reason collected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("identity operation failed: {}", errors.join("; "))]
pub struct IdentityFailure {
    pub errors: Vec<String>,
}

impl IdentityFailure {
    pub fn new(errors: Vec<String>) -> Self {
        Self { errors }
    }

    pub fn single(error: impl Into<String>) -> Self {
        Self {
            errors: vec![error.into()],
        }
    }
}

/// Outcome of an identity operation: success, or the provider's error list.
pub type IdentityResult<T = ()> = Result<T, IdentityFailure>;

/// Public view of a user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserAccount {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    pub roles: Vec<Role>,
    pub email_confirmed: bool,
    pub created_at: DateTime<Utc>,
}

impl UserAccount {
    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }
}

/// Input for [`IdentityService::create_user`].
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub display_name: String,
    pub password: String,
    pub roles: Vec<Role>,
    /// Skip the confirmation flow (seeded accounts).
    pub email_confirmed: bool,
}

/// Input for [`IdentityService::update_user`]; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct AccountChanges {
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn create_user(&self, new: NewAccount, now: DateTime<Utc>) -> IdentityResult<UserAccount>;

    async fn update_user(&self, id: UserId, changes: AccountChanges) -> IdentityResult<UserAccount>;

    async fn delete_user(&self, id: UserId) -> IdentityResult;

    async fn assign_role(&self, id: UserId, role: Role) -> IdentityResult<UserAccount>;

    async fn remove_role(&self, id: UserId, role: Role) -> IdentityResult<UserAccount>;

    async fn find_user(&self, id: UserId) -> Option<UserAccount>;

    async fn list_users(&self) -> Vec<UserAccount>;

    /// Verify credentials. Unknown emails and wrong passwords fail alike.
    async fn authenticate(&self, email: &str, password: &str) -> IdentityResult<UserAccount>;

    async fn confirm_email(&self, id: UserId, token: &str) -> IdentityResult;

    /// Issue a reset token through the notifier. Unknown emails succeed silently.
    async fn request_password_reset(&self, email: &str, now: DateTime<Utc>) -> IdentityResult;

    async fn reset_password(
        &self,
        email: &str,
        token: &str,
        new_password: &str,
        now: DateTime<Utc>,
    ) -> IdentityResult;

    async fn issue_refresh_token(&self, id: UserId, expires_at: DateTime<Utc>) -> IdentityResult<String>;

    /// Exchange a refresh token for its account. The token is revoked.
    async fn redeem_refresh_token(&self, token: &str, now: DateTime<Utc>) -> IdentityResult<UserAccount>;
}
