use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use shiptrack_core::UserId;

use super::password::{PasswordHashError, new_token, token_digest, token_matches};
use super::{
    AccountChanges, IdentityFailure, IdentityResult, IdentityService, NewAccount, Notification,
    Notifier, PasswordHash, UserAccount, password_violations,
};
use crate::Role;

const INVALID_CREDENTIALS: &str = "invalid email or password";
const INVALID_TOKEN: &str = "invalid or expired token";
const USER_NOT_FOUND: &str = "user not found";

/// Lifetime of a password-reset token.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// Verified against when the email is unknown so both failures cost the same.
static DUMMY_HASH: LazyLock<Option<PasswordHash>> =
    LazyLock::new(|| PasswordHash::new("unknown-account-0").ok());

impl From<PasswordHashError> for IdentityFailure {
    fn from(err: PasswordHashError) -> Self {
        tracing::error!(error = %err, "password hashing failed");
        IdentityFailure::single("could not store password")
    }
}

#[derive(Debug, Clone)]
struct StoredUser {
    account: UserAccount,
    password: PasswordHash,
    confirmation_digest: Option<String>,
    reset: Option<(String, DateTime<Utc>)>,
}

#[derive(Debug, Clone)]
struct RefreshRecord {
    user_id: UserId,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, StoredUser>,
    /// Keyed by token digest.
    refresh: HashMap<String, RefreshRecord>,
}

impl State {
    fn by_email(&self, email: &str) -> Option<&StoredUser> {
        self.users.values().find(|u| u.account.email == email)
    }

    fn user_mut(&mut self, id: UserId) -> IdentityResult<&mut StoredUser> {
        self.users
            .get_mut(&id)
            .ok_or_else(|| IdentityFailure::single(USER_NOT_FOUND))
    }

    fn admin_count(&self) -> usize {
        let admin = Role::admin();
        self.users.values().filter(|u| u.account.has_role(&admin)).count()
    }
}

/// In-process identity provider for development and tests.
pub struct InMemoryIdentityService {
    state: RwLock<State>,
    notifier: Arc<dyn Notifier>,
}

impl InMemoryIdentityService {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            state: RwLock::new(State::default()),
            notifier,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn email_violation(email: &str) -> Option<String> {
    let valid = email
        .split_once('@')
        .map(|(local, domain)| {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        })
        .unwrap_or(false);
    if valid && !email.contains(char::is_whitespace) {
        None
    } else {
        Some("invalid email format".to_string())
    }
}

#[async_trait]
impl IdentityService for InMemoryIdentityService {
    async fn create_user(&self, new: NewAccount, now: DateTime<Utc>) -> IdentityResult<UserAccount> {
        let email = normalize_email(&new.email);
        let display_name = new.display_name.trim().to_string();

        let mut errors = Vec::new();
        errors.extend(email_violation(&email));
        if display_name.is_empty() {
            errors.push("display name cannot be empty".to_string());
        }
        errors.extend(password_violations(&new.password));

        let hashed = if errors.is_empty() {
            Some(PasswordHash::new(&new.password)?)
        } else {
            None
        };

        let mut state = self.write();
        if state.by_email(&email).is_some() {
            errors.push(format!("email '{email}' is already registered"));
        }
        let Some(password) = hashed.filter(|_| errors.is_empty()) else {
            return Err(IdentityFailure::new(errors));
        };

        let mut roles = new.roles;
        roles.sort();
        roles.dedup();

        let account = UserAccount {
            id: UserId::new(),
            email,
            display_name,
            roles,
            email_confirmed: new.email_confirmed,
            created_at: now,
        };

        let confirmation = (!new.email_confirmed).then(new_token);
        state.users.insert(
            account.id,
            StoredUser {
                account: account.clone(),
                password,
                confirmation_digest: confirmation.as_deref().map(token_digest),
                reset: None,
            },
        );
        drop(state);

        if let Some(token) = confirmation {
            self.notifier.send(Notification::EmailConfirmation {
                to: account.email.clone(),
                user_id: account.id,
                token,
            });
        }

        Ok(account)
    }

    async fn update_user(&self, id: UserId, changes: AccountChanges) -> IdentityResult<UserAccount> {
        let mut state = self.write();

        let email = changes.email.as_deref().map(normalize_email);
        let mut errors = Vec::new();
        if let Some(email) = &email {
            errors.extend(email_violation(email));
            if state.by_email(email).is_some_and(|u| u.account.id != id) {
                errors.push(format!("email '{email}' is already registered"));
            }
        }
        let display_name = changes.display_name.map(|n| n.trim().to_string());
        if display_name.as_deref().is_some_and(str::is_empty) {
            errors.push("display name cannot be empty".to_string());
        }

        let user = state.user_mut(id)?;
        if !errors.is_empty() {
            return Err(IdentityFailure::new(errors));
        }

        if let Some(email) = email {
            if email != user.account.email {
                user.account.email = email;
                user.account.email_confirmed = false;
            }
        }
        if let Some(name) = display_name {
            user.account.display_name = name;
        }
        Ok(user.account.clone())
    }

    async fn delete_user(&self, id: UserId) -> IdentityResult {
        let mut state = self.write();
        let is_admin = state.user_mut(id)?.account.has_role(&Role::admin());
        if is_admin && state.admin_count() == 1 {
            return Err(IdentityFailure::single("at least one admin must remain"));
        }
        state.users.remove(&id);
        state.refresh.retain(|_, r| r.user_id != id);
        Ok(())
    }

    async fn assign_role(&self, id: UserId, role: Role) -> IdentityResult<UserAccount> {
        let mut state = self.write();
        let user = state.user_mut(id)?;
        if user.account.has_role(&role) {
            return Err(IdentityFailure::single(format!("user already has role '{role}'")));
        }
        user.account.roles.push(role);
        user.account.roles.sort();
        Ok(user.account.clone())
    }

    async fn remove_role(&self, id: UserId, role: Role) -> IdentityResult<UserAccount> {
        let mut state = self.write();
        if role == Role::admin()
            && state.user_mut(id)?.account.has_role(&role)
            && state.admin_count() == 1
        {
            return Err(IdentityFailure::single("at least one admin must remain"));
        }
        let user = state.user_mut(id)?;
        if !user.account.has_role(&role) {
            return Err(IdentityFailure::single(format!("user does not have role '{role}'")));
        }
        user.account.roles.retain(|r| *r != role);
        Ok(user.account.clone())
    }

    async fn find_user(&self, id: UserId) -> Option<UserAccount> {
        self.read().users.get(&id).map(|u| u.account.clone())
    }

    async fn list_users(&self) -> Vec<UserAccount> {
        let mut users: Vec<UserAccount> = self.read().users.values().map(|u| u.account.clone()).collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        users
    }

    async fn authenticate(&self, email: &str, password: &str) -> IdentityResult<UserAccount> {
        let email = normalize_email(email);
        let found = self
            .read()
            .by_email(&email)
            .map(|u| (u.account.clone(), u.password.clone()));

        match found {
            Some((account, hash)) if hash.verify(password) => Ok(account),
            Some(_) => Err(IdentityFailure::single(INVALID_CREDENTIALS)),
            None => {
                if let Some(dummy) = DUMMY_HASH.as_ref() {
                    dummy.verify(password);
                }
                Err(IdentityFailure::single(INVALID_CREDENTIALS))
            }
        }
    }

    async fn confirm_email(&self, id: UserId, token: &str) -> IdentityResult {
        let mut state = self.write();
        let user = state.user_mut(id)?;
        if user.account.email_confirmed {
            return Ok(());
        }
        match &user.confirmation_digest {
            Some(digest) if token_matches(digest, token.trim()) => {
                user.account.email_confirmed = true;
                user.confirmation_digest = None;
                Ok(())
            }
            _ => Err(IdentityFailure::single(INVALID_TOKEN)),
        }
    }

    async fn request_password_reset(&self, email: &str, now: DateTime<Utc>) -> IdentityResult {
        let email = normalize_email(email);
        let mut state = self.write();
        let Some(id) = state.by_email(&email).map(|u| u.account.id) else {
            tracing::debug!("password reset requested for unknown email");
            return Ok(());
        };

        let token = new_token();
        let user = state.user_mut(id)?;
        user.reset = Some((
            token_digest(&token),
            now + Duration::minutes(RESET_TOKEN_TTL_MINUTES),
        ));
        drop(state);

        self.notifier.send(Notification::PasswordReset { to: email, token });
        Ok(())
    }

    async fn reset_password(
        &self,
        email: &str,
        token: &str,
        new_password: &str,
        now: DateTime<Utc>,
    ) -> IdentityResult {
        let email = normalize_email(email);
        let violations = password_violations(new_password);
        let hashed = if violations.is_empty() {
            Some(PasswordHash::new(new_password)?)
        } else {
            None
        };

        let mut state = self.write();
        let Some(id) = state.by_email(&email).map(|u| u.account.id) else {
            return Err(IdentityFailure::single(INVALID_TOKEN));
        };
        let user = state.user_mut(id)?;

        let token_ok = matches!(
            &user.reset,
            Some((digest, expires_at)) if token_matches(digest, token.trim()) && now < *expires_at
        );
        if !token_ok {
            return Err(IdentityFailure::single(INVALID_TOKEN));
        }

        let Some(password) = hashed else {
            return Err(IdentityFailure::new(violations));
        };

        user.password = password;
        user.reset = None;
        // Existing sessions end with the old password.
        state.refresh.retain(|_, r| r.user_id != id);
        Ok(())
    }

    async fn issue_refresh_token(&self, id: UserId, expires_at: DateTime<Utc>) -> IdentityResult<String> {
        let mut state = self.write();
        state.user_mut(id)?;
        let token = new_token();
        state
            .refresh
            .insert(token_digest(&token), RefreshRecord { user_id: id, expires_at });
        Ok(token)
    }

    async fn redeem_refresh_token(&self, token: &str, now: DateTime<Utc>) -> IdentityResult<UserAccount> {
        let mut state = self.write();
        let record = state
            .refresh
            .remove(&token_digest(token.trim()))
            .ok_or_else(|| IdentityFailure::single(INVALID_TOKEN))?;
        if now >= record.expires_at {
            return Err(IdentityFailure::single(INVALID_TOKEN));
        }
        state
            .users
            .get(&record.user_id)
            .map(|u| u.account.clone())
            .ok_or_else(|| IdentityFailure::single(INVALID_TOKEN))
    }
}
