//! Identity use cases: sign-in, token rotation, account recovery, and user
//! administration. Credentials and accounts live behind the
//! [`IdentityService`] port.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::instrument;

use shiptrack_auth::{
    AccountChanges, CallerIdentity, Hs256Jwt, IdentityService, NewAccount, Permission, Role,
    UserAccount, authorize,
};
use shiptrack_core::UserId;

use super::{UseCaseError, Violations};

#[derive(Debug, Clone)]
pub struct Login {
    pub email: String,
    pub password: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RefreshToken {
    pub refresh_token: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ConfirmEmail {
    pub user_id: UserId,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct ForgotPassword {
    pub email: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ResetPassword {
    pub email: String,
    pub token: String,
    pub new_password: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    pub display_name: String,
    pub password: String,
    pub roles: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub id: UserId,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// Access + refresh token pair handed out on login and refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
    pub user: UserAccount,
}

pub struct IdentityHandlers {
    identity: Arc<dyn IdentityService>,
    jwt: Arc<Hs256Jwt>,
    refresh_ttl: Duration,
}

impl IdentityHandlers {
    pub fn new(identity: Arc<dyn IdentityService>, jwt: Arc<Hs256Jwt>, refresh_ttl: Duration) -> Self {
        Self {
            identity,
            jwt,
            refresh_ttl,
        }
    }

    #[instrument(skip(self, cmd), err)]
    pub async fn login(&self, cmd: Login) -> Result<AuthTokens, UseCaseError> {
        let mut violations = Violations::new();
        violations.require(!cmd.email.trim().is_empty(), "email is required");
        violations.require(!cmd.password.is_empty(), "password is required");
        violations.finish()?;

        let account = self.identity.authenticate(&cmd.email, &cmd.password).await?;
        tracing::info!(user_id = %account.id, "user signed in");
        self.issue_tokens(account, cmd.occurred_at).await
    }

    /// Rotate: the presented refresh token is revoked and a new pair issued.
    #[instrument(skip(self, cmd), err)]
    pub async fn refresh(&self, cmd: RefreshToken) -> Result<AuthTokens, UseCaseError> {
        if cmd.refresh_token.trim().is_empty() {
            return Err(UseCaseError::validation("refresh token is required"));
        }
        let account = self
            .identity
            .redeem_refresh_token(cmd.refresh_token.trim(), cmd.occurred_at)
            .await?;
        self.issue_tokens(account, cmd.occurred_at).await
    }

    #[instrument(skip(self, cmd), fields(user_id = %cmd.user_id), err)]
    pub async fn confirm_email(&self, cmd: ConfirmEmail) -> Result<(), UseCaseError> {
        self.identity.confirm_email(cmd.user_id, cmd.token.trim()).await?;
        Ok(())
    }

    /// Always succeeds for well-formed input so account existence is not
    /// disclosed.
    #[instrument(skip(self, cmd), err)]
    pub async fn forgot_password(&self, cmd: ForgotPassword) -> Result<(), UseCaseError> {
        if cmd.email.trim().is_empty() {
            return Err(UseCaseError::validation("email is required"));
        }
        self.identity
            .request_password_reset(&cmd.email, cmd.occurred_at)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, cmd), err)]
    pub async fn reset_password(&self, cmd: ResetPassword) -> Result<(), UseCaseError> {
        self.identity
            .reset_password(&cmd.email, cmd.token.trim(), &cmd.new_password, cmd.occurred_at)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, caller, cmd), err)]
    pub async fn create_user(
        &self,
        caller: &CallerIdentity,
        cmd: CreateUser,
    ) -> Result<UserAccount, UseCaseError> {
        authorize(caller, &Permission::USERS_MANAGE)?;

        let mut violations = Violations::new();
        let mut roles = parse_roles(&mut violations, &cmd.roles);
        violations.finish()?;
        if roles.is_empty() {
            roles.push(Role::viewer());
        }

        let account = self
            .identity
            .create_user(
                NewAccount {
                    email: cmd.email,
                    display_name: cmd.display_name,
                    password: cmd.password,
                    roles,
                    email_confirmed: false,
                },
                cmd.occurred_at,
            )
            .await?;
        tracing::info!(user_id = %account.id, "user created");
        Ok(account)
    }

    #[instrument(skip(self, caller, cmd), fields(user_id = %cmd.id), err)]
    pub async fn update_user(
        &self,
        caller: &CallerIdentity,
        cmd: UpdateUser,
    ) -> Result<UserAccount, UseCaseError> {
        authorize(caller, &Permission::USERS_MANAGE)?;
        self.ensure_exists(cmd.id).await?;
        Ok(self
            .identity
            .update_user(
                cmd.id,
                AccountChanges {
                    email: cmd.email,
                    display_name: cmd.display_name,
                },
            )
            .await?)
    }

    #[instrument(skip(self, caller), err)]
    pub async fn delete_user(&self, caller: &CallerIdentity, id: UserId) -> Result<(), UseCaseError> {
        authorize(caller, &Permission::USERS_MANAGE)?;
        if caller.user_id() == id {
            return Err(UseCaseError::validation("users cannot delete their own account"));
        }
        self.ensure_exists(id).await?;
        self.identity.delete_user(id).await?;
        tracing::info!(user_id = %id, "user deleted");
        Ok(())
    }

    #[instrument(skip(self, caller), err)]
    pub async fn assign_role(
        &self,
        caller: &CallerIdentity,
        id: UserId,
        role: &str,
    ) -> Result<UserAccount, UseCaseError> {
        authorize(caller, &Permission::USERS_MANAGE)?;
        let role = known_role(role)?;
        self.ensure_exists(id).await?;
        Ok(self.identity.assign_role(id, role).await?)
    }

    #[instrument(skip(self, caller), err)]
    pub async fn remove_role(
        &self,
        caller: &CallerIdentity,
        id: UserId,
        role: &str,
    ) -> Result<UserAccount, UseCaseError> {
        authorize(caller, &Permission::USERS_MANAGE)?;
        let role = known_role(role)?;
        self.ensure_exists(id).await?;
        Ok(self.identity.remove_role(id, role).await?)
    }

    pub async fn get_user(&self, caller: &CallerIdentity, id: UserId) -> Result<UserAccount, UseCaseError> {
        authorize(caller, &Permission::USERS_MANAGE)?;
        self.identity.find_user(id).await.ok_or(UseCaseError::NotFound)
    }

    pub async fn list_users(&self, caller: &CallerIdentity) -> Result<Vec<UserAccount>, UseCaseError> {
        authorize(caller, &Permission::USERS_MANAGE)?;
        Ok(self.identity.list_users().await)
    }

    /// Create a confirmed administrator when no users exist yet.
    pub async fn seed_admin(
        &self,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserAccount>, UseCaseError> {
        if !self.identity.list_users().await.is_empty() {
            return Ok(None);
        }
        let account = self
            .identity
            .create_user(
                NewAccount {
                    email: email.to_string(),
                    display_name: "Administrator".to_string(),
                    password: password.to_string(),
                    roles: vec![Role::admin()],
                    email_confirmed: true,
                },
                now,
            )
            .await?;
        tracing::info!(user_id = %account.id, email = %account.email, "seeded administrator account");
        Ok(Some(account))
    }

    async fn issue_tokens(&self, account: UserAccount, now: DateTime<Utc>) -> Result<AuthTokens, UseCaseError> {
        let (access_token, claims) = self
            .jwt
            .issue(&account, now)
            .map_err(|e| UseCaseError::Internal(e.to_string()))?;
        let refresh_expires_at = now
            .checked_add_signed(self.refresh_ttl)
            .ok_or_else(|| UseCaseError::Internal("refresh token expiry is out of range".to_string()))?;
        let refresh_token = self
            .identity
            .issue_refresh_token(account.id, refresh_expires_at)
            .await?;

        Ok(AuthTokens {
            access_token,
            token_type: "Bearer",
            expires_at: claims.expires_at,
            refresh_token,
            refresh_expires_at,
            user: account,
        })
    }

    async fn ensure_exists(&self, id: UserId) -> Result<(), UseCaseError> {
        match self.identity.find_user(id).await {
            Some(_) => Ok(()),
            None => Err(UseCaseError::NotFound),
        }
    }
}

fn known_role(raw: &str) -> Result<Role, UseCaseError> {
    Role::known(raw).ok_or_else(|| UseCaseError::validation(format!("unknown role '{}'", raw.trim())))
}

fn parse_roles(violations: &mut Violations, raw: &[String]) -> Vec<Role> {
    raw.iter()
        .filter_map(|r| {
            let role = Role::known(r);
            if role.is_none() {
                violations.push(format!("unknown role '{}'", r.trim()));
            }
            role
        })
        .collect()
}
