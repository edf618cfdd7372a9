use shiptrack_auth::{CallerIdentity, JwtClaims, Role};
use shiptrack_core::UserId;

/// Authenticated principal for a request (token subject + roles).
///
/// Inserted by the auth middleware; every protected handler turns it into
/// the [`CallerIdentity`] its use case expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    user_id: UserId,
    email: String,
    roles: Vec<Role>,
}

impl PrincipalContext {
    pub fn new(user_id: UserId, email: String, roles: Vec<Role>) -> Self {
        Self {
            user_id,
            email,
            roles,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn caller(&self) -> CallerIdentity {
        CallerIdentity::new(self.user_id, self.roles.clone())
    }
}

impl From<JwtClaims> for PrincipalContext {
    fn from(claims: JwtClaims) -> Self {
        Self::new(claims.sub, claims.email, claims.roles)
    }
}
