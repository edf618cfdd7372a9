use std::collections::HashSet;

use shiptrack_core::UserId;

use crate::{Permission, Role};

/// Identity of the caller of a use case.
///
/// Built by the transport layer from a validated token and handed to each
/// use case explicitly; there is no ambient "current user".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    user_id: UserId,
    roles: Vec<Role>,
}

impl CallerIdentity {
    pub fn new(user_id: UserId, roles: Vec<Role>) -> Self {
        Self { user_id, roles }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Effective permissions derived from the caller's roles.
    pub fn permissions(&self) -> HashSet<Permission> {
        self.roles.iter().flat_map(Permission::for_role).collect()
    }
}
