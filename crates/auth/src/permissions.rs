use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Role;

/// Permission identifier (e.g. `"shipments.write"`).
///
/// The wildcard `"*"` grants everything and is only handed out to admins.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const SHIPMENTS_READ: Permission = Permission(Cow::Borrowed("shipments.read"));
    pub const SHIPMENTS_WRITE: Permission = Permission(Cow::Borrowed("shipments.write"));
    pub const PORTS_READ: Permission = Permission(Cow::Borrowed("ports.read"));
    pub const PORTS_WRITE: Permission = Permission(Cow::Borrowed("ports.write"));
    pub const USERS_MANAGE: Permission = Permission(Cow::Borrowed("users.manage"));
    pub const WILDCARD: Permission = Permission(Cow::Borrowed("*"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Permissions granted by a role. Unknown roles grant nothing.
    pub fn for_role(role: &Role) -> Vec<Permission> {
        match role.as_str() {
            Role::ADMIN => vec![Permission::WILDCARD],
            Role::OPERATOR => vec![
                Permission::SHIPMENTS_READ,
                Permission::SHIPMENTS_WRITE,
                Permission::PORTS_READ,
            ],
            Role::VIEWER => vec![Permission::SHIPMENTS_READ, Permission::PORTS_READ],
            _ => Vec::new(),
        }
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
