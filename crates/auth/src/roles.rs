use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier used for RBAC.
///
/// Three roles are known to the policy: `admin`, `operator` and `viewer`.
/// Tokens may carry other names; they simply grant nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: &'static str = "admin";
    pub const OPERATOR: &'static str = "operator";
    pub const VIEWER: &'static str = "viewer";

    pub const KNOWN: [&'static str; 3] = [Self::ADMIN, Self::OPERATOR, Self::VIEWER];

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn admin() -> Self {
        Self::new(Self::ADMIN)
    }

    pub fn operator() -> Self {
        Self::new(Self::OPERATOR)
    }

    pub fn viewer() -> Self {
        Self::new(Self::VIEWER)
    }

    /// Resolve a user-supplied role name (case-insensitive) to a known role.
    pub fn known(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::KNOWN
            .into_iter()
            .find(|k| k.eq_ignore_ascii_case(name))
            .map(Self::new)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
