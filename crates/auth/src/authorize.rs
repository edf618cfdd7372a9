use thiserror::Error;

use crate::{CallerIdentity, Permission};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Check that the caller holds `required` (or the wildcard).
///
/// Pure policy check: no IO, no panics.
pub fn authorize(caller: &CallerIdentity, required: &Permission) -> Result<(), AuthzError> {
    let perms = caller.permissions();
    if perms.contains(&Permission::WILDCARD) || perms.contains(required) {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %caller.user_id(),
            permission = %required,
            "authorization denied"
        );
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use shiptrack_core::UserId;

    use super::*;
    use crate::Role;

    fn caller(roles: &[Role]) -> CallerIdentity {
        CallerIdentity::new(UserId::new(), roles.to_vec())
    }

    #[test]
    fn admin_is_granted_everything() {
        let admin = caller(&[Role::admin()]);
        assert!(authorize(&admin, &Permission::USERS_MANAGE).is_ok());
        assert!(authorize(&admin, &Permission::new("anything.else")).is_ok());
    }

    #[test]
    fn operator_can_write_shipments_but_not_ports() {
        let op = caller(&[Role::operator()]);
        assert!(authorize(&op, &Permission::SHIPMENTS_WRITE).is_ok());
        assert_eq!(
            authorize(&op, &Permission::PORTS_WRITE),
            Err(AuthzError::Forbidden("ports.write".to_string()))
        );
    }

    #[test]
    fn viewer_is_read_only() {
        let viewer = caller(&[Role::viewer()]);
        assert!(authorize(&viewer, &Permission::SHIPMENTS_READ).is_ok());
        assert!(authorize(&viewer, &Permission::SHIPMENTS_WRITE).is_err());
    }

    #[test]
    fn unknown_roles_grant_nothing() {
        let nobody = caller(&[Role::new("guest")]);
        assert!(authorize(&nobody, &Permission::SHIPMENTS_READ).is_err());
    }
}
