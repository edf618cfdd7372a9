//! `shiptrack-auth` — authentication/authorization boundary.
//!
//! Decoupled from HTTP and storage: token claims and their validation,
//! role/permission policy, the caller identity passed into every use case,
//! and the identity-provider port.

pub mod authorize;
pub mod claims;
pub mod identity;
pub mod jwt;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use identity::{
    AccountChanges, IdentityFailure, IdentityResult, IdentityService, InMemoryIdentityService,
    NewAccount, Notifier, TracingNotifier, UserAccount,
};
pub use jwt::{Hs256Jwt, JwtError, JwtValidator};
pub use permissions::Permission;
pub use principal::CallerIdentity;
pub use roles::Role;
