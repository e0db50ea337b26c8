//! `marketplace-auth`: token verification and role-based authorization.
//!
//! Decoupled from HTTP and storage; the API layer feeds it bearer tokens.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use permissions::{Permission, permissions_for, permissions_from_roles};
pub use principal::Principal;
pub use roles::Role;
