use marketplace_core::UserId;

use crate::{JwtClaims, Permission, Role, permissions_from_roles};

/// A fully resolved principal for authorization decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
}

impl Principal {
    /// Resolve permissions for the roles carried in verified claims.
    pub fn from_claims(claims: &JwtClaims) -> Self {
        Self::new(claims.sub, claims.roles.clone())
    }

    pub fn new(user_id: UserId, roles: Vec<Role>) -> Self {
        let permissions = permissions_from_roles(&roles);
        Self {
            user_id,
            roles,
            permissions,
        }
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }
}
