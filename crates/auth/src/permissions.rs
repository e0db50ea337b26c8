use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Role;

/// Permission identifier.
///
/// Permissions are opaque strings (e.g. "orders.purchase"). The wildcard `"*"`
/// grants everything and is what the admin role maps to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    /// Manage one's own cart.
    pub const CART_MANAGE: Permission = Permission(Cow::Borrowed("cart.manage"));
    /// Check out, view and cancel one's own purchases.
    pub const ORDERS_PURCHASE: Permission = Permission(Cow::Borrowed("orders.purchase"));
    /// View and advance orders placed against one's products.
    pub const ORDERS_FULFIL: Permission = Permission(Cow::Borrowed("orders.fulfil"));
    pub const WILDCARD: Permission = Permission(Cow::Borrowed("*"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static role→permission policy. Unknown roles grant nothing.
pub fn permissions_for(role: &Role) -> Vec<Permission> {
    match role.as_str() {
        "admin" => vec![Permission::WILDCARD],
        "store" => vec![Permission::CART_MANAGE, Permission::ORDERS_PURCHASE],
        "distributor" => vec![Permission::ORDERS_FULFIL],
        _ => Vec::new(),
    }
}

/// Union of the permissions granted by `roles`, without duplicates.
pub fn permissions_from_roles(roles: &[Role]) -> Vec<Permission> {
    let mut out: Vec<Permission> = Vec::new();
    for perm in roles.iter().flat_map(permissions_for) {
        if !out.contains(&perm) {
            out.push(perm);
        }
    }
    out
}
