use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier carried in tokens.
///
/// Roles stay opaque strings on the wire; the marketplace recognises three of them
/// (see the associated constants) and ignores anything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    /// Buyer account.
    pub const STORE: Role = Role(Cow::Borrowed("store"));
    /// Seller account.
    pub const DISTRIBUTOR: Role = Role(Cow::Borrowed("distributor"));
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
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
