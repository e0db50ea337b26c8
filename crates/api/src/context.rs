use marketplace_auth::{Principal, Role};
use marketplace_core::UserId;
use marketplace_orders::ActingParty;

/// Principal context for a request (authenticated identity + resolved permissions).
///
/// Inserted by the auth middleware; present on every protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn user_id(&self) -> UserId {
        self.principal.user_id
    }

    pub fn roles(&self) -> &[Role] {
        &self.principal.roles
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// The caller as the buyer side of its orders.
    pub fn as_buyer(&self) -> ActingParty {
        ActingParty::Buyer(self.user_id())
    }

    /// The caller as the seller side of its orders.
    pub fn as_seller(&self) -> ActingParty {
        ActingParty::Seller(self.user_id())
    }
}
