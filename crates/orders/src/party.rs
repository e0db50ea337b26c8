use serde::{Deserialize, Serialize};

use marketplace_core::UserId;

use crate::order::Order;

/// The authenticated user seen from one side of an order.
///
/// Every order read and write is scoped to the acting party: a store only sees what
/// it bought, a distributor only what it sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "side", content = "user_id", rename_all = "lowercase")]
pub enum ActingParty {
    Buyer(UserId),
    Seller(UserId),
}

impl ActingParty {
    pub fn user_id(&self) -> UserId {
        match self {
            ActingParty::Buyer(id) | ActingParty::Seller(id) => *id,
        }
    }

    pub fn owns(&self, order: &Order) -> bool {
        match self {
            ActingParty::Buyer(id) => order.buyer_id() == *id,
            ActingParty::Seller(id) => order.seller_id() == *id,
        }
    }
}
