use serde::{Deserialize, Serialize};

use marketplace_core::UserId;

/// Distributor profile (seller side), shown next to cart lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distributor {
    pub user_id: UserId,
    pub name: String,
    pub company_name: String,
    pub details: String,
    pub phone_number: String,
    pub city: String,
    pub img_url: String,
}

/// Contact details of a user account at a point in time.
///
/// Orders copy the email out of this at checkout so later account changes don't
/// rewrite order history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub user_id: UserId,
    pub email: String,
}
