//! Read models returned by the services. Money is rounded to cents here.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use marketplace_cart::Cart;
use marketplace_catalog::{Distributor, Product};
use marketplace_core::{AggregateRoot, CartId, OrderId, ProductId, UserId, round_to_cents};
use marketplace_orders::{Order, OrderStatistics, OrderStatus, StageRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineView {
    pub product_id: ProductId,
    /// Current catalog record; `None` if the product was removed from the catalog.
    pub product: Option<Product>,
    pub distributor: Option<Distributor>,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartView {
    /// `None` for a buyer without a cart.
    pub id: Option<CartId>,
    pub buyer_id: UserId,
    pub items: Vec<CartLineView>,
    pub total_price: Decimal,
}

impl CartView {
    /// The value returned for a buyer who has no cart.
    pub fn empty(buyer_id: UserId) -> Self {
        Self {
            id: None,
            buyer_id,
            items: Vec::new(),
            total_price: Decimal::ZERO,
        }
    }

    pub(crate) fn from_cart(cart: &Cart, items: Vec<CartLineView>) -> Self {
        if cart.is_empty() {
            return Self::empty(cart.buyer_id());
        }
        Self {
            id: Some(*cart.id()),
            buyer_id: cart.buyer_id(),
            items,
            total_price: round_to_cents(cart.total_price()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderView {
    pub id: OrderId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub product_id: ProductId,
    pub product_name: String,
    /// Current catalog record, joined at read time.
    pub product: Option<Product>,
    pub unit_price: Decimal,
    pub quantity: i64,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub city: String,
    pub address: String,
    pub buyer_email: String,
    pub seller_email: String,
    pub status: OrderStatus,
    pub stage: StageRecord,
}

impl OrderView {
    pub fn new(order: &Order, product: Option<Product>) -> Self {
        let d = order.details();
        Self {
            id: *order.id(),
            buyer_id: d.buyer_id,
            seller_id: d.seller_id,
            product_id: d.product_id,
            product_name: d.product_name.clone(),
            product,
            unit_price: d.unit_price,
            quantity: d.quantity,
            total_price: round_to_cents(d.total_price),
            created_at: d.created_at,
            city: d.city.clone(),
            address: d.address.clone(),
            buyer_email: d.buyer_email.clone(),
            seller_email: d.seller_email.clone(),
            status: order.status(),
            stage: *order.stage(),
        }
    }
}

/// Fulfilled orders plus their money totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderHistory {
    pub orders: Vec<OrderView>,
    pub overall: Decimal,
    pub in_month: Decimal,
}

impl OrderHistory {
    pub fn new(orders: Vec<OrderView>, stats: OrderStatistics) -> Self {
        Self {
            orders,
            overall: round_to_cents(stats.overall),
            in_month: round_to_cents(stats.in_month),
        }
    }
}
