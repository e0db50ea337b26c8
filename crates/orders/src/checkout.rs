//! Checkout planning: turns a cart into orders plus the stock to take.
//!
//! Planning is pure. Storage backends call it while holding their product locks and
//! then persist the plan in one transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marketplace_cart::Cart;
use marketplace_catalog::{Contact, Product};
use marketplace_core::{DomainError, DomainResult, OrderId, ProductId, StageId, line_total};

use crate::order::{Order, OrderDetails};

/// Where the buyer wants the goods delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub city: String,
    pub address: String,
}

impl Delivery {
    pub fn validate(&self) -> DomainResult<()> {
        if self.city.trim().is_empty() {
            return Err(DomainError::validation("city is required"));
        }
        if self.address.trim().is_empty() {
            return Err(DomainError::validation("address is required"));
        }
        Ok(())
    }
}

/// Units taken out of a product's stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDecrement {
    pub product_id: ProductId,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutPlan {
    pub orders: Vec<Order>,
    pub decrements: Vec<StockDecrement>,
}

/// Everything checkout reads, looked up by the caller.
pub struct CheckoutInput<'a> {
    pub cart: Option<&'a Cart>,
    pub products: &'a [Product],
    pub buyer: &'a Contact,
    pub sellers: &'a [Contact],
    pub delivery: &'a Delivery,
    pub now: DateTime<Utc>,
}

/// Validate every line, then build one order per line.
///
/// Nothing is produced unless all lines pass, so a failure leaves stock untouched.
pub fn plan_checkout(input: CheckoutInput<'_>) -> DomainResult<CheckoutPlan> {
    let cart = match input.cart {
        Some(cart) if !cart.is_empty() => cart,
        _ => return Err(DomainError::invalid_state("cart is empty")),
    };
    input.delivery.validate()?;

    let mut lines = Vec::with_capacity(cart.items().len());
    for item in cart.items() {
        let product = input
            .products
            .iter()
            .find(|p| p.id == item.product_id)
            .ok_or_else(DomainError::not_found)?;
        product.check_stock(item.quantity)?;

        let seller = input
            .sellers
            .iter()
            .find(|c| c.user_id == product.distributor_id)
            .ok_or_else(DomainError::not_found)?;

        lines.push((item, product, seller));
    }

    let mut plan = CheckoutPlan {
        orders: Vec::with_capacity(lines.len()),
        decrements: Vec::with_capacity(lines.len()),
    };
    for (item, product, seller) in lines {
        let details = OrderDetails {
            buyer_id: cart.buyer_id(),
            seller_id: product.distributor_id,
            product_id: product.id,
            product_name: product.product_name.clone(),
            unit_price: product.price,
            quantity: item.quantity,
            total_price: line_total(product.price, item.quantity)?,
            created_at: input.now,
            city: input.delivery.city.clone(),
            address: input.delivery.address.clone(),
            buyer_email: input.buyer.email.clone(),
            seller_email: seller.email.clone(),
        };
        plan.orders.push(Order::place(OrderId::new(), StageId::new(), details));
        plan.decrements.push(StockDecrement {
            product_id: product.id,
            quantity: item.quantity,
        });
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::StageState;
    use marketplace_cart::{CartCommand, SetItem};
    use marketplace_core::{Aggregate, CartId, UserId};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    struct Fixture {
        buyer: Contact,
        seller: Contact,
        products: Vec<Product>,
        delivery: Delivery,
    }

    fn fixture() -> Fixture {
        let seller = Contact {
            user_id: UserId::new(),
            email: "seller@example.com".to_string(),
        };
        let product = |name: &str, price: Decimal, stock: i64| Product {
            id: ProductId::new(),
            distributor_id: seller.user_id,
            product_name: name.to_string(),
            product_description: String::new(),
            price,
            minimum_quantity: 1,
            stock,
            city: String::new(),
            category: String::new(),
            img_urls: Vec::new(),
        };
        Fixture {
            buyer: Contact {
                user_id: UserId::new(),
                email: "buyer@example.com".to_string(),
            },
            products: vec![product("Tea", dec!(10), 5), product("Salt", dec!(5), 5)],
            seller,
            delivery: Delivery {
                city: "Astana".to_string(),
                address: "Main st 2".to_string(),
            },
        }
    }

    fn cart_with(f: &Fixture, quantities: &[i64]) -> Cart {
        let mut cart = Cart::new(CartId::new(), f.buyer.user_id);
        for (product, quantity) in f.products.iter().zip(quantities) {
            cart.execute(&CartCommand::SetItem(SetItem {
                product: product.clone(),
                quantity: *quantity,
            }))
            .unwrap();
        }
        cart
    }

    fn input<'a>(f: &'a Fixture, cart: Option<&'a Cart>, products: &'a [Product]) -> CheckoutInput<'a> {
        CheckoutInput {
            cart,
            products,
            buyer: &f.buyer,
            sellers: std::slice::from_ref(&f.seller),
            delivery: &f.delivery,
            now: Utc::now(),
        }
    }

    #[test]
    fn two_lines_make_two_active_orders() {
        let f = fixture();
        let cart = cart_with(&f, &[2, 1]);

        let plan = plan_checkout(input(&f, Some(&cart), &f.products)).unwrap();

        assert_eq!(plan.orders.len(), 2);
        for order in &plan.orders {
            assert!(!order.is_closed());
            assert_eq!(order.stage().state, StageState::initial());
            assert_eq!(order.details().buyer_email, "buyer@example.com");
            assert_eq!(order.details().seller_email, "seller@example.com");
        }
        assert_eq!(plan.orders[0].total_price(), dec!(20));
        assert_eq!(plan.orders[1].total_price(), dec!(5));
        assert_eq!(
            plan.decrements,
            vec![
                StockDecrement { product_id: f.products[0].id, quantity: 2 },
                StockDecrement { product_id: f.products[1].id, quantity: 1 },
            ]
        );
    }

    #[test]
    fn missing_or_empty_cart_is_invalid_state() {
        let f = fixture();
        let err = plan_checkout(input(&f, None, &f.products)).unwrap_err();
        assert_eq!(err, DomainError::invalid_state("cart is empty"));

        let empty = Cart::new(CartId::new(), f.buyer.user_id);
        let err = plan_checkout(input(&f, Some(&empty), &f.products)).unwrap_err();
        assert_eq!(err, DomainError::invalid_state("cart is empty"));
    }

    #[test]
    fn any_short_line_fails_the_whole_checkout() {
        let f = fixture();
        let cart = cart_with(&f, &[2, 4]);

        let mut drained = f.products.clone();
        drained[1].stock = 3;

        let err = plan_checkout(input(&f, Some(&cart), &drained)).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                product: "Salt".to_string(),
                requested: 4,
                available: 3,
            }
        );
    }

    #[test]
    fn blank_delivery_is_rejected() {
        let mut f = fixture();
        f.delivery.address = "  ".to_string();
        let cart = cart_with(&f, &[1]);
        let err = plan_checkout(input(&f, Some(&cart), &f.products)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
