use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use marketplace_catalog::Product;
use marketplace_core::{
    Aggregate, AggregateRoot, CartId, DomainError, DomainResult, ProductId, UserId, checked_sum,
    line_total,
};

/// Cart line: product, quantity and the unit price captured when it was set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub distributor_id: UserId,
    pub quantity: i64,
    pub unit_price: Decimal,
}

impl CartItem {
    pub fn line_total(&self) -> DomainResult<Decimal> {
        line_total(self.unit_price, self.quantity)
    }
}

/// Aggregate root: a buyer's cart.
///
/// Invariant: `total_price` is always the exact sum of the lines' totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    id: CartId,
    buyer_id: UserId,
    items: Vec<CartItem>,
    total_price: Decimal,
    version: u64,
}

impl Cart {
    /// A cart that has not been persisted yet (version 0).
    pub fn new(id: CartId, buyer_id: UserId) -> Self {
        Self {
            id,
            buyer_id,
            items: Vec::new(),
            total_price: Decimal::ZERO,
            version: 0,
        }
    }

    /// Rebuild a cart from storage. The total is recomputed from the lines.
    pub fn restore(
        id: CartId,
        buyer_id: UserId,
        items: Vec<CartItem>,
        version: u64,
    ) -> DomainResult<Self> {
        let total_price = total_of(&items)?;
        Ok(Self {
            id,
            buyer_id,
            items,
            total_price,
            version,
        })
    }

    pub fn buyer_id(&self) -> UserId {
        self.buyer_id
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn item(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    pub fn total_price(&self) -> Decimal {
        self.total_price
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total of every line except `product_id`'s.
    fn total_without(&self, product_id: ProductId) -> DomainResult<Decimal> {
        total_of(self.items.iter().filter(|i| i.product_id != product_id))
    }
}

fn total_of<'a>(items: impl IntoIterator<Item = &'a CartItem>) -> DomainResult<Decimal> {
    let lines = items
        .into_iter()
        .map(CartItem::line_total)
        .collect::<DomainResult<Vec<_>>>()?;
    checked_sum(lines)
}

impl AggregateRoot for Cart {
    type Id = CartId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: set a product's quantity in the cart (add or replace).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetItem {
    pub product: Product,
    pub quantity: i64,
}

/// Command: remove a product's line from the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveItem {
    pub product_id: ProductId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartCommand {
    SetItem(SetItem),
    RemoveItem(RemoveItem),
}

/// Each event carries the cart total after it, checked for overflow in `handle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartEvent {
    ItemSet { item: CartItem, total_price: Decimal },
    ItemRemoved { product_id: ProductId, total_price: Decimal },
}

impl Aggregate for Cart {
    type Command = CartCommand;
    type Event = CartEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CartEvent::ItemSet { item, total_price } => {
                match self.items.iter_mut().find(|i| i.product_id == item.product_id) {
                    Some(existing) => *existing = item.clone(),
                    None => self.items.push(item.clone()),
                }
                self.total_price = *total_price;
            }
            CartEvent::ItemRemoved { product_id, total_price } => {
                self.items.retain(|i| i.product_id != *product_id);
                self.total_price = *total_price;
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CartCommand::SetItem(cmd) => {
                cmd.product.check_orderable(cmd.quantity)?;
                let item = CartItem {
                    product_id: cmd.product.id,
                    distributor_id: cmd.product.distributor_id,
                    quantity: cmd.quantity,
                    unit_price: cmd.product.price,
                };
                let total_price =
                    checked_sum([self.total_without(item.product_id)?, item.line_total()?])?;
                Ok(vec![CartEvent::ItemSet { item, total_price }])
            }
            CartCommand::RemoveItem(cmd) => {
                if self.item(cmd.product_id).is_none() {
                    return Err(DomainError::not_found());
                }
                Ok(vec![CartEvent::ItemRemoved {
                    product_id: cmd.product_id,
                    total_price: self.total_without(cmd.product_id)?,
                }])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product(price: Decimal, stock: i64, minimum_quantity: i64) -> Product {
        Product {
            id: ProductId::new(),
            distributor_id: UserId::new(),
            product_name: "Sugar".to_string(),
            product_description: String::new(),
            price,
            minimum_quantity,
            stock,
            city: String::new(),
            category: String::new(),
            img_urls: Vec::new(),
        }
    }

    fn set(cart: &mut Cart, product: &Product, quantity: i64) -> Result<(), DomainError> {
        cart.execute(&CartCommand::SetItem(SetItem {
            product: product.clone(),
            quantity,
        }))
        .map(|_| ())
    }

    #[test]
    fn adding_items_sums_totals() {
        let mut cart = Cart::new(CartId::new(), UserId::new());
        let a = product(dec!(10), 5, 1);
        let b = product(dec!(5), 5, 1);

        set(&mut cart, &a, 2).unwrap();
        set(&mut cart, &b, 1).unwrap();

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.total_price(), dec!(25));
        assert_eq!(cart.version(), 2);
    }

    #[test]
    fn re_adding_a_product_replaces_quantity() {
        let mut cart = Cart::new(CartId::new(), UserId::new());
        let a = product(dec!(10), 10, 1);

        set(&mut cart, &a, 2).unwrap();
        set(&mut cart, &a, 3).unwrap();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.item(a.id).unwrap().quantity, 3);
        assert_eq!(cart.total_price(), dec!(30));
    }

    #[test]
    fn quantity_over_stock_is_rejected_and_cart_unchanged() {
        let mut cart = Cart::new(CartId::new(), UserId::new());
        let a = product(dec!(10), 1, 1);

        let err = set(&mut cart, &a, 2).unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { .. }));
        assert!(cart.is_empty());
        assert_eq!(cart.version(), 0);
    }

    #[test]
    fn oversized_line_is_rejected_and_cart_unchanged() {
        let mut cart = Cart::new(CartId::new(), UserId::new());
        let a = product(dec!(9999999999.9999), i64::MAX, 1);

        let err = set(&mut cart, &a, i64::MAX).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(cart.is_empty());
        assert_eq!(cart.version(), 0);
    }

    #[test]
    fn removing_last_item_leaves_empty_cart() {
        let mut cart = Cart::new(CartId::new(), UserId::new());
        let a = product(dec!(7.25), 10, 1);
        set(&mut cart, &a, 2).unwrap();

        cart.execute(&CartCommand::RemoveItem(RemoveItem { product_id: a.id }))
            .unwrap();

        assert!(cart.is_empty());
        assert_eq!(cart.total_price(), Decimal::ZERO);
    }

    #[test]
    fn removing_unknown_item_is_not_found() {
        let cart = Cart::new(CartId::new(), UserId::new());
        let err = cart
            .handle(&CartCommand::RemoveItem(RemoveItem {
                product_id: ProductId::new(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn restore_recomputes_total_from_lines() {
        let items = vec![
            CartItem {
                product_id: ProductId::new(),
                distributor_id: UserId::new(),
                quantity: 3,
                unit_price: dec!(1.10),
            },
            CartItem {
                product_id: ProductId::new(),
                distributor_id: UserId::new(),
                quantity: 1,
                unit_price: dec!(0.05),
            },
        ];
        let cart = Cart::restore(CartId::new(), UserId::new(), items, 4).unwrap();
        assert_eq!(cart.total_price(), dec!(3.35));
        assert_eq!(cart.version(), 4);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Set { product: usize, quantity: i64 },
            Remove { product: usize },
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0usize..4, 1i64..20).prop_map(|(product, quantity)| Op::Set { product, quantity }),
                (0usize..4).prop_map(|product| Op::Remove { product }),
            ]
        }

        proptest! {
            /// Property: after any add/remove sequence the total equals the sum of lines.
            #[test]
            fn total_always_matches_lines(
                cents in proptest::collection::vec(1i64..100_000, 4),
                ops in proptest::collection::vec(op(), 0..40),
            ) {
                let products: Vec<Product> = cents
                    .iter()
                    .map(|c| product(Decimal::new(*c, 2), 100, 1))
                    .collect();
                let mut cart = Cart::new(CartId::new(), UserId::new());

                for op in ops {
                    let command = match op {
                        Op::Set { product, quantity } => CartCommand::SetItem(SetItem {
                            product: products[product].clone(),
                            quantity,
                        }),
                        Op::Remove { product } => CartCommand::RemoveItem(RemoveItem {
                            product_id: products[product].id,
                        }),
                    };
                    let _ = cart.execute(&command);

                    let expected: Decimal = cart
                        .items()
                        .iter()
                        .map(|i| i.unit_price * Decimal::from(i.quantity))
                        .sum();
                    prop_assert_eq!(cart.total_price(), expected);
                }
            }
        }
    }
}
