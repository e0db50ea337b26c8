use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use marketplace_cart::Cart;
use marketplace_catalog::{Contact, Distributor, Product};
use marketplace_core::{AggregateRoot, ExpectedVersion, OrderId, ProductId, UserId};
use marketplace_orders::{ActingParty, CheckoutInput, Delivery, Order, plan_checkout};

use super::query::ListQuery;
use super::{CartStore, CatalogStore, OrderStore, StoreError};

#[derive(Debug, Default)]
struct State {
    products: HashMap<ProductId, Product>,
    distributors: HashMap<UserId, Distributor>,
    contacts: HashMap<UserId, Contact>,
    carts: HashMap<UserId, Cart>,
    orders: HashMap<OrderId, Order>,
}

/// In-memory store.
///
/// Intended for tests/dev. A single lock guards all records, so checkout and
/// cancellation are atomic with respect to every other operation.
#[derive(Debug, Default)]
pub struct InMemoryMarketStore {
    state: RwLock<State>,
}

impl InMemoryMarketStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Database("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Database("lock poisoned".to_string()))
    }

    /// Seed or replace a catalog product.
    pub fn insert_product(&self, product: Product) -> Result<(), StoreError> {
        self.write()?.products.insert(product.id, product);
        Ok(())
    }

    pub fn insert_distributor(&self, distributor: Distributor) -> Result<(), StoreError> {
        self.write()?
            .distributors
            .insert(distributor.user_id, distributor);
        Ok(())
    }

    pub fn insert_contact(&self, contact: Contact) -> Result<(), StoreError> {
        self.write()?.contacts.insert(contact.user_id, contact);
        Ok(())
    }
}

#[async_trait::async_trait]
impl CatalogStore for InMemoryMarketStore {
    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    async fn distributor(&self, user_id: UserId) -> Result<Option<Distributor>, StoreError> {
        Ok(self.read()?.distributors.get(&user_id).cloned())
    }

    async fn contact(&self, user_id: UserId) -> Result<Option<Contact>, StoreError> {
        Ok(self.read()?.contacts.get(&user_id).cloned())
    }
}

#[async_trait::async_trait]
impl CartStore for InMemoryMarketStore {
    async fn load_cart(&self, buyer_id: UserId) -> Result<Option<Cart>, StoreError> {
        Ok(self.read()?.carts.get(&buyer_id).cloned())
    }

    async fn save_cart(&self, cart: &Cart, expected: ExpectedVersion) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let current = state
            .carts
            .get(&cart.buyer_id())
            .map(|c| c.version())
            .unwrap_or(0);

        if !expected.matches(current) {
            return Err(StoreError::Concurrency(format!(
                "cart: expected {expected:?}, found {current}"
            )));
        }

        if cart.is_empty() {
            state.carts.remove(&cart.buyer_id());
        } else {
            state.carts.insert(cart.buyer_id(), cart.clone());
        }
        Ok(())
    }

    async fn delete_cart(&self, buyer_id: UserId) -> Result<(), StoreError> {
        self.write()?.carts.remove(&buyer_id);
        Ok(())
    }
}

#[async_trait::async_trait]
impl OrderStore for InMemoryMarketStore {
    async fn checkout(
        &self,
        buyer_id: UserId,
        delivery: &Delivery,
        now: DateTime<Utc>,
    ) -> Result<Vec<Order>, StoreError> {
        let mut state = self.write()?;

        let cart = state.carts.get(&buyer_id);
        let products: Vec<Product> = cart
            .map(|c| {
                c.items()
                    .iter()
                    .filter_map(|i| state.products.get(&i.product_id).cloned())
                    .collect()
            })
            .unwrap_or_default();
        let sellers: Vec<Contact> = products
            .iter()
            .filter_map(|p| state.contacts.get(&p.distributor_id).cloned())
            .collect();
        let buyer = state
            .contacts
            .get(&buyer_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("contact {buyer_id}")))?;

        let plan = plan_checkout(CheckoutInput {
            cart,
            products: &products,
            buyer: &buyer,
            sellers: &sellers,
            delivery,
            now,
        })?;

        // Every line was checked against the same locked snapshot, so these cannot fail.
        for decrement in &plan.decrements {
            if let Some(product) = state.products.get_mut(&decrement.product_id) {
                product.reserve(decrement.quantity)?;
            }
        }
        for order in &plan.orders {
            state.orders.insert(*order.id(), order.clone());
        }
        state.carts.remove(&buyer_id);

        Ok(plan.orders)
    }

    async fn load_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.read()?.orders.get(&id).cloned())
    }

    async fn commit_order(
        &self,
        order: &Order,
        expected: ExpectedVersion,
        release: Option<(ProductId, i64)>,
    ) -> Result<(), StoreError> {
        let mut state = self.write()?;

        let current = state
            .orders
            .get(order.id())
            .map(|o| o.version())
            .ok_or_else(|| StoreError::NotFound(format!("order {}", order.id())))?;
        if !expected.matches(current) {
            return Err(StoreError::Concurrency(format!(
                "order {}: expected {expected:?}, found {current}",
                order.id()
            )));
        }

        if let Some((product_id, quantity)) = release {
            let product = state
                .products
                .get_mut(&product_id)
                .ok_or_else(|| StoreError::NotFound(format!("product {product_id}")))?;
            product.release(quantity)?;
        }
        state.orders.insert(*order.id(), order.clone());
        Ok(())
    }

    async fn list_orders(
        &self,
        party: ActingParty,
        query: &ListQuery,
    ) -> Result<(Vec<Order>, u64), StoreError> {
        let state = self.read()?;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| party.owns(o))
            .cloned()
            .collect();
        let total = orders.len() as u64;

        query.sort_orders(&mut orders);
        let page = orders
            .into_iter()
            .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
            .take(query.limit() as usize)
            .collect();
        Ok((page, total))
    }

    async fn list_fulfilled_orders(&self, party: ActingParty) -> Result<Vec<Order>, StoreError> {
        let state = self.read()?;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| party.owns(o) && o.is_fulfilled())
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then_with(|| b.id().cmp(a.id())));
        Ok(orders)
    }
}
