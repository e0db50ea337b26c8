//! Storage boundary for catalog lookups, carts and orders.
//!
//! Two backends implement it: [`InMemoryMarketStore`] for tests/dev and
//! [`PostgresMarketStore`] for production. Multi-record writes (checkout,
//! cancellation) are single store operations so each backend can make them atomic.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use marketplace_cart::Cart;
use marketplace_catalog::{Contact, Distributor, Product};
use marketplace_core::{DomainError, ExpectedVersion, OrderId, ProductId, UserId};
use marketplace_orders::{ActingParty, Delivery, Order};

pub mod in_memory;
pub mod postgres;
pub mod query;

pub use in_memory::InMemoryMarketStore;
pub use postgres::PostgresMarketStore;
pub use query::{ListQuery, Page, PageMetadata, Sort, SortField};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A business rule rejected the write (checked under the store's lock).
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(String),
}

/// Read access to catalog records owned by the catalog service.
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    async fn distributor(&self, user_id: UserId) -> Result<Option<Distributor>, StoreError>;

    async fn contact(&self, user_id: UserId) -> Result<Option<Contact>, StoreError>;
}

#[async_trait::async_trait]
pub trait CartStore: Send + Sync {
    async fn load_cart(&self, buyer_id: UserId) -> Result<Option<Cart>, StoreError>;

    /// Insert or update the buyer's cart; an empty cart is deleted instead.
    ///
    /// `expected` is compared with the stored version (0 when no cart exists).
    async fn save_cart(&self, cart: &Cart, expected: ExpectedVersion) -> Result<(), StoreError>;

    /// Delete the buyer's cart. No-op when there is none.
    async fn delete_cart(&self, buyer_id: UserId) -> Result<(), StoreError>;
}

#[async_trait::async_trait]
pub trait OrderStore: Send + Sync {
    /// Turn the buyer's cart into orders in one atomic step.
    ///
    /// Stock is re-checked under lock for every line before anything is written;
    /// on success stock is decremented, the orders are inserted and the cart is
    /// deleted.
    async fn checkout(
        &self,
        buyer_id: UserId,
        delivery: &Delivery,
        now: DateTime<Utc>,
    ) -> Result<Vec<Order>, StoreError>;

    async fn load_order(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Persist an order's mutable state (status + stage) after a command.
    ///
    /// When `release` is set, that quantity is added back to the product's stock in
    /// the same transaction.
    async fn commit_order(
        &self,
        order: &Order,
        expected: ExpectedVersion,
        release: Option<(ProductId, i64)>,
    ) -> Result<(), StoreError>;

    /// One page of the party's orders plus the total number of matching orders.
    async fn list_orders(
        &self,
        party: ActingParty,
        query: &ListQuery,
    ) -> Result<(Vec<Order>, u64), StoreError>;

    /// Closed orders that reached `(success, success)`, newest first.
    async fn list_fulfilled_orders(&self, party: ActingParty) -> Result<Vec<Order>, StoreError>;
}

/// Everything the application services need from storage.
pub trait MarketStore: CatalogStore + CartStore + OrderStore {}

impl<T> MarketStore for T where T: CatalogStore + CartStore + OrderStore {}

/// Shared handle used by the services.
pub type SharedStore = Arc<dyn MarketStore>;
