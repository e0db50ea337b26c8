use chrono::Utc;
use tracing::instrument;

use marketplace_core::{Aggregate, AggregateRoot, DomainError, ExpectedVersion, OrderId, UserId};
use marketplace_orders::{
    ActingParty, Delivery, Order, OrderCommand, StageStatus, released_stock, summarize,
};

use super::views::{OrderHistory, OrderView};
use super::ServiceResult;
use crate::store::{ListQuery, Page, PageMetadata, SharedStore};

/// Checkout, fulfilment and order read paths.
#[derive(Clone)]
pub struct OrderService {
    store: SharedStore,
}

impl OrderService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Turn the buyer's cart into one order per line.
    #[instrument(skip(self, delivery), fields(buyer_id = %buyer_id), err)]
    pub async fn checkout(&self, buyer_id: UserId, delivery: Delivery) -> ServiceResult<Vec<OrderView>> {
        let orders = self.store.checkout(buyer_id, &delivery, Utc::now()).await?;
        tracing::info!(orders = orders.len(), city = %delivery.city, "checkout completed");
        self.views(&orders).await
    }

    /// Seller signal on one of their orders.
    #[instrument(skip(self), fields(seller_id = %seller_id, order_id = %id), err)]
    pub async fn advance(&self, seller_id: UserId, id: OrderId, requested: StageStatus) -> ServiceResult<OrderView> {
        let order = self
            .run(ActingParty::Seller(seller_id), id, OrderCommand::AdvanceStage { requested })
            .await?;
        tracing::info!(
            stage = %order.stage().state.stage,
            status = %order.stage().state.status,
            closed = order.is_closed(),
            "order stage advanced"
        );
        self.view(&order).await
    }

    /// Buyer cancellation. Closes the order and puts its quantity back in stock.
    #[instrument(skip(self), fields(buyer_id = %buyer_id, order_id = %id), err)]
    pub async fn cancel(&self, buyer_id: UserId, id: OrderId) -> ServiceResult<OrderView> {
        let order = self.run(ActingParty::Buyer(buyer_id), id, OrderCommand::Cancel).await?;
        tracing::info!(quantity = order.quantity(), product_id = %order.product_id(), "order cancelled");
        self.view(&order).await
    }

    pub async fn get_order(&self, party: ActingParty, id: OrderId) -> ServiceResult<OrderView> {
        let order = self.load_owned(party, id).await?;
        self.view(&order).await
    }

    #[instrument(skip(self, query), err)]
    pub async fn list_orders(&self, party: ActingParty, query: &ListQuery) -> ServiceResult<Page<OrderView>> {
        let (orders, total) = self.store.list_orders(party, query).await?;
        Ok(Page {
            items: self.views(&orders).await?,
            metadata: PageMetadata::calculate(total, query),
        })
    }

    /// Closed orders that reached `(success, success)`, newest first.
    pub async fn list_success_orders(&self, party: ActingParty) -> ServiceResult<Vec<OrderView>> {
        let orders = self.store.list_fulfilled_orders(party).await?;
        self.views(&orders).await
    }

    /// Fulfilled orders with overall and current-month totals.
    pub async fn statistics(&self, party: ActingParty) -> ServiceResult<OrderHistory> {
        let orders = self.store.list_fulfilled_orders(party).await?;
        let stats = summarize(&orders, Utc::now())?;
        Ok(OrderHistory::new(self.views(&orders).await?, stats))
    }

    async fn load_owned(&self, party: ActingParty, id: OrderId) -> ServiceResult<Order> {
        // Another party's order is reported as missing.
        match self.store.load_order(id).await? {
            Some(order) if party.owns(&order) => Ok(order),
            _ => Err(DomainError::not_found().into()),
        }
    }

    async fn run(&self, party: ActingParty, id: OrderId, command: OrderCommand) -> ServiceResult<Order> {
        let mut order = self.load_owned(party, id).await?;
        let expected = ExpectedVersion::Exact(order.version());

        let events = order.execute(&command)?;
        self.store
            .commit_order(&order, expected, released_stock(&events))
            .await?;
        Ok(order)
    }

    async fn view(&self, order: &Order) -> ServiceResult<OrderView> {
        let product = self.store.product(order.product_id()).await?;
        Ok(OrderView::new(order, product))
    }

    async fn views(&self, orders: &[Order]) -> ServiceResult<Vec<OrderView>> {
        let mut views = Vec::with_capacity(orders.len());
        for order in orders {
            views.push(self.view(order).await?);
        }
        Ok(views)
    }
}
