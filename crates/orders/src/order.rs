use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use marketplace_core::{Aggregate, AggregateRoot, DomainError, OrderId, ProductId, StageId, UserId};

use crate::lifecycle::advance;
use crate::stage::{OrderStatus, StageRecord, StageState, StageStatus};

/// Immutable part of an order, fixed at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i64,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub city: String,
    pub address: String,
    pub buyer_email: String,
    pub seller_email: String,
}

/// Aggregate root: Order (one per checked-out cart line).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    details: OrderDetails,
    status: OrderStatus,
    stage: StageRecord,
    version: u64,
}

impl Order {
    /// A freshly placed order: `(new, success)`, active, version 1.
    pub fn place(id: OrderId, stage_id: StageId, details: OrderDetails) -> Self {
        Self {
            id,
            details,
            status: OrderStatus::Active,
            stage: StageRecord::new(stage_id, StageState::initial()),
            version: 1,
        }
    }

    /// Rebuild an order from storage.
    pub fn restore(
        id: OrderId,
        details: OrderDetails,
        status: OrderStatus,
        stage: StageRecord,
        version: u64,
    ) -> Self {
        Self {
            id,
            details,
            status,
            stage,
            version,
        }
    }

    pub fn details(&self) -> &OrderDetails {
        &self.details
    }

    pub fn buyer_id(&self) -> UserId {
        self.details.buyer_id
    }

    pub fn seller_id(&self) -> UserId {
        self.details.seller_id
    }

    pub fn product_id(&self) -> ProductId {
        self.details.product_id
    }

    pub fn quantity(&self) -> i64 {
        self.details.quantity
    }

    pub fn total_price(&self) -> Decimal {
        self.details.total_price
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.details.created_at
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn stage(&self) -> &StageRecord {
        &self.stage
    }

    pub fn is_closed(&self) -> bool {
        self.status == OrderStatus::Closed
    }

    /// Closed with the final stage reached and no problem overlay.
    pub fn is_fulfilled(&self) -> bool {
        self.is_closed() && self.stage.state.is_fulfilled()
    }

    fn ensure_open(&self) -> Result<(), DomainError> {
        if self.is_closed() {
            return Err(DomainError::invalid_state("order is closed"));
        }
        if self.stage.state.status == StageStatus::Error {
            return Err(DomainError::invalid_state("order stage is in error"));
        }
        Ok(())
    }

    fn transition_events(&self, requested: StageStatus) -> Vec<OrderEvent> {
        let from = self.stage.state;
        let transition = advance(from, requested);
        let mut events = vec![OrderEvent::StageAdvanced {
            from,
            to: transition.next,
        }];
        if transition.closes {
            events.push(OrderEvent::OrderClosed);
        }
        events
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderCommand {
    /// Seller signal: apply a status overlay and let the lifecycle decide the stage.
    AdvanceStage { requested: StageStatus },
    /// Buyer cancellation: an error signal that also hands the stock back.
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    StageAdvanced { from: StageState, to: StageState },
    OrderClosed,
    /// Stock to put back on the product. Carried out by the caller, in the same
    /// transaction that persists the order.
    StockReleased { product_id: ProductId, quantity: i64 },
}

impl Aggregate for Order {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::StageAdvanced { to, .. } => {
                self.stage.state = *to;
            }
            OrderEvent::OrderClosed => {
                self.status = OrderStatus::Closed;
            }
            OrderEvent::StockReleased { .. } => {}
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        self.ensure_open()?;

        match command {
            OrderCommand::AdvanceStage { requested } => Ok(self.transition_events(*requested)),
            OrderCommand::Cancel => {
                let mut events = self.transition_events(StageStatus::Error);
                events.push(OrderEvent::StockReleased {
                    product_id: self.details.product_id,
                    quantity: self.details.quantity,
                });
                Ok(events)
            }
        }
    }
}

/// Stock to hand back, if any, from a batch of order events.
pub fn released_stock(events: &[OrderEvent]) -> Option<(ProductId, i64)> {
    events.iter().find_map(|e| match e {
        OrderEvent::StockReleased {
            product_id,
            quantity,
        } => Some((*product_id, *quantity)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Stage;
    use rust_decimal_macros::dec;

    fn order() -> Order {
        Order::place(
            OrderId::new(),
            StageId::new(),
            OrderDetails {
                buyer_id: UserId::new(),
                seller_id: UserId::new(),
                product_id: ProductId::new(),
                product_name: "Rice 25kg".to_string(),
                unit_price: dec!(10),
                quantity: 3,
                total_price: dec!(30),
                created_at: Utc::now(),
                city: "Almaty".to_string(),
                address: "Abay 1".to_string(),
                buyer_email: "store@example.com".to_string(),
                seller_email: "distributor@example.com".to_string(),
            },
        )
    }

    fn signal(order: &mut Order, requested: StageStatus) -> Result<Vec<OrderEvent>, DomainError> {
        order.execute(&OrderCommand::AdvanceStage { requested })
    }

    #[test]
    fn placed_order_is_active_new_success() {
        let o = order();
        assert_eq!(o.status(), OrderStatus::Active);
        assert_eq!(o.stage().state, StageState::new(Stage::New, StageStatus::Success));
        assert_eq!(o.version(), 1);
    }

    #[test]
    fn error_signal_closes_order() {
        let mut o = order();
        let events = signal(&mut o, StageStatus::Error).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[1], OrderEvent::OrderClosed);
        assert_eq!(o.stage().state, StageState::new(Stage::Confirmed, StageStatus::Error));
        assert!(o.is_closed());
        assert_eq!(o.version(), 3);
    }

    #[test]
    fn closed_order_rejects_further_signals() {
        let mut o = order();
        signal(&mut o, StageStatus::Error).unwrap();

        let err = signal(&mut o, StageStatus::Success).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));

        let err = o.handle(&OrderCommand::Cancel).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn full_success_walk_fulfils_order() {
        let mut o = order();
        for _ in 0..4 {
            signal(&mut o, StageStatus::Success).unwrap();
        }
        assert!(o.is_fulfilled());
    }

    #[test]
    fn warning_then_success_on_shipped_fulfils_order() {
        let mut o = order();
        signal(&mut o, StageStatus::Success).unwrap();
        signal(&mut o, StageStatus::Success).unwrap();
        signal(&mut o, StageStatus::Warning).unwrap();
        assert_eq!(o.stage().state, StageState::new(Stage::Shipped, StageStatus::Warning));
        assert!(!o.is_closed());

        signal(&mut o, StageStatus::Success).unwrap();
        assert!(o.is_fulfilled());
    }

    #[test]
    fn cancel_closes_and_releases_quantity() {
        let mut o = order();
        let product_id = o.product_id();
        let events = o.execute(&OrderCommand::Cancel).unwrap();

        assert!(o.is_closed());
        assert_eq!(o.stage().state.status, StageStatus::Error);
        assert_eq!(released_stock(&events), Some((product_id, 3)));
    }

    #[test]
    fn plain_advance_releases_nothing() {
        let mut o = order();
        let events = signal(&mut o, StageStatus::Error).unwrap();
        assert_eq!(released_stock(&events), None);
    }
}
