//! Order lifecycle module.
//!
//! Checkout planning, the stage/status state machine, the `Order` aggregate and the
//! statistics fold. Deterministic domain logic only; persistence lives in infra.

pub mod checkout;
pub mod lifecycle;
pub mod order;
pub mod party;
pub mod stage;
pub mod statistics;

pub use checkout::{CheckoutInput, CheckoutPlan, Delivery, StockDecrement, plan_checkout};
pub use lifecycle::{Transition, advance};
pub use order::{Order, OrderCommand, OrderDetails, OrderEvent, released_stock};
pub use party::ActingParty;
pub use stage::{OrderStatus, Stage, StageRecord, StageState, StageStatus};
pub use statistics::{OrderStatistics, summarize};
