//! `marketplace-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod error;
pub mod id;
pub mod money;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{CartId, OrderId, ProductId, StageId, UserId};
pub use money::{checked_sum, line_total, round_to_cents};
