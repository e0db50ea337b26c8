//! Cart domain module.
//!
//! Accumulates a buyer's line items and keeps the running total, implemented as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod cart;

pub use cart::{Cart, CartCommand, CartEvent, CartItem, RemoveItem, SetItem};
