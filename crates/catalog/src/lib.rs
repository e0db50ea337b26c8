//! Catalog types consumed by the cart and order engine.
//!
//! The catalog itself (product CRUD, search) lives outside this workspace; these
//! are the records it hands over plus the quantity/stock rules applied to them.

pub mod party;
pub mod product;

pub use party::{Contact, Distributor};
pub use product::Product;
