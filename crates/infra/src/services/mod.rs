//! Application services: load, decide, persist.
//!
//! Each operation loads the aggregate from the store, runs the pure domain command
//! and persists the result with an optimistic version check. Errors from either
//! side are folded into [`ServiceError`].

use thiserror::Error;

use marketplace_core::DomainError;

use crate::store::StoreError;

pub mod cart;
pub mod orders;
pub mod views;

pub use cart::CartService;
pub use orders::OrderService;
pub use views::{CartLineView, CartView, OrderHistory, OrderView};

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Deterministic business failure (validation, state rules, missing record).
    #[error(transparent)]
    Domain(DomainError),

    /// Optimistic concurrency failure (stale version or racing insert).
    #[error("conflict: {0}")]
    Concurrency(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Storage failed for reasons unrelated to the request.
    #[error("store error: {0}")]
    Store(String),
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Conflict(msg) => ServiceError::Concurrency(msg),
            other => ServiceError::Domain(other),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Domain(e) => e.into(),
            StoreError::Concurrency(msg) => ServiceError::Concurrency(msg),
            StoreError::NotFound(msg) => ServiceError::NotFound(msg),
            StoreError::Database(msg) => ServiceError::Store(msg),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
