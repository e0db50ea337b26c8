//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// state rules, conflicts). Storage failures belong to the infra layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The operation is not allowed in the current state (e.g. closed order).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Not enough stock to satisfy the requested quantity.
    #[error("not enough quantity in stock for product {product} (requested: {requested}, available: {available})")]
    InsufficientStock {
        product: String,
        requested: i64,
        available: i64,
    },

    /// Requested quantity is below the product's minimum order quantity.
    #[error("less than minimum quantity (minimum: {minimum}, requested: {requested})")]
    BelowMinimumQuantity { minimum: i64, requested: i64 },

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found.
    #[error("not found")]
    NotFound,

    /// A conflict occurred (stale version / optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Authorization failure at the domain boundary.
    #[error("unauthorized")]
    Unauthorized,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// True for every variant that reports a rejected state transition or a
    /// quantity rule (as opposed to malformed input or a missing record).
    pub fn is_invalid_state(&self) -> bool {
        matches!(
            self,
            Self::InvalidState(_) | Self::InsufficientStock { .. } | Self::BelowMinimumQuantity { .. }
        )
    }
}
