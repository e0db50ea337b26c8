use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use marketplace_core::{DomainError, DomainResult, ProductId, UserId};

/// Catalog product as seen by the cart and order engine.
///
/// Products are owned by the catalog (an external collaborator); this crate only
/// carries the fields the order engine needs plus the quantity rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub distributor_id: UserId,
    pub product_name: String,
    pub product_description: String,
    pub price: Decimal,
    pub minimum_quantity: i64,
    pub stock: i64,
    pub city: String,
    pub category: String,
    pub img_urls: Vec<String>,
}

impl Product {
    /// Validate a cart quantity against this product at add-time.
    ///
    /// Zero/negative quantities are rejected before the stock and minimum rules so
    /// a product with `minimum_quantity == 0` still needs a positive quantity.
    pub fn check_orderable(&self, quantity: i64) -> DomainResult<()> {
        if quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        self.check_stock(quantity)?;
        if quantity < self.minimum_quantity {
            return Err(DomainError::BelowMinimumQuantity {
                minimum: self.minimum_quantity,
                requested: quantity,
            });
        }
        Ok(())
    }

    /// Fail with `InsufficientStock` when `quantity` exceeds the current stock.
    pub fn check_stock(&self, quantity: i64) -> DomainResult<()> {
        if self.stock < quantity {
            return Err(DomainError::InsufficientStock {
                product: self.product_name.clone(),
                requested: quantity,
                available: self.stock,
            });
        }
        Ok(())
    }

    /// Take `quantity` units out of stock.
    pub fn reserve(&mut self, quantity: i64) -> DomainResult<()> {
        self.check_stock(quantity)?;
        self.stock -= quantity;
        Ok(())
    }

    /// Put `quantity` units back into stock (cancelled order).
    pub fn release(&mut self, quantity: i64) -> DomainResult<()> {
        self.stock = self
            .stock
            .checked_add(quantity)
            .ok_or_else(|| DomainError::validation("stock overflow"))?;
        Ok(())
    }
}
