use std::str::FromStr;

use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use marketplace_core::DomainError;
use marketplace_infra::services::{OrderHistory, OrderView};
use marketplace_infra::store::ListQuery;
use marketplace_orders::Delivery;

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub city: String,
    pub address: String,
}

impl From<CheckoutRequest> for Delivery {
    fn from(value: CheckoutRequest) -> Self {
        Delivery {
            city: value.city,
            address: value.address,
        }
    }
}

/// Seller signal. Kept as text so unknown values get a domain validation error.
#[derive(Debug, Deserialize)]
pub struct AdvanceRequest {
    pub stage_status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort: Option<String>,
}

impl ListParams {
    pub fn to_query(&self) -> Result<ListQuery, axum::response::Response> {
        ListQuery::new(self.page, self.page_size, self.sort.as_deref())
            .map_err(errors::domain_error_to_response)
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct PurchasedResponse {
    pub orders: Vec<OrderView>,
    pub spent_overall: Decimal,
    pub spent_in_month: Decimal,
}

impl From<OrderHistory> for PurchasedResponse {
    fn from(value: OrderHistory) -> Self {
        Self {
            orders: value.orders,
            spent_overall: value.overall,
            spent_in_month: value.in_month,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SoldResponse {
    pub orders: Vec<OrderView>,
    pub sold_overall: Decimal,
    pub sold_in_month: Decimal,
}

impl From<OrderHistory> for SoldResponse {
    fn from(value: OrderHistory) -> Self {
        Self {
            orders: value.orders,
            sold_overall: value.overall,
            sold_in_month: value.in_month,
        }
    }
}

// -------------------------
// Helpers
// -------------------------

/// Parse a path identifier, answering 400 on failure.
pub fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse::<T>()
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string()))
}
