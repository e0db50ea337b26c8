//! Seller (distributor role) endpoints: fulfilment and sales history.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use marketplace_auth::Permission;
use marketplace_core::OrderId;
use marketplace_orders::StageStatus;

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/sold", get(sold))
        .route("/orders/:id", get(get_order).put(advance_order))
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(params): Query<dto::ListParams>,
) -> axum::response::Response {
    if let Err(res) = authz::require(&principal, Permission::ORDERS_FULFIL) {
        return res;
    }
    let query = match params.to_query() {
        Ok(q) => q,
        Err(res) => return res,
    };

    match services.orders.list_orders(principal.as_seller(), &query).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn sold(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(res) = authz::require(&principal, Permission::ORDERS_FULFIL) {
        return res;
    }

    match services.orders.statistics(principal.as_seller()).await {
        Ok(history) => (StatusCode::OK, Json(dto::SoldResponse::from(history))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(res) = authz::require(&principal, Permission::ORDERS_FULFIL) {
        return res;
    }
    let order_id: OrderId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.orders.get_order(principal.as_seller(), order_id).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn advance_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::AdvanceRequest>,
) -> axum::response::Response {
    if let Err(res) = authz::require(&principal, Permission::ORDERS_FULFIL) {
        return res;
    }
    let order_id: OrderId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let requested: StageStatus = match body.stage_status.parse() {
        Ok(s) => s,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services
        .orders
        .advance(principal.user_id(), order_id, requested)
        .await
    {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
