//! Buyer (store role) endpoints: cart management, checkout and purchase history.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use marketplace_auth::Permission;
use marketplace_core::{OrderId, ProductId};

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/carts", get(get_cart))
        .route(
            "/carts/products/:id",
            post(add_item).put(update_item).delete(remove_item),
        )
        .route("/orders", post(checkout).get(list_orders))
        .route("/orders/purchased", get(purchased))
        .route("/orders/:id", get(get_order).put(cancel_order))
}

pub async fn get_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(res) = authz::require(&principal, Permission::CART_MANAGE) {
        return res;
    }

    match services.cart.get_cart(principal.user_id()).await {
        Ok(cart) => (StatusCode::OK, Json(cart)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn add_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::QuantityRequest>,
) -> axum::response::Response {
    if let Err(res) = authz::require(&principal, Permission::CART_MANAGE) {
        return res;
    }
    let product_id: ProductId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services
        .cart
        .add_item(principal.user_id(), product_id, body.quantity)
        .await
    {
        Ok(cart) => (StatusCode::OK, Json(cart)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::QuantityRequest>,
) -> axum::response::Response {
    if let Err(res) = authz::require(&principal, Permission::CART_MANAGE) {
        return res;
    }
    let product_id: ProductId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services
        .cart
        .update_item(principal.user_id(), product_id, body.quantity)
        .await
    {
        Ok(cart) => (StatusCode::OK, Json(cart)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn remove_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(res) = authz::require(&principal, Permission::CART_MANAGE) {
        return res;
    }
    let product_id: ProductId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.cart.remove_item(principal.user_id(), product_id).await {
        Ok(cart) => (StatusCode::OK, Json(cart)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn checkout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CheckoutRequest>,
) -> axum::response::Response {
    if let Err(res) = authz::require(&principal, Permission::ORDERS_PURCHASE) {
        return res;
    }

    match services.orders.checkout(principal.user_id(), body.into()).await {
        Ok(orders) => (StatusCode::CREATED, Json(orders)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(params): Query<dto::ListParams>,
) -> axum::response::Response {
    if let Err(res) = authz::require(&principal, Permission::ORDERS_PURCHASE) {
        return res;
    }
    let query = match params.to_query() {
        Ok(q) => q,
        Err(res) => return res,
    };

    match services.orders.list_orders(principal.as_buyer(), &query).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn purchased(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(res) = authz::require(&principal, Permission::ORDERS_PURCHASE) {
        return res;
    }

    match services.orders.statistics(principal.as_buyer()).await {
        Ok(history) => (StatusCode::OK, Json(dto::PurchasedResponse::from(history))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(res) = authz::require(&principal, Permission::ORDERS_PURCHASE) {
        return res;
    }
    let order_id: OrderId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.orders.get_order(principal.as_buyer(), order_id).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Buyer cancellation; the order closes and its stock is returned.
pub async fn cancel_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(res) = authz::require(&principal, Permission::ORDERS_PURCHASE) {
        return res;
    }
    let order_id: OrderId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.orders.cancel(principal.user_id(), order_id).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
