use axum::{routing::get, Router};

pub mod distributor;
pub mod store;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/store", store::router())
        .nest("/distributor", distributor::router())
}
