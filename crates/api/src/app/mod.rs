//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection and application services
//! - `routes/`: HTTP routes + handlers (one file per caller role)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use marketplace_auth::Hs256JwtValidator;
use marketplace_infra::config::AppConfig;
use marketplace_infra::store::SharedStore;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: AppConfig) -> anyhow::Result<Router> {
    let services = services::build_services(&config).await?;
    Ok(router(&config.jwt_secret, services))
}

/// Router over an already constructed store (tests seed an in-memory one).
pub fn build_app_with_store(jwt_secret: &str, store: SharedStore) -> Router {
    router(jwt_secret, services::AppServices::new(store))
}

fn router(jwt_secret: &str, services: services::AppServices) -> Router {
    let jwt = Arc::new(Hs256JwtValidator::new(jwt_secret));
    let auth_state = middleware::AuthState { jwt };

    // Protected routes: require a valid bearer token.
    let protected = routes::router()
        .layer(Extension(Arc::new(services)))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new())
}
