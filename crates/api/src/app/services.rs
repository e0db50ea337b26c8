use std::sync::Arc;

use marketplace_infra::config::AppConfig;
use marketplace_infra::services::{CartService, OrderService};
use marketplace_infra::store::{InMemoryMarketStore, PostgresMarketStore, SharedStore};

/// Application services shared by every handler.
#[derive(Clone)]
pub struct AppServices {
    pub cart: CartService,
    pub orders: OrderService,
}

impl AppServices {
    pub fn new(store: SharedStore) -> Self {
        Self {
            cart: CartService::new(store.clone()),
            orders: OrderService::new(store),
        }
    }
}

/// Pick the store backend from configuration.
///
/// Postgres when a database is configured (schema applied on startup), otherwise
/// the in-memory store.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let store: SharedStore = match &config.database {
        Some(db) => {
            let store = PostgresMarketStore::connect(db).await?;
            store.apply_schema().await?;
            tracing::info!(max_connections = db.max_connections, "using postgres store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("USE_PERSISTENT_STORES not enabled; data lives in memory only");
            Arc::new(InMemoryMarketStore::new())
        }
    };
    Ok(AppServices::new(store))
}
