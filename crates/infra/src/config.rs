//! Configuration loading and representation.
//!
//! Values come from the process environment, optionally seeded from a `.env` file.
//! The resulting [`AppConfig`] is passed explicitly to whatever needs it.

use std::env;

use dotenv::dotenv;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_SERVER_ADDRESS: &str = "0.0.0.0:8080";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("missing {0}; set DATABASE_URL or DB_HOST/DB_USER/DB_NAME")]
    Missing(&'static str),
}

/// Postgres connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub server_address: String,
    /// `None` keeps everything in memory.
    pub database: Option<DatabaseConfig>,
    pub jwt_secret: String,
    pub log_level: String,
}

impl AppConfig {
    /// Load `.env` (if present), then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let server_address =
            non_empty("SERVER_ADDRESS").unwrap_or_else(|| DEFAULT_SERVER_ADDRESS.to_string());
        let log_level = non_empty("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        let jwt_secret = non_empty("JWT_SECRET").unwrap_or_else(|| DEV_JWT_SECRET.to_string());

        let use_persistent = match non_empty("USE_PERSISTENT_STORES") {
            Some(v) => v.parse::<bool>().map_err(|e| ConfigError::Invalid {
                key: "USE_PERSISTENT_STORES",
                message: e.to_string(),
            })?,
            None => false,
        };

        let database = if use_persistent {
            let max_connections = match non_empty("DB_MAX_CONNECTIONS") {
                Some(v) => v.parse::<u32>().map_err(|e| ConfigError::Invalid {
                    key: "DB_MAX_CONNECTIONS",
                    message: e.to_string(),
                })?,
                None => DEFAULT_MAX_CONNECTIONS,
            };
            Some(DatabaseConfig {
                url: database_url(&non_empty)?,
                max_connections,
            })
        } else {
            None
        };

        Ok(Self {
            server_address,
            database,
            jwt_secret,
            log_level,
        })
    }

    /// True when no `JWT_SECRET` was configured and the built-in dev secret is in use.
    pub fn uses_dev_jwt_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    /// In-memory config for tests and local runs.
    pub fn in_memory(jwt_secret: impl Into<String>) -> Self {
        Self {
            server_address: DEFAULT_SERVER_ADDRESS.to_string(),
            database: None,
            jwt_secret: jwt_secret.into(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

fn database_url(lookup: &impl Fn(&str) -> Option<String>) -> Result<String, ConfigError> {
    if let Some(url) = lookup("DATABASE_URL") {
        return Ok(url);
    }

    let host = lookup("DB_HOST").ok_or(ConfigError::Missing("DB_HOST"))?;
    let user = lookup("DB_USER").ok_or(ConfigError::Missing("DB_USER"))?;
    let name = lookup("DB_NAME").ok_or(ConfigError::Missing("DB_NAME"))?;
    let port = lookup("DB_PORT").unwrap_or_else(|| "5432".to_string());
    let password = lookup("DB_PASSWORD").unwrap_or_default();

    Ok(format!("postgres://{user}:{password}@{host}:{port}/{name}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_to_in_memory() {
        let cfg = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.server_address, DEFAULT_SERVER_ADDRESS);
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.jwt_secret, DEV_JWT_SECRET);
        assert!(cfg.uses_dev_jwt_secret());
        assert!(cfg.database.is_none());
    }

    #[test]
    fn assembles_url_from_parts() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("USE_PERSISTENT_STORES", "true"),
            ("DB_HOST", "db"),
            ("DB_USER", "market"),
            ("DB_PASSWORD", "pw"),
            ("DB_NAME", "marketplace"),
            ("DB_MAX_CONNECTIONS", "4"),
        ]))
        .unwrap();

        let db = cfg.database.unwrap();
        assert_eq!(db.url, "postgres://market:pw@db:5432/marketplace");
        assert_eq!(db.max_connections, 4);
    }

    #[test]
    fn database_url_wins_over_parts() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("USE_PERSISTENT_STORES", "true"),
            ("DATABASE_URL", "postgres://x/y"),
            ("DB_HOST", "ignored"),
        ]))
        .unwrap();
        assert_eq!(cfg.database.unwrap().url, "postgres://x/y");
    }

    #[test]
    fn persistent_without_database_settings_fails() {
        let err = AppConfig::from_lookup(lookup(&[("USE_PERSISTENT_STORES", "true")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DB_HOST"));
    }

    #[test]
    fn rejects_non_boolean_flag() {
        let err = AppConfig::from_lookup(lookup(&[("USE_PERSISTENT_STORES", "yes")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "USE_PERSISTENT_STORES", .. }));
    }

    #[test]
    fn configured_jwt_secret_is_not_the_dev_default() {
        let cfg = AppConfig::from_lookup(lookup(&[("JWT_SECRET", "s3cr3t")])).unwrap();
        assert_eq!(cfg.jwt_secret, "s3cr3t");
        assert!(!cfg.uses_dev_jwt_secret());
    }
}
