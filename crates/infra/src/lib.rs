//! Infrastructure layer: configuration, storage backends and application services.

pub mod config;
pub mod services;
pub mod store;
