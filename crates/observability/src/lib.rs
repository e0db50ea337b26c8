//! Process-wide tracing setup.

/// Tracing configuration (filters, layers).
pub mod tracing;

/// Initialize tracing/logging at `level` (e.g. `"info"`, `"marketplace_infra=debug"`).
///
/// `RUST_LOG` takes precedence when set. Safe to call multiple times; subsequent
/// calls are no-ops.
pub fn init(level: &str) {
    tracing::init(level);
}
