//! Tracing/logging initialization: JSON lines on stdout, filtered by `EnvFilter`.

use tracing_subscriber::EnvFilter;

/// Filter from `RUST_LOG`, falling back to `level`, then to `info` if `level` does
/// not parse.
pub fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize tracing/logging for the process.
pub fn init(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(level))
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();

    ::tracing::debug!(level, "tracing initialized");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_a_no_op() {
        init("debug");
        init("warn");
    }

    #[test]
    fn unparsable_level_falls_back() {
        // Builds a filter either way; must not panic.
        let _ = filter("not a [valid filter");
    }
}
