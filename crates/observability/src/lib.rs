//! Shared tracing setup.
//!
//! Both entry points honor `RUST_LOG` and are safe to call more than once;
//! only the first call installs a subscriber.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Install JSON logs on stdout for a host process.
pub fn init() {
    // JSON logs + timestamps, configurable via RUST_LOG.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}

/// Install human-readable logs routed through the test harness, so output
/// only shows for failing tests.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_test_writer()
        .try_init();
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
